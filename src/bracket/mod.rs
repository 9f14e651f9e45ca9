//! Bracket planners for the supported tournament formats.
//!
//! Planners are pure: they take a [`SeedingContext`] and return a
//! [`BracketPlan`] of matches to insert, linked by intra-plan indices. The
//! engine persists the plan, patches the index links into real match ids,
//! and runs advancement from there. Keeping planners free of storage makes
//! the pairing logic testable without a store and benchmarkable on its own.
//!
//! - `seeding`: seed ordering and first-round pairing shared by the
//!   elimination formats
//! - `fan`: seeded knockout with one consolation round for first-round
//!   losers
//! - `olympic`: knockout main draw plus recursive placement ladders that
//!   rank every entrant
//! - `round_robin`: circle-method all-plays-all schedule and standings

use chrono::{DateTime, Utc};
use enum_dispatch::enum_dispatch;

use crate::tournament::error::ValidationError;
use crate::tournament::models::{EntrantRef, MatchStatus, TournamentFormat};

pub mod fan;
pub mod olympic;
pub mod round_robin;
pub mod seeding;

pub use fan::FanGenerator;
pub use olympic::OlympicGenerator;
pub use round_robin::RoundRobinGenerator;
pub use seeding::SeedingContext;

/// A match to be inserted, with links expressed as indices into the owning
/// plan until the store assigns real ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMatch {
    pub round_index: u32,
    pub round_order: u32,
    pub is_consolation: bool,
    pub placement_min: Option<u32>,
    pub placement_max: Option<u32>,
    pub side1: Option<EntrantRef>,
    pub side2: Option<EntrantRef>,
    pub status: MatchStatus,
    pub deadline: Option<DateTime<Utc>>,
    pub winner: Option<EntrantRef>,
    /// Index of the plan match the winner advances to
    pub next_idx: Option<usize>,
    /// Index of the plan match the loser drops to
    pub loser_next_idx: Option<usize>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PlannedMatch {
    pub fn scheduled(
        round_index: u32,
        round_order: u32,
        side1: Option<EntrantRef>,
        side2: Option<EntrantRef>,
        deadline: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            round_index,
            round_order,
            is_consolation: false,
            placement_min: None,
            placement_max: None,
            side1,
            side2,
            status: MatchStatus::Scheduled,
            deadline,
            winner: None,
            next_idx: None,
            loser_next_idx: None,
            completed_at: None,
        }
    }

    /// Mark as a consolation-side match.
    pub fn consolation(mut self) -> Self {
        self.is_consolation = true;
        self
    }

    /// Plant the match already decided as a walkover.
    pub fn walkover_to(mut self, winner: EntrantRef, now: DateTime<Utc>) -> Self {
        self.status = MatchStatus::Walkover;
        self.winner = Some(winner);
        self.completed_at = Some(now);
        self
    }

    /// Attach the final-place range this match contests.
    pub fn contesting_places(mut self, min: u32, max: u32) -> Self {
        self.placement_min = Some(min);
        self.placement_max = Some(max);
        self
    }
}

/// Output of a bracket planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketPlan {
    pub matches: Vec<PlannedMatch>,
    /// Human-readable summary returned to the caller
    pub message: String,
}

/// Trait for turning a seeded entrant list into an initial bracket
#[enum_dispatch]
pub trait BuildBracket {
    fn build(&self, ctx: &SeedingContext) -> Result<BracketPlan, ValidationError>;
}

/// Planner for each supported format, dispatched statically.
#[enum_dispatch(BuildBracket)]
pub enum FormatGenerator {
    Fan(FanGenerator),
    Olympic(OlympicGenerator),
    RoundRobin(RoundRobinGenerator),
}

impl FormatGenerator {
    /// The planner matching a tournament's format.
    pub fn for_format(format: TournamentFormat) -> Self {
        match format {
            TournamentFormat::SingleElimination => FanGenerator.into(),
            TournamentFormat::OlympicPlacement => OlympicGenerator.into(),
            TournamentFormat::RoundRobin => RoundRobinGenerator.into(),
        }
    }
}
