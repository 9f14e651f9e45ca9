//! Olympic placement format.
//!
//! The main draw is the same lazy knockout the fan format uses. What differs
//! is what happens to losers: every cohort of same-round losers enters a
//! recursive placement ladder that keeps splitting winners from losers until
//! each entrant holds an exact final place. A cohort of size `s` contests
//! places `[lo, lo + s - 1]`; its entry-round winners fight on for the top
//! half of that range and its losers for the bottom half.

use chrono::{DateTime, Duration, Utc};

use crate::tournament::error::ValidationError;
use crate::tournament::models::{EntrantId, EntrantRef, MatchStatus};

use super::seeding::{SeedingContext, plan_first_round};
use super::{BracketPlan, BuildBracket, PlannedMatch};

/// Ladder matches number from here, above the consolation range.
pub const LADDER_ROUND_ORDER_BASE: u32 = 201;

/// Planner for the olympic placement format.
pub struct OlympicGenerator;

impl BuildBracket for OlympicGenerator {
    fn build(&self, ctx: &SeedingContext) -> Result<BracketPlan, ValidationError> {
        let n = ctx.entrants.len();
        if n < 2 {
            return Err(ValidationError::NotEnoughEntrants {
                needed: 2,
                current: n,
            });
        }

        let matches = plan_first_round(ctx);
        let message = format!(
            "Generated olympic round 1 with {} matches for {} entrants",
            matches.len(),
            n
        );

        Ok(BracketPlan { matches, message })
    }
}

/// A planned placement ladder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LadderPlan {
    pub matches: Vec<PlannedMatch>,
    /// Places assigned without play (cohorts of one)
    pub direct_places: Vec<(EntrantId, u32)>,
}

/// Plan the placement ladder for one cohort of same-round losers.
///
/// `cohort` lists the real losers of main-draw round `round_index` in the
/// round order of the matches they lost; `place_lo` is the best final place
/// still open to them. Entry matches pair first against last; each deeper
/// tier starts one match period later. Link indices refer to positions in
/// the returned match list.
pub fn plan_ladder(
    cohort: &[EntrantId],
    round_index: u32,
    place_lo: u32,
    start_date: DateTime<Utc>,
    match_period: Duration,
    order_base: u32,
) -> Result<LadderPlan, ValidationError> {
    let size = cohort.len();
    if size == 0 {
        return Ok(LadderPlan {
            matches: Vec::new(),
            direct_places: Vec::new(),
        });
    }
    if !size.is_power_of_two() {
        return Err(ValidationError::CohortNotPowerOfTwo(size));
    }

    let mut arena = Vec::new();
    let mut direct_places = Vec::new();
    build_tier(
        &mut arena,
        &mut direct_places,
        TierEntrants::Seeded(cohort.to_vec()),
        place_lo,
        place_lo + size as u32 - 1,
        0,
    );

    // Number matches tier by tier so shallower tiers carry lower orders,
    // while links keep referring to arena positions.
    let mut by_tier: Vec<usize> = (0..arena.len()).collect();
    by_tier.sort_by_key(|&i| (arena[i].depth, i));
    let mut orders = vec![0u32; arena.len()];
    for (position, &i) in by_tier.iter().enumerate() {
        orders[i] = order_base + position as u32;
    }

    let matches = arena
        .iter()
        .enumerate()
        .map(|(i, slot)| PlannedMatch {
            round_index,
            round_order: orders[i],
            is_consolation: true,
            placement_min: Some(slot.placement_min),
            placement_max: Some(slot.placement_max),
            side1: slot.side1,
            side2: slot.side2,
            status: MatchStatus::Scheduled,
            deadline: Some(start_date + match_period * (round_index + 1 + slot.depth) as i32),
            winner: None,
            next_idx: slot.next,
            loser_next_idx: slot.loser_next,
            completed_at: None,
        })
        .collect();

    Ok(LadderPlan {
        matches,
        direct_places,
    })
}

struct ArenaMatch {
    depth: u32,
    placement_min: u32,
    placement_max: u32,
    side1: Option<EntrantRef>,
    side2: Option<EntrantRef>,
    next: Option<usize>,
    loser_next: Option<usize>,
}

/// A tier's entrants: known ids at the cohort's entry, or slots still to be
/// filled by feeder results below it.
enum TierEntrants {
    Seeded(Vec<EntrantId>),
    Pending(usize),
}

impl TierEntrants {
    fn len(&self) -> usize {
        match self {
            TierEntrants::Seeded(ids) => ids.len(),
            TierEntrants::Pending(size) => *size,
        }
    }

    fn side(&self, position: usize) -> Option<EntrantRef> {
        match self {
            TierEntrants::Seeded(ids) => Some(EntrantRef::Real(ids[position])),
            TierEntrants::Pending(_) => None,
        }
    }
}

/// Build one tier and everything below it; returns the tier's entry match
/// indices in cohort-position order.
fn build_tier(
    arena: &mut Vec<ArenaMatch>,
    direct_places: &mut Vec<(EntrantId, u32)>,
    entrants: TierEntrants,
    lo: u32,
    hi: u32,
    depth: u32,
) -> Vec<usize> {
    let size = entrants.len();

    if size == 1 {
        if let TierEntrants::Seeded(ids) = &entrants {
            direct_places.push((ids[0], lo));
        }
        return Vec::new();
    }

    if size == 2 {
        let idx = arena.len();
        arena.push(ArenaMatch {
            depth,
            placement_min: lo,
            placement_max: hi,
            side1: entrants.side(0),
            side2: entrants.side(1),
            next: None,
            loser_next: None,
        });
        return vec![idx];
    }

    let half = size / 2;
    let mut entries = Vec::with_capacity(half);
    for i in 0..half {
        let idx = arena.len();
        arena.push(ArenaMatch {
            depth,
            placement_min: lo,
            placement_max: hi,
            side1: entrants.side(i),
            side2: entrants.side(size - 1 - i),
            next: None,
            loser_next: None,
        });
        entries.push(idx);
    }

    let winner_entries = build_tier(
        arena,
        direct_places,
        TierEntrants::Pending(half),
        lo,
        lo + half as u32 - 1,
        depth + 1,
    );
    let loser_entries = build_tier(
        arena,
        direct_places,
        TierEntrants::Pending(half),
        lo + half as u32,
        hi,
        depth + 1,
    );

    for (i, &idx) in entries.iter().enumerate() {
        let slot = i.min(half - 1 - i);
        arena[idx].next = Some(winner_entries[slot]);
        arena[idx].loser_next = Some(loser_entries[slot]);
    }

    entries
}
