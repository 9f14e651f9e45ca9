//! Storage trait for tournaments, matches, proposals, placements, and sweep
//! leases.
//!
//! The engine talks to storage only through [`EngineStore`], so the same
//! logic runs against PostgreSQL in production and the in-memory store in
//! tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::tournament::error::StoreResult;
use crate::tournament::models::{
    Match, MatchId, PlacementResult, ProposalId, ResultProposal, Tournament, TournamentId,
};

/// Trait for engine storage operations
#[async_trait]
pub trait EngineStore: Send + Sync {
    /// Insert a tournament, returning it with its assigned id
    async fn insert_tournament(&self, tournament: &Tournament) -> StoreResult<Tournament>;

    /// Fetch a tournament by id
    async fn tournament(&self, id: TournamentId) -> StoreResult<Option<Tournament>>;

    /// Persist all mutable tournament fields
    async fn update_tournament(&self, tournament: &Tournament) -> StoreResult<()>;

    /// Upcoming tournaments whose registration deadline has passed and whose
    /// bracket is not yet generated
    async fn tournaments_past_registration_deadline(
        &self,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Tournament>>;

    /// Insert a match, returning it with its assigned id
    async fn insert_match(&self, m: &Match) -> StoreResult<Match>;

    /// Fetch a match by id
    async fn match_by_id(&self, id: MatchId) -> StoreResult<Option<Match>>;

    /// Persist all mutable match fields
    async fn update_match(&self, m: &Match) -> StoreResult<()>;

    /// Persist a decided match only if the stored row is still open
    /// (scheduled or in progress); returns whether this write won
    async fn complete_match(&self, m: &Match) -> StoreResult<bool>;

    /// All matches of a tournament, ordered by round then round order
    async fn matches_of(&self, tournament: TournamentId) -> StoreResult<Vec<Match>>;

    /// The main-draw match at a bracket position, if it exists
    async fn main_draw_match_at(
        &self,
        tournament: TournamentId,
        round_index: u32,
        round_order: u32,
    ) -> StoreResult<Option<Match>>;

    /// Open matches whose deadline has passed, ordered by round, deadline,
    /// then round order so feeders come before the slots they feed
    async fn overdue_matches(&self, now: DateTime<Utc>) -> StoreResult<Vec<Match>>;

    /// Scheduled matches with a deadline inside the inclusive window
    async fn scheduled_matches_with_deadline_in(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Match>>;

    /// Insert a proposal, returning it with its assigned id
    async fn insert_proposal(&self, proposal: &ResultProposal) -> StoreResult<ResultProposal>;

    /// Fetch a proposal by id
    async fn proposal(&self, id: ProposalId) -> StoreResult<Option<ResultProposal>>;

    /// Persist a proposal's status
    async fn update_proposal(&self, proposal: &ResultProposal) -> StoreResult<()>;

    /// Pending proposals for a match, oldest first
    async fn pending_proposals_for(&self, match_id: MatchId) -> StoreResult<Vec<ResultProposal>>;

    /// Pending proposals created at or before the cutoff, oldest first
    async fn stale_pending_proposals(
        &self,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<Vec<ResultProposal>>;

    /// Write or overwrite the placement row for (tournament, player)
    async fn upsert_placement(&self, placement: &PlacementResult) -> StoreResult<()>;

    /// All placement rows of a tournament
    async fn placements_of(&self, tournament: TournamentId) -> StoreResult<Vec<PlacementResult>>;

    /// Take the named sweep lease if it is free or expired. The lease is
    /// never released early; its expiry is the sweep's cooldown.
    async fn try_acquire_lease(
        &self,
        name: &str,
        holder: Uuid,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> StoreResult<bool>;
}
