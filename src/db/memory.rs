//! In-memory [`EngineStore`] used by tests and self-contained runs.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::tournament::error::StoreResult;
use crate::tournament::models::{
    Match, MatchId, MatchStatus, PlacementResult, PlayerId, ProposalId, ProposalStatus,
    ResultProposal, SweepLease, Tournament, TournamentId, TournamentStatus,
};

use super::store::EngineStore;

/// Store backed by process memory.
///
/// All state sits behind one mutex and no method holds it across an await,
/// so the store gives the same effective isolation per call that a database
/// transaction would.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    tournaments: HashMap<TournamentId, Tournament>,
    matches: HashMap<MatchId, Match>,
    proposals: HashMap<ProposalId, ResultProposal>,
    placements: HashMap<(TournamentId, PlayerId), PlacementResult>,
    leases: HashMap<String, SweepLease>,
    next_id: i64,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EngineStore for MemoryStore {
    async fn insert_tournament(&self, tournament: &Tournament) -> StoreResult<Tournament> {
        let mut inner = self.inner.lock().await;
        let mut stored = tournament.clone();
        stored.id = inner.next_id();
        inner.tournaments.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn tournament(&self, id: TournamentId) -> StoreResult<Option<Tournament>> {
        Ok(self.inner.lock().await.tournaments.get(&id).cloned())
    }

    async fn update_tournament(&self, tournament: &Tournament) -> StoreResult<()> {
        self.inner
            .lock()
            .await
            .tournaments
            .insert(tournament.id, tournament.clone());
        Ok(())
    }

    async fn tournaments_past_registration_deadline(
        &self,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Tournament>> {
        let inner = self.inner.lock().await;
        let mut due: Vec<Tournament> = inner
            .tournaments
            .values()
            .filter(|t| {
                t.status == TournamentStatus::Upcoming
                    && !t.bracket_generated
                    && t.registration_deadline.is_some_and(|d| d <= now)
            })
            .cloned()
            .collect();
        due.sort_by_key(|t| t.id);
        Ok(due)
    }

    async fn insert_match(&self, m: &Match) -> StoreResult<Match> {
        let mut inner = self.inner.lock().await;
        let mut stored = m.clone();
        stored.id = inner.next_id();
        inner.matches.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn match_by_id(&self, id: MatchId) -> StoreResult<Option<Match>> {
        Ok(self.inner.lock().await.matches.get(&id).cloned())
    }

    async fn update_match(&self, m: &Match) -> StoreResult<()> {
        self.inner.lock().await.matches.insert(m.id, m.clone());
        Ok(())
    }

    async fn complete_match(&self, m: &Match) -> StoreResult<bool> {
        let mut inner = self.inner.lock().await;
        match inner.matches.get_mut(&m.id) {
            Some(stored) if !stored.status.is_terminal() => {
                *stored = m.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn matches_of(&self, tournament: TournamentId) -> StoreResult<Vec<Match>> {
        let inner = self.inner.lock().await;
        let mut matches: Vec<Match> = inner
            .matches
            .values()
            .filter(|m| m.tournament_id == tournament)
            .cloned()
            .collect();
        matches.sort_by_key(|m| (m.round_index, m.round_order, m.id));
        Ok(matches)
    }

    async fn main_draw_match_at(
        &self,
        tournament: TournamentId,
        round_index: u32,
        round_order: u32,
    ) -> StoreResult<Option<Match>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .matches
            .values()
            .find(|m| {
                m.tournament_id == tournament
                    && !m.is_consolation
                    && m.round_index == round_index
                    && m.round_order == round_order
            })
            .cloned())
    }

    async fn overdue_matches(&self, now: DateTime<Utc>) -> StoreResult<Vec<Match>> {
        let inner = self.inner.lock().await;
        let mut overdue: Vec<Match> = inner
            .matches
            .values()
            .filter(|m| {
                matches!(m.status, MatchStatus::Scheduled | MatchStatus::InProgress)
                    && m.deadline.is_some_and(|d| d <= now)
            })
            .cloned()
            .collect();
        overdue.sort_by_key(|m| (m.round_index, m.deadline, m.round_order, m.id));
        Ok(overdue)
    }

    async fn scheduled_matches_with_deadline_in(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Match>> {
        let inner = self.inner.lock().await;
        let mut upcoming: Vec<Match> = inner
            .matches
            .values()
            .filter(|m| {
                m.status == MatchStatus::Scheduled
                    && m.deadline.is_some_and(|d| from <= d && d <= to)
            })
            .cloned()
            .collect();
        upcoming.sort_by_key(|m| (m.deadline, m.id));
        Ok(upcoming)
    }

    async fn insert_proposal(&self, proposal: &ResultProposal) -> StoreResult<ResultProposal> {
        let mut inner = self.inner.lock().await;
        let mut stored = proposal.clone();
        stored.id = inner.next_id();
        inner.proposals.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn proposal(&self, id: ProposalId) -> StoreResult<Option<ResultProposal>> {
        Ok(self.inner.lock().await.proposals.get(&id).cloned())
    }

    async fn update_proposal(&self, proposal: &ResultProposal) -> StoreResult<()> {
        self.inner
            .lock()
            .await
            .proposals
            .insert(proposal.id, proposal.clone());
        Ok(())
    }

    async fn pending_proposals_for(&self, match_id: MatchId) -> StoreResult<Vec<ResultProposal>> {
        let inner = self.inner.lock().await;
        let mut pending: Vec<ResultProposal> = inner
            .proposals
            .values()
            .filter(|p| p.match_id == match_id && p.status == ProposalStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|p| (p.created_at, p.id));
        Ok(pending)
    }

    async fn stale_pending_proposals(
        &self,
        cutoff: DateTime<Utc>,
    ) -> StoreResult<Vec<ResultProposal>> {
        let inner = self.inner.lock().await;
        let mut stale: Vec<ResultProposal> = inner
            .proposals
            .values()
            .filter(|p| p.status == ProposalStatus::Pending && p.created_at <= cutoff)
            .cloned()
            .collect();
        stale.sort_by_key(|p| (p.created_at, p.id));
        Ok(stale)
    }

    async fn upsert_placement(&self, placement: &PlacementResult) -> StoreResult<()> {
        self.inner.lock().await.placements.insert(
            (placement.tournament_id, placement.player_id),
            placement.clone(),
        );
        Ok(())
    }

    async fn placements_of(&self, tournament: TournamentId) -> StoreResult<Vec<PlacementResult>> {
        let inner = self.inner.lock().await;
        let mut rows: Vec<PlacementResult> = inner
            .placements
            .values()
            .filter(|p| p.tournament_id == tournament)
            .cloned()
            .collect();
        rows.sort_by_key(|p| p.player_id);
        Ok(rows)
    }

    async fn try_acquire_lease(
        &self,
        name: &str,
        holder: Uuid,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut inner = self.inner.lock().await;
        let free = inner
            .leases
            .get(name)
            .is_none_or(|lease| lease.expires_at <= now);
        if free {
            inner.leases.insert(
                name.to_string(),
                SweepLease {
                    name: name.to_string(),
                    holder,
                    expires_at: now + ttl,
                },
            );
        }
        Ok(free)
    }
}
