//! The tournament engine facade.
//!
//! [`TournamentEngine`] wires the storage trait and the platform ports
//! together and exposes the operations hosts call: tournament creation,
//! bracket generation, the result confirmation workflow, and the periodic
//! sweeps. The workflow submodules hang their operations off the same
//! struct; this module owns the shared plumbing they lean on (roster
//! resolution, member lookup, best-effort notification).

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Value, json};

use crate::bracket::PlannedMatch;
use crate::bracket::round_robin::{StandingsRow, compute_standings};
use crate::db::EngineStore;
use crate::ports::{NotificationKind, NotificationSink, RankingProvider, RegistrationProvider};
use crate::tournament::error::{EngineResult, NotFoundError, ValidationError};
use crate::tournament::models::{
    Entrant, EntrantId, EntrantRef, Match, MatchId, PlacementResult, PlayerId, ProposalId,
    ResultProposal, Tournament, TournamentFormat, TournamentId, TournamentSettings,
};

mod advancement;
mod overdue;
mod proposals;
mod registration;
mod sweeps;

pub use sweeps::{BELOW_MINIMUM_GRACE_HOURS, STALE_PROPOSAL_HOURS};

/// Tournament engine
///
/// Cheap to clone; every clone shares the same store and ports.
#[derive(Clone)]
pub struct TournamentEngine {
    store: Arc<dyn EngineStore>,
    rankings: Arc<dyn RankingProvider>,
    registry: Arc<dyn RegistrationProvider>,
    notifier: Arc<dyn NotificationSink>,
}

impl TournamentEngine {
    /// Create a new engine over a store and the platform ports
    pub fn new(
        store: Arc<dyn EngineStore>,
        rankings: Arc<dyn RankingProvider>,
        registry: Arc<dyn RegistrationProvider>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            store,
            rankings,
            registry,
            notifier,
        }
    }

    /// Create a tournament from settings, returning it with its assigned id
    pub async fn create_tournament(
        &self,
        settings: TournamentSettings,
    ) -> EngineResult<Tournament> {
        let tournament = Tournament::from_settings(settings, Utc::now());
        let stored = self.store.insert_tournament(&tournament).await?;
        log::info!("Created tournament {} '{}'", stored.id, stored.name);
        Ok(stored)
    }

    /// Fetch a tournament by id
    pub async fn tournament(&self, id: TournamentId) -> EngineResult<Tournament> {
        self.require_tournament(id).await
    }

    /// All matches of a tournament, in bracket order
    pub async fn matches_of(&self, id: TournamentId) -> EngineResult<Vec<Match>> {
        Ok(self.store.matches_of(id).await?)
    }

    /// All placement rows of a tournament
    pub async fn placements_of(&self, id: TournamentId) -> EngineResult<Vec<PlacementResult>> {
        Ok(self.store.placements_of(id).await?)
    }

    /// Current round-robin table, ranked by the standings tie-break chain
    pub async fn round_robin_standings(
        &self,
        id: TournamentId,
    ) -> EngineResult<Vec<StandingsRow>> {
        let tournament = self.require_tournament(id).await?;
        if tournament.format != TournamentFormat::RoundRobin {
            return Err(ValidationError::WrongFormat {
                expected: TournamentFormat::RoundRobin,
                actual: tournament.format,
            }
            .into());
        }
        let roster = self.roster(id).await?;
        let entrants: Vec<EntrantId> = roster.iter().map(|e| e.id).collect();
        let matches = self.store.matches_of(id).await?;
        Ok(compute_standings(&entrants, &matches))
    }

    pub(crate) async fn require_tournament(&self, id: TournamentId) -> EngineResult<Tournament> {
        self.store
            .tournament(id)
            .await?
            .ok_or_else(|| NotFoundError::Tournament(id).into())
    }

    pub(crate) async fn require_match(&self, id: MatchId) -> EngineResult<Match> {
        self.store
            .match_by_id(id)
            .await?
            .ok_or_else(|| NotFoundError::Match(id).into())
    }

    pub(crate) async fn require_proposal(&self, id: ProposalId) -> EngineResult<ResultProposal> {
        self.store
            .proposal(id)
            .await?
            .ok_or_else(|| NotFoundError::Proposal(id).into())
    }

    /// The entrant roster as the registration port reports it. After bracket
    /// generation the set is frozen, so this doubles as the draw size.
    pub(crate) async fn roster(&self, tournament: TournamentId) -> EngineResult<Vec<Entrant>> {
        Ok(self.registry.registered_entrants(tournament).await?)
    }

    /// Member players of a roster entrant; unknown entrants have none.
    pub(crate) fn members_of(roster: &[Entrant], entrant: EntrantId) -> Vec<PlayerId> {
        roster
            .iter()
            .find(|e| e.id == entrant)
            .map(|e| e.members().collect())
            .unwrap_or_default()
    }

    /// Current rating of an entrant: the sum of its member ratings.
    pub(crate) async fn entrant_rating(&self, entrant: &Entrant) -> EngineResult<i64> {
        let mut total = 0;
        for player in entrant.members() {
            total += self.rankings.player_rating(player).await?;
        }
        Ok(total)
    }

    /// Rating of a roster entrant by id; unknown entrants rate 0.
    pub(crate) async fn rating_of(
        &self,
        roster: &[Entrant],
        entrant: EntrantId,
    ) -> EngineResult<i64> {
        match roster.iter().find(|e| e.id == entrant) {
            Some(e) => self.entrant_rating(e).await,
            None => Ok(0),
        }
    }

    /// Notify every member of an entrant. Delivery failures are logged and
    /// swallowed; notifications never roll back engine state.
    pub(crate) async fn notify_entrant(
        &self,
        roster: &[Entrant],
        entrant: EntrantId,
        kind: NotificationKind,
        payload: &Value,
    ) {
        for player in Self::members_of(roster, entrant) {
            if let Err(e) = self.notifier.notify(player, kind, payload.clone()).await {
                log::warn!(
                    "Failed to deliver {} to player {}: {}",
                    kind.as_str(),
                    player,
                    e
                );
            }
        }
    }

    /// Notify both real sides of a match.
    pub(crate) async fn notify_match_sides(
        &self,
        roster: &[Entrant],
        m: &Match,
        kind: NotificationKind,
        payload: &Value,
    ) {
        for side in m.sides().into_iter().flatten() {
            if let EntrantRef::Real(id) = side {
                self.notify_entrant(roster, id, kind, payload).await;
            }
        }
    }

    /// Tell both sides about a newly scheduled pairing. Planted walkovers,
    /// half-fed ladder slots, and bye placeholders stay silent until a real
    /// opponent exists.
    pub(crate) async fn announce_match(&self, roster: &[Entrant], m: &Match) {
        let (Some(EntrantRef::Real(a)), Some(EntrantRef::Real(b))) = (m.side1, m.side2) else {
            return;
        };
        if m.status.is_terminal() {
            return;
        }
        let payload = json!({
            "tournament_id": m.tournament_id,
            "match_id": m.id,
            "round": m.round_index,
            "deadline": m.deadline,
        });
        self.notify_entrant(roster, a, NotificationKind::MatchCreated, &payload)
            .await;
        self.notify_entrant(roster, b, NotificationKind::MatchCreated, &payload)
            .await;
    }

    /// Insert planned matches and patch their intra-plan links into real
    /// match ids.
    pub(crate) async fn persist_planned(
        &self,
        tournament: TournamentId,
        planned: &[PlannedMatch],
    ) -> EngineResult<Vec<Match>> {
        let mut created = Vec::with_capacity(planned.len());
        for p in planned {
            let m = Match {
                id: 0,
                tournament_id: tournament,
                round_index: p.round_index,
                round_order: p.round_order,
                is_consolation: p.is_consolation,
                placement_min: p.placement_min,
                placement_max: p.placement_max,
                side1: p.side1,
                side2: p.side2,
                status: p.status,
                deadline: p.deadline,
                winner: p.winner,
                sets: Vec::new(),
                next_match: None,
                loser_next_match: None,
                completed_at: p.completed_at,
            };
            created.push(self.store.insert_match(&m).await?);
        }
        for (i, p) in planned.iter().enumerate() {
            if p.next_idx.is_none() && p.loser_next_idx.is_none() {
                continue;
            }
            let next = p.next_idx.map(|idx| created[idx].id);
            let loser_next = p.loser_next_idx.map(|idx| created[idx].id);
            created[i].next_match = next;
            created[i].loser_next_match = loser_next;
            self.store.update_match(&created[i]).await?;
        }
        Ok(created)
    }
}
