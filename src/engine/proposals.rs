//! The result confirmation workflow.
//!
//! Results are double entry: one side proposes what happened, the other
//! confirms or rejects. An accepted proposal resolves the match and feeds
//! the advancement cascade; an unanswered one is accepted as submitted by
//! the stale sweep after [`STALE_PROPOSAL_HOURS`](super::STALE_PROPOSAL_HOURS).

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::ports::NotificationKind;
use crate::tournament::error::{EngineResult, StateError};
use crate::tournament::models::{
    EntrantId, EntrantRef, Match, MatchId, MatchStatus, ProposalId, ProposalStatus, ResultClaim,
    ResultProposal, SetScore,
};

use super::TournamentEngine;

impl TournamentEngine {
    /// Record a claimed result for the opponent to confirm.
    ///
    /// A second submission from the same side supersedes the first: any
    /// earlier pending proposal of the proposer is rejected in place.
    pub async fn propose_result(
        &self,
        match_id: MatchId,
        proposer: EntrantId,
        sets: Vec<SetScore>,
        claim: ResultClaim,
    ) -> EngineResult<ResultProposal> {
        let m = self.require_match(match_id).await?;
        if m.status.is_terminal() {
            return Err(StateError::MatchAlreadyResolved(match_id).into());
        }
        if !m.has_side(proposer) {
            return Err(StateError::NotAParticipant.into());
        }
        // A placeholder's Bye cannot confirm anything; the overdue sweep
        // settles it instead.
        if m.opponent_of(proposer) == Some(EntrantRef::Bye) {
            return Err(StateError::NoOpponent(match_id).into());
        }

        for mut prior in self.store.pending_proposals_for(match_id).await? {
            if prior.proposer == proposer {
                prior.status = ProposalStatus::Rejected;
                self.store.update_proposal(&prior).await?;
                log::debug!("Proposal {} superseded by a new submission", prior.id);
            }
        }

        let proposal = self
            .store
            .insert_proposal(&ResultProposal {
                id: 0,
                match_id,
                proposer,
                claim,
                sets,
                status: ProposalStatus::Pending,
                created_at: Utc::now(),
            })
            .await?;

        if let Some(EntrantRef::Real(opponent)) = m.opponent_of(proposer) {
            let roster = self.roster(m.tournament_id).await?;
            let payload = json!({
                "tournament_id": m.tournament_id,
                "match_id": match_id,
                "proposal_id": proposal.id,
                "claim": proposal.claim.as_str(),
            });
            self.notify_entrant(&roster, opponent, NotificationKind::ResultProposed, &payload)
                .await;
        }

        log::info!(
            "Entrant {} proposed a result for match {}",
            proposer,
            match_id
        );
        Ok(proposal)
    }

    /// Accept or reject the opponent's claim. Accepting resolves the match
    /// and cascades the advancement.
    pub async fn confirm_proposal(
        &self,
        proposal_id: ProposalId,
        confirmer: EntrantId,
        accept: bool,
    ) -> EngineResult<()> {
        let mut proposal = self.require_proposal(proposal_id).await?;
        if proposal.status != ProposalStatus::Pending {
            return Err(StateError::ProposalAlreadyResolved(proposal_id).into());
        }
        let m = self.require_match(proposal.match_id).await?;
        if m.status.is_terminal() {
            return Err(StateError::MatchAlreadyResolved(m.id).into());
        }
        if !m.has_side(confirmer) {
            return Err(StateError::NotAParticipant.into());
        }
        if confirmer == proposal.proposer {
            return Err(StateError::SelfConfirmation.into());
        }

        if !accept {
            proposal.status = ProposalStatus::Rejected;
            self.store.update_proposal(&proposal).await?;
            let roster = self.roster(m.tournament_id).await?;
            let payload = json!({
                "tournament_id": m.tournament_id,
                "match_id": m.id,
                "proposal_id": proposal_id,
            });
            self.notify_entrant(
                &roster,
                proposal.proposer,
                NotificationKind::ResultRejected,
                &payload,
            )
            .await;
            log::info!("Proposal {} rejected by entrant {}", proposal_id, confirmer);
            return Ok(());
        }

        if !self.apply_proposal(&m, &proposal, Utc::now(), false).await? {
            return Err(StateError::MatchAlreadyResolved(m.id).into());
        }
        Ok(())
    }

    /// Apply one unanswered proposal as if the opponent had accepted it.
    /// Proposals whose match disappeared or already resolved are rejected
    /// in place. Returns whether a result was applied.
    pub(crate) async fn apply_stale_proposal(
        &self,
        proposal: &ResultProposal,
        now: DateTime<Utc>,
    ) -> EngineResult<bool> {
        let Some(m) = self.store.match_by_id(proposal.match_id).await? else {
            self.reject_in_place(proposal).await?;
            return Ok(false);
        };
        if m.status.is_terminal() {
            self.reject_in_place(proposal).await?;
            return Ok(false);
        }
        self.apply_proposal(&m, proposal, now, true).await
    }

    /// Turn an accepted claim into the match result and cascade it.
    /// Returns false when another write resolved the match first.
    async fn apply_proposal(
        &self,
        m: &Match,
        proposal: &ResultProposal,
        now: DateTime<Utc>,
        auto_accepted: bool,
    ) -> EngineResult<bool> {
        let winner = if proposal.claim.wins_for_proposer() {
            EntrantRef::Real(proposal.proposer)
        } else {
            match m.opponent_of(proposal.proposer) {
                Some(opponent) => opponent,
                None => {
                    self.reject_in_place(proposal).await?;
                    return Ok(false);
                }
            }
        };
        if winner.is_bye() {
            // A loss claim on a bye placeholder cannot crown the Bye.
            self.reject_in_place(proposal).await?;
            log::warn!(
                "Rejected proposal {}: it would award match {} to a bye",
                proposal.id,
                m.id
            );
            return Ok(false);
        }

        let mut resolved = m.clone();
        resolved.status = if proposal.claim.is_walkover() {
            MatchStatus::Walkover
        } else {
            MatchStatus::Completed
        };
        resolved.winner = Some(winner);
        resolved.sets = proposal.sets.clone();
        resolved.completed_at = Some(now);
        if !self.store.complete_match(&resolved).await? {
            self.reject_in_place(proposal).await?;
            return Ok(false);
        }

        let mut accepted = proposal.clone();
        accepted.status = ProposalStatus::Accepted;
        self.store.update_proposal(&accepted).await?;
        for mut other in self.store.pending_proposals_for(m.id).await? {
            other.status = ProposalStatus::Rejected;
            self.store.update_proposal(&other).await?;
        }

        let roster = self.roster(m.tournament_id).await?;
        let payload = json!({
            "tournament_id": m.tournament_id,
            "match_id": m.id,
            "winner_entrant": winner.real_id(),
            "auto_accepted": auto_accepted,
        });
        self.notify_match_sides(&roster, m, NotificationKind::ResultConfirmed, &payload)
            .await;

        log::info!("Match {} resolved by proposal {}", m.id, proposal.id);
        self.on_match_resolved(&resolved, now).await?;
        Ok(true)
    }

    async fn reject_in_place(&self, proposal: &ResultProposal) -> EngineResult<()> {
        let mut rejected = proposal.clone();
        rejected.status = ProposalStatus::Rejected;
        self.store.update_proposal(&rejected).await?;
        Ok(())
    }
}
