//! Technical-win resolution for matches that miss their deadline.

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::ports::NotificationKind;
use crate::tournament::error::EngineResult;
use crate::tournament::models::{
    Entrant, EntrantRef, Match, MatchStatus, ProposalStatus, TournamentStatus,
};

use super::TournamentEngine;

impl TournamentEngine {
    /// Resolve one overdue match as a technical walkover. Returns whether a
    /// result was applied.
    ///
    /// Half-fed ladder slots and Bye-vs-Bye rows are skipped. A bye
    /// placeholder walks its real side over only once every earlier main
    /// round is decided; until then a late feeder could still claim the Bye
    /// seat. Between two real sides the higher-rated entrant wins, ties
    /// broken toward the lower entrant id.
    pub(crate) async fn resolve_overdue_match(
        &self,
        m: &Match,
        now: DateTime<Utc>,
    ) -> EngineResult<bool> {
        // The batch snapshot may be stale: an earlier resolution in the
        // same pass can fill this match's open seat or decide it outright.
        let Some(m) = self.store.match_by_id(m.id).await? else {
            return Ok(false);
        };
        let m = &m;
        if m.status.is_terminal() {
            return Ok(false);
        }
        let (Some(side1), Some(side2)) = (m.side1, m.side2) else {
            return Ok(false);
        };
        if side1.is_bye() && side2.is_bye() {
            return Ok(false);
        }
        let Some(tournament) = self.store.tournament(m.tournament_id).await? else {
            return Ok(false);
        };
        if tournament.status == TournamentStatus::Cancelled {
            return Ok(false);
        }
        if m.is_bye_placeholder() && self.bye_seat_may_still_fill(m).await? {
            return Ok(false);
        }

        let roster = self.roster(tournament.id).await?;
        let winner = self.technical_winner(&roster, side1, side2).await?;

        let mut resolved = m.clone();
        resolved.status = MatchStatus::Walkover;
        resolved.winner = Some(winner);
        resolved.sets = Vec::new();
        resolved.completed_at = Some(now);
        if !self.store.complete_match(&resolved).await? {
            return Ok(false);
        }

        for mut proposal in self.store.pending_proposals_for(m.id).await? {
            proposal.status = ProposalStatus::Rejected;
            self.store.update_proposal(&proposal).await?;
        }

        let payload = json!({
            "tournament_id": m.tournament_id,
            "match_id": m.id,
            "winner_entrant": winner.real_id(),
        });
        self.notify_match_sides(&roster, m, NotificationKind::TechnicalWin, &payload)
            .await;
        log::info!("Match {} resolved as a technical walkover", m.id);

        if let Err(e) = self.on_match_resolved(&resolved, now).await {
            log::warn!("Advancement after overdue match {} failed: {}", m.id, e);
        }
        Ok(true)
    }

    /// Whether an undecided main-draw match in an earlier round could still
    /// send a winner into this match's Bye seat. The overdue drain loops to
    /// a fixpoint, so a deferred placeholder resolves later in the same
    /// sweep once those rounds settle.
    async fn bye_seat_may_still_fill(&self, m: &Match) -> EngineResult<bool> {
        let matches = self.store.matches_of(m.tournament_id).await?;
        Ok(matches.iter().any(|other| {
            !other.is_consolation
                && other.round_index < m.round_index
                && !other.status.is_terminal()
        }))
    }

    async fn technical_winner(
        &self,
        roster: &[Entrant],
        side1: EntrantRef,
        side2: EntrantRef,
    ) -> EngineResult<EntrantRef> {
        match (side1, side2) {
            (EntrantRef::Bye, other) | (other, EntrantRef::Bye) => Ok(other),
            (EntrantRef::Real(a), EntrantRef::Real(b)) => {
                let rating_a = self.rating_of(roster, a).await?;
                let rating_b = self.rating_of(roster, b).await?;
                if rating_a > rating_b {
                    Ok(side1)
                } else if rating_b > rating_a {
                    Ok(side2)
                } else if a <= b {
                    Ok(side1)
                } else {
                    Ok(side2)
                }
            }
        }
    }
}
