//! Bracket generation and the registration lifecycle.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;

use crate::bracket::seeding::{SeedingContext, seed_order};
use crate::bracket::{BuildBracket, FormatGenerator};
use crate::ports::NotificationKind;
use crate::tournament::error::{EngineResult, StateError, ValidationError};
use crate::tournament::models::{
    Entrant, MatchStatus, PlayerId, Tournament, TournamentId, TournamentStatus,
};

use super::TournamentEngine;

impl TournamentEngine {
    /// Close registration and build the bracket for a tournament.
    ///
    /// Rates and seeds the registered entrants, runs the format's planner,
    /// persists the plan, and announces the created pairings. Incomplete
    /// doubles teams are withdrawn and refunded before seeding. Returns the
    /// planner's summary message.
    pub async fn generate_bracket(&self, id: TournamentId) -> EngineResult<String> {
        self.generate_bracket_at(id, Utc::now()).await
    }

    /// Clock-injected twin of [`generate_bracket`](Self::generate_bracket).
    pub async fn generate_bracket_at(
        &self,
        id: TournamentId,
        now: DateTime<Utc>,
    ) -> EngineResult<String> {
        let tournament = self.require_tournament(id).await?;
        if tournament.bracket_generated {
            return Err(ValidationError::BracketAlreadyGenerated.into());
        }
        match tournament.status {
            TournamentStatus::Upcoming | TournamentStatus::Active => {}
            status => return Err(StateError::TournamentNotActive { status }.into()),
        }

        let entrants = self.withdraw_incomplete_teams(&tournament).await?;
        if entrants.len() < 2 {
            return Err(ValidationError::NotEnoughEntrants {
                needed: 2,
                current: entrants.len(),
            }
            .into());
        }
        if let Some(capacity) = tournament.max_entrants {
            if entrants.len() > capacity as usize {
                return Err(ValidationError::OverCapacity {
                    capacity: capacity as usize,
                    current: entrants.len(),
                }
                .into());
            }
        }

        let mut rated = Vec::with_capacity(entrants.len());
        for entrant in entrants {
            let rating = self.entrant_rating(&entrant).await?;
            rated.push((entrant, rating));
        }
        let seeded = seed_order(rated);

        let ctx = SeedingContext {
            entrants: seeded,
            start_date: tournament.start_date,
            match_period: tournament.match_period(),
            now,
        };
        let plan = FormatGenerator::for_format(tournament.format).build(&ctx)?;
        let created = self.persist_planned(tournament.id, &plan.matches).await?;

        let mut current = tournament.clone();
        current.bracket_generated = true;
        current.status = TournamentStatus::Active;
        self.store.update_tournament(&current).await?;

        let roster = self.roster(tournament.id).await?;
        for m in &created {
            self.announce_match(&roster, m).await;
        }

        // Planted first-round walkovers advance their seeds immediately.
        for m in &created {
            if m.status.is_decided() {
                self.on_match_resolved(m, now).await?;
            }
        }

        log::info!(
            "Generated {} bracket for tournament {}: {} matches",
            tournament.format.as_str(),
            tournament.id,
            created.len()
        );
        Ok(plan.message)
    }

    /// Drop doubles entrants that never found a partner, refunding each
    /// registered member. Returns the remaining roster.
    async fn withdraw_incomplete_teams(
        &self,
        tournament: &Tournament,
    ) -> EngineResult<Vec<Entrant>> {
        let roster = self.roster(tournament.id).await?;
        let mut kept = Vec::with_capacity(roster.len());
        for entrant in roster {
            if entrant.is_complete() {
                kept.push(entrant);
                continue;
            }
            let payload = json!({
                "tournament_id": tournament.id,
                "entrant_id": entrant.id,
                "reason": "incomplete_team",
            });
            for player in entrant.members() {
                if let Err(e) = self.registry.refund_slot(player).await {
                    log::warn!("Failed to refund player {}: {}", player, e);
                }
                if let Err(e) = self
                    .notifier
                    .notify(player, NotificationKind::EntrantWithdrawn, payload.clone())
                    .await
                {
                    log::warn!("Failed to notify withdrawn player {}: {}", player, e);
                }
            }
            self.registry
                .remove_entrant(tournament.id, entrant.id)
                .await?;
            log::info!(
                "Withdrew incomplete entrant {} from tournament {}",
                entrant.id,
                tournament.id
            );
        }
        Ok(kept)
    }

    /// Cancel a tournament: refund every registered player, cancel its open
    /// matches, and mark it cancelled. Idempotent.
    pub async fn cancel_tournament(&self, id: TournamentId) -> EngineResult<String> {
        let tournament = self.require_tournament(id).await?;
        if tournament.status == TournamentStatus::Cancelled {
            return Ok(format!("Tournament {} is already cancelled", id));
        }

        let roster = self.roster(id).await?;
        let mut refunded: HashSet<PlayerId> = HashSet::new();
        let payload = json!({
            "tournament_id": id,
            "name": tournament.name,
        });
        for entrant in &roster {
            for player in entrant.members() {
                if !refunded.insert(player) {
                    continue;
                }
                if let Err(e) = self.registry.refund_slot(player).await {
                    log::warn!("Failed to refund player {}: {}", player, e);
                }
                if let Err(e) = self
                    .notifier
                    .notify(
                        player,
                        NotificationKind::TournamentCancelled,
                        payload.clone(),
                    )
                    .await
                {
                    log::warn!("Failed to notify player {} of cancellation: {}", player, e);
                }
            }
        }

        for m in self.store.matches_of(id).await? {
            if m.status.is_terminal() {
                continue;
            }
            let mut cancelled = m;
            cancelled.status = MatchStatus::Cancelled;
            self.store.update_match(&cancelled).await?;
        }

        let mut current = tournament;
        current.status = TournamentStatus::Cancelled;
        self.store.update_tournament(&current).await?;

        log::info!(
            "Cancelled tournament {}, refunded {} players",
            id,
            refunded.len()
        );
        Ok(format!(
            "Tournament {} cancelled, {} players refunded",
            id,
            refunded.len()
        ))
    }

    /// Push the registration deadline out and clear any pending
    /// below-minimum alert. Registered players are told about the new date.
    pub async fn extend_registration_deadline(
        &self,
        id: TournamentId,
        new_deadline: DateTime<Utc>,
    ) -> EngineResult<()> {
        let tournament = self.require_tournament(id).await?;
        if tournament.bracket_generated {
            return Err(ValidationError::BracketAlreadyGenerated.into());
        }
        if tournament.status != TournamentStatus::Upcoming {
            return Err(StateError::TournamentNotActive {
                status: tournament.status,
            }
            .into());
        }

        let mut current = tournament;
        current.registration_deadline = Some(new_deadline);
        current.below_minimum_alerted_at = None;
        self.store.update_tournament(&current).await?;

        let roster = self.roster(id).await?;
        let payload = json!({
            "tournament_id": id,
            "new_deadline": new_deadline,
        });
        for entrant in &roster {
            self.notify_entrant(
                &roster,
                entrant.id,
                NotificationKind::ExtensionApproved,
                &payload,
            )
            .await;
        }

        log::info!(
            "Extended registration for tournament {} to {}",
            id,
            new_deadline
        );
        Ok(())
    }

    /// Handle one tournament whose registration window has closed: generate
    /// its bracket when enough entrants signed up, otherwise walk the
    /// alert-then-cancel path. Returns whether a bracket was generated.
    pub(crate) async fn close_registration(
        &self,
        tournament: &Tournament,
        now: DateTime<Utc>,
    ) -> EngineResult<bool> {
        if let Some(minimum) = tournament.min_entrants {
            let count = self.roster(tournament.id).await?.len();
            if count < minimum as usize {
                match tournament.below_minimum_alerted_at {
                    None => {
                        let mut current = tournament.clone();
                        current.below_minimum_alerted_at = Some(now);
                        self.store.update_tournament(&current).await?;
                        let payload = json!({
                            "tournament_id": tournament.id,
                            "name": tournament.name,
                            "entrants": count,
                            "minimum": minimum,
                        });
                        if let Err(e) = self
                            .notifier
                            .alert_operator(NotificationKind::InsufficientEntrants, payload)
                            .await
                        {
                            log::warn!(
                                "Failed to alert operator about tournament {}: {}",
                                tournament.id,
                                e
                            );
                        }
                        log::info!(
                            "Tournament {} below minimum at deadline ({} of {})",
                            tournament.id,
                            count,
                            minimum
                        );
                    }
                    Some(alerted_at)
                        if now >= alerted_at + Duration::hours(super::BELOW_MINIMUM_GRACE_HOURS) =>
                    {
                        self.cancel_tournament(tournament.id).await?;
                    }
                    Some(_) => {}
                }
                return Ok(false);
            }
        }
        self.generate_bracket_at(tournament.id, now).await?;
        Ok(true)
    }
}
