//! Periodic sweeps over the stored state.
//!
//! Each sweep is lease guarded: the first caller inside a cooldown window
//! runs the batch and later callers get 0 until the lease expires, so a
//! fleet of hosts can schedule the sweeps without coordinating. Per-item
//! failures are logged and skipped; one broken row never stalls the rest
//! of the batch. Every sweep has a `*_at` twin taking the current time so
//! tests can steer the clock.

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::ports::NotificationKind;
use crate::tournament::error::EngineResult;
use crate::tournament::models::{EntrantRef, Match, TournamentStatus};

use super::TournamentEngine;

/// Hours an unanswered proposal waits before it is accepted as submitted.
pub const STALE_PROPOSAL_HOURS: i64 = 6;

/// Hours a below-minimum tournament has between the operator alert and
/// cancellation.
pub const BELOW_MINIMUM_GRACE_HOURS: i64 = 3;

const OVERDUE_LEASE: &str = "overdue_matches";
const STALE_PROPOSAL_LEASE: &str = "stale_proposals";
const REGISTRATION_LEASE: &str = "registration_deadlines";
const REMINDER_LEASE: &str = "deadline_reminders";

const SWEEP_COOLDOWN_SECS: i64 = 60;
const REMINDER_COOLDOWN_SECS: i64 = 3600;

/// Reminder windows around a deadline: how many hours out the window
/// opens and closes, and the day count quoted to the player.
const REMINDER_WINDOWS: [(i64, i64, i64); 2] = [(47, 49, 2), (23, 25, 1)];

impl TournamentEngine {
    async fn acquire_sweep_lease(
        &self,
        name: &str,
        cooldown: Duration,
        now: DateTime<Utc>,
    ) -> EngineResult<bool> {
        let acquired = self
            .store
            .try_acquire_lease(name, Uuid::new_v4(), cooldown, now)
            .await?;
        if !acquired {
            log::debug!("Sweep '{}' skipped: lease still held", name);
        }
        Ok(acquired)
    }

    /// Resolve every overdue match as a technical win, repeating until a
    /// pass makes no progress so cascade-created placeholders with past
    /// deadlines drain in the same sweep. Returns the number resolved.
    pub async fn process_overdue_matches(&self) -> EngineResult<usize> {
        self.process_overdue_matches_at(Utc::now()).await
    }

    /// Clock-injected twin of [`process_overdue_matches`](Self::process_overdue_matches).
    pub async fn process_overdue_matches_at(&self, now: DateTime<Utc>) -> EngineResult<usize> {
        if !self
            .acquire_sweep_lease(OVERDUE_LEASE, Duration::seconds(SWEEP_COOLDOWN_SECS), now)
            .await?
        {
            return Ok(0);
        }
        let mut resolved = 0usize;
        loop {
            let batch = self.store.overdue_matches(now).await?;
            let mut progressed = 0usize;
            for m in &batch {
                match self.resolve_overdue_match(m, now).await {
                    Ok(true) => progressed += 1,
                    Ok(false) => {}
                    Err(e) => log::warn!("Failed to resolve overdue match {}: {}", m.id, e),
                }
            }
            resolved += progressed;
            if progressed == 0 {
                break;
            }
        }
        if resolved > 0 {
            log::info!("Overdue sweep resolved {} matches", resolved);
        }
        Ok(resolved)
    }

    /// Accept result claims the opponent never answered. Returns the number
    /// of proposals applied.
    pub async fn auto_accept_stale_proposals(&self) -> EngineResult<usize> {
        self.auto_accept_stale_proposals_at(Utc::now()).await
    }

    /// Clock-injected twin of [`auto_accept_stale_proposals`](Self::auto_accept_stale_proposals).
    pub async fn auto_accept_stale_proposals_at(&self, now: DateTime<Utc>) -> EngineResult<usize> {
        if !self
            .acquire_sweep_lease(
                STALE_PROPOSAL_LEASE,
                Duration::seconds(SWEEP_COOLDOWN_SECS),
                now,
            )
            .await?
        {
            return Ok(0);
        }
        let cutoff = now - Duration::hours(STALE_PROPOSAL_HOURS);
        let mut accepted = 0usize;
        for proposal in self.store.stale_pending_proposals(cutoff).await? {
            match self.apply_stale_proposal(&proposal, now).await {
                Ok(true) => accepted += 1,
                Ok(false) => {}
                Err(e) => log::warn!("Failed to auto-accept proposal {}: {}", proposal.id, e),
            }
        }
        if accepted > 0 {
            log::info!("Auto-accepted {} stale proposals", accepted);
        }
        Ok(accepted)
    }

    /// Close registration for tournaments whose window has passed:
    /// generate brackets where enough entrants signed up, alert and
    /// eventually cancel the rest. Returns the number of brackets built.
    pub async fn sweep_past_deadline_registrations(&self) -> EngineResult<usize> {
        self.sweep_past_deadline_registrations_at(Utc::now()).await
    }

    /// Clock-injected twin of
    /// [`sweep_past_deadline_registrations`](Self::sweep_past_deadline_registrations).
    pub async fn sweep_past_deadline_registrations_at(
        &self,
        now: DateTime<Utc>,
    ) -> EngineResult<usize> {
        if !self
            .acquire_sweep_lease(
                REGISTRATION_LEASE,
                Duration::seconds(SWEEP_COOLDOWN_SECS),
                now,
            )
            .await?
        {
            return Ok(0);
        }
        let mut generated = 0usize;
        for tournament in self
            .store
            .tournaments_past_registration_deadline(now)
            .await?
        {
            match self.close_registration(&tournament, now).await {
                Ok(true) => generated += 1,
                Ok(false) => {}
                Err(e) => log::warn!(
                    "Registration sweep failed for tournament {}: {}",
                    tournament.id,
                    e
                ),
            }
        }
        Ok(generated)
    }

    /// Remind both sides of matches whose deadline falls two days or one
    /// day out. Returns the number of notifications delivered.
    pub async fn send_deadline_reminders(&self) -> EngineResult<usize> {
        self.send_deadline_reminders_at(Utc::now()).await
    }

    /// Clock-injected twin of [`send_deadline_reminders`](Self::send_deadline_reminders).
    pub async fn send_deadline_reminders_at(&self, now: DateTime<Utc>) -> EngineResult<usize> {
        if !self
            .acquire_sweep_lease(
                REMINDER_LEASE,
                Duration::seconds(REMINDER_COOLDOWN_SECS),
                now,
            )
            .await?
        {
            return Ok(0);
        }
        let mut sent = 0usize;
        for (from_hours, to_hours, days_left) in REMINDER_WINDOWS {
            let batch = self
                .store
                .scheduled_matches_with_deadline_in(
                    now + Duration::hours(from_hours),
                    now + Duration::hours(to_hours),
                )
                .await?;
            for m in &batch {
                match self.remind_match_sides(m, days_left).await {
                    Ok(n) => sent += n,
                    Err(e) => log::warn!("Failed to send reminders for match {}: {}", m.id, e),
                }
            }
        }
        if sent > 0 {
            log::info!("Sent {} deadline reminders", sent);
        }
        Ok(sent)
    }

    async fn remind_match_sides(&self, m: &Match, days_left: i64) -> EngineResult<usize> {
        // Placeholders and half-fed ladder slots have nobody to play.
        let (Some(EntrantRef::Real(a)), Some(EntrantRef::Real(b))) = (m.side1, m.side2) else {
            return Ok(0);
        };
        let Some(tournament) = self.store.tournament(m.tournament_id).await? else {
            return Ok(0);
        };
        if tournament.status == TournamentStatus::Cancelled {
            return Ok(0);
        }
        let roster = self.roster(tournament.id).await?;
        let payload = json!({
            "tournament_id": m.tournament_id,
            "match_id": m.id,
            "deadline": m.deadline,
            "days_left": days_left,
        });
        let mut sent = 0usize;
        for entrant in [a, b] {
            for player in Self::members_of(&roster, entrant) {
                match self
                    .notifier
                    .notify(player, NotificationKind::DeadlineReminder, payload.clone())
                    .await
                {
                    Ok(()) => sent += 1,
                    Err(e) => {
                        log::warn!("Failed to remind player {}: {}", player, e);
                    }
                }
            }
        }
        Ok(sent)
    }
}
