//! Ports to the surrounding platform: player ratings, registration, and
//! notification delivery.
//!
//! The engine owns brackets, proposals, and placements; everything else is
//! reached through these traits so hosts can wire in their own services and
//! tests can substitute recording fakes from [`stubs`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tournament::error::PortResult;
use crate::tournament::models::{Entrant, EntrantId, PlayerId, TournamentId};

/// What a delivered notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    /// A new match with a known opponent was scheduled
    MatchCreated,
    /// The opponent proposed a result for confirmation
    ResultProposed,
    /// A proposed result was accepted (explicitly or by timeout)
    ResultConfirmed,
    /// A proposed result was rejected
    ResultRejected,
    /// A match deadline is approaching
    DeadlineReminder,
    /// An overdue match was resolved as a technical win
    TechnicalWin,
    /// The registration deadline was extended
    ExtensionApproved,
    /// The tournament was cancelled
    TournamentCancelled,
    /// Too few entrants at the registration deadline
    InsufficientEntrants,
    /// An incomplete team was withdrawn at bracket generation
    EntrantWithdrawn,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::MatchCreated => "match_created",
            NotificationKind::ResultProposed => "result_proposed",
            NotificationKind::ResultConfirmed => "result_confirmed",
            NotificationKind::ResultRejected => "result_rejected",
            NotificationKind::DeadlineReminder => "deadline_reminder",
            NotificationKind::TechnicalWin => "technical_win",
            NotificationKind::ExtensionApproved => "extension_approved",
            NotificationKind::TournamentCancelled => "tournament_cancelled",
            NotificationKind::InsufficientEntrants => "insufficient_entrants",
            NotificationKind::EntrantWithdrawn => "entrant_withdrawn",
        }
    }
}

/// Trait for reading and updating player ratings
#[async_trait]
pub trait RankingProvider: Send + Sync {
    /// Current rating of a player, used for seeding and technical-win
    /// tie-breaks
    async fn player_rating(&self, player: PlayerId) -> PortResult<i64>;

    /// Push earned tournament points into a player's rating
    async fn add_points(&self, player: PlayerId, points: i64) -> PortResult<()>;
}

/// Trait for the registration roster the engine freezes at generation time
#[async_trait]
pub trait RegistrationProvider: Send + Sync {
    /// All entrants currently registered for a tournament
    async fn registered_entrants(&self, tournament: TournamentId) -> PortResult<Vec<Entrant>>;

    /// Withdraw an entrant from a tournament
    async fn remove_entrant(&self, tournament: TournamentId, entrant: EntrantId) -> PortResult<()>;

    /// Return a consumed registration slot to a player after a withdrawal
    /// or cancellation
    async fn refund_slot(&self, player: PlayerId) -> PortResult<()>;
}

/// Trait for delivering notifications. Delivery is best effort: engine
/// callers log failures and move on.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver a notification to one player
    async fn notify(&self, player: PlayerId, kind: NotificationKind, payload: Value)
    -> PortResult<()>;

    /// Raise an operator-facing alert not tied to a single player
    async fn alert_operator(&self, kind: NotificationKind, payload: Value) -> PortResult<()>;
}

/// In-memory port implementations for tests and offline runs.
pub mod stubs {
    use std::collections::HashMap;

    use tokio::sync::Mutex;

    use super::*;

    /// Rating provider backed by a fixed map. Unknown players rate 0;
    /// `add_points` accumulates so point totals can be asserted.
    #[derive(Default)]
    pub struct StaticRankings {
        ratings: Mutex<HashMap<PlayerId, i64>>,
    }

    impl StaticRankings {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_rating(mut self, player: PlayerId, rating: i64) -> Self {
            self.ratings.get_mut().insert(player, rating);
            self
        }
    }

    #[async_trait]
    impl RankingProvider for StaticRankings {
        async fn player_rating(&self, player: PlayerId) -> PortResult<i64> {
            Ok(self.ratings.lock().await.get(&player).copied().unwrap_or(0))
        }

        async fn add_points(&self, player: PlayerId, points: i64) -> PortResult<()> {
            *self.ratings.lock().await.entry(player).or_insert(0) += points;
            Ok(())
        }
    }

    /// Registration roster held in memory.
    #[derive(Default)]
    pub struct InMemoryRegistry {
        entrants: Mutex<HashMap<TournamentId, Vec<Entrant>>>,
        refunds: Mutex<Vec<PlayerId>>,
    }

    impl InMemoryRegistry {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_entrant(mut self, tournament: TournamentId, entrant: Entrant) -> Self {
            self.entrants
                .get_mut()
                .entry(tournament)
                .or_default()
                .push(entrant);
            self
        }

        pub async fn register(&self, tournament: TournamentId, entrant: Entrant) {
            self.entrants
                .lock()
                .await
                .entry(tournament)
                .or_default()
                .push(entrant);
        }

        /// Players whose slots were refunded, in refund order.
        pub async fn refunds(&self) -> Vec<PlayerId> {
            self.refunds.lock().await.clone()
        }
    }

    #[async_trait]
    impl RegistrationProvider for InMemoryRegistry {
        async fn registered_entrants(&self, tournament: TournamentId) -> PortResult<Vec<Entrant>> {
            Ok(self
                .entrants
                .lock()
                .await
                .get(&tournament)
                .cloned()
                .unwrap_or_default())
        }

        async fn remove_entrant(
            &self,
            tournament: TournamentId,
            entrant: EntrantId,
        ) -> PortResult<()> {
            if let Some(list) = self.entrants.lock().await.get_mut(&tournament) {
                list.retain(|e| e.id != entrant);
            }
            Ok(())
        }

        async fn refund_slot(&self, player: PlayerId) -> PortResult<()> {
            self.refunds.lock().await.push(player);
            Ok(())
        }
    }

    /// One captured notification.
    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedNotification {
        pub player: PlayerId,
        pub kind: NotificationKind,
        pub payload: Value,
    }

    /// Notification sink that records everything it is asked to send.
    #[derive(Default)]
    pub struct RecordingNotifier {
        events: Mutex<Vec<RecordedNotification>>,
        operator_alerts: Mutex<Vec<(NotificationKind, Value)>>,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn events(&self) -> Vec<RecordedNotification> {
            self.events.lock().await.clone()
        }

        pub async fn operator_alerts(&self) -> Vec<(NotificationKind, Value)> {
            self.operator_alerts.lock().await.clone()
        }

        /// How many notifications of the given kind were sent.
        pub async fn count_of(&self, kind: NotificationKind) -> usize {
            self.events
                .lock()
                .await
                .iter()
                .filter(|e| e.kind == kind)
                .count()
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingNotifier {
        async fn notify(
            &self,
            player: PlayerId,
            kind: NotificationKind,
            payload: Value,
        ) -> PortResult<()> {
            self.events.lock().await.push(RecordedNotification {
                player,
                kind,
                payload,
            });
            Ok(())
        }

        async fn alert_operator(&self, kind: NotificationKind, payload: Value) -> PortResult<()> {
            self.operator_alerts.lock().await.push((kind, payload));
            Ok(())
        }
    }

}
