//! Error taxonomy for the engine.
//!
//! Errors are split by what the caller can do about them: fix the request
//! (`ValidationError`), retry later or give up (`StateError`), look elsewhere
//! (`NotFoundError`), or page someone (`StoreError`/`PortError`).

use thiserror::Error;

use super::models::{MatchId, ProposalId, TournamentFormat, TournamentId, TournamentStatus};

/// Rejected inputs. The request itself is wrong and retrying it unchanged
/// will fail again.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Not enough entrants: need {needed}, have {current}")]
    NotEnoughEntrants { needed: usize, current: usize },

    #[error("Over capacity: limit {capacity}, have {current}")]
    OverCapacity { capacity: usize, current: usize },

    #[error("Bracket already generated")]
    BracketAlreadyGenerated,

    #[error("Placement cohort of {0} is not a power of two")]
    CohortNotPowerOfTwo(usize),

    #[error("Wrong format: expected {expected:?}, got {actual:?}")]
    WrongFormat {
        expected: TournamentFormat,
        actual: TournamentFormat,
    },

    #[error("Tournament has no registration deadline")]
    NoDeadline,
}

/// The request was well formed but arrived against the wrong state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("Match {0} already resolved")]
    MatchAlreadyResolved(MatchId),

    #[error("Proposal {0} already resolved")]
    ProposalAlreadyResolved(ProposalId),

    #[error("Not a participant of this match")]
    NotAParticipant,

    #[error("Match {0} has no opponent to answer the claim")]
    NoOpponent(MatchId),

    #[error("Cannot confirm your own proposal")]
    SelfConfirmation,

    #[error("Tournament not active: status {status:?}")]
    TournamentNotActive { status: TournamentStatus },
}

/// Referenced entity does not exist.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotFoundError {
    #[error("Tournament not found: {0}")]
    Tournament(TournamentId),

    #[error("Match not found: {0}")]
    Match(MatchId),

    #[error("Proposal not found: {0}")]
    Proposal(ProposalId),
}

/// Storage failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Failure in an external port (rankings, registration, notifications).
#[derive(Debug, Error)]
pub enum PortError {
    #[error("Port unavailable: {0}")]
    Unavailable(String),

    #[error("Port rejected request: {0}")]
    Rejected(String),
}

/// Top-level engine error.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Port(#[from] PortError),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for port operations
pub type PortResult<T> = Result<T, PortError>;
