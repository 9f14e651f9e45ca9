//! # Matchpoint
//!
//! A tournament bracket and progression engine for amateur racquet-sports
//! leagues.
//!
//! This library turns a roster of ranked entrants into a running
//! competition: it seeds and generates brackets, advances winners as
//! results are confirmed, settles disputed or missing results, and
//! finalizes standings with rating points. Matches are played offline over
//! days, so the engine is deadline driven rather than real time: periodic
//! sweeps resolve overdue matches as technical wins, accept unanswered
//! result claims, close expired registration windows, and remind players
//! of upcoming deadlines.
//!
//! ## Formats
//!
//! - **Single elimination**: seeded knockout with one consolation round
//!   for first-round losers
//! - **Olympic placement**: knockout main draw plus recursive placement
//!   ladders that give every entrant an exact final place
//! - **Round robin**: circle-method schedule with tie-broken standings
//!
//! ## Core Modules
//!
//! - [`tournament`]: entities, lifecycle enums, and the error taxonomy
//! - [`bracket`]: pure bracket planners, one per format
//! - [`engine`]: the [`TournamentEngine`] facade wiring planners, storage,
//!   and sweeps together
//! - [`ports`]: traits to the surrounding platform (ratings, registration,
//!   notifications)
//! - [`db`]: the storage trait with PostgreSQL and in-memory backends
//!
//! ## Example
//!
//! ```no_run
//! use matchpoint::TournamentEngine;
//! use matchpoint::db::MemoryStore;
//! use matchpoint::ports::stubs::{InMemoryRegistry, RecordingNotifier, StaticRankings};
//! use std::sync::Arc;
//!
//! // An engine over in-memory storage and stub ports
//! let engine = TournamentEngine::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(StaticRankings::new()),
//!     Arc::new(InMemoryRegistry::new()),
//!     Arc::new(RecordingNotifier::new()),
//! );
//! ```

/// Bracket planners for the supported formats.
pub mod bracket;

/// Storage: the engine store trait, PostgreSQL, and in-memory backends.
pub mod db;

/// The engine facade: generation, confirmation, advancement, and sweeps.
pub mod engine;

/// Ports to the surrounding platform.
pub mod ports;

/// Core tournament types and errors.
pub mod tournament;

pub use engine::TournamentEngine;
pub use tournament::{
    EngineError, EngineResult, Tournament, TournamentFormat, TournamentSettings, TournamentStatus,
};
