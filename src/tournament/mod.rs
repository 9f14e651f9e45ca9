//! Core tournament types: entities, formats, and the error taxonomy.
//!
//! This module defines the vocabulary the rest of the crate speaks:
//! - Tournament, entrant, and match models with their lifecycle enums
//! - The bye sentinel (`EntrantRef::Bye`) used to pad odd draws
//! - Result proposals and placement bookkeeping
//! - Point tables mapping elimination rounds and final places to points
//!
//! ## Example
//!
//! ```no_run
//! use matchpoint::db::MemoryStore;
//! use matchpoint::engine::TournamentEngine;
//! use matchpoint::ports::stubs::{InMemoryRegistry, RecordingNotifier, StaticRankings};
//! use matchpoint::tournament::{EntrantMode, TournamentFormat, TournamentSettings};
//! use chrono::Utc;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = TournamentEngine::new(
//!         Arc::new(MemoryStore::new()),
//!         Arc::new(StaticRankings::new()),
//!         Arc::new(InMemoryRegistry::new()),
//!         Arc::new(RecordingNotifier::new()),
//!     );
//!
//!     // An eight-player knockout starting now
//!     let settings = TournamentSettings::new(
//!         "Spring Open",
//!         TournamentFormat::SingleElimination,
//!         EntrantMode::Singles,
//!         Utc::now(),
//!     )
//!     .with_entrant_bounds(Some(4), Some(8));
//!
//!     let tournament = engine.create_tournament(settings).await?;
//!     println!("Created tournament: {}", tournament.id);
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod models;

pub use error::{
    EngineError, EngineResult, NotFoundError, PortError, PortResult, StateError, StoreError,
    StoreResult, ValidationError,
};
pub use models::{
    Entrant, EntrantId, EntrantKind, EntrantMode, EntrantRef, Match, MatchId, MatchStatus,
    PlacementResult, PlayerId, PointTable, ProposalId, ProposalStatus, ResultClaim, ResultProposal,
    RoundReached, SetScore, SweepLease, Tournament, TournamentFormat, TournamentId,
    TournamentSettings, TournamentStatus,
};
