//! Corkboard: round-based conspiracy graph engine
//!
//! Takes two unrelated topics and elaborates a "conspiracy graph" across
//! successive rounds: evidence is fetched through injected search providers,
//! entity/connection tuples come back from an extraction provider, and each
//! round merges them into an accumulating board without duplication — while
//! a monotone "intensity" signal models the narrative escalating.
//!
//! # Core Concepts
//!
//! - **Board**: entities and weighted connections, merged by normalized label
//! - **Round**: one search → extract → merge → summarize cycle
//! - **Evidence log**: bounded per-session memory replayed into later rounds
//!
//! # Example
//!
//! ```
//! use corkboard::Board;
//!
//! let mut board = Board::new();
//! board.upsert_entity("Dolphins", Some("animal"), 0).unwrap();
//! board
//!     .upsert_relationship("Dolphins", "The Pyramids", "sonar-mapped", 0)
//!     .unwrap();
//! assert_eq!(board.entity_count(), 2);
//! ```

pub mod cancel;
mod graph;
pub mod narrator;
pub mod provider;
mod session;
pub mod storage;

pub use cancel::CancelToken;
pub use graph::{Board, BoardSnapshot, Entity, EntityId, GraphError, GraphResult, Relationship};
pub use session::{
    EvidenceStore, RoundController, RoundResult, Session, SessionError, SessionEvent, SessionId,
    SessionRunner, SessionState, SkippedCounts, DEFAULT_INTENSITY_GAIN, DEFAULT_MAX_CONTEXT_CHARS,
};
pub use storage::{BoardStore, OpenStore, SqliteStore, StorageError, StorageResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
