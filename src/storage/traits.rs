//! Storage trait definitions

use crate::graph::{Entity, Relationship};
use crate::session::SessionId;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable backing for board state, keyed per session.
///
/// Upserts use the same identity rules as the in-memory board: entities by
/// normalized-label id, relationships by unordered endpoint pair plus
/// normalized description. Implementations must be thread-safe.
pub trait BoardStore: Send + Sync {
    /// Insert or update an entity row
    fn save_entity(&self, session: &SessionId, entity: &Entity) -> StorageResult<()>;

    /// Insert or update a relationship row
    fn save_relationship(&self, session: &SessionId, rel: &Relationship) -> StorageResult<()>;

    /// Load all persisted entities for a session, insertion order
    fn load_entities(&self, session: &SessionId) -> StorageResult<Vec<Entity>>;

    /// Load all persisted relationships for a session, insertion order
    fn load_relationships(&self, session: &SessionId) -> StorageResult<Vec<Relationship>>;

    /// Delete everything stored for a session (fresh run)
    fn clear(&self, session: &SessionId) -> StorageResult<()>;
}

/// Extension trait for opening stores from paths
pub trait OpenStore: BoardStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}
