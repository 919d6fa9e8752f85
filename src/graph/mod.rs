//! The conspiracy board graph: entities, weighted connections, merge rules

mod board;
mod entity;
mod relationship;

pub use board::{Board, BoardSnapshot, GraphError, GraphResult};
pub use entity::{Entity, EntityId};
pub use relationship::Relationship;

/// Normalize free text for identity comparisons: case-fold, trim, collapse
/// internal whitespace. "The  Pyramids " and "the pyramids" compare equal.
pub(crate) fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
