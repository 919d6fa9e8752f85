//! Entity representation on the conspiracy board

use super::normalize;
use serde::{Deserialize, Serialize};

/// Unique identifier for an entity.
///
/// Derived deterministically from the normalized display label, so the same
/// real-world thing named with trivial textual variation ("The Pyramids",
/// "the pyramids") resolves to the same id across rounds.
///
/// Serializes as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Derive the id for a display label. Returns `None` when the label
    /// normalizes to nothing (empty or whitespace-only).
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = normalize(label);
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    /// Reconstruct an id from its stored string form (e.g. a database row).
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An entity pinned to the board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier (normalized label)
    pub id: EntityId,
    /// Display name, as first seen
    pub label: String,
    /// Free-form category from extraction ("person", "place", ...).
    /// Advisory only — never part of identity.
    pub kind: Option<String>,
    /// Round in which the entity first appeared
    pub first_seen_round: u32,
    /// How many times extraction has named this entity
    pub mention_count: u32,
    /// Relationship-free annotations (image clues and the like)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl Entity {
    /// Create a new entity with a zero mention count. The board increments
    /// the count on every upsert, including the one that creates it.
    pub fn new(id: EntityId, label: impl Into<String>, kind: Option<String>, round: u32) -> Self {
        Self {
            id,
            label: label.into(),
            kind,
            first_seen_round: round,
            mention_count: 0,
            notes: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_derivation_is_case_and_whitespace_invariant() {
        let a = EntityId::from_label("the Pyramids").unwrap();
        let b = EntityId::from_label("  the   pyramids  ").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "the pyramids");
    }

    #[test]
    fn blank_label_has_no_id() {
        assert!(EntityId::from_label("").is_none());
        assert!(EntityId::from_label("   ").is_none());
    }

    #[test]
    fn id_serializes_as_plain_string() {
        let id = EntityId::from_label("Dolphins").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"dolphins\"");
    }
}
