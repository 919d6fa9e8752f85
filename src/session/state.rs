//! Session: the unit of investigation state

use crate::graph::{Board, GraphResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session lifecycle. No re-entrant transitions:
/// `Idle → Running → (Completed | Failed)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Running,
    /// Finished normally — possibly early, at a cancellation boundary.
    Completed,
    /// An owned resource (storage) became unavailable. All accumulated
    /// state is preserved for inspection.
    Failed { reason: String },
}

/// Cumulative counters for dropped noisy input, reported alongside the
/// successful counts so noise stays observable without being fatal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedCounts {
    /// Extraction tuples missing a subject or object
    pub malformed_extractions: u32,
    /// Empty or whitespace-only entity labels
    pub invalid_entities: u32,
    /// Relationships whose endpoints normalize to the same entity
    pub self_loops: u32,
}

impl SkippedCounts {
    pub fn total(&self) -> u32 {
        self.malformed_extractions + self.invalid_entities + self.self_loops
    }
}

/// One investigation: two anchor topics, the accumulated board, the
/// evidence log, and the escalation signal.
///
/// A session exclusively owns its board and evidence log. The round
/// controller only holds a transient borrow during a round; all committed
/// state lives here. Independent sessions share nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub topic_a: String,
    pub topic_b: String,
    /// Rounds completed so far; the next round to run
    pub round_number: u32,
    /// Narrative escalation signal, monotone non-decreasing in [0, 1]
    pub intensity: f64,
    pub board: Board,
    /// Append-only per-round summaries, oldest first
    pub evidence_log: Vec<String>,
    /// Session-level annotations (vision clues with no entity context)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    pub skipped: SkippedCounts,
    pub state: SessionState,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create a session with the two anchor entities already pinned.
    /// Fails only when a topic label is empty or whitespace.
    pub fn new(topic_a: &str, topic_b: &str) -> GraphResult<Self> {
        let mut board = Board::new();
        board.upsert_entity(topic_a, Some("topic"), 0)?;
        board.upsert_entity(topic_b, Some("topic"), 0)?;
        Ok(Self {
            id: SessionId::new(),
            topic_a: topic_a.trim().to_string(),
            topic_b: topic_b.trim().to_string(),
            round_number: 0,
            intensity: 0.0,
            board,
            evidence_log: Vec::new(),
            notes: Vec::new(),
            skipped: SkippedCounts::default(),
            state: SessionState::Idle,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_pins_both_anchors() {
        let session = Session::new("dolphins", "the pyramids").unwrap();
        assert_eq!(session.board.entity_count(), 2);
        assert_eq!(session.round_number, 0);
        assert_eq!(session.intensity, 0.0);
        assert_eq!(session.state, SessionState::Idle);
    }

    #[test]
    fn blank_topic_is_rejected() {
        assert!(Session::new("  ", "the pyramids").is_err());
    }

    #[test]
    fn anchor_topics_may_collide_into_one_entity() {
        // Same topic twice is legal, if pointless: one anchor, two mentions.
        let session = Session::new("dolphins", "Dolphins").unwrap();
        assert_eq!(session.board.entity_count(), 1);
    }
}
