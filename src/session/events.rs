//! Progress events emitted while a session runs
//!
//! One event per observable step of a round, plus a terminal summary.
//! Consumed by presentation layers through the `ProgressSink` trait;
//! delivery failure never affects the round.

use super::round::RoundResult;
use serde::{Deserialize, Serialize};

/// A progress event from the session loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    RoundStarted {
        round: u32,
        total_rounds: u32,
    },
    SearchCompleted {
        round: u32,
        result_count: usize,
        image_count: usize,
    },
    /// A vision clue extracted from an image found during search
    ImageClue {
        round: u32,
        image_url: String,
        note: String,
    },
    RoundCompleted(RoundResult),
    SessionCompleted {
        rounds_completed: u32,
        entity_count: usize,
        relationship_count: usize,
        skipped_total: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = SessionEvent::RoundStarted {
            round: 0,
            total_rounds: 3,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "round_started");
        assert_eq!(json["round"], 0);
    }
}
