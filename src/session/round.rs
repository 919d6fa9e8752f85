//! Round controller: merge one round of findings into the session
//!
//! One call, one round: normalize the extracted tuples, merge them into the
//! board, attach vision clues, escalate the intensity signal, mirror touched
//! state into durable storage when configured, and digest the round for the
//! evidence log.

use crate::graph::{EntityId, GraphError, Relationship};
use crate::provider::ExtractedFact;
use crate::session::state::Session;
use crate::storage::{BoardStore, StorageError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Default escalation constant for the intensity update.
pub const DEFAULT_INTENSITY_GAIN: f64 = 0.15;

/// Description used when extraction names two entities but no connection text.
const DEFAULT_DESCRIPTION: &str = "connected to";

/// How many top-weight connections the round digest quotes.
const DIGEST_TOP_RELATIONSHIPS: usize = 3;

/// Fatal session errors. Noisy input never lands here — it is dropped and
/// counted. These are owned-resource failures and caller mistakes.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("at least one round is required, got {0}")]
    InvalidRounds(u32),

    #[error("invalid topic: {0}")]
    InvalidTopic(#[from] GraphError),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] StorageError),
}

/// What one round accomplished. Emitted as a progress event and digested
/// into the evidence log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundResult {
    pub round_number: u32,
    /// Entities created this round (anchors and auto-created endpoints included)
    pub entities_added: usize,
    /// Relationships created or weight-incremented this round
    pub relationships_touched: usize,
    /// Malformed or degenerate items dropped this round
    pub skipped: u32,
    pub intensity_after: f64,
    /// Deterministic digest: counts plus the top-weight connections touched
    pub summary_text: String,
}

/// Executes exactly one round against a session.
///
/// Holds only configuration and the optional store handle — all committed
/// state lives in the session. Construct once, reuse across rounds.
pub struct RoundController {
    store: Option<Arc<dyn BoardStore>>,
    /// When set, a storage failure fails the round instead of degrading
    durable: bool,
    intensity_gain: f64,
}

impl Default for RoundController {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundController {
    pub fn new() -> Self {
        Self {
            store: None,
            durable: false,
            intensity_gain: DEFAULT_INTENSITY_GAIN,
        }
    }

    /// Mirror board mutations into a durable store. With `durable` set,
    /// storage failure is fatal to the round; otherwise the controller
    /// logs and degrades to memory-only.
    pub fn with_store(mut self, store: Arc<dyn BoardStore>, durable: bool) -> Self {
        self.store = Some(store);
        self.durable = durable;
        self
    }

    pub fn with_intensity_gain(mut self, gain: f64) -> Self {
        self.intensity_gain = gain;
        self
    }

    /// Merge one round of raw findings into the session.
    ///
    /// Tuples missing a subject or object are dropped and counted, as are
    /// blank labels and self-loops surfaced by the board. The round fails
    /// only when durable storage was required and is unreachable.
    pub fn run_round(
        &self,
        session: &mut Session,
        facts: Vec<ExtractedFact>,
        vision_notes: Vec<String>,
    ) -> Result<RoundResult, SessionError> {
        let round = session.round_number;
        let entities_before = session.board.entity_count();
        let skipped_before = session.skipped.total();

        let mut relationships_touched = 0usize;
        let mut touched_entities: HashSet<EntityId> = HashSet::new();
        let mut last_touched: Option<EntityId> = None;

        for fact in facts {
            let (Some(subject), Some(object)) = (fact.subject.as_deref(), fact.object.as_deref())
            else {
                session.skipped.malformed_extractions += 1;
                debug!(round, "dropped extraction tuple with missing endpoint");
                continue;
            };

            let description = fact
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .unwrap_or(DEFAULT_DESCRIPTION);

            match session
                .board
                .upsert_relationship(subject, object, description, round)
            {
                Ok(rel) => {
                    relationships_touched += 1;
                    touched_entities.insert(rel.source.clone());
                    touched_entities.insert(rel.target.clone());
                    last_touched = Some(rel.target.clone());
                }
                Err(GraphError::InvalidEntity(label)) => {
                    session.skipped.invalid_entities += 1;
                    debug!(round, label = %label, "dropped extraction tuple with blank label");
                    continue;
                }
                Err(GraphError::SelfLoopRejected(id)) => {
                    session.skipped.self_loops += 1;
                    debug!(round, entity = %id, "dropped self-loop");
                    continue;
                }
            }

            if let Some(kind) = fact.kind.as_deref() {
                if let Some(id) = EntityId::from_label(subject) {
                    session.board.suggest_kind(&id, kind);
                }
            }
        }

        // Vision clues attach to the last entity the round touched; with no
        // entity context they land on the session itself.
        for note in vision_notes {
            match &last_touched {
                Some(id) => session.board.annotate_entity(id, note),
                None => session.notes.push(note),
            }
        }

        // Escalate: diminishing returns as the board fills, saturating at 1.
        let gained = self.intensity_gain * ((1 + relationships_touched) as f64).ln();
        session.intensity = (session.intensity + gained).min(1.0);

        self.persist_touched(session, &touched_entities, round)?;

        let entities_added = session.board.entity_count() - entities_before;
        let skipped = session.skipped.total() - skipped_before;
        let summary_text = digest(session, round, entities_added, relationships_touched, skipped);

        Ok(RoundResult {
            round_number: round,
            entities_added,
            relationships_touched,
            skipped,
            intensity_after: session.intensity,
            summary_text,
        })
    }

    /// Mirror this round's touched entities and relationships into the
    /// configured store, if any.
    fn persist_touched(
        &self,
        session: &Session,
        touched_entities: &HashSet<EntityId>,
        round: u32,
    ) -> Result<(), SessionError> {
        let Some(store) = &self.store else {
            return Ok(());
        };

        let result = (|| -> Result<(), StorageError> {
            for id in touched_entities {
                if let Some(entity) = session.board.get_entity(id) {
                    store.save_entity(&session.id, entity)?;
                }
            }
            for rel in session.board.relationships() {
                if rel.last_touched_round == round {
                    store.save_relationship(&session.id, rel)?;
                }
            }
            Ok(())
        })();

        match result {
            Ok(()) => Ok(()),
            Err(e) if self.durable => Err(SessionError::StorageUnavailable(e)),
            Err(e) => {
                warn!(error = %e, "storage degraded to memory-only for this round");
                Ok(())
            }
        }
    }
}

/// Deterministic round digest: counts plus the highest-weight connections
/// touched this round. This string is the round's evidence log entry.
fn digest(
    session: &Session,
    round: u32,
    entities_added: usize,
    relationships_touched: usize,
    skipped: u32,
) -> String {
    let mut touched: Vec<&Relationship> = session
        .board
        .relationships()
        .filter(|r| r.last_touched_round == round)
        .collect();
    touched.sort_by(|a, b| b.weight.cmp(&a.weight));

    let mut summary = format!(
        "round {}: +{} entities, {} connections touched, {} skipped, intensity {:.2}",
        round, entities_added, relationships_touched, skipped, session.intensity,
    );

    let strongest: Vec<String> = touched
        .iter()
        .take(DIGEST_TOP_RELATIONSHIPS)
        .map(|r| {
            format!(
                "{} <-> {} \"{}\" (w{})",
                r.source, r.target, r.description, r.weight
            )
        })
        .collect();
    if !strongest.is_empty() {
        summary.push_str("; strongest: ");
        summary.push_str(&strongest.join(", "));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ExtractedFact;
    use crate::session::state::SkippedCounts;

    fn session() -> Session {
        Session::new("dolphins", "the pyramids").unwrap()
    }

    // --- Scenario: a round merges facts and counts noise ---

    #[test]
    fn malformed_tuples_are_skipped_not_fatal() {
        let controller = RoundController::new();
        let mut session = session();

        let facts = vec![
            ExtractedFact::new("dolphins", "sonar-mapped", "the pyramids"),
            ExtractedFact {
                subject: Some("dolphins".into()),
                description: Some("studied by".into()),
                object: None,
                kind: None,
            },
            ExtractedFact::new("dolphins", "conspires with", "Dolphins"),
        ];

        let result = controller.run_round(&mut session, facts, vec![]).unwrap();

        assert_eq!(result.relationships_touched, 1);
        assert_eq!(result.skipped, 2);
        assert_eq!(
            session.skipped,
            SkippedCounts {
                malformed_extractions: 1,
                invalid_entities: 0,
                self_loops: 1,
            }
        );
    }

    #[test]
    fn empty_description_defaults() {
        let controller = RoundController::new();
        let mut session = session();

        let facts = vec![ExtractedFact {
            subject: Some("Atlantis".into()),
            description: Some("   ".into()),
            object: Some("dolphins".into()),
            kind: None,
        }];
        controller.run_round(&mut session, facts, vec![]).unwrap();

        let snapshot = session.board.snapshot();
        assert_eq!(snapshot.relationships[0].description, "connected to");
    }

    #[test]
    fn kind_hint_lands_on_subject() {
        let controller = RoundController::new();
        let mut session = session();

        let facts =
            vec![ExtractedFact::new("Jacques Cousteau", "filmed", "dolphins").with_kind("person")];
        controller.run_round(&mut session, facts, vec![]).unwrap();

        let id = EntityId::from_label("jacques cousteau").unwrap();
        assert_eq!(
            session.board.get_entity(&id).unwrap().kind.as_deref(),
            Some("person")
        );
    }

    // --- Scenario: intensity escalates monotonically and saturates ---

    #[test]
    fn intensity_is_monotone_and_saturates() {
        let controller = RoundController::new().with_intensity_gain(0.5);
        let mut session = session();
        let mut previous = session.intensity;

        for round in 0..10 {
            session.round_number = round;
            let facts = vec![ExtractedFact::new(
                "dolphins",
                &format!("clue {}", round),
                "the pyramids",
            )];
            let result = controller.run_round(&mut session, facts, vec![]).unwrap();
            assert!(result.intensity_after >= previous);
            assert!(result.intensity_after <= 1.0);
            previous = result.intensity_after;
        }
        assert_eq!(previous, 1.0);
    }

    #[test]
    fn empty_round_leaves_intensity_unchanged() {
        let controller = RoundController::new();
        let mut session = session();
        session.intensity = 0.4;

        let result = controller.run_round(&mut session, vec![], vec![]).unwrap();
        assert_eq!(result.intensity_after, 0.4);
        assert_eq!(result.relationships_touched, 0);
    }

    // --- Scenario: vision clues find a home ---

    #[test]
    fn vision_notes_attach_to_last_touched_entity() {
        let controller = RoundController::new();
        let mut session = session();

        let facts = vec![ExtractedFact::new("dolphins", "circled", "the Sphinx")];
        controller
            .run_round(&mut session, facts, vec!["eyes follow the camera".into()])
            .unwrap();

        let id = EntityId::from_label("the sphinx").unwrap();
        assert_eq!(session.board.get_entity(&id).unwrap().notes.len(), 1);
        assert!(session.notes.is_empty());
    }

    #[test]
    fn vision_notes_without_entity_context_land_on_session() {
        let controller = RoundController::new();
        let mut session = session();

        controller
            .run_round(&mut session, vec![], vec!["a suspicious shadow".into()])
            .unwrap();

        assert_eq!(session.notes, vec!["a suspicious shadow"]);
    }

    // --- Scenario: the digest is deterministic and quotes the strongest edges ---

    #[test]
    fn digest_quotes_top_weight_connections() {
        let controller = RoundController::new();
        let mut session = session();

        let facts = vec![
            ExtractedFact::new("dolphins", "sonar-mapped", "the pyramids"),
            ExtractedFact::new("the pyramids", "sonar-mapped", "dolphins"),
            ExtractedFact::new("dolphins", "funded", "Atlantis"),
        ];
        let result = controller.run_round(&mut session, facts, vec![]).unwrap();

        assert!(result.summary_text.starts_with("round 0:"));
        // The reinforced edge (weight 2) leads the digest.
        let strongest = result.summary_text.split("strongest: ").nth(1).unwrap();
        assert!(strongest.starts_with("dolphins <-> the pyramids"));
        assert!(strongest.contains("(w2)"));
    }
}
