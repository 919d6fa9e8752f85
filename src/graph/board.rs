//! Board: the in-memory conspiracy graph with merge rules

use super::entity::{Entity, EntityId};
use super::normalize;
use super::relationship::Relationship;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use thiserror::Error;

/// Errors from board mutations. Both variants are recoverable: callers
/// merging noisy extraction output drop the offending item and count it.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("invalid entity label: {0:?}")]
    InvalidEntity(String),

    #[error("self-loop rejected for entity: {0}")]
    SelfLoopRejected(EntityId),
}

/// Result type for board operations
pub type GraphResult<T> = Result<T, GraphError>;

/// Read-only export of the board for persistence, visualization, narration.
/// Both lists are in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
}

/// The in-memory conspiracy graph.
///
/// Entity identity is the normalized display label — the cheapest correct
/// merge policy for noisy extraction output that repeats the same entity
/// with trivial textual variation round over round. Connections merge on
/// (unordered endpoint pair, normalized description), accumulating weight
/// as a corroboration signal.
///
/// Mutated by exactly one writer per round; no internal locking.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Board {
    entities: HashMap<EntityId, Entity>,
    /// Entity insertion order, for deterministic snapshots
    order: Vec<EntityId>,
    relationships: Vec<Relationship>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the entity for `label` if absent, bump its mention count either
    /// way, and return the canonical entity.
    ///
    /// `kind` is advisory: recorded on first sight, never overwritten.
    /// Empty or whitespace-only labels are rejected.
    pub fn upsert_entity(
        &mut self,
        label: &str,
        kind: Option<&str>,
        round: u32,
    ) -> GraphResult<&Entity> {
        let id = EntityId::from_label(label)
            .ok_or_else(|| GraphError::InvalidEntity(label.to_string()))?;

        let entity = match self.entities.entry(id) {
            Entry::Vacant(slot) => {
                let id = slot.key().clone();
                self.order.push(id.clone());
                slot.insert(Entity::new(id, label.trim(), kind.map(str::to_string), round))
            }
            Entry::Occupied(slot) => slot.into_mut(),
        };
        entity.mention_count += 1;
        Ok(entity)
    }

    /// Merge a connection between two labeled entities.
    ///
    /// Endpoints are resolved through [`Board::upsert_entity`], auto-creating
    /// entities named only in a relationship. If a connection with the same
    /// unordered pair and normalized description already exists its weight is
    /// bumped; otherwise a new edge is created with weight 1.
    ///
    /// Linear scan over the edge list — boards stay in the tens to low
    /// hundreds of edges.
    pub fn upsert_relationship(
        &mut self,
        source_label: &str,
        target_label: &str,
        description: &str,
        round: u32,
    ) -> GraphResult<&Relationship> {
        let source = self.upsert_entity(source_label, None, round)?.id.clone();
        let target = self.upsert_entity(target_label, None, round)?.id.clone();
        if source == target {
            return Err(GraphError::SelfLoopRejected(source));
        }

        let normalized_description = normalize(description);
        let existing = self
            .relationships
            .iter()
            .position(|r| r.merges_with(&source, &target, &normalized_description));

        let index = match existing {
            Some(index) => {
                self.relationships[index].reinforce(round);
                index
            }
            None => {
                self.relationships
                    .push(Relationship::new(source, target, description.trim(), round));
                self.relationships.len() - 1
            }
        };
        Ok(&self.relationships[index])
    }

    /// Record an advisory kind for an entity that doesn't have one yet.
    /// A kind seen earlier always wins; unknown ids are ignored.
    pub fn suggest_kind(&mut self, id: &EntityId, kind: &str) {
        if let Some(entity) = self.entities.get_mut(id) {
            if entity.kind.is_none() {
                entity.kind = Some(kind.to_string());
            }
        }
    }

    /// Attach a relationship-free annotation to an entity.
    /// Unknown ids are ignored — annotations are best-effort color.
    pub fn annotate_entity(&mut self, id: &EntityId, note: impl Into<String>) {
        if let Some(entity) = self.entities.get_mut(id) {
            entity.notes.push(note.into());
        }
    }

    pub fn get_entity(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.iter()
    }

    /// Export entities and relationships in insertion order.
    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            entities: self
                .order
                .iter()
                .filter_map(|id| self.entities.get(id))
                .cloned()
                .collect(),
            relationships: self.relationships.clone(),
        }
    }
}
