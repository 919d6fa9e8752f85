//! Weighted connections between entities

use super::entity::EntityId;
use super::normalize;
use serde::{Deserialize, Serialize};

/// A merged, weighted connection between two entities.
///
/// Direction is preserved as first observed for display, but merge identity
/// treats the connection as undirected: the endpoint pair is normalized by
/// sorted id order, and the description is compared in normalized form.
/// A re-observed connection reinforces the existing edge instead of creating
/// a duplicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    /// Source entity, original direction
    pub source: EntityId,
    /// Target entity, original direction
    pub target: EntityId,
    /// Connection description, as first seen
    pub description: String,
    /// Normalized description used for merge identity
    pub normalized_description: String,
    /// Corroboration proxy: incremented each time the same connection reappears
    pub weight: u32,
    /// Round in which the connection first appeared
    pub round_added: u32,
    /// Round in which the connection was last created or reinforced
    pub last_touched_round: u32,
}

impl Relationship {
    pub fn new(
        source: EntityId,
        target: EntityId,
        description: impl Into<String>,
        round: u32,
    ) -> Self {
        let description = description.into();
        let normalized_description = normalize(&description);
        Self {
            source,
            target,
            description,
            normalized_description,
            weight: 1,
            round_added: round,
            last_touched_round: round,
        }
    }

    /// Endpoint pair normalized by sorted id order.
    pub fn unordered_pair(&self) -> (&EntityId, &EntityId) {
        if self.source <= self.target {
            (&self.source, &self.target)
        } else {
            (&self.target, &self.source)
        }
    }

    /// True when this edge is the merge target for the given endpoints and
    /// description (both sides compared in normalized/unordered form).
    pub fn merges_with(&self, a: &EntityId, b: &EntityId, normalized_description: &str) -> bool {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let (my_lo, my_hi) = self.unordered_pair();
        my_lo == lo && my_hi == hi && self.normalized_description == normalized_description
    }

    /// Record a re-observation: bump the weight, remember the round.
    /// `round_added` never changes.
    pub fn reinforce(&mut self, round: u32) {
        self.weight += 1;
        self.last_touched_round = round;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(label: &str) -> EntityId {
        EntityId::from_label(label).unwrap()
    }

    #[test]
    fn unordered_pair_sorts_endpoints() {
        let rel = Relationship::new(id("zebra"), id("apple"), "linked to", 0);
        let (lo, hi) = rel.unordered_pair();
        assert_eq!(lo.as_str(), "apple");
        assert_eq!(hi.as_str(), "zebra");
    }

    #[test]
    fn merge_identity_ignores_direction_and_case() {
        let rel = Relationship::new(id("A"), id("B"), "Linked To", 0);
        assert!(rel.merges_with(&id("b"), &id("a"), "linked to"));
        assert!(!rel.merges_with(&id("a"), &id("b"), "funded by"));
    }

    #[test]
    fn reinforce_bumps_weight_and_keeps_origin_round() {
        let mut rel = Relationship::new(id("A"), id("B"), "linked to", 0);
        rel.reinforce(3);
        assert_eq!(rel.weight, 2);
        assert_eq!(rel.round_added, 0);
        assert_eq!(rel.last_touched_round, 3);
    }
}
