//! Evidence store: append-only round summaries, bounded recall
//!
//! Each round's digest is appended to the session's evidence log, and the
//! most recent entries are replayed as bounded context for the next round's
//! extraction prompt. Recency beats completeness: context is truncated from
//! the oldest end, never mid-entry.

use super::round::RoundResult;
use super::state::Session;
use crate::storage::StorageError;

/// Separator between evidence entries in the replayed context.
const ENTRY_SEPARATOR: &str = "\n";

/// Append-only evidence log operations over a session.
///
/// Stateless — the log itself lives on the session. The `record` contract
/// reserves a failure path for durable evidence backends; the in-memory
/// log cannot fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvidenceStore;

impl EvidenceStore {
    pub fn new() -> Self {
        Self
    }

    /// Append the round's digest to the session's evidence log.
    pub fn record(&self, session: &mut Session, result: &RoundResult) -> Result<(), StorageError> {
        session.evidence_log.push(result.summary_text.clone());
        Ok(())
    }

    /// Replay the most recent evidence entries, newest last, within
    /// `max_chars`. Whole oldest entries are dropped first; an entry is
    /// never split. Deterministic and side-effect-free.
    pub fn context_for_next_round(&self, session: &Session, max_chars: usize) -> String {
        let mut kept: Vec<&str> = Vec::new();
        let mut used = 0usize;

        for entry in session.evidence_log.iter().rev() {
            let cost = entry.len() + if kept.is_empty() { 0 } else { ENTRY_SEPARATOR.len() };
            if used + cost > max_chars {
                break;
            }
            used += cost;
            kept.push(entry);
        }

        kept.reverse();
        kept.join(ENTRY_SEPARATOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::round::RoundResult;

    fn session_with_entries(entries: &[&str]) -> Session {
        let mut session = Session::new("dolphins", "the pyramids").unwrap();
        session.evidence_log = entries.iter().map(|e| e.to_string()).collect();
        session
    }

    fn result_with_summary(summary: &str) -> RoundResult {
        RoundResult {
            round_number: 0,
            entities_added: 0,
            relationships_touched: 0,
            skipped: 0,
            intensity_after: 0.0,
            summary_text: summary.to_string(),
        }
    }

    #[test]
    fn record_appends_in_order() {
        let store = EvidenceStore::new();
        let mut session = session_with_entries(&[]);
        store.record(&mut session, &result_with_summary("first")).unwrap();
        store.record(&mut session, &result_with_summary("second")).unwrap();
        assert_eq!(session.evidence_log, vec!["first", "second"]);
    }

    #[test]
    fn context_keeps_newest_whole_entries_only() {
        // Three 50-char entries with an 80-char budget: only the newest fits.
        let a = "a".repeat(50);
        let b = "b".repeat(50);
        let c = "c".repeat(50);
        let session = session_with_entries(&[&a, &b, &c]);

        let context = EvidenceStore::new().context_for_next_round(&session, 80);
        assert_eq!(context, c);
        assert!(context.len() <= 80);
    }

    #[test]
    fn context_orders_survivors_oldest_first() {
        let session = session_with_entries(&["one", "two", "three"]);
        let context = EvidenceStore::new().context_for_next_round(&session, 100);
        assert_eq!(context, "one\ntwo\nthree");
    }

    #[test]
    fn oversized_single_entry_yields_empty_context() {
        let big = "x".repeat(200);
        let session = session_with_entries(&[&big]);
        assert_eq!(EvidenceStore::new().context_for_next_round(&session, 80), "");
    }

    #[test]
    fn empty_log_yields_empty_context() {
        let session = session_with_entries(&[]);
        assert_eq!(EvidenceStore::new().context_for_next_round(&session, 80), "");
    }
}
