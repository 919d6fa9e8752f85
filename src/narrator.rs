//! Round-phased narration over round results
//!
//! A pure read-only consumer: deterministic string templating, no state,
//! no model calls. The register escalates with the round number — measured
//! at first, pattern-obsessed in the middle, fully unhinged from round
//! three on.

use crate::session::RoundResult;

/// Narrate one round's result in the voice the round deserves.
pub fn narrate(result: &RoundResult) -> String {
    let thread = strongest_thread(result).unwrap_or("something they buried");

    match result.round_number {
        0 => format!(
            "Interesting... {} new names on the board, and already a thread: {}. \
             Follow the money.",
            result.entities_added, thread
        ),
        1 => format!(
            "The pattern is right there — {}. {} connections and counting. \
             Coincidence? I THINK NOT.",
            thread, result.relationships_touched
        ),
        _ => format!(
            "IT'S ALL CONNECTED. {} — AGAIN. Intensity {:.2} and climbing. \
             THEY DON'T WANT YOU TO SEE THIS BOARD.",
            thread, result.intensity_after
        ),
    }
}

/// The strongest connection quoted in the round digest, if any.
fn strongest_thread(result: &RoundResult) -> Option<&str> {
    let quoted = result.summary_text.split("strongest: ").nth(1)?;
    quoted.split(", ").next()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(round: u32, summary: &str) -> RoundResult {
        RoundResult {
            round_number: round,
            entities_added: 2,
            relationships_touched: 3,
            skipped: 0,
            intensity_after: 0.42,
            summary_text: summary.to_string(),
        }
    }

    #[test]
    fn narration_is_deterministic() {
        let r = result(0, "round 0: ...; strongest: a <-> b \"linked\" (w1)");
        assert_eq!(narrate(&r), narrate(&r));
    }

    #[test]
    fn register_escalates_by_round() {
        let summary = "round x; strongest: a <-> b \"linked\" (w2)";
        let early = narrate(&result(0, summary));
        let deep = narrate(&result(1, summary));
        let unhinged = narrate(&result(5, summary));

        assert!(early.contains("Interesting"));
        assert!(deep.contains("I THINK NOT"));
        assert!(unhinged.contains("ALL CONNECTED"));
        assert!(unhinged.contains("a <-> b"));
    }

    #[test]
    fn missing_thread_gets_a_stand_in() {
        let bare = narrate(&result(0, "round 0: +0 entities"));
        assert!(bare.contains("something they buried"));
    }
}
