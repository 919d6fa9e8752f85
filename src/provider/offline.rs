//! Offline providers — no-network stand-ins used by the CLI
//!
//! Search returns templated snippets seeded with recurring fictional
//! institutions; extraction pulls capitalized phrases out of the text and
//! chains them into connections. Everything is deterministic for a given
//! query set, so repeated runs build the same board. Real search/LLM/vision
//! adapters plug in through the same traits.

use super::traits::{
    ExtractedFact, Extractor, ProgressSink, ProviderResult, SearchProvider, SearchResponse,
    SearchResult,
};
use crate::session::SessionEvent;
use async_trait::async_trait;

/// Recurring fictional institutions that seed the offline board.
const BUREAUS: [&str; 4] = [
    "Global Frequency Institute",
    "Bureau of Hidden Patterns",
    "Midnight Archive",
    "Office of Coincidence Denial",
];

/// Connection templates cycled through by the offline extractor.
const LINKS: [&str; 5] = [
    "keeps appearing alongside",
    "shares funding with",
    "was photographed near",
    "cites the same sources as",
    "denies any link to",
];

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Templated search results mentioning the query next to a rotating cast
/// of institutions. Deterministic per query.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineSearch;

impl OfflineSearch {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SearchProvider for OfflineSearch {
    async fn search(&self, query: &str) -> ProviderResult<SearchResponse> {
        let subject = title_case(query);
        let first = BUREAUS[query.len() % BUREAUS.len()];
        let second = BUREAUS[(query.len() + 1) % BUREAUS.len()];

        Ok(SearchResponse {
            results: vec![
                SearchResult {
                    title: format!("What the {} knows about {}", first, subject),
                    url: format!("https://example.invalid/{}", query.replace(' ', "-")),
                    snippet: format!(
                        "Leaked minutes from the {} mention {} twice in one paragraph.",
                        first, subject
                    ),
                },
                SearchResult {
                    title: format!("{} files, annotated", second),
                    url: format!("https://example.invalid/archive/{}", query.len()),
                    snippet: format!(
                        "A redacted memo ties {} to the {} through a shared mailing address.",
                        subject, second
                    ),
                },
            ],
            image_urls: Vec::new(),
        })
    }
}

/// Heuristic extraction: capitalized phrases become entities, adjacent
/// phrases become connections. A cheap deterministic stand-in for the LLM.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineExtractor;

impl OfflineExtractor {
    pub fn new() -> Self {
        Self
    }
}

/// Runs of words with uppercase initials, in order of first appearance.
/// Single capitalized words are kept only when reasonably long, which
/// filters sentence starts like "A" and "The".
fn capitalized_phrases(text: &str) -> Vec<String> {
    let mut phrases: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    let mut flush = |current: &mut Vec<&str>, phrases: &mut Vec<String>| {
        let keep = current.len() > 1 || current.first().is_some_and(|w| w.len() >= 5);
        if keep {
            let phrase = current.join(" ");
            if !phrases.iter().any(|p| p.eq_ignore_ascii_case(&phrase)) {
                phrases.push(phrase);
            }
        }
        current.clear();
    };

    for word in text.split_whitespace() {
        let cleaned = word.trim_matches(|c: char| !c.is_alphanumeric());
        if cleaned.chars().next().is_some_and(|c| c.is_uppercase()) {
            current.push(cleaned);
        } else {
            flush(&mut current, &mut phrases);
        }
    }
    flush(&mut current, &mut phrases);
    phrases
}

#[async_trait]
impl Extractor for OfflineExtractor {
    async fn extract(
        &self,
        text: &str,
        _prior_context: &str,
    ) -> ProviderResult<Vec<ExtractedFact>> {
        let phrases = capitalized_phrases(text);
        let facts = phrases
            .windows(2)
            .enumerate()
            .filter(|(_, pair)| !pair[0].eq_ignore_ascii_case(&pair[1]))
            .map(|(i, pair)| ExtractedFact::new(&pair[0], LINKS[i % LINKS.len()], &pair[1]))
            .collect();
        Ok(facts)
    }

    async fn followup_queries(
        &self,
        _topic_a: &str,
        _topic_b: &str,
        _last_summary: &str,
    ) -> ProviderResult<Vec<String>> {
        // Defer to the session loop's canned deep-dive queries.
        Ok(Vec::new())
    }
}

/// Progress sink that prints events to stdout, for the CLI.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutProgress;

impl StdoutProgress {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProgressSink for StdoutProgress {
    async fn deliver(&self, event: &SessionEvent) -> ProviderResult<()> {
        match event {
            SessionEvent::RoundStarted { round, total_rounds } => {
                println!("\n=== round {}/{} ===", round + 1, total_rounds);
            }
            SessionEvent::SearchCompleted { result_count, .. } => {
                println!("[search] {} results collected", result_count);
            }
            SessionEvent::ImageClue { note, .. } => {
                println!("[vision] {}", note);
            }
            SessionEvent::RoundCompleted(result) => {
                println!("[board] {}", result.summary_text);
                println!("{}", crate::narrator::narrate(result));
            }
            SessionEvent::SessionCompleted { .. } => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalized_phrases_keep_first_appearance_order() {
        let text = "Leaked minutes from the Midnight Archive mention The Pyramids twice.";
        let phrases = capitalized_phrases(text);
        assert_eq!(phrases, vec!["Leaked", "Midnight Archive", "The Pyramids"]);
    }

    #[test]
    fn short_lone_capitals_are_filtered() {
        let phrases = capitalized_phrases("A memo ties Dolphins to the Bureau of secrets.");
        assert_eq!(phrases, vec!["Dolphins", "Bureau"]);
    }

    #[tokio::test]
    async fn offline_pipeline_is_deterministic() {
        let search = OfflineSearch::new();
        let first = search.search("dolphins").await.unwrap();
        let second = search.search("dolphins").await.unwrap();
        assert_eq!(first.results[0].snippet, second.results[0].snippet);

        let extractor = OfflineExtractor::new();
        let facts = extractor
            .extract(&first.results[0].snippet, "")
            .await
            .unwrap();
        assert!(!facts.is_empty());
    }
}
