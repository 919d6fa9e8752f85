//! Provider trait definitions — the boundary contracts the core consumes
//!
//! Transport, retries, and timeouts are the implementation's concern.
//! The session loop treats any provider failure as an empty result set:
//! a degraded round, never a fatal one.

use crate::session::SessionEvent;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from provider calls. The session loop logs these and degrades;
/// they never abort a round.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("provider response unusable: {0}")]
    BadResponse(String),
}

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// A single web search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Everything one search call produced: text hits plus any image URLs
/// worth a vision pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

/// One entity/connection tuple from the extraction provider.
///
/// Field names alias the wire keys the extraction model emits
/// (`from`/`to`/`relationship`). Everything is optional — malformed tuples
/// are the round controller's problem, dropped and counted there.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedFact {
    #[serde(default, alias = "from")]
    pub subject: Option<String>,
    #[serde(default, alias = "relationship")]
    pub description: Option<String>,
    #[serde(default, alias = "to")]
    pub object: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
}

impl ExtractedFact {
    pub fn new(subject: &str, description: &str, object: &str) -> Self {
        Self {
            subject: Some(subject.to_string()),
            description: Some(description.to_string()),
            object: Some(object.to_string()),
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: &str) -> Self {
        self.kind = Some(kind.to_string());
        self
    }
}

/// Web search capability. An empty response is a valid answer.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> ProviderResult<SearchResponse>;
}

/// Entity/connection extraction over raw search text.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract entity/connection tuples from `text`, with the bounded
    /// evidence context from previous rounds available as guidance.
    async fn extract(&self, text: &str, prior_context: &str) -> ProviderResult<Vec<ExtractedFact>>;

    /// Propose up to three follow-up search queries digging deeper into
    /// the last round's findings. The session loop falls back to canned
    /// queries when this returns nothing.
    async fn followup_queries(
        &self,
        topic_a: &str,
        topic_b: &str,
        last_summary: &str,
    ) -> ProviderResult<Vec<String>>;
}

/// Image analysis capability: free-text clue notes for an image URL.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    async fn analyze(
        &self,
        image_url: &str,
        topic_a: &str,
        topic_b: &str,
    ) -> ProviderResult<Vec<String>>;
}

/// Receives session progress events for presentation. Delivery failure is
/// non-fatal to the round.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn deliver(&self, event: &SessionEvent) -> ProviderResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracted_fact_accepts_wire_aliases() {
        let json = r#"{"from": "Dolphins", "to": "The Pyramids", "relationship": "sonar-mapped"}"#;
        let fact: ExtractedFact = serde_json::from_str(json).unwrap();
        assert_eq!(fact.subject.as_deref(), Some("Dolphins"));
        assert_eq!(fact.object.as_deref(), Some("The Pyramids"));
        assert_eq!(fact.description.as_deref(), Some("sonar-mapped"));
    }

    #[test]
    fn extracted_fact_tolerates_missing_fields() {
        let fact: ExtractedFact = serde_json::from_str(r#"{"from": "Dolphins"}"#).unwrap();
        assert!(fact.object.is_none());
        assert!(fact.description.is_none());
    }
}
