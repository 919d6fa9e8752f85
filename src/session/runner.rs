//! Session loop: N rounds of search → extract → merge → record
//!
//! Runs rounds strictly sequentially — each round's query construction
//! depends on the previous round's evidence context and intensity. Within a
//! round, the independent search sub-queries fan out concurrently and are
//! merged only after all have returned, so the board has exactly one writer.

use super::events::SessionEvent;
use super::evidence::EvidenceStore;
use super::round::{RoundController, RoundResult, SessionError};
use super::state::{Session, SessionState};
use crate::cancel::CancelToken;
use crate::provider::{
    Extractor, ProgressSink, SearchProvider, SearchResponse, VisionProvider,
};
use crate::storage::BoardStore;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Default budget for the evidence context replayed into extraction.
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 1500;

/// Cap on the search text blob handed to extraction.
const EXTRACT_TEXT_CAP: usize = 3000;

/// At most this many images get a vision pass per round.
const MAX_IMAGES_PER_ROUND: usize = 2;

/// At most this many follow-up queries per round.
const MAX_FOLLOWUP_QUERIES: usize = 3;

/// Drives one session from `Idle` to `Completed` or `Failed`.
///
/// All external capabilities are injected; the runner owns no ambient
/// state, so independent sessions run in parallel with nothing shared.
pub struct SessionRunner {
    search: Arc<dyn SearchProvider>,
    extractor: Arc<dyn Extractor>,
    vision: Option<Arc<dyn VisionProvider>>,
    progress: Option<Arc<dyn ProgressSink>>,
    controller: RoundController,
    evidence: EvidenceStore,
    cancel: CancelToken,
    max_context_chars: usize,
}

impl SessionRunner {
    pub fn new(search: Arc<dyn SearchProvider>, extractor: Arc<dyn Extractor>) -> Self {
        Self {
            search,
            extractor,
            vision: None,
            progress: None,
            controller: RoundController::new(),
            evidence: EvidenceStore::new(),
            cancel: CancelToken::new(),
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
        }
    }

    pub fn with_vision(mut self, vision: Arc<dyn VisionProvider>) -> Self {
        self.vision = Some(vision);
        self
    }

    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Mirror board state into a durable store. With `durable` set, storage
    /// failure ends the session in `Failed` instead of degrading.
    pub fn with_store(mut self, store: Arc<dyn BoardStore>, durable: bool) -> Self {
        self.controller = std::mem::take(&mut self.controller).with_store(store, durable);
        self
    }

    pub fn with_intensity_gain(mut self, gain: f64) -> Self {
        self.controller = std::mem::take(&mut self.controller).with_intensity_gain(gain);
        self
    }

    /// Token checked before each round's external requests. Cancellation
    /// takes effect at the next round boundary only.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_max_context_chars(mut self, max_chars: usize) -> Self {
        self.max_context_chars = max_chars;
        self
    }

    /// Run up to `rounds` rounds for the two topics.
    ///
    /// Returns the finished session: `Completed` normally (possibly early,
    /// at a cancellation boundary — `round_number` is the count actually
    /// completed), or `Failed` with every accumulated entity, relationship,
    /// and evidence entry preserved for inspection. `Err` is returned only
    /// for caller mistakes caught before the first round.
    pub async fn run(
        &self,
        topic_a: &str,
        topic_b: &str,
        rounds: u32,
    ) -> Result<Session, SessionError> {
        if rounds == 0 {
            return Err(SessionError::InvalidRounds(rounds));
        }
        let mut session = Session::new(topic_a, topic_b)?;
        session.state = SessionState::Running;
        info!(session = %session.id, topic_a, topic_b, rounds, "session started");

        for _ in 0..rounds {
            if self.cancel.is_cancelled() {
                info!(session = %session.id, round = session.round_number, "cancelled at round boundary");
                break;
            }

            match self.execute_round(&mut session, rounds).await {
                Ok(result) => {
                    self.emit(SessionEvent::RoundCompleted(result)).await;
                    session.round_number += 1;
                }
                Err(e) => {
                    warn!(session = %session.id, error = %e, "session failed");
                    session.state = SessionState::Failed {
                        reason: e.to_string(),
                    };
                    break;
                }
            }
        }

        if session.state == SessionState::Running {
            session.state = SessionState::Completed;
        }
        self.emit(SessionEvent::SessionCompleted {
            rounds_completed: session.round_number,
            entity_count: session.board.entity_count(),
            relationship_count: session.board.relationship_count(),
            skipped_total: session.skipped.total(),
        })
        .await;
        info!(session = %session.id, rounds_completed = session.round_number, "session finished");
        Ok(session)
    }

    /// One round: plan queries, fan out searches, extract, merge, record.
    async fn execute_round(
        &self,
        session: &mut Session,
        total_rounds: u32,
    ) -> Result<RoundResult, SessionError> {
        let round = session.round_number;
        self.emit(SessionEvent::RoundStarted {
            round,
            total_rounds,
        })
        .await;

        let context = self
            .evidence
            .context_for_next_round(session, self.max_context_chars);

        let queries = self.plan_queries(session).await;
        let responses = self.fan_out_searches(&queries).await;

        let mut text = String::new();
        let mut image_urls: Vec<String> = Vec::new();
        let mut result_count = 0usize;
        for response in responses.into_iter().flatten() {
            result_count += response.results.len();
            for hit in &response.results {
                // Whole snippets only, up to the extraction budget.
                if text.len() + hit.snippet.len() + 1 > EXTRACT_TEXT_CAP {
                    continue;
                }
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(&hit.snippet);
            }
            image_urls.extend(response.image_urls);
        }

        self.emit(SessionEvent::SearchCompleted {
            round,
            result_count,
            image_count: image_urls.len(),
        })
        .await;

        let facts = match self.extractor.extract(&text, &context).await {
            Ok(facts) => facts,
            Err(e) => {
                warn!(round, error = %e, "extraction degraded to empty");
                Vec::new()
            }
        };

        let vision_notes = self.analyze_images(session, round, image_urls).await;

        let result = self.controller.run_round(session, facts, vision_notes)?;
        self.evidence.record(session, &result)?;
        Ok(result)
    }

    /// Sub-queries for the round: both topics and their connection, plus —
    /// after the first round — follow-ups digging into the last finding.
    async fn plan_queries(&self, session: &Session) -> Vec<String> {
        let a = &session.topic_a;
        let b = &session.topic_b;
        let mut queries = vec![
            a.clone(),
            b.clone(),
            format!("{} {} connection", a, b),
        ];

        if session.round_number > 0 {
            let last_summary = session.evidence_log.last().cloned().unwrap_or_default();
            let followups = match self.extractor.followup_queries(a, b, &last_summary).await {
                Ok(list) if !list.is_empty() => list,
                Ok(_) => fallback_queries(a, b),
                Err(e) => {
                    warn!(error = %e, "follow-up planning degraded to fallback queries");
                    fallback_queries(a, b)
                }
            };
            queries.extend(followups.into_iter().take(MAX_FOLLOWUP_QUERIES));
        }
        queries
    }

    /// Issue all sub-queries concurrently; collect in query order so the
    /// merged text blob is deterministic. A failed or panicked sub-query
    /// degrades to an empty result set.
    async fn fan_out_searches(&self, queries: &[String]) -> Vec<Option<SearchResponse>> {
        let mut tasks = JoinSet::new();
        for (index, query) in queries.iter().enumerate() {
            let search = Arc::clone(&self.search);
            let query = query.clone();
            tasks.spawn(async move { (index, search.search(&query).await) });
        }

        let mut responses: Vec<Option<SearchResponse>> = vec![None; queries.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(response))) => responses[index] = Some(response),
                Ok((index, Err(e))) => {
                    warn!(query = %queries[index], error = %e, "search degraded to empty");
                }
                Err(e) => warn!(error = %e, "search task aborted"),
            }
        }
        responses
    }

    /// Vision pass over the round's images: dedupe, cap, analyze, emit a
    /// clue event per note. No provider, no notes.
    async fn analyze_images(
        &self,
        session: &Session,
        round: u32,
        image_urls: Vec<String>,
    ) -> Vec<String> {
        let Some(vision) = &self.vision else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let unique: Vec<String> = image_urls
            .into_iter()
            .filter(|url| seen.insert(url.clone()))
            .take(MAX_IMAGES_PER_ROUND)
            .collect();

        let mut notes = Vec::new();
        for url in unique {
            match vision.analyze(&url, &session.topic_a, &session.topic_b).await {
                Ok(clues) => {
                    for note in clues {
                        self.emit(SessionEvent::ImageClue {
                            round,
                            image_url: url.clone(),
                            note: note.clone(),
                        })
                        .await;
                        notes.push(note);
                    }
                }
                Err(e) => warn!(image_url = %url, error = %e, "vision degraded to no clues"),
            }
        }
        notes
    }

    async fn emit(&self, event: SessionEvent) {
        if let Some(sink) = &self.progress {
            if let Err(e) = sink.deliver(&event).await {
                warn!(error = %e, "progress delivery failed");
            }
        }
    }
}

/// Canned deep-dive queries used when the extraction provider offers none.
fn fallback_queries(topic_a: &str, topic_b: &str) -> Vec<String> {
    vec![
        format!("{} secret connections", topic_a),
        format!("{} hidden links", topic_b),
        format!("{} {} conspiracy", topic_a, topic_b),
    ]
}
