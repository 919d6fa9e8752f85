//! Scripted providers — deterministic fakes for tests
//!
//! Each provider replays a preloaded queue of responses, one per call, and
//! degrades to an empty response when the script runs out. The recording
//! sink captures every event and can flip a cancel token at a chosen round,
//! which is how the cancellation-boundary scenarios are driven.

use super::traits::{
    ExtractedFact, Extractor, ProgressSink, ProviderError, ProviderResult, SearchProvider,
    SearchResponse, VisionProvider,
};
use crate::cancel::CancelToken;
use crate::session::SessionEvent;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Search fake: pops one scripted response per `search` call.
#[derive(Default)]
pub struct ScriptedSearch {
    responses: Mutex<VecDeque<ProviderResult<SearchResponse>>>,
}

impl ScriptedSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next unanswered `search` call.
    pub fn with_response(self, response: SearchResponse) -> Self {
        self.responses.lock().unwrap().push_back(Ok(response));
        self
    }

    /// Queue a failure for the next unanswered `search` call.
    pub fn with_failure(self, error: ProviderError) -> Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }
}

#[async_trait]
impl SearchProvider for ScriptedSearch {
    async fn search(&self, _query: &str) -> ProviderResult<SearchResponse> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(SearchResponse::default()))
    }
}

/// Extraction fake: one scripted fact list per `extract` call, plus an
/// optional fixed follow-up query list.
#[derive(Default)]
pub struct ScriptedExtractor {
    rounds: Mutex<VecDeque<Vec<ExtractedFact>>>,
    followups: Vec<String>,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the fact list returned by the next `extract` call.
    pub fn with_round(self, facts: Vec<ExtractedFact>) -> Self {
        self.rounds.lock().unwrap().push_back(facts);
        self
    }

    /// Fixed follow-up queries returned for every round after the first.
    pub fn with_followups(mut self, queries: Vec<String>) -> Self {
        self.followups = queries;
        self
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    async fn extract(
        &self,
        _text: &str,
        _prior_context: &str,
    ) -> ProviderResult<Vec<ExtractedFact>> {
        Ok(self.rounds.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn followup_queries(
        &self,
        _topic_a: &str,
        _topic_b: &str,
        _last_summary: &str,
    ) -> ProviderResult<Vec<String>> {
        Ok(self.followups.clone())
    }
}

/// Vision fake: one scripted note list per `analyze` call.
#[derive(Default)]
pub struct ScriptedVision {
    clues: Mutex<VecDeque<Vec<String>>>,
}

impl ScriptedVision {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clues(self, notes: Vec<String>) -> Self {
        self.clues.lock().unwrap().push_back(notes);
        self
    }
}

#[async_trait]
impl VisionProvider for ScriptedVision {
    async fn analyze(
        &self,
        _image_url: &str,
        _topic_a: &str,
        _topic_b: &str,
    ) -> ProviderResult<Vec<String>> {
        Ok(self.clues.lock().unwrap().pop_front().unwrap_or_default())
    }
}

/// Progress sink that records every event, optionally cancelling a token
/// once a given round completes.
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<SessionEvent>>,
    cancel_after: Option<(u32, CancelToken)>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel `token` as soon as the round with this number completes.
    pub fn with_cancel_after(mut self, round_number: u32, token: CancelToken) -> Self {
        self.cancel_after = Some((round_number, token));
        self
    }

    /// Snapshot of the events delivered so far.
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Round numbers of the completed rounds seen so far.
    pub fn completed_rounds(&self) -> Vec<u32> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SessionEvent::RoundCompleted(result) => Some(result.round_number),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ProgressSink for RecordingProgress {
    async fn deliver(&self, event: &SessionEvent) -> ProviderResult<()> {
        if let (Some((after, token)), SessionEvent::RoundCompleted(result)) =
            (&self.cancel_after, event)
        {
            if result.round_number == *after {
                token.cancel();
            }
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}
