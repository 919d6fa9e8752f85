//! External capability providers: search, extraction, vision, progress
//!
//! The core never reaches for ambient global clients. Every external call
//! goes through one of these injected traits, so sessions are isolated and
//! tests substitute deterministic fakes.

mod offline;
mod scripted;
mod traits;

pub use offline::{OfflineExtractor, OfflineSearch, StdoutProgress};
pub use scripted::{RecordingProgress, ScriptedExtractor, ScriptedSearch, ScriptedVision};
pub use traits::{
    Extractor, ExtractedFact, ProgressSink, ProviderError, ProviderResult, SearchProvider,
    SearchResponse, SearchResult, VisionProvider,
};
