//! Narration batches: a manifest of slide notes turned into one audio file per slide.

pub mod manifest;
pub mod orchestrator;

pub use manifest::{ManifestError, NarrationItem, NarrationManifest};
pub use orchestrator::{BatchSummary, NarrationOrchestrator, DEFAULT_PACING};
