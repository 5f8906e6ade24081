use super::manifest::{ManifestError, NarrationManifest};
use crate::domain::tts::{
    normalize_text, ProviderDispatcher, ProviderKind, SynthesisError, SynthesisRequest,
    SynthesisResult,
};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Default gap between consecutive remote provider calls.
pub const DEFAULT_PACING: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total: usize,
}

impl BatchSummary {
    /// A batch is usable if anything was produced.
    pub fn is_success(&self) -> bool {
        self.succeeded > 0
    }
}

/// Drives the dispatcher over narration items, one at a time, in index order.
pub struct NarrationOrchestrator {
    dispatcher: ProviderDispatcher,
    provider: ProviderKind,
    audio_dir: PathBuf,
    pacing: Duration,
    speaker_reference: Option<PathBuf>,
}

impl NarrationOrchestrator {
    pub fn new(dispatcher: ProviderDispatcher, provider: ProviderKind, audio_dir: PathBuf) -> Self {
        Self {
            dispatcher,
            provider,
            audio_dir,
            pacing: DEFAULT_PACING,
            speaker_reference: None,
        }
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_speaker_reference(mut self, path: Option<PathBuf>) -> Self {
        self.speaker_reference = path;
        self
    }

    /// `<audio_dir>/slide_<index>.<ext>`, ext being the provider's native format.
    pub fn output_path(&self, index: u32) -> PathBuf {
        self.audio_dir.join(format!(
            "slide_{}.{}",
            index,
            self.provider.audio_format().extension()
        ))
    }

    pub async fn run_batch(&self, manifest: &NarrationManifest) -> BatchSummary {
        let mut summary = BatchSummary {
            total: manifest.len(),
            ..BatchSummary::default()
        };
        let mut remote_calls = 0usize;

        for item in manifest.items() {
            if item.is_blank() {
                tracing::warn!(index = item.index, "Empty narration, skipping");
                summary.skipped += 1;
                continue;
            }

            if self.provider.is_remote() && remote_calls > 0 && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
            if self.provider.is_remote() {
                remote_calls += 1;
            }

            tracing::info!(index = item.index, provider = %self.provider, "Generating narration audio");
            let result = self.synthesize(item.index, item.text).await;

            if result.is_success() {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
                tracing::error!(
                    index = item.index,
                    error = result.failure().map(|f| f.detail.as_str()).unwrap_or_default(),
                    "Failed to generate narration audio"
                );
            }
        }

        tracing::info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            total = summary.total,
            "Batch generation completed: {}/{} successful",
            summary.succeeded,
            summary.total
        );

        summary
    }

    pub async fn run_single(&self, index: u32, text: &str) -> SynthesisResult {
        if text.trim().is_empty() {
            tracing::error!(index = index, "Empty narration text");
            return SynthesisResult::failed(
                Uuid::new_v4(),
                self.provider,
                &SynthesisError::InvalidInput(format!("empty narration for index {}", index)),
                Duration::ZERO,
            );
        }

        tracing::info!(index = index, provider = %self.provider, "Generating single narration audio");
        self.synthesize(index, text.to_string()).await
    }

    pub async fn run_single_from_manifest(
        &self,
        manifest: &NarrationManifest,
        index: u32,
    ) -> Result<SynthesisResult, ManifestError> {
        let text = manifest.get(index)?;
        Ok(self.run_single(index, text).await)
    }

    async fn synthesize(&self, index: u32, text: String) -> SynthesisResult {
        let request = SynthesisRequest::new(normalize_text(&text), self.provider)
            .with_speaker_reference(self.speaker_reference.clone());
        self.dispatcher
            .dispatch(Uuid::new_v4(), &request, &self.output_path(index))
            .await
    }
}
