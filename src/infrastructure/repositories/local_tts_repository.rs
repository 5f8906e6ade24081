use super::tts_repository::TtsRepository;
use crate::domain::tts::{AudioArtifact, ProviderKind, SynthesisError, SynthesisRequest};
use crate::infrastructure::device::Device;
use crate::infrastructure::model::{ModelResidency, SynthesisExecutor};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Synthesis on the resident model. No network.
pub struct LocalTtsRepository {
    residency: Arc<ModelResidency>,
    executor: Arc<SynthesisExecutor>,
    device: Device,
}

impl LocalTtsRepository {
    pub fn new(residency: Arc<ModelResidency>, executor: Arc<SynthesisExecutor>, device: Device) -> Self {
        Self {
            residency,
            executor,
            device,
        }
    }
}

#[async_trait]
impl TtsRepository for LocalTtsRepository {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Local
    }

    async fn synthesize(
        &self,
        request: &SynthesisRequest,
        destination: &Path,
    ) -> Result<AudioArtifact, SynthesisError> {
        let start_time = std::time::Instant::now();
        let handle = self.residency.acquire(&self.device).await?;

        let artifact = self
            .executor
            .synthesize(
                &handle,
                &request.text,
                request.speaker_reference.as_deref(),
                destination,
            )
            .await?;

        let duration = start_time.elapsed();
        tracing::info!(
            provider = "local",
            device = %self.device,
            latency_ms = duration.as_millis() as u64,
            characters_count = request.text.chars().count(),
            audio_size_bytes = artifact.size_bytes,
            "TTS synthesis completed"
        );

        Ok(artifact)
    }
}
