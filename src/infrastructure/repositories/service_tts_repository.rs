use super::remote::{self, RetryPolicy};
use super::tts_repository::TtsRepository;
use crate::domain::tts::{
    AudioArtifact, ErrorKind, GenerateRequest, HealthReport, HealthStatus, ProviderKind,
    SynthesisError, SynthesisRequest,
};
use crate::infrastructure::config::RemoteConfig;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;

const PROVIDER: &str = "deckvoice";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceFailure {
    error: String,
    #[serde(default)]
    error_kind: Option<ErrorKind>,
}

/// The local provider, reached through a running deckvoice server.
///
/// Batch runs go through the server's resident model so only one model
/// instance ever occupies the accelerator.
pub struct ServiceTtsRepository {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl ServiceTtsRepository {
    /// Connect and require `/health` to report healthy before any synthesis.
    pub async fn connect(base_url: &str, remote: &RemoteConfig) -> Result<Self, SynthesisError> {
        let repository = Self {
            client: remote::build_client(remote)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::from(remote),
        };

        let health = repository.health().await?;
        if health.status != HealthStatus::Healthy {
            return Err(SynthesisError::ServiceUnavailable(format!(
                "TTS service at {} is unhealthy (device available: {})",
                repository.base_url, health.device_available
            )));
        }

        tracing::info!(
            url = %repository.base_url,
            model_loaded = health.model_loaded,
            "Connected to TTS service"
        );
        Ok(repository)
    }

    pub async fn health(&self) -> Result<HealthReport, SynthesisError> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(|e| remote::network_error(PROVIDER, e))?;

        // An unhealthy server still answers with a report, under a 503
        response.json::<HealthReport>().await.map_err(|e| {
            SynthesisError::ServiceUnavailable(format!("unreadable health report: {}", e))
        })
    }

    async fn generate(&self, request: &SynthesisRequest) -> Result<Vec<u8>, SynthesisError> {
        let payload = GenerateRequest {
            text: request.text.clone(),
            speaker_reference: request
                .speaker_reference
                .as_ref()
                .map(|p| p.display().to_string()),
            output_name_hint: None,
        };

        let response = self
            .client
            .post(format!("{}/generate", self.base_url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| remote::network_error(PROVIDER, e))?;

        let status = response.status();
        if status.is_success() {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| remote::network_error(PROVIDER, e))?;
            return Ok(bytes.to_vec());
        }

        let body = response.text().await.unwrap_or_default();
        Err(failure_to_error(status, &body))
    }
}

/// Rebuild the server's failure so callers see the same kind it reported.
fn failure_to_error(status: reqwest::StatusCode, body: &str) -> SynthesisError {
    let Ok(failure) = serde_json::from_str::<ServiceFailure>(body) else {
        return remote::status_error(PROVIDER, status, body);
    };

    let message = failure.error;
    match failure.error_kind {
        Some(ErrorKind::InvalidInput) => SynthesisError::InvalidInput(message),
        Some(ErrorKind::DeviceUnavailable) => SynthesisError::DeviceUnavailable(message),
        Some(ErrorKind::ModelLoad) => SynthesisError::ModelLoad(message),
        Some(ErrorKind::Inference) => SynthesisError::Inference(message),
        Some(ErrorKind::QueueFull) | Some(ErrorKind::ServiceUnavailable) => {
            SynthesisError::ServiceUnavailable(message)
        }
        _ => SynthesisError::provider(PROVIDER, Some(i64::from(status.as_u16())), message),
    }
}

#[async_trait]
impl TtsRepository for ServiceTtsRepository {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Local
    }

    async fn synthesize(
        &self,
        request: &SynthesisRequest,
        destination: &Path,
    ) -> Result<AudioArtifact, SynthesisError> {
        let start_time = std::time::Instant::now();

        let audio = self.retry.run(PROVIDER, || self.generate(request)).await?;
        let artifact =
            remote::write_audio(PROVIDER, destination, &audio, self.kind().audio_format()).await?;

        tracing::info!(
            provider = "local",
            url = %self.base_url,
            latency_ms = start_time.elapsed().as_millis() as u64,
            characters_count = request.text.chars().count(),
            audio_size_bytes = artifact.size_bytes,
            "TTS synthesis completed"
        );

        Ok(artifact)
    }
}
