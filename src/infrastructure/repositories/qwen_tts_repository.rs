use super::remote::{self, RetryPolicy};
use super::tts_repository::TtsRepository;
use crate::domain::tts::{AudioArtifact, ProviderKind, SynthesisError, SynthesisRequest};
use crate::infrastructure::config::{QwenConfig, RemoteConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

const PROVIDER: &str = "qwen";
const GENERATION_PATH: &str = "/api/v1/services/aigc/multimodal-generation/generation";

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    input: GenerationInput<'a>,
}

#[derive(Debug, Serialize)]
struct GenerationInput<'a> {
    text: &'a str,
    voice: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    output: Option<GenerationOutput>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerationOutput {
    #[serde(default)]
    audio: Option<AudioLocation>,
}

#[derive(Debug, Deserialize)]
struct AudioLocation {
    #[serde(default)]
    url: Option<String>,
}

/// Qwen TTS on DashScope. Two round trips: generation returns a URL, then the WAV is downloaded.
pub struct QwenTtsRepository {
    client: reqwest::Client,
    api_key: String,
    model: String,
    voice_id: String,
    base_url: String,
    retry: RetryPolicy,
}

impl QwenTtsRepository {
    pub fn new(config: &QwenConfig, remote: &RemoteConfig) -> Result<Self, SynthesisError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            SynthesisError::InvalidInput("Qwen requires an API key".to_string())
        })?;

        Ok(Self {
            client: remote::build_client(remote)?,
            api_key,
            model: config.model.clone(),
            voice_id: config.voice_id.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::from(remote),
        })
    }

    async fn request_audio_url(&self, text: &str) -> Result<String, SynthesisError> {
        tracing::info!(
            model = %self.model,
            voice = %self.voice_id,
            text_length = text.chars().count(),
            text_preview = %text.chars().take(50).collect::<String>(),
            "Calling Qwen TTS API"
        );

        let payload = GenerationRequest {
            model: &self.model,
            input: GenerationInput {
                text,
                voice: &self.voice_id,
            },
        };

        let response = self
            .client
            .post(format!("{}{}", self.base_url, GENERATION_PATH))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| remote::network_error(PROVIDER, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| remote::network_error(PROVIDER, e))?;

        if !status.is_success() {
            return Err(remote::status_error(PROVIDER, status, &body));
        }

        let url = extract_audio_url(&body)?;
        tracing::debug!(audio_url = %url, "Qwen TTS audio URL received");
        Ok(url)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, SynthesisError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| remote::network_error(PROVIDER, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(remote::status_error(PROVIDER, status, &body));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| remote::network_error(PROVIDER, e))?;
        Ok(bytes.to_vec())
    }
}

fn extract_audio_url(body: &str) -> Result<String, SynthesisError> {
    let response: GenerationResponse = serde_json::from_str(body)
        .map_err(|e| SynthesisError::provider(PROVIDER, None, format!("malformed response: {}", e)))?;

    if let Some(code) = response.code.filter(|c| !c.is_empty()) {
        let message = response.message.unwrap_or_default();
        return Err(SynthesisError::provider(
            PROVIDER,
            None,
            format!("{}: {}", code, message),
        ));
    }

    response
        .output
        .and_then(|o| o.audio)
        .and_then(|a| a.url)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| SynthesisError::provider(PROVIDER, None, "response has no audio url"))
}

#[async_trait]
impl TtsRepository for QwenTtsRepository {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Qwen
    }

    async fn synthesize(
        &self,
        request: &SynthesisRequest,
        destination: &Path,
    ) -> Result<AudioArtifact, SynthesisError> {
        let start_time = std::time::Instant::now();

        let url = self
            .retry
            .run(PROVIDER, || self.request_audio_url(&request.text))
            .await?;
        let audio = self.retry.run(PROVIDER, || self.download(&url)).await?;

        let artifact =
            remote::write_audio(PROVIDER, destination, &audio, self.kind().audio_format()).await?;

        tracing::info!(
            provider = PROVIDER,
            model = %self.model,
            voice = %self.voice_id,
            latency_ms = start_time.elapsed().as_millis() as u64,
            characters_count = request.text.chars().count(),
            audio_size_bytes = artifact.size_bytes,
            "TTS synthesis completed"
        );

        Ok(artifact)
    }
}
