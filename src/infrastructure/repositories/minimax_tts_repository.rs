use super::remote::{self, RetryPolicy};
use super::text_batches::split_into_batches;
use super::tts_repository::TtsRepository;
use crate::domain::tts::{AudioArtifact, ProviderKind, SynthesisError, SynthesisRequest};
use crate::infrastructure::config::{MiniMaxConfig, RemoteConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

const PROVIDER: &str = "minimax";

/// MiniMax rejects requests above 10k characters
const MAX_BATCH_SIZE: usize = 10_000;

#[derive(Debug, Serialize)]
struct T2aRequest<'a> {
    text: &'a str,
    model: &'a str,
    voice_setting: VoiceSetting<'a>,
}

#[derive(Debug, Serialize)]
struct VoiceSetting<'a> {
    voice_id: &'a str,
    speed: f32,
}

#[derive(Debug, Deserialize)]
struct T2aResponse {
    #[serde(default)]
    data: Option<T2aData>,
    #[serde(default)]
    base_resp: Option<BaseResp>,
}

#[derive(Debug, Deserialize)]
struct T2aData {
    #[serde(default)]
    audio: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BaseResp {
    status_code: i64,
    #[serde(default)]
    status_msg: Option<String>,
}

/// MiniMax t2a v2: bearer token auth, MP3 returned inline as hex.
pub struct MiniMaxTtsRepository {
    client: reqwest::Client,
    group_id: String,
    access_token: String,
    voice_id: String,
    model: String,
    base_url: String,
    speed: f32,
    retry: RetryPolicy,
}

impl MiniMaxTtsRepository {
    pub fn new(config: &MiniMaxConfig, remote: &RemoteConfig) -> Result<Self, SynthesisError> {
        let (Some(group_id), Some(access_token)) = (&config.group_id, &config.access_token) else {
            return Err(SynthesisError::InvalidInput(
                "MiniMax requires a group id and an access token".to_string(),
            ));
        };

        Ok(Self {
            client: remote::build_client(remote)?,
            group_id: group_id.clone(),
            access_token: access_token.clone(),
            voice_id: config.voice_id.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            speed: config.speed,
            retry: RetryPolicy::from(remote),
        })
    }

    /// Call the t2a endpoint for a single text batch
    async fn call_minimax(&self, text: &str) -> Result<Vec<u8>, SynthesisError> {
        tracing::info!(
            model = %self.model,
            voice = %self.voice_id,
            text_length = text.chars().count(),
            text_preview = %text.chars().take(50).collect::<String>(),
            "Calling MiniMax TTS API"
        );

        let payload = T2aRequest {
            text,
            model: &self.model,
            voice_setting: VoiceSetting {
                voice_id: &self.voice_id,
                speed: self.speed,
            },
        };

        let response = self
            .client
            .post(format!("{}/v1/t2a_v2", self.base_url))
            .query(&[("GroupId", self.group_id.as_str())])
            .bearer_auth(&self.access_token)
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

        decode_response(&body)
    }
}

/// Check the status envelope, then decode the hex payload.
fn decode_response(body: &str) -> Result<Vec<u8>, SynthesisError> {
    let response: T2aResponse = serde_json::from_str(body)
        .map_err(|e| SynthesisError::provider(PROVIDER, None, format!("malformed response: {}", e)))?;

    let base = response.base_resp.ok_or_else(|| {
        SynthesisError::provider(PROVIDER, None, "response has no base_resp envelope")
    })?;

    if base.status_code != 0 {
        let message = base.status_msg.unwrap_or_else(|| "Unknown error".to_string());
        tracing::error!(code = base.status_code, message = %message, "MiniMax API error");
        return Err(SynthesisError::provider(
            PROVIDER,
            Some(base.status_code),
            format!("code {} - {}", base.status_code, message),
        ));
    }

    let audio = response
        .data
        .and_then(|d| d.audio)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| SynthesisError::provider(PROVIDER, None, "no audio in data field"))?;

    hex::decode(audio.trim())
        .map_err(|e| SynthesisError::provider(PROVIDER, None, format!("audio is not valid hex: {}", e)))
}

#[async_trait]
impl TtsRepository for MiniMaxTtsRepository {
    fn kind(&self) -> ProviderKind {
        ProviderKind::MiniMax
    }

    async fn synthesize(
        &self,
        request: &SynthesisRequest,
        destination: &Path,
    ) -> Result<AudioArtifact, SynthesisError> {
        let start_time = std::time::Instant::now();
        let batches = split_into_batches(&request.text, MAX_BATCH_SIZE);

        let mut merged_audio = Vec::new();
        for (index, batch) in batches.iter().enumerate() {
            let audio = self
                .retry
                .run(PROVIDER, || self.call_minimax(batch))
                .await?;
            merged_audio.extend(audio);

            tracing::debug!(
                batch_index = index,
                total_audio_size = merged_audio.len(),
                "Batch synthesized and merged"
            );
        }

        let artifact =
            remote::write_audio(PROVIDER, destination, &merged_audio, self.kind().audio_format())
                .await?;

        tracing::info!(
            provider = PROVIDER,
            model = %self.model,
            voice = %self.voice_id,
            latency_ms = start_time.elapsed().as_millis() as u64,
            characters_count = request.text.chars().count(),
            batch_count = batches.len(),
            audio_size_bytes = artifact.size_bytes,
            "TTS synthesis completed"
        );

        Ok(artifact)
    }
}
