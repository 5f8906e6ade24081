//! Plumbing shared by the HTTP providers.

use crate::domain::tts::{AudioArtifact, AudioFormat, SynthesisError};
use crate::infrastructure::config::RemoteConfig;
use reqwest::StatusCode;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl From<&RemoteConfig> for RetryPolicy {
    fn from(config: &RemoteConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff: config.retry_backoff,
        }
    }
}

impl RetryPolicy {
    /// Run `call`, retrying only transport failures. Backoff grows linearly per attempt.
    pub async fn run<T, F, Fut>(&self, provider: &'static str, call: F) -> Result<T, SynthesisError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, SynthesisError>>,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.backoff * attempt;
                    tracing::warn!(
                        provider = provider,
                        attempt = attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Remote TTS call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

pub fn build_client(config: &RemoteConfig) -> Result<reqwest::Client, SynthesisError> {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|e| SynthesisError::Network(format!("failed to build HTTP client: {}", e)))
}

/// Transport errors (connect, timeout, body read) are retryable network failures.
pub fn network_error(provider: &'static str, e: reqwest::Error) -> SynthesisError {
    SynthesisError::Network(format!("{} request failed: {}", provider, e))
}

/// Map a non-success HTTP status. 5xx and 429 are transient, everything else is the provider rejecting us.
pub fn status_error(provider: &'static str, status: StatusCode, body: &str) -> SynthesisError {
    let body: String = body.chars().take(300).collect();
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        SynthesisError::Network(format!("{} returned HTTP {}: {}", provider, status, body))
    } else {
        SynthesisError::provider(
            provider,
            Some(i64::from(status.as_u16())),
            format!("HTTP {}: {}", status, body),
        )
    }
}

pub async fn write_audio(
    provider: &'static str,
    destination: &Path,
    bytes: &[u8],
    format: AudioFormat,
) -> Result<AudioArtifact, SynthesisError> {
    if bytes.is_empty() {
        return Err(SynthesisError::provider(provider, None, "returned no audio"));
    }

    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(destination, bytes).await?;

    Ok(AudioArtifact {
        path: destination.to_path_buf(),
        format,
        size_bytes: bytes.len() as u64,
    })
}
