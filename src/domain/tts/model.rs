use super::error::{ErrorKind, SynthesisError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// The closed set of synthesis backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Resident model on a local accelerator
    Local,
    /// MiniMax t2a API (token auth, hex audio inline)
    MiniMax,
    /// Qwen TTS on DashScope (API key auth, audio behind a download URL)
    Qwen,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Local => "local",
            ProviderKind::MiniMax => "minimax",
            ProviderKind::Qwen => "qwen",
        }
    }

    pub fn is_remote(&self) -> bool {
        !matches!(self, ProviderKind::Local)
    }

    pub fn audio_format(&self) -> AudioFormat {
        match self {
            ProviderKind::Local | ProviderKind::Qwen => AudioFormat::Wav,
            ProviderKind::MiniMax => AudioFormat::Mp3,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "coqui" => Ok(ProviderKind::Local),
            "minimax" | "providera" | "provider-a" => Ok(ProviderKind::MiniMax),
            "qwen" | "providerb" | "provider-b" => Ok(ProviderKind::Qwen),
            other => Err(format!("Unknown TTS provider: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Wav,
    Mp3,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Mp3 => "audio/mpeg",
        }
    }
}

/// One text-to-speech job. Immutable once built.
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub text: String,
    pub speaker_reference: Option<PathBuf>,
    pub output_name_hint: Option<String>,
    pub provider: ProviderKind,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>, provider: ProviderKind) -> Self {
        Self {
            text: text.into(),
            speaker_reference: None,
            output_name_hint: None,
            provider,
        }
    }

    pub fn with_speaker_reference(mut self, path: Option<PathBuf>) -> Self {
        self.speaker_reference = path;
        self
    }

    pub fn with_output_name_hint(mut self, hint: Option<String>) -> Self {
        self.output_name_hint = hint;
        self
    }
}

/// Audio written to disk by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioArtifact {
    pub path: PathBuf,
    pub format: AudioFormat,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SynthesisFailure {
    pub kind: ErrorKind,
    pub detail: String,
}

impl From<&SynthesisError> for SynthesisFailure {
    fn from(err: &SynthesisError) -> Self {
        Self {
            kind: err.kind(),
            detail: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisOutcome {
    Succeeded(AudioArtifact),
    Failed(SynthesisFailure),
}

/// Uniform result shape returned by the dispatcher for every provider.
#[derive(Debug, Clone)]
pub struct SynthesisResult {
    pub task_id: Uuid,
    pub provider: ProviderKind,
    pub elapsed: Duration,
    pub outcome: SynthesisOutcome,
}

impl SynthesisResult {
    pub fn succeeded(
        task_id: Uuid,
        provider: ProviderKind,
        artifact: AudioArtifact,
        elapsed: Duration,
    ) -> Self {
        Self {
            task_id,
            provider,
            elapsed,
            outcome: SynthesisOutcome::Succeeded(artifact),
        }
    }

    pub fn failed(
        task_id: Uuid,
        provider: ProviderKind,
        error: &SynthesisError,
        elapsed: Duration,
    ) -> Self {
        Self {
            task_id,
            provider,
            elapsed,
            outcome: SynthesisOutcome::Failed(SynthesisFailure::from(error)),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, SynthesisOutcome::Succeeded(_))
    }

    pub fn artifact(&self) -> Option<&AudioArtifact> {
        match &self.outcome {
            SynthesisOutcome::Succeeded(artifact) => Some(artifact),
            SynthesisOutcome::Failed(_) => None,
        }
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.artifact().map(|a| a.path.as_path())
    }

    pub fn failure(&self) -> Option<&SynthesisFailure> {
        match &self.outcome {
            SynthesisOutcome::Succeeded(_) => None,
            SynthesisOutcome::Failed(failure) => Some(failure),
        }
    }
}
