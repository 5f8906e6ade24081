use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Stable, serializable tag for every synthesis failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DeviceUnavailable,
    ModelLoad,
    Inference,
    Provider,
    Network,
    InvalidInput,
    Timeout,
    QueueFull,
    ServiceUnavailable,
    Io,
}

impl ErrorKind {
    /// Same names as the serde rename; kept as `&'static str` for log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::DeviceUnavailable => "device_unavailable",
            ErrorKind::ModelLoad => "model_load",
            ErrorKind::Inference => "inference",
            ErrorKind::Provider => "provider",
            ErrorKind::Network => "network",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Timeout => "timeout",
            ErrorKind::QueueFull => "queue_full",
            ErrorKind::ServiceUnavailable => "service_unavailable",
            ErrorKind::Io => "io",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("model load failed: {0}")]
    ModelLoad(String),

    #[error("inference failed: {0}")]
    Inference(String),

    /// The provider answered, but with a non-success envelope or a payload we cannot use.
    #[error("{provider} error: {message}")]
    Provider {
        provider: &'static str,
        code: Option<i64>,
        message: String,
    },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("synthesis timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("synthesis queue is full ({0} requests already pending)")]
    QueueFull(usize),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SynthesisError {
    pub fn provider(provider: &'static str, code: Option<i64>, message: impl Into<String>) -> Self {
        SynthesisError::Provider {
            provider,
            code,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SynthesisError::DeviceUnavailable(_) => ErrorKind::DeviceUnavailable,
            SynthesisError::ModelLoad(_) => ErrorKind::ModelLoad,
            SynthesisError::Inference(_) => ErrorKind::Inference,
            SynthesisError::Provider { .. } => ErrorKind::Provider,
            SynthesisError::Network(_) => ErrorKind::Network,
            SynthesisError::InvalidInput(_) => ErrorKind::InvalidInput,
            SynthesisError::Timeout(_) => ErrorKind::Timeout,
            SynthesisError::QueueFull(_) => ErrorKind::QueueFull,
            SynthesisError::ServiceUnavailable(_) => ErrorKind::ServiceUnavailable,
            SynthesisError::Io(_) => ErrorKind::Io,
        }
    }

    /// Only transport-level failures are safe to retry: synthesis has no side effects
    /// beyond its output, but a provider rejection will not change on a second attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SynthesisError::Network(_))
    }
}
