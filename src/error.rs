use crate::domain::tts::{ErrorKind, GenerateFailure};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Main application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Synthesis(#[from] GenerateFailure),

    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),
}

/// Body for a failed `/generate`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureResponse {
    pub success: bool,
    pub task_id: Uuid,
    pub error: String,
    pub error_kind: ErrorKind,
}

/// Body for every other failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn status_for_kind(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::QueueFull | ErrorKind::ServiceUnavailable | ErrorKind::DeviceUnavailable => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Provider | ErrorKind::Network => StatusCode::BAD_GATEWAY,
        ErrorKind::ModelLoad | ErrorKind::Inference | ErrorKind::Io => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Synthesis(failure) => status_for_kind(failure.kind),
            Self::DeviceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match self {
            Self::Synthesis(failure) => {
                tracing::error!(
                    task_id = %failure.task_id,
                    error_kind = %failure.kind,
                    error = %failure.detail,
                    status = %status.as_u16(),
                    "Request failed"
                );
                let body = FailureResponse {
                    success: false,
                    task_id: failure.task_id,
                    error: failure.detail,
                    error_kind: failure.kind,
                };
                (status, Json(body)).into_response()
            }
            Self::DeviceUnavailable(detail) => {
                tracing::error!(error = %detail, status = %status.as_u16(), "Request failed");
                let body = ErrorResponse {
                    error: format!("Device unavailable: {}", detail),
                };
                (status, Json(body)).into_response()
            }
        }
    }
}

/// Custom result type for the application
pub type AppResult<T> = Result<T, AppError>;
