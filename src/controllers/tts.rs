use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    Json,
};
use std::sync::Arc;

use crate::{
    domain::tts::{GenerateFailure, GenerateRequest, SynthesisError, SynthesisService},
    error::AppResult,
};

pub const X_TASK_ID: HeaderName = HeaderName::from_static("x-task-id");
pub const X_PROCESSING_TIME: HeaderName = HeaderName::from_static("x-processing-time");

pub struct TtsController {
    service: Arc<SynthesisService>,
}

impl TtsController {
    pub fn new(service: Arc<SynthesisService>) -> Self {
        Self { service }
    }

    /// POST /generate - Synthesize text and stream the audio back
    pub async fn generate(
        State(controller): State<Arc<TtsController>>,
        payload: Result<Json<GenerateRequest>, JsonRejection>,
    ) -> AppResult<(StatusCode, HeaderMap, Body)> {
        let Json(request) = payload.map_err(|rejection| {
            GenerateFailure::rejected(&SynthesisError::InvalidInput(rejection.body_text()))
        })?;

        let audio = controller.service.generate(request).await?;

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(audio.format.content_type()),
        );
        if let Ok(value) = HeaderValue::from_str(&audio.task_id.to_string()) {
            headers.insert(X_TASK_ID, value);
        }
        if let Ok(value) = HeaderValue::from_str(&format!("{:.3}", audio.elapsed.as_secs_f64())) {
            headers.insert(X_PROCESSING_TIME, value);
        }
        if let Some(name) = &audio.file_name {
            if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", name)) {
                headers.insert(header::CONTENT_DISPOSITION, value);
            }
        }

        Ok((StatusCode::OK, headers, Body::from(audio.bytes)))
    }
}
