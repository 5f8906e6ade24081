use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::{
    domain::tts::{DeviceReport, HealthReport, HealthStatus, ServiceDescriptor, SynthesisService},
    error::{AppError, AppResult},
};

pub struct HealthController {
    service: Arc<SynthesisService>,
}

impl HealthController {
    pub fn new(service: Arc<SynthesisService>) -> Self {
        Self { service }
    }

    /// GET /health
    pub async fn health(
        State(controller): State<Arc<HealthController>>,
    ) -> (StatusCode, Json<HealthReport>) {
        let report = controller.service.health().await;
        let status = match report.status {
            HealthStatus::Healthy => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, Json(report))
    }

    /// GET /stats
    pub async fn stats(
        State(controller): State<Arc<HealthController>>,
    ) -> AppResult<Json<DeviceReport>> {
        controller
            .service
            .stats()
            .await
            .map(Json)
            .map_err(|e| AppError::DeviceUnavailable(e.to_string()))
    }

    /// GET /
    pub async fn index(State(controller): State<Arc<HealthController>>) -> Json<ServiceDescriptor> {
        Json(controller.service.descriptor())
    }
}
