use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Request for POST /generate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub text: String,
    #[serde(default, alias = "speaker_wav", skip_serializing_if = "Option::is_none")]
    pub speaker_reference: Option<String>,
    #[serde(default, alias = "output_filename", skip_serializing_if = "Option::is_none")]
    pub output_name_hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Response for GET /health
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: HealthStatus,
    pub model_loaded: bool,
    pub device_available: bool,
    #[serde(
        rename = "deviceMemoryUsedGB",
        skip_serializing_if = "Option::is_none"
    )]
    pub device_memory_used_gb: Option<f64>,
}

/// Response for GET /stats when an accelerator is present
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceReport {
    #[serde(rename = "deviceName")]
    pub device_name: String,
    #[serde(rename = "totalMemoryGB")]
    pub total_memory_gb: f64,
    #[serde(rename = "allocatedMemoryGB")]
    pub allocated_memory_gb: f64,
    #[serde(rename = "availableMemoryGB")]
    pub available_memory_gb: f64,
    #[serde(rename = "modelLoaded")]
    pub model_loaded: bool,
}

/// Response for GET /
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub service: String,
    pub version: String,
    pub status: String,
    pub provider: String,
    pub endpoints: BTreeMap<String, String>,
}
