use super::dispatcher::ProviderDispatcher;
use super::dto::{DeviceReport, GenerateRequest, HealthReport, HealthStatus, ServiceDescriptor};
use super::error::{ErrorKind, SynthesisError};
use super::model::{AudioFormat, ProviderKind, SynthesisOutcome, SynthesisRequest};
use super::text::normalize_text;
use crate::infrastructure::config::Config;
use crate::infrastructure::device::Device;
use crate::infrastructure::model::ModelResidency;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Lifecycle of the service process.
///
/// `Serving` is not stored: it is `Ready` with at least one request in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Starting,
    Ready,
    Serving,
    Stopping,
    Stopped,
}

impl ServiceState {
    fn as_str(&self) -> &'static str {
        match self {
            ServiceState::Starting => "starting",
            ServiceState::Ready => "ready",
            ServiceState::Serving => "serving",
            ServiceState::Stopping => "stopping",
            ServiceState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const STARTING: u8 = 0;
const READY: u8 = 1;
const STOPPING: u8 = 2;
const STOPPED: u8 = 3;

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub provider: ProviderKind,
    pub device: Device,
    pub scratch_dir: PathBuf,
    pub max_text_chars: usize,
    pub eager_load: bool,
}

impl From<&Config> for ServiceSettings {
    fn from(config: &Config) -> Self {
        Self {
            provider: config.provider,
            device: config.local.device,
            scratch_dir: config.scratch_dir.clone(),
            max_text_chars: config.max_text_chars,
            eager_load: config.local.eager_load,
        }
    }
}

/// Audio produced for one `/generate` call. The scratch file is already gone.
#[derive(Debug, Clone)]
pub struct GeneratedAudio {
    pub task_id: Uuid,
    pub bytes: Vec<u8>,
    pub format: AudioFormat,
    pub elapsed: Duration,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{detail}")]
pub struct GenerateFailure {
    pub task_id: Uuid,
    pub kind: ErrorKind,
    pub detail: String,
    pub elapsed: Duration,
}

impl GenerateFailure {
    fn new(task_id: Uuid, error: &SynthesisError, started: Instant) -> Self {
        Self {
            task_id,
            kind: error.kind(),
            detail: error.to_string(),
            elapsed: started.elapsed(),
        }
    }

    /// A request refused before it reached the service (e.g. an unreadable body).
    pub fn rejected(error: &SynthesisError) -> Self {
        Self::new(Uuid::new_v4(), error, Instant::now())
    }
}

/// Deletes the request's scratch file on every exit path.
struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Scratch file removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove scratch file"),
        }
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The service front end: request validation, scratch handling, health and lifecycle.
pub struct SynthesisService {
    dispatcher: ProviderDispatcher,
    residency: Arc<ModelResidency>,
    settings: ServiceSettings,
    state: AtomicU8,
    in_flight: AtomicUsize,
}

impl SynthesisService {
    pub fn new(
        dispatcher: ProviderDispatcher,
        residency: Arc<ModelResidency>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            dispatcher,
            residency,
            settings,
            state: AtomicU8::new(STARTING),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn state(&self) -> ServiceState {
        match self.state.load(Ordering::SeqCst) {
            STARTING => ServiceState::Starting,
            READY if self.in_flight.load(Ordering::SeqCst) > 0 => ServiceState::Serving,
            READY => ServiceState::Ready,
            STOPPING => ServiceState::Stopping,
            _ => ServiceState::Stopped,
        }
    }

    pub fn provider(&self) -> ProviderKind {
        self.settings.provider
    }

    fn is_accepting(&self) -> bool {
        self.state.load(Ordering::SeqCst) == READY
    }

    /// Prepare the scratch directory and optionally load the model, then accept requests.
    ///
    /// An eager load that fails is logged, not fatal: the next request retries the load.
    pub async fn start(&self) -> Result<(), SynthesisError> {
        tokio::fs::create_dir_all(&self.settings.scratch_dir).await?;

        if self.settings.eager_load && self.settings.provider == ProviderKind::Local {
            tracing::info!(device = %self.settings.device, "Eager-loading speech model");
            if let Err(e) = self.residency.acquire(&self.settings.device).await {
                tracing::error!(error = %e, "Eager model load failed; will retry on first request");
            }
        }

        self.state.store(READY, Ordering::SeqCst);
        tracing::info!(
            provider = %self.settings.provider,
            scratch_dir = %self.settings.scratch_dir.display(),
            "Synthesis service ready"
        );
        Ok(())
    }

    pub async fn generate(&self, request: GenerateRequest) -> Result<GeneratedAudio, GenerateFailure> {
        let task_id = Uuid::new_v4();
        let started = Instant::now();

        if !self.is_accepting() {
            let err = SynthesisError::ServiceUnavailable(format!("service is {}", self.state()));
            return Err(GenerateFailure::new(task_id, &err, started));
        }
        let _in_flight = InFlight::enter(&self.in_flight);

        let text = self
            .validate_text(&request.text)
            .map_err(|e| GenerateFailure::new(task_id, &e, started))?;

        tracing::info!(
            task_id = %task_id,
            provider = %self.settings.provider,
            text_length = text.chars().count(),
            "Synthesis request received"
        );

        let format = self.settings.provider.audio_format();
        let scratch = ScratchFile {
            path: self
                .settings
                .scratch_dir
                .join(format!("{}.{}", task_id, format.extension())),
        };

        let synthesis_request = SynthesisRequest::new(text, self.settings.provider)
            .with_speaker_reference(
                request
                    .speaker_reference
                    .filter(|s| !s.trim().is_empty())
                    .map(PathBuf::from),
            )
            .with_output_name_hint(request.output_name_hint.clone());

        let result = self
            .dispatcher
            .dispatch(task_id, &synthesis_request, scratch.path())
            .await;

        if let SynthesisOutcome::Failed(failure) = result.outcome {
            return Err(GenerateFailure {
                task_id,
                kind: failure.kind,
                detail: failure.detail,
                elapsed: started.elapsed(),
            });
        }

        let bytes = tokio::fs::read(scratch.path())
            .await
            .map_err(|e| GenerateFailure::new(task_id, &SynthesisError::Io(e), started))?;
        drop(scratch);

        let elapsed = started.elapsed();
        tracing::info!(
            task_id = %task_id,
            provider = %self.settings.provider,
            audio_size_bytes = bytes.len(),
            latency_ms = elapsed.as_millis() as u64,
            "Synthesis request completed"
        );

        Ok(GeneratedAudio {
            task_id,
            bytes,
            format,
            elapsed,
            file_name: request
                .output_name_hint
                .as_deref()
                .and_then(|hint| attachment_name(hint, format)),
        })
    }

    fn validate_text(&self, text: &str) -> Result<String, SynthesisError> {
        let normalized = normalize_text(text);
        if normalized.is_empty() {
            return Err(SynthesisError::InvalidInput("text cannot be empty".to_string()));
        }

        let length = normalized.chars().count();
        if length > self.settings.max_text_chars {
            return Err(SynthesisError::InvalidInput(format!(
                "text must be {} characters or less (got {})",
                self.settings.max_text_chars, length
            )));
        }

        Ok(normalized)
    }

    pub async fn health(&self) -> HealthReport {
        let device = self.settings.device;
        let stats = self.residency.probe().stats(&device).await;
        // The CPU is always there; an accelerator is there when it can be queried
        let device_available = match device {
            Device::Cpu => true,
            Device::Cuda(_) => stats.is_some(),
        };

        let uses_device = self.settings.provider == ProviderKind::Local;
        let healthy = self.is_accepting() && (!uses_device || device_available);

        HealthReport {
            status: if healthy {
                HealthStatus::Healthy
            } else {
                HealthStatus::Unhealthy
            },
            model_loaded: self.residency.is_loaded(),
            device_available,
            device_memory_used_gb: stats.map(|s| s.used_gb()),
        }
    }

    pub async fn stats(&self) -> Result<DeviceReport, SynthesisError> {
        let device = self.settings.device;
        let stats = self
            .residency
            .probe()
            .stats(&device)
            .await
            .ok_or_else(|| SynthesisError::DeviceUnavailable(format!("no accelerator at {}", device)))?;

        Ok(DeviceReport {
            device_name: stats.name.clone(),
            total_memory_gb: stats.total_gb(),
            allocated_memory_gb: stats.used_gb(),
            available_memory_gb: stats.available_gb(),
            model_loaded: self.residency.is_loaded(),
        })
    }

    pub fn descriptor(&self) -> ServiceDescriptor {
        let endpoints = [
            ("generate", "POST /generate"),
            ("health", "GET /health"),
            ("stats", "GET /stats"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect::<BTreeMap<_, _>>();

        ServiceDescriptor {
            service: "deckvoice".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            status: self.state().to_string(),
            provider: self.settings.provider.to_string(),
            endpoints,
        }
    }

    /// Stop accepting requests and free the model's device memory.
    pub async fn shutdown(&self) {
        self.state.store(STOPPING, Ordering::SeqCst);
        tracing::info!(in_flight = self.in_flight.load(Ordering::SeqCst), "Synthesis service stopping");

        self.residency.release().await;

        self.state.store(STOPPED, Ordering::SeqCst);
        tracing::info!("Synthesis service stopped");
    }
}

/// Client-facing file name from an output hint: no directories, provider extension.
fn attachment_name(hint: &str, format: AudioFormat) -> Option<String> {
    let name = Path::new(hint.trim()).file_name()?.to_str()?;
    let stem = Path::new(name).file_stem()?.to_str()?;
    let stem: String = stem
        .chars()
        .filter(|c| !c.is_control() && *c != '"')
        .collect();
    if stem.is_empty() {
        return None;
    }
    Some(format!("{}.{}", stem, format.extension()))
}
