use super::ModelHandle;
use crate::domain::tts::{AudioArtifact, AudioFormat, SynthesisError};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;

/// Runs inference against the resident model, one call at a time per device.
///
/// Admission is bounded: at most `queue_capacity` calls may be waiting or running.
/// A call that exceeds `timeout` is reported as failed, but the device stays held
/// until the underlying model call actually returns.
pub struct SynthesisExecutor {
    admission: Arc<Semaphore>,
    queue_capacity: usize,
    device_lock: Arc<Semaphore>,
    default_voice: Option<PathBuf>,
    timeout: Duration,
}

impl SynthesisExecutor {
    pub fn new(queue_capacity: usize, timeout: Duration, default_voice: Option<PathBuf>) -> Self {
        let queue_capacity = queue_capacity.max(1);
        Self {
            admission: Arc::new(Semaphore::new(queue_capacity)),
            queue_capacity,
            device_lock: Arc::new(Semaphore::new(1)),
            default_voice,
            timeout,
        }
    }

    /// Number of calls currently waiting for or holding the device.
    pub fn pending(&self) -> usize {
        self.queue_capacity - self.admission.available_permits()
    }

    pub async fn synthesize(
        &self,
        handle: &ModelHandle,
        text: &str,
        voice_reference: Option<&Path>,
        destination: &Path,
    ) -> Result<AudioArtifact, SynthesisError> {
        let admitted = self
            .admission
            .clone()
            .try_acquire_owned()
            .map_err(|_| SynthesisError::QueueFull(self.queue_capacity))?;

        let deadline = Instant::now() + self.timeout;
        let voice = self.resolve_voice(voice_reference).await;

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let permit = match tokio::time::timeout_at(deadline, self.device_lock.clone().acquire_owned()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => {
                return Err(SynthesisError::ServiceUnavailable(
                    "device lock closed".to_string(),
                ))
            }
            Err(_) => {
                tracing::warn!(timeout_secs = self.timeout.as_secs(), "Timed out waiting for device");
                return Err(SynthesisError::Timeout(self.timeout));
            }
        };

        tracing::info!(
            device = %handle.device(),
            text_length = text.chars().count(),
            text_preview = %preview(text),
            voice = ?voice,
            "Generating audio on device"
        );

        let mut abandon = AbandonGuard::new();
        let task = {
            let model = handle.model().clone();
            let text = text.to_string();
            let output = destination.to_path_buf();
            let abandoned = abandon.flag();

            // Both permits travel with the blocking call so a dropped caller
            // cannot free the device or its queue slot early.
            tokio::task::spawn_blocking(move || {
                let _admitted = admitted;
                let _permit = permit;
                model.clear_transient();
                let result = model.synthesize_to_file(&text, voice.as_deref(), &output);
                model.clear_transient();
                if abandoned.load(Ordering::SeqCst) {
                    let _ = std::fs::remove_file(&output);
                }
                result
            })
        };

        let outcome = match tokio::time::timeout_at(deadline, task).await {
            Ok(Ok(Ok(()))) => {
                abandon.disarm();
                Ok(())
            }
            Ok(Ok(Err(message))) => Err(SynthesisError::Inference(message)),
            Ok(Err(join_error)) => Err(SynthesisError::Inference(format!(
                "inference task failed: {}",
                join_error
            ))),
            Err(_) => {
                // Flag before the cleanup below, not at scope end.
                drop(abandon);
                tracing::warn!(
                    timeout_secs = self.timeout.as_secs(),
                    "Inference timed out; device stays busy until the call returns"
                );
                Err(SynthesisError::Timeout(self.timeout))
            }
        };

        let artifact = match outcome {
            Ok(()) => verify_output(destination).await,
            Err(e) => Err(e),
        };

        if let Err(e) = &artifact {
            tracing::error!(error = %e, destination = %destination.display(), "Local synthesis failed");
            remove_if_exists(destination).await;
        }

        artifact
    }

    /// Caller reference if readable, else the configured default, else the model's own voice.
    async fn resolve_voice(&self, requested: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = requested {
            if is_file(path).await {
                return Some(path.to_path_buf());
            }
            tracing::warn!(path = %path.display(), "Reference voice not readable, falling back");
        }

        if let Some(path) = &self.default_voice {
            if is_file(path).await {
                return Some(path.clone());
            }
        }

        tracing::info!("Using the model's built-in voice");
        None
    }
}

/// Marks the blocking call abandoned unless disarmed, so its output is removed
/// when the caller times out, fails, or is dropped mid-inference.
struct AbandonGuard {
    flag: Arc<AtomicBool>,
    armed: bool,
}

impl AbandonGuard {
    fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            armed: true,
        }
    }

    fn flag(&self) -> Arc<AtomicBool> {
        self.flag.clone()
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for AbandonGuard {
    fn drop(&mut self) {
        if self.armed {
            self.flag.store(true, Ordering::SeqCst);
        }
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

async fn verify_output(path: &Path) -> Result<AudioArtifact, SynthesisError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|_| SynthesisError::Inference("model reported success but wrote no file".into()))?;

    if metadata.len() == 0 {
        return Err(SynthesisError::Inference("model produced an empty file".into()));
    }

    Ok(AudioArtifact {
        path: path.to_path_buf(),
        format: AudioFormat::Wav,
        size_bytes: metadata.len(),
    })
}

pub(crate) async fn remove_if_exists(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove output"),
    }
}

fn preview(text: &str) -> String {
    text.chars().take(50).collect()
}
