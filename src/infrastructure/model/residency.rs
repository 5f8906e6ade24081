use super::{ModelLoader, SpeechModel};
use crate::domain::tts::SynthesisError;
use crate::infrastructure::device::{gb_to_bytes, to_gb, Device, DeviceProbe};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// The loaded model pinned to a device. Cheap to clone.
#[derive(Clone)]
pub struct ModelHandle {
    device: Device,
    loaded_at: DateTime<Utc>,
    load_duration: Duration,
    model: Arc<dyn SpeechModel>,
}

impl ModelHandle {
    pub fn device(&self) -> Device {
        self.device
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn load_duration(&self) -> Duration {
        self.load_duration
    }

    pub(crate) fn model(&self) -> &Arc<dyn SpeechModel> {
        &self.model
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("device", &self.device)
            .field("loaded_at", &self.loaded_at)
            .field("load_duration", &self.load_duration)
            .finish_non_exhaustive()
    }
}

/// Owns the process-wide model handle.
///
/// The first `acquire` for a device pays for the load; every later call for the
/// same device returns the cached handle without touching the loader or the device.
/// Concurrent first calls are serialized on the slot lock, so the loader runs once.
pub struct ModelResidency {
    loader: Arc<dyn ModelLoader>,
    probe: Arc<dyn DeviceProbe>,
    min_free_bytes: u64,
    slot: Mutex<Option<ModelHandle>>,
    loaded: AtomicBool,
    loads: AtomicUsize,
}

impl ModelResidency {
    pub fn new(loader: Arc<dyn ModelLoader>, probe: Arc<dyn DeviceProbe>, min_free_gb: f64) -> Self {
        Self {
            loader,
            probe,
            min_free_bytes: gb_to_bytes(min_free_gb),
            slot: Mutex::new(None),
            loaded: AtomicBool::new(false),
            loads: AtomicUsize::new(0),
        }
    }

    pub async fn acquire(&self, device: &Device) -> Result<ModelHandle, SynthesisError> {
        let mut slot = self.slot.lock().await;

        if let Some(handle) = slot.as_ref() {
            if handle.device == *device {
                tracing::debug!(device = %device, "Model already resident, reusing handle");
                return Ok(handle.clone());
            }

            tracing::info!(
                from = %handle.device,
                to = %device,
                "Model resident on another device, releasing before reload"
            );
            handle.model.release();
            *slot = None;
            self.loaded.store(false, Ordering::SeqCst);
        }

        self.check_device(device).await?;

        tracing::info!(
            device = %device,
            model = self.loader.model_name(),
            "Loading speech model (first use on this device)"
        );

        let loader = self.loader.clone();
        let target = *device;
        let started = Instant::now();

        let model = tokio::task::spawn_blocking(move || loader.load(&target))
            .await
            .map_err(|e| SynthesisError::ModelLoad(format!("loader task failed: {}", e)))?
            .map_err(|e| {
                tracing::error!(device = %device, error = %e, "Speech model load failed");
                SynthesisError::ModelLoad(e)
            })?;

        let handle = ModelHandle {
            device: *device,
            loaded_at: Utc::now(),
            load_duration: started.elapsed(),
            model,
        };

        self.loads.fetch_add(1, Ordering::SeqCst);
        self.loaded.store(true, Ordering::SeqCst);

        tracing::info!(
            device = %device,
            load_secs = %format!("{:.1}", handle.load_duration.as_secs_f64()),
            "Speech model loaded and kept resident"
        );

        *slot = Some(handle.clone());
        Ok(handle)
    }

    /// Fail fast before loading: the device must exist and have enough free memory.
    async fn check_device(&self, device: &Device) -> Result<(), SynthesisError> {
        if !device.is_accelerator() {
            return Ok(());
        }

        let stats = self.probe.stats(device).await.ok_or_else(|| {
            SynthesisError::DeviceUnavailable(format!("{} is not present", device))
        })?;

        tracing::info!(
            device = %device,
            name = %stats.name,
            total_gb = stats.total_gb(),
            used_gb = stats.used_gb(),
            available_gb = stats.available_gb(),
            "Accelerator found"
        );

        if stats.available_bytes() < self.min_free_bytes {
            return Err(SynthesisError::DeviceUnavailable(format!(
                "{} has {:.2} GB free, {:.2} GB required",
                device,
                stats.available_gb(),
                to_gb(self.min_free_bytes)
            )));
        }

        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    pub async fn current_device(&self) -> Option<Device> {
        self.slot.lock().await.as_ref().map(|handle| handle.device)
    }

    /// Number of times the expensive load path has run.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn probe(&self) -> &Arc<dyn DeviceProbe> {
        &self.probe
    }

    /// Drop the handle and free its device memory. Used at shutdown.
    pub async fn release(&self) {
        let mut slot = self.slot.lock().await;
        if let Some(handle) = slot.take() {
            handle.model.release();
            tracing::info!(device = %handle.device, "Speech model released");
        }
        self.loaded.store(false, Ordering::SeqCst);
    }
}
