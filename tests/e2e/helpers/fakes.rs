use async_trait::async_trait;
use deckvoice::infrastructure::device::{gb_to_bytes, Device, DeviceProbe, DeviceStats};
use deckvoice::infrastructure::model::{ModelLoader, SpeechModel};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const FAKE_WAV: &[u8] = b"RIFF\x24\x00\x00\x00WAVEfmt fake-pcm";

#[derive(Clone, Debug)]
pub enum ModelBehavior {
    Succeed,
    Fail(String),
    Slow(Duration),
}

#[derive(Default)]
pub struct ModelStats {
    pub loads: AtomicUsize,
    pub calls: AtomicUsize,
    pub releases: AtomicUsize,
    running: AtomicUsize,
    pub max_running: AtomicUsize,
}

impl ModelStats {
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn max_running(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }
}

struct FakeModel {
    behavior: ModelBehavior,
    stats: Arc<ModelStats>,
}

impl SpeechModel for FakeModel {
    fn synthesize_to_file(&self, _text: &str, _voice: Option<&Path>, output: &Path) -> Result<(), String> {
        self.stats.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.stats.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_running.fetch_max(running, Ordering::SeqCst);

        let result = match &self.behavior {
            ModelBehavior::Succeed => std::fs::write(output, FAKE_WAV).map_err(|e| e.to_string()),
            ModelBehavior::Fail(message) => {
                let _ = std::fs::write(output, b"RIFF");
                Err(message.clone())
            }
            ModelBehavior::Slow(delay) => {
                std::thread::sleep(*delay);
                std::fs::write(output, FAKE_WAV).map_err(|e| e.to_string())
            }
        };

        self.stats.running.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn release(&self) {
        self.stats.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Loader that hands out [`FakeModel`]s and counts what happens to them.
pub struct FakeLoader {
    behavior: ModelBehavior,
    pub stats: Arc<ModelStats>,
}

impl FakeLoader {
    pub fn new(behavior: ModelBehavior) -> Self {
        Self {
            behavior,
            stats: Arc::new(ModelStats::default()),
        }
    }
}

impl ModelLoader for FakeLoader {
    fn model_name(&self) -> &str {
        "fake"
    }

    fn load(&self, _device: &Device) -> Result<Arc<dyn SpeechModel>, String> {
        self.stats.loads.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakeModel {
            behavior: self.behavior.clone(),
            stats: self.stats.clone(),
        }))
    }
}

pub struct FakeProbe {
    stats: Option<DeviceStats>,
}

impl FakeProbe {
    /// A 24 GB accelerator with `used_gb` already taken.
    pub fn with_used_gb(used_gb: f64) -> Self {
        Self {
            stats: Some(DeviceStats {
                name: "Test GPU 24GB".to_string(),
                total_bytes: gb_to_bytes(24.0),
                used_bytes: gb_to_bytes(used_gb),
            }),
        }
    }

    pub fn absent() -> Self {
        Self { stats: None }
    }
}

#[async_trait]
impl DeviceProbe for FakeProbe {
    async fn stats(&self, device: &Device) -> Option<DeviceStats> {
        match device {
            Device::Cuda(0) => self.stats.clone(),
            _ => None,
        }
    }
}
