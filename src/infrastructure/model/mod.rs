//! Resident speech model: loading, residency and device-serialized inference.

pub mod executor;
#[cfg(feature = "pocket-tts")]
pub mod pocket;
pub mod residency;
pub mod voices;

pub use executor::SynthesisExecutor;
pub use residency::{ModelHandle, ModelResidency};
pub use voices::VoiceCache;

use crate::infrastructure::config::LocalModelConfig;
use crate::infrastructure::device::Device;
use std::path::Path;
use std::sync::Arc;

/// A generative speech model that has been materialized on a device.
///
/// Calls are blocking and compute bound; callers run them on the blocking pool.
pub trait SpeechModel: Send + Sync {
    /// Synthesize `text` into a WAV file at `output`.
    ///
    /// `voice` is a reference recording to clone; `None` selects the model's built-in voice.
    fn synthesize_to_file(&self, text: &str, voice: Option<&Path>, output: &Path)
        -> Result<(), String>;

    /// Drop caches left behind by previous inference calls. Model weights stay resident.
    fn clear_transient(&self) {}

    /// Free everything the model holds on its device.
    fn release(&self) {}
}

/// Materializes a [`SpeechModel`] onto a device. Expensive; blocking.
pub trait ModelLoader: Send + Sync {
    fn model_name(&self) -> &str;

    fn load(&self, device: &Device) -> Result<Arc<dyn SpeechModel>, String>;
}

/// Loader used when no local engine was compiled in.
pub struct UnavailableLoader;

impl ModelLoader for UnavailableLoader {
    fn model_name(&self) -> &str {
        "none"
    }

    fn load(&self, _device: &Device) -> Result<Arc<dyn SpeechModel>, String> {
        Err("no local speech engine compiled in; rebuild with --features pocket-tts".to_string())
    }
}

/// The loader this build ships with.
#[cfg(feature = "pocket-tts")]
pub fn default_loader(config: &LocalModelConfig) -> Arc<dyn ModelLoader> {
    Arc::new(pocket::PocketTtsLoader::new(
        config.model_variant.clone(),
        config.default_speaker_wav.clone(),
    ))
}

/// The loader this build ships with.
#[cfg(not(feature = "pocket-tts"))]
pub fn default_loader(config: &LocalModelConfig) -> Arc<dyn ModelLoader> {
    tracing::warn!(
        model_variant = %config.model_variant,
        "Built without a local speech engine; the local provider will fail to load"
    );
    Arc::new(UnavailableLoader)
}
