//! Local engine backed by Kyutai's pocket-tts on candle.

use super::{ModelLoader, SpeechModel, VoiceCache};
use crate::infrastructure::device::Device;
use pocket_tts::{ModelState, TTSModel};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const TEMPERATURE: f32 = 0.7;
const LSD_DECODE_STEPS: usize = 1;
const EOS_THRESHOLD: f32 = -4.0;
const BUILTIN_VOICE: &str = "hf://kyutai/pocket-tts-without-voice-cloning/embeddings/alba.safetensors";

pub struct PocketTtsLoader {
    variant: String,
    default_voice: Option<PathBuf>,
}

impl PocketTtsLoader {
    pub fn new(variant: String, default_voice: Option<PathBuf>) -> Self {
        Self {
            variant,
            default_voice,
        }
    }
}

fn candle_device(device: &Device) -> Result<candle_core::Device, String> {
    match device {
        Device::Cpu => Ok(candle_core::Device::Cpu),
        Device::Cuda(ordinal) => candle_core::Device::new_cuda(*ordinal)
            .map_err(|e| format!("failed to open {}: {}", device, e)),
    }
}

impl ModelLoader for PocketTtsLoader {
    fn model_name(&self) -> &str {
        &self.variant
    }

    fn load(&self, device: &Device) -> Result<Arc<dyn SpeechModel>, String> {
        let target = candle_device(device)?;

        let model = TTSModel::load_with_params_device(
            &self.variant,
            TEMPERATURE,
            LSD_DECODE_STEPS,
            EOS_THRESHOLD,
            None,
            &target,
        )
        .map_err(|e| format!("failed to load pocket-tts {}: {}", self.variant, e))?;

        Ok(Arc::new(PocketTtsModel {
            model,
            voices: Mutex::new(VoiceCache::new(self.default_voice.clone())),
        }))
    }
}

pub struct PocketTtsModel {
    model: TTSModel,
    voices: Mutex<VoiceCache<ModelState>>,
}

impl PocketTtsModel {
    fn voice_state(&self, voice: Option<&Path>) -> Result<ModelState, String> {
        let mut voices = self
            .voices
            .lock()
            .map_err(|e| format!("voice cache poisoned: {}", e))?;

        voices.get_or_try_insert(voice, || match voice {
            Some(path) => self
                .model
                .get_voice_state(path)
                .map_err(|e| format!("failed to encode reference voice {}: {}", path.display(), e)),
            None => {
                let local = pocket_tts::weights::download_if_necessary(BUILTIN_VOICE)
                    .map_err(|e| format!("failed to fetch built-in voice: {}", e))?;
                self.model
                    .get_voice_state_from_prompt_file(&local)
                    .map_err(|e| format!("failed to load built-in voice: {}", e))
            }
        })
    }
}

impl SpeechModel for PocketTtsModel {
    fn synthesize_to_file(
        &self,
        text: &str,
        voice: Option<&Path>,
        output: &Path,
    ) -> Result<(), String> {
        let state = self.voice_state(voice)?;

        let audio = self
            .model
            .generate(text, &state)
            .map_err(|e| format!("generation failed: {}", e))?;

        let audio = if audio.dims().len() > 1 {
            audio
                .squeeze(0)
                .map_err(|e| format!("unexpected output shape {:?}: {}", audio.dims(), e))?
        } else {
            audio
        };

        let samples = audio
            .to_vec1::<f32>()
            .map_err(|e| format!("failed to read samples: {}", e))?;

        write_wav(output, &samples, self.model.sample_rate as u32)
    }

    fn clear_transient(&self) {
        if let Ok(mut voices) = self.voices.lock() {
            let evicted = voices.evict_transient();
            if evicted > 0 {
                tracing::debug!(evicted = evicted, "Dropped caller reference voices");
            }
        }
    }

    fn release(&self) {
        if let Ok(mut voices) = self.voices.lock() {
            voices.clear();
        }
    }
}

fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), String> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer =
        hound::WavWriter::create(path, spec).map_err(|e| format!("failed to create wav: {}", e))?;
    for &sample in samples {
        writer
            .write_sample(sample)
            .map_err(|e| format!("failed to write wav: {}", e))?;
    }
    writer
        .finalize()
        .map_err(|e| format!("failed to finalize wav: {}", e))
}
