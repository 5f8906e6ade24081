use crate::domain::tts::ProviderKind;
use crate::infrastructure::device::Device;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub log_format: LogFormat,
    pub provider: ProviderKind,
    pub scratch_dir: PathBuf,
    pub max_text_chars: usize,
    pub local: LocalModelConfig,
    pub minimax: MiniMaxConfig,
    pub qwen: QwenConfig,
    pub remote: RemoteConfig,
}

#[derive(Debug, Clone)]
pub struct LocalModelConfig {
    pub device: Device,
    pub min_free_memory_gb: f64,
    pub eager_load: bool,
    pub default_speaker_wav: Option<PathBuf>,
    pub queue_capacity: usize,
    pub request_timeout: Duration,
    pub model_variant: String,
}

impl Default for LocalModelConfig {
    fn default() -> Self {
        Self {
            device: Device::default(),
            min_free_memory_gb: 3.0,
            eager_load: false,
            default_speaker_wav: None,
            queue_capacity: 16,
            request_timeout: Duration::from_secs(180),
            model_variant: "b6369a24".to_string(),
        }
    }
}

/// Provider A credentials.
#[derive(Debug, Clone)]
pub struct MiniMaxConfig {
    pub group_id: Option<String>,
    pub access_token: Option<String>,
    pub voice_id: String,
    pub model: String,
    pub base_url: String,
    pub speed: f32,
}

impl Default for MiniMaxConfig {
    fn default() -> Self {
        Self {
            group_id: None,
            access_token: None,
            voice_id: "Chinese (Mandarin)_News_Anchor".to_string(),
            model: "speech-2.6-hd".to_string(),
            base_url: "https://api.minimaxi.com".to_string(),
            speed: 1.0,
        }
    }
}

impl MiniMaxConfig {
    pub fn is_configured(&self) -> bool {
        self.group_id.is_some() && self.access_token.is_some()
    }
}

/// Provider B credentials.
#[derive(Debug, Clone)]
pub struct QwenConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub voice_id: String,
    pub base_url: String,
}

impl Default for QwenConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "qwen3-tts-flash".to_string(),
            voice_id: "Cherry".to_string(),
            base_url: "https://dashscope.aliyuncs.com".to_string(),
        }
    }
}

impl QwenConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_backoff: Duration::from_millis(500),
            timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn flag(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|s| matches!(s.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let local_defaults = LocalModelConfig::default();
        let minimax_defaults = MiniMaxConfig::default();
        let qwen_defaults = QwenConfig::default();

        let config = Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8001".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string())
                .parse::<String>()
                .map(|s| match s.as_str() {
                    "production" => Environment::Production,
                    _ => Environment::Development,
                })?,
            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .parse::<String>()
                .map(|s| match s.as_str() {
                    "json" => LogFormat::Json,
                    _ => LogFormat::Pretty,
                })?,
            provider: env::var("TTS_PROVIDER")
                .unwrap_or_else(|_| "local".to_string())
                .parse()?,
            scratch_dir: optional("TTS_SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| env::temp_dir().join("deckvoice")),
            max_text_chars: env::var("TTS_MAX_TEXT_CHARS")
                .unwrap_or_else(|_| "10000".to_string())
                .parse()?,
            local: LocalModelConfig {
                device: env::var("TTS_DEVICE")
                    .unwrap_or_else(|_| local_defaults.device.to_string())
                    .parse()?,
                min_free_memory_gb: env::var("TTS_MIN_FREE_MEMORY_GB")
                    .unwrap_or_else(|_| "3.0".to_string())
                    .parse()?,
                eager_load: flag("TTS_EAGER_LOAD", false),
                default_speaker_wav: optional("TTS_DEFAULT_SPEAKER_WAV").map(PathBuf::from),
                queue_capacity: env::var("TTS_QUEUE_CAPACITY")
                    .unwrap_or_else(|_| "16".to_string())
                    .parse()?,
                request_timeout: Duration::from_secs(
                    env::var("TTS_REQUEST_TIMEOUT_SECS")
                        .unwrap_or_else(|_| "180".to_string())
                        .parse()?,
                ),
                model_variant: optional("TTS_MODEL_VARIANT").unwrap_or(local_defaults.model_variant),
            },
            minimax: MiniMaxConfig {
                group_id: optional("MINIMAX_GROUP_ID"),
                access_token: optional("MINIMAX_ACCESS_TOKEN"),
                voice_id: optional("MINIMAX_VOICE_ID").unwrap_or(minimax_defaults.voice_id),
                model: optional("MINIMAX_MODEL").unwrap_or(minimax_defaults.model),
                base_url: optional("MINIMAX_BASE_URL").unwrap_or(minimax_defaults.base_url),
                speed: minimax_defaults.speed,
            },
            qwen: QwenConfig {
                api_key: optional("QWEN_API_KEY"),
                model: optional("QWEN_MODEL").unwrap_or(qwen_defaults.model),
                voice_id: optional("QWEN_VOICE_ID").unwrap_or(qwen_defaults.voice_id),
                base_url: optional("QWEN_BASE_URL").unwrap_or(qwen_defaults.base_url),
            },
            remote: RemoteConfig {
                max_retries: env::var("REMOTE_MAX_RETRIES")
                    .unwrap_or_else(|_| "2".to_string())
                    .parse()?,
                retry_backoff: Duration::from_millis(
                    env::var("REMOTE_RETRY_BACKOFF_MS")
                        .unwrap_or_else(|_| "500".to_string())
                        .parse()?,
                ),
                timeout: Duration::from_secs(
                    env::var("REMOTE_TIMEOUT_SECS")
                        .unwrap_or_else(|_| "120".to_string())
                        .parse()?,
                ),
            },
        };

        Ok(config)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    /// Defaults for everything, for tests and embedding.
    pub fn for_provider(provider: ProviderKind, scratch_dir: PathBuf) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: Environment::Development,
            log_format: LogFormat::Pretty,
            provider,
            scratch_dir,
            max_text_chars: 10_000,
            local: LocalModelConfig::default(),
            minimax: MiniMaxConfig::default(),
            qwen: QwenConfig::default(),
            remote: RemoteConfig::default(),
        }
    }
}
