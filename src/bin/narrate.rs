use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use deckvoice::domain::narration::{NarrationManifest, NarrationOrchestrator};
use deckvoice::domain::tts::{ProviderDispatcher, ProviderKind};
use deckvoice::infrastructure::config::{LocalModelConfig, MiniMaxConfig, QwenConfig, RemoteConfig};
use deckvoice::infrastructure::device::{Device, NvidiaSmiProbe};
use deckvoice::infrastructure::model::{default_loader, ModelResidency, SynthesisExecutor};
use deckvoice::infrastructure::repositories::{
    LocalTtsRepository, MiniMaxTtsRepository, QwenTtsRepository, ServiceTtsRepository,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Every note in the notes file
    Batch,
    /// One slide
    Single,
}

/// Generate narration audio for presentation slides.
#[derive(Parser, Debug)]
#[command(name = "narrate")]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(long, value_enum, default_value = "batch")]
    mode: Mode,

    /// JSON file with `{"notes": [{"slide": N, "note": "..."}]}`
    #[arg(long)]
    notes_file: Option<PathBuf>,

    /// Where `slide_<N>.<ext>` files are written
    #[arg(long)]
    audio_dir: PathBuf,

    /// local, minimax (provider-a) or qwen (provider-b)
    #[arg(long, default_value = "local", value_parser = parse_provider)]
    service: ProviderKind,

    #[arg(long)]
    slide_id: Option<u32>,

    /// Narration text for single mode; read from --notes-file when absent
    #[arg(long)]
    note_text: Option<String>,

    #[arg(long, env = "MINIMAX_GROUP_ID", hide_env_values = true)]
    group_id: Option<String>,

    #[arg(long, env = "MINIMAX_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    #[arg(long, env = "MINIMAX_VOICE_ID")]
    voice_id: Option<String>,

    /// Reference recording for the local model's voice
    #[arg(long, env = "TTS_DEFAULT_SPEAKER_WAV")]
    speaker_wav: Option<PathBuf>,

    #[arg(long, env = "TTS_DEVICE", default_value = "cuda:0")]
    device: Device,

    /// A running deckvoice server to use for local synthesis instead of loading the model here
    #[arg(long, env = "TTS_SERVICE_URL")]
    service_url: Option<String>,

    #[arg(long, env = "QWEN_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, env = "QWEN_MODEL")]
    qwen_model: Option<String>,

    #[arg(long, env = "QWEN_VOICE_ID")]
    qwen_voice_id: Option<String>,

    /// Delay between consecutive remote calls
    #[arg(long, default_value_t = 1000)]
    pacing_ms: u64,
}

fn parse_provider(raw: &str) -> Result<ProviderKind, String> {
    raw.parse()
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "narrate failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<bool> {
    validate(&cli)?;

    let (dispatcher, residency) = build_dispatcher(&cli).await?;
    let orchestrator = NarrationOrchestrator::new(dispatcher, cli.service, cli.audio_dir.clone())
        .with_pacing(Duration::from_millis(cli.pacing_ms))
        .with_speaker_reference(cli.speaker_wav.clone());

    tokio::fs::create_dir_all(&cli.audio_dir)
        .await
        .with_context(|| format!("creating {}", cli.audio_dir.display()))?;

    let succeeded = match cli.mode {
        Mode::Batch => {
            let notes_file = cli.notes_file.as_deref().context("--notes-file is required")?;
            let manifest = NarrationManifest::load(notes_file)?;
            let summary = orchestrator.run_batch(&manifest).await;
            println!(
                "{} succeeded, {} failed, {} skipped ({} total)",
                summary.succeeded, summary.failed, summary.skipped, summary.total
            );
            summary.is_success()
        }
        Mode::Single => {
            let index = cli.slide_id.context("--slide-id is required")?;
            let result = match (&cli.note_text, &cli.notes_file) {
                (Some(text), _) => orchestrator.run_single(index, text).await,
                (None, Some(notes_file)) => {
                    let manifest = NarrationManifest::load(notes_file)?;
                    orchestrator.run_single_from_manifest(&manifest, index).await?
                }
                (None, None) => bail!("single mode needs --note-text or --notes-file"),
            };
            match (result.output_path(), result.failure()) {
                (Some(path), _) => println!("{}", path.display()),
                (None, Some(failure)) => eprintln!("slide {}: {}", index, failure.detail),
                (None, None) => {}
            }
            result.is_success()
        }
    };

    if let Some(residency) = residency {
        residency.release().await;
    }

    Ok(succeeded)
}

/// Argument combinations clap cannot express.
fn validate(cli: &Cli) -> Result<()> {
    match cli.mode {
        Mode::Batch if cli.notes_file.is_none() => bail!("batch mode requires --notes-file"),
        Mode::Single if cli.slide_id.is_none() => bail!("single mode requires --slide-id"),
        Mode::Single if cli.note_text.is_none() && cli.notes_file.is_none() => {
            bail!("single mode requires --note-text or --notes-file")
        }
        _ => {}
    }

    match cli.service {
        ProviderKind::MiniMax if cli.group_id.is_none() || cli.access_token.is_none() => {
            bail!("minimax requires --group-id and --access-token")
        }
        ProviderKind::Qwen if cli.api_key.is_none() => bail!("qwen requires --api-key"),
        ProviderKind::Local => {
            // With a server, the reference path is resolved on the server's side
            if let (Some(wav), None) = (&cli.speaker_wav, &cli.service_url) {
                if !wav.is_file() {
                    bail!("speaker reference {} does not exist", wav.display());
                }
            }
        }
        _ => {}
    }

    if cli.service_url.is_some() && cli.service != ProviderKind::Local {
        bail!("--service-url only applies to --service local");
    }

    Ok(())
}

/// Register only the selected provider; an in-process model is released when the run ends.
async fn build_dispatcher(cli: &Cli) -> Result<(ProviderDispatcher, Option<Arc<ModelResidency>>)> {
    let remote = RemoteConfig::default();

    match (cli.service, cli.service_url.as_deref()) {
        (ProviderKind::Local, Some(url)) => {
            let service_remote = RemoteConfig {
                timeout: LocalModelConfig::default().request_timeout + Duration::from_secs(30),
                ..remote
            };
            let repository = ServiceTtsRepository::connect(url, &service_remote)
                .await
                .with_context(|| format!("TTS service at {} is not usable", url))?;
            Ok((ProviderDispatcher::new().with_provider(Arc::new(repository)), None))
        }
        (ProviderKind::Local, None) => {
            tracing::warn!(
                device = %cli.device,
                "No --service-url given; loading the model in this process"
            );
            let local = LocalModelConfig {
                device: cli.device,
                ..LocalModelConfig::default()
            };
            let residency = Arc::new(ModelResidency::new(
                default_loader(&local),
                Arc::new(NvidiaSmiProbe::new()),
                local.min_free_memory_gb,
            ));
            let executor = Arc::new(SynthesisExecutor::new(
                local.queue_capacity,
                local.request_timeout,
                None,
            ));
            let dispatcher = ProviderDispatcher::new().with_provider(Arc::new(
                LocalTtsRepository::new(residency.clone(), executor, local.device),
            ));
            Ok((dispatcher, Some(residency)))
        }
        (ProviderKind::MiniMax, _) => {
            let defaults = MiniMaxConfig::default();
            let config = MiniMaxConfig {
                group_id: cli.group_id.clone(),
                access_token: cli.access_token.clone(),
                voice_id: cli.voice_id.clone().unwrap_or(defaults.voice_id),
                ..MiniMaxConfig::default()
            };
            let repository = MiniMaxTtsRepository::new(&config, &remote)?;
            Ok((ProviderDispatcher::new().with_provider(Arc::new(repository)), None))
        }
        (ProviderKind::Qwen, _) => {
            let defaults = QwenConfig::default();
            let config = QwenConfig {
                api_key: cli.api_key.clone(),
                model: cli.qwen_model.clone().unwrap_or(defaults.model),
                voice_id: cli.qwen_voice_id.clone().unwrap_or(defaults.voice_id),
                base_url: defaults.base_url,
            };
            let repository = QwenTtsRepository::new(&config, &remote)?;
            Ok((ProviderDispatcher::new().with_provider(Arc::new(repository)), None))
        }
    }
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "deckvoice=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
