use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use deckvoice::controllers::{health::HealthController, tts::TtsController};
use deckvoice::domain::tts::{ProviderDispatcher, ServiceSettings, SynthesisService};
use deckvoice::infrastructure::config::{Config, LogFormat};
use deckvoice::infrastructure::device::NvidiaSmiProbe;
use deckvoice::infrastructure::http::start_http_server;
use deckvoice::infrastructure::model::{default_loader, ModelResidency, SynthesisExecutor};
use deckvoice::infrastructure::repositories::{
    LocalTtsRepository, MiniMaxTtsRepository, QwenTtsRepository,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config);

    tracing::info!(
        "Starting deckvoice on {}:{} (provider: {})",
        config.host,
        config.port,
        config.provider
    );

    let config = Arc::new(config);

    // === DEPENDENCY INJECTION SETUP ===
    // 1. Local model residency and executor
    tracing::info!(
        device = %config.local.device,
        model_variant = %config.local.model_variant,
        "Preparing local model residency..."
    );
    let probe = Arc::new(NvidiaSmiProbe::new());
    let residency = Arc::new(ModelResidency::new(
        default_loader(&config.local),
        probe,
        config.local.min_free_memory_gb,
    ));
    let executor = Arc::new(SynthesisExecutor::new(
        config.local.queue_capacity,
        config.local.request_timeout,
        config.local.default_speaker_wav.clone(),
    ));

    // 2. Instantiate repositories
    tracing::info!("Instantiating TTS repositories...");
    let mut dispatcher = ProviderDispatcher::new().with_provider(Arc::new(LocalTtsRepository::new(
        residency.clone(),
        executor,
        config.local.device,
    )));

    if config.minimax.is_configured() {
        dispatcher.register(Arc::new(MiniMaxTtsRepository::new(&config.minimax, &config.remote)?));
    } else {
        tracing::warn!("MINIMAX_GROUP_ID / MINIMAX_ACCESS_TOKEN not set; minimax provider disabled");
    }

    if config.qwen.is_configured() {
        dispatcher.register(Arc::new(QwenTtsRepository::new(&config.qwen, &config.remote)?));
    } else {
        tracing::warn!("QWEN_API_KEY not set; qwen provider disabled");
    }

    if !dispatcher.supports(config.provider) {
        return Err(format!("TTS_PROVIDER={} is not configured", config.provider).into());
    }

    // 3. Instantiate the service
    tracing::info!("Instantiating synthesis service...");
    let service = Arc::new(SynthesisService::new(
        dispatcher,
        residency,
        ServiceSettings::from(config.as_ref()),
    ));

    // 4. Instantiate controllers (inject service)
    tracing::info!("Instantiating controllers...");
    let tts_controller = Arc::new(TtsController::new(service.clone()));
    let health_controller = Arc::new(HealthController::new(service.clone()));

    // Start HTTP server with all routes
    start_http_server(config, service, tts_controller, health_controller).await?;

    Ok(())
}

fn init_logging(config: &Config) {
    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "deckvoice=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "deckvoice=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
