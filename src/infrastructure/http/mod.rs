pub mod request_id;

pub use request_id::{request_id_middleware, RequestId, X_REQUEST_ID};

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::controllers::{health::HealthController, tts::TtsController};
use crate::domain::tts::SynthesisService;
use crate::infrastructure::config::Config;

/// All routes, with request ids and tracing.
pub fn build_router(tts_controller: Arc<TtsController>, health_controller: Arc<HealthController>) -> Router {
    let tts_routes = Router::new()
        .route("/generate", post(TtsController::generate))
        .with_state(tts_controller);

    let health_routes = Router::new()
        .route("/", get(HealthController::index))
        .route("/health", get(HealthController::health))
        .route("/stats", get(HealthController::stats))
        .with_state(health_controller);

    Router::new()
        .merge(tts_routes)
        .merge(health_routes)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Serve until `shutdown` resolves, then release the model.
pub async fn serve_until<F>(
    listener: TcpListener,
    app: Router,
    service: Arc<SynthesisService>,
    shutdown: F,
) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    service
        .start()
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    let result = axum::serve(listener, app).with_graceful_shutdown(shutdown).await;

    service.shutdown().await;
    result
}

/// Start the HTTP server with all routes configured
pub async fn start_http_server(
    config: Arc<Config>,
    service: Arc<SynthesisService>,
    tts_controller: Arc<TtsController>,
    health_controller: Arc<HealthController>,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_router(tts_controller, health_controller);

    let listener = TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    serve_until(listener, app, service, shutdown_signal()).await?;

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
