//! HTTP server wiring: router, listener, and graceful shutdown.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use runtime::TtsMetrics;
use tts_core::{ServerConfig, Synthesizer, TtsError, TtsResult};

use crate::service::{AppState, health_handler, synthesize_handler, voices_handler};

/// Build the application router around a loaded model handle.
pub fn router(synthesizer: Arc<dyn Synthesizer>, metrics: TtsMetrics) -> Router {
    let state = Arc::new(AppState::new(synthesizer, metrics));

    Router::new()
        .route("/health", get(health_handler))
        .route("/voices", get(voices_handler))
        .route("/synthesize", post(synthesize_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The TTS HTTP server.
pub struct TtsServer {
    config: ServerConfig,
    synthesizer: Arc<dyn Synthesizer>,
    metrics: TtsMetrics,
}

impl TtsServer {
    /// Create a server around an already-loaded model handle.
    pub fn new(config: ServerConfig, synthesizer: Arc<dyn Synthesizer>) -> Self {
        Self {
            config,
            synthesizer,
            metrics: TtsMetrics::noop(),
        }
    }

    /// Report request metrics through `metrics`.
    pub fn with_metrics(mut self, metrics: TtsMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run until SIGINT or SIGTERM.
    pub async fn run(self) -> TtsResult<()> {
        let addr = self.config.addr();
        let app = router(self.synthesizer, self.metrics);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| TtsError::config(format!("failed to bind {addr}: {e}")))?;

        info!(addr = %addr, "Starting Kokoro TTS server");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

/// Wait for shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping server");
}
