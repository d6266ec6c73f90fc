//! Kokoro TTS HTTP server.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;

use runtime::logging::init_from_config;
use runtime::{KokoroModel, TtsMetrics};
use tts_core::{LoggingConfig, ModelConfig, ServerConfig};
use tts_server::TtsServer;

/// Kokoro TTS HTTP server
#[derive(Debug, Parser)]
#[command(name = "kokoro-tts")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Listen port (bound on all interfaces)
    #[arg(long, env = "PORT", default_value_t = 5000)]
    port: u16,

    /// Directory holding kokoro-v1.0.onnx and voices.bin [default: ~/.cache/kokoro]
    #[arg(long, env = "KOKORO_CACHE_DIR")]
    model_dir: Option<PathBuf>,

    /// Log level (RUST_LOG takes precedence)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Log format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "text")]
    log_format: LogFormatArg,

    /// Serve Prometheus metrics on this port
    #[arg(long, env = "METRICS_PORT")]
    metrics_port: Option<u16>,

    /// espeak-ng executable used for phonemization
    #[arg(long, env = "ESPEAK_NG", default_value = "espeak-ng")]
    espeak_program: PathBuf,
}

impl Args {
    fn logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level.clone(),
            format: self.log_format.as_str().to_string(),
        }
    }

    fn model_config(&self) -> ModelConfig {
        let config = ModelConfig::default().with_espeak_program(&self.espeak_program);
        match &self.model_dir {
            Some(dir) => config.with_model_dir(dir),
            None => config,
        }
    }

    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            port: self.port,
            metrics_port: self.metrics_port,
            ..ServerConfig::default()
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Json,
    Text,
}

impl LogFormatArg {
    fn as_str(self) -> &'static str {
        match self {
            LogFormatArg::Json => "json",
            LogFormatArg::Text => "text",
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_from_config(&args.logging_config()).context("failed to initialize logging")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = args.port,
        "Starting Kokoro TTS service"
    );

    let model =
        KokoroModel::load(&args.model_config()).context("failed to load Kokoro TTS model")?;

    let metrics = match args.metrics_port {
        Some(port) => {
            info!(port, "Serving Prometheus metrics");
            TtsMetrics::init(port).context("failed to start metrics exporter")?
        }
        None => TtsMetrics::noop(),
    };

    TtsServer::new(args.server_config(), Arc::new(model))
        .with_metrics(metrics)
        .run()
        .await
        .context("server failed")?;

    info!("Server shutdown complete");
    Ok(())
}
