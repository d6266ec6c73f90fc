//! Structured logging setup with tracing.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use tts_core::{LoggingConfig, TtsError, TtsResult};

/// Logging format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable text format.
    #[default]
    Text,
    /// JSON format for log shippers.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = TtsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(TtsError::config(format!("unknown log format: {s}"))),
        }
    }
}

/// Build the level filter. `RUST_LOG` wins over `level` when set.
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initialize the global subscriber.
///
/// Returns an error if a subscriber is already installed.
///
/// # Example
/// ```ignore
/// use runtime::logging::{init_logging, LogFormat};
/// init_logging("info", LogFormat::Json)?;
/// ```
pub fn init_logging(level: &str, format: LogFormat) -> TtsResult<()> {
    let registry = tracing_subscriber::registry().with(env_filter(level));

    let result = match format {
        LogFormat::Text => registry.with(fmt::layer().with_target(true)).try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(true).with_current_span(true))
            .try_init(),
    };

    result.map_err(|e| TtsError::internal(format!("logging init failed: {e}")))
}

/// Initialize logging from a [`LoggingConfig`].
pub fn init_from_config(config: &LoggingConfig) -> TtsResult<()> {
    let format: LogFormat = config.format.parse()?;
    init_logging(&config.level, format)
}
