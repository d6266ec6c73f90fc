//! Configuration structures for the TTS service.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

/// File name of the Kokoro acoustic model.
pub const MODEL_FILE: &str = "kokoro-v1.0.onnx";

/// File name of the packed voice styles.
pub const VOICES_FILE: &str = "voices.bin";

/// Phonemizer executable looked up on `PATH`.
pub const ESPEAK_PROGRAM: &str = "espeak-ng";

/// Model artifact configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Directory holding the model artifacts.
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,
    /// Acoustic model file name, relative to `model_dir`.
    #[serde(default = "default_model_file")]
    pub model_file: String,
    /// Voice pack file name, relative to `model_dir`.
    #[serde(default = "default_voices_file")]
    pub voices_file: String,
    /// espeak-ng executable used to turn text into phonemes.
    #[serde(default = "default_espeak_program")]
    pub espeak_program: PathBuf,
}

/// Default artifact directory: `~/.cache/kokoro`.
pub fn default_model_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".cache")
        .join("kokoro")
}

fn default_model_file() -> String {
    MODEL_FILE.to_string()
}

fn default_voices_file() -> String {
    VOICES_FILE.to_string()
}

fn default_espeak_program() -> PathBuf {
    PathBuf::from(ESPEAK_PROGRAM)
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_dir: default_model_dir(),
            model_file: default_model_file(),
            voices_file: default_voices_file(),
            espeak_program: default_espeak_program(),
        }
    }
}

impl ModelConfig {
    /// Use artifacts from a custom directory.
    pub fn with_model_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.model_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Full path of the acoustic model.
    pub fn model_path(&self) -> PathBuf {
        self.model_dir.join(&self.model_file)
    }

    /// Full path of the voice pack.
    pub fn voices_path(&self) -> PathBuf {
        self.model_dir.join(&self.voices_file)
    }

    /// Use a specific espeak-ng executable.
    pub fn with_espeak_program(mut self, program: impl AsRef<Path>) -> Self {
        self.espeak_program = program.as_ref().to_path_buf();
        self
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address. Always every interface in the shipped binary.
    #[serde(default = "default_server_host")]
    pub host: IpAddr,
    /// Listen port.
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Optional Prometheus exporter port.
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

fn default_server_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_server_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            metrics_port: None,
        }
    }
}

impl ServerConfig {
    /// Socket address the HTTP listener binds to.
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format (json or text).
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}
