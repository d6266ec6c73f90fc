//! Unified error types for the TTS service.

use std::path::PathBuf;

/// Main error type for TTS operations.
///
/// The HTTP layer splits these into two kinds: client input errors
/// ([`TtsError::InvalidInput`]) and everything else, which is reported as a
/// synthesis failure.
#[derive(Debug, thiserror::Error)]
pub enum TtsError {
    /// The request was malformed or named an unknown voice.
    #[error("{0}")]
    InvalidInput(String),

    /// The request body or one of its fields could not be decoded as the
    /// expected type.
    #[error("{0}")]
    Conversion(String),

    /// Model artifact could not be read.
    #[error("model load failed for {path}: {source}")]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Model artifact was read but could not be used.
    #[error("invalid model artifact {path}: {reason}")]
    InvalidModel { path: PathBuf, reason: String },

    /// Model inference error.
    #[error("inference error: {0}")]
    Inference(String),

    /// WAV encoding error.
    #[error("audio encode error: {0}")]
    AudioEncode(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error (should not happen in normal operation).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for Results with TtsError.
pub type TtsResult<T> = Result<T, TtsError>;

impl TtsError {
    /// Create an invalid input error with message.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a conversion error with message.
    pub fn conversion(msg: impl Into<String>) -> Self {
        Self::Conversion(msg.into())
    }

    /// Create an invalid model error for the artifact at `path`.
    pub fn invalid_model(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::InvalidModel {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an inference error with message.
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Create an audio encode error with message.
    pub fn audio_encode(msg: impl Into<String>) -> Self {
        Self::AudioEncode(msg.into())
    }

    /// Create a config error with message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error with message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the caller is at fault (maps to HTTP 400).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}
