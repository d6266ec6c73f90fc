//! # tts-core
//!
//! Core types, traits, and error definitions for the Kokoro TTS service.
//!
//! This crate provides the foundational abstractions used across the
//! workspace, including:
//!
//! - The fixed voice set and request validation (`Voice`, `SynthesisRequest`)
//! - The `Synthesizer` trait, the boundary to the inference engine
//! - Unified error handling via `TtsError`
//! - Configuration structures

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{LoggingConfig, ModelConfig, ServerConfig};
pub use error::{TtsError, TtsResult};
pub use traits::Synthesizer;
pub use types::{AudioBuffer, DEFAULT_SPEED, SynthesisRequest, Voice};
