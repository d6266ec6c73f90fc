//! # runtime
//!
//! Runtime support for the Kokoro TTS service.
//!
//! This crate provides:
//! - The loaded model handle (`KokoroModel`), built once at startup
//! - espeak-ng phonemization and the Kokoro phoneme vocabulary
//! - Voice pack parsing
//! - Structured logging setup
//! - Request metrics with optional Prometheus export

pub mod engine;
pub mod logging;
pub mod metrics;
pub mod phonemizer;
pub mod voices;

pub use engine::{KokoroModel, MAX_SPEED, MIN_SPEED, SAMPLE_RATE};
pub use metrics::TtsMetrics;
pub use phonemizer::Phonemizer;
pub use voices::{STYLE_DIM, VoicePack, VoiceStyles};
