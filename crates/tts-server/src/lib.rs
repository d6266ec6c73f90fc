//! # tts-server
//!
//! HTTP front end for the Kokoro TTS model.
//!
//! Provides:
//! - `POST /synthesize`: text to WAV
//! - `GET /voices`: supported voice identifiers
//! - `GET /health`: liveness check

pub mod server;
pub mod service;

pub use server::{TtsServer, router};
pub use service::{AppState, ApiError};
