//! # audio-codec
//!
//! Turns engine output into what the HTTP layer sends:
//! - Float to 16-bit PCM conversion (clamp, then round to nearest)
//! - Canonical mono WAV container written in memory
//! - Duration metadata
//! - Hann fades for generated audio

pub mod wav;

pub use wav::{
    EncodedWav, PCM_SCALE, WAV_HEADER_LEN, apply_fade_in, apply_fade_out, decode_wav, encode_audio,
    encode_wav, sample_to_i16,
};
