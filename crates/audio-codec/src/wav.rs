//! In-memory WAV encoding and decoding.

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::Cursor;
use tts_core::{AudioBuffer, TtsError, TtsResult};

/// Scale between normalized float samples and 16-bit PCM.
pub const PCM_SCALE: f32 = i16::MAX as f32;

/// Bits per encoded sample.
pub const BITS_PER_SAMPLE: u16 = 16;

/// Size of the canonical RIFF/WAVE header hound emits for 16-bit mono PCM.
pub const WAV_HEADER_LEN: usize = 44;

/// A WAV file ready to be sent, with the metadata reported alongside it.
#[derive(Debug, Clone)]
pub struct EncodedWav {
    /// Complete RIFF/WAVE file.
    pub bytes: Vec<u8>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of encoded samples.
    pub num_samples: usize,
    /// Playback duration in seconds.
    pub duration_secs: f64,
}

/// Convert one normalized sample to 16-bit PCM.
///
/// The sample is clamped to [-1.0, 1.0], scaled by 32767 and rounded to
/// nearest, ties away from zero. The result lies in [-32767, 32767]. NaN
/// becomes silence.
pub fn sample_to_i16(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    (sample.clamp(-1.0, 1.0) * PCM_SCALE).round() as i16
}

/// WAV spec for mono 16-bit PCM at `sample_rate`.
pub fn pcm16_mono_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: SampleFormat::Int,
    }
}

/// Encode float samples as a mono 16-bit PCM WAV file.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> TtsResult<Vec<u8>> {
    if sample_rate == 0 {
        return Err(TtsError::audio_encode("sample rate must be non-zero"));
    }

    let mut cursor = Cursor::new(Vec::with_capacity(
        WAV_HEADER_LEN + samples.len() * usize::from(BITS_PER_SAMPLE / 8),
    ));

    {
        let mut writer = WavWriter::new(&mut cursor, pcm16_mono_spec(sample_rate))
            .map_err(|e| TtsError::audio_encode(e.to_string()))?;

        for &sample in samples {
            writer
                .write_sample(sample_to_i16(sample))
                .map_err(|e| TtsError::audio_encode(e.to_string()))?;
        }

        writer
            .finalize()
            .map_err(|e| TtsError::audio_encode(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

/// Encode an engine buffer and compute its duration.
pub fn encode_audio(audio: &AudioBuffer) -> TtsResult<EncodedWav> {
    let duration_secs = audio
        .duration_secs()
        .ok_or_else(|| TtsError::audio_encode("sample rate must be non-zero"))?;
    let bytes = encode_wav(&audio.samples, audio.sample_rate)?;

    Ok(EncodedWav {
        bytes,
        sample_rate: audio.sample_rate,
        num_samples: audio.num_samples(),
        duration_secs,
    })
}

/// Decode a WAV file held in memory into normalized float samples.
///
/// Integer PCM is divided by the same scale [`encode_wav`] multiplies by, so
/// a round trip is exact up to quantization.
pub fn decode_wav(bytes: &[u8]) -> TtsResult<(Vec<f32>, WavSpec)> {
    let mut reader =
        WavReader::new(Cursor::new(bytes)).map_err(|e| TtsError::audio_encode(e.to_string()))?;

    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Int => {
            let max_val = ((1i64 << (spec.bits_per_sample - 1)) - 1) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| TtsError::audio_encode(e.to_string()))?
        }
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TtsError::audio_encode(e.to_string()))?,
    };

    Ok((samples, spec))
}

/// Apply fade-in to audio samples to soften the attack.
///
/// Uses a Hann window for smooth fade-in.
pub fn apply_fade_in(samples: &mut [f32], fade_ms: f32, sample_rate: u32) {
    let fade_samples = ((fade_ms / 1000.0) * sample_rate as f32) as usize;
    let fade_samples = fade_samples.min(samples.len());

    for (i, sample) in samples.iter_mut().take(fade_samples).enumerate() {
        let t = i as f32 / fade_samples.max(1) as f32;
        *sample *= 0.5 * (1.0 - (std::f32::consts::PI * t).cos());
    }
}

/// Apply fade-out to audio samples.
///
/// Uses a Hann window for smooth fade-out.
pub fn apply_fade_out(samples: &mut [f32], fade_ms: f32, sample_rate: u32) {
    let fade_samples = ((fade_ms / 1000.0) * sample_rate as f32) as usize;
    let fade_samples = fade_samples.min(samples.len());
    let start = samples.len() - fade_samples;

    for (i, sample) in samples[start..].iter_mut().enumerate() {
        let t = i as f32 / fade_samples.max(1) as f32;
        *sample *= 0.5 * (1.0 + (std::f32::consts::PI * t).cos());
    }
}
