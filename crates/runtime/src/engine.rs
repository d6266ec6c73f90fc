//! Kokoro model handle.
//!
//! The handle is built once at startup and shared by every request. Loading
//! opens the ONNX acoustic model, parses the voice pack, and checks that the
//! phonemizer runs; any failure is an error the caller should treat as fatal.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Tensor;
use tracing::{debug, info, instrument};

use audio_codec::{apply_fade_in, apply_fade_out};
use tts_core::{AudioBuffer, ModelConfig, Synthesizer, TtsError, TtsResult, Voice};

use crate::phonemizer::{PAD_TOKEN, Phonemizer, chunk_tokens, tokenize};
use crate::voices::{STYLE_DIM, VoicePack};

/// Output sample rate of Kokoro v1.0.
pub const SAMPLE_RATE: u32 = 24000;

/// Slowest speed the engine accepts.
pub const MIN_SPEED: f32 = 0.5;

/// Fastest speed the engine accepts.
pub const MAX_SPEED: f32 = 2.0;

/// Fade applied on each side of a join between separately generated pieces.
const JOIN_FADE_MS: f32 = 5.0;

/// Loaded Kokoro model.
pub struct KokoroModel {
    session: Mutex<Session>,
    voices: VoicePack,
    phonemizer: Phonemizer,
    model_path: PathBuf,
}

impl std::fmt::Debug for KokoroModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KokoroModel")
            .field("model_path", &self.model_path)
            .field("voices", &self.voices.len())
            .field("phonemizer", &self.phonemizer)
            .finish_non_exhaustive()
    }
}

impl KokoroModel {
    /// Load the model from the configured cache directory.
    #[instrument(skip_all, fields(model_dir = %config.model_dir.display()))]
    pub fn load(config: &ModelConfig) -> TtsResult<Self> {
        let model_path = config.model_path();
        let voices_path = config.voices_path();
        info!(
            model = %model_path.display(),
            voices = %voices_path.display(),
            "Loading Kokoro TTS model"
        );

        let model_bytes = std::fs::metadata(&model_path)
            .map_err(|source| TtsError::ModelLoad {
                path: model_path.clone(),
                source,
            })?
            .len();

        let voices = VoicePack::read(&voices_path)?;
        let session = open_session(&model_path)?;
        let phonemizer = Phonemizer::new(&config.espeak_program)?;

        info!(
            model_bytes,
            voices = voices.len(),
            "Kokoro TTS model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            voices,
            phonemizer,
            model_path,
        })
    }

    /// Path the acoustic model was loaded from.
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Loaded voice pack.
    pub fn voices(&self) -> &VoicePack {
        &self.voices
    }

    /// Run the acoustic model on one framed token sequence.
    fn infer(&self, tokens: &[i64], style: &[f32], speed: f32) -> TtsResult<Vec<f32>> {
        let mut ids = Vec::with_capacity(tokens.len() + 2);
        ids.push(PAD_TOKEN);
        ids.extend_from_slice(tokens);
        ids.push(PAD_TOKEN);
        let len = ids.len();

        let tokens = Tensor::from_array(([1usize, len], ids)).map_err(inference_error)?;
        let style =
            Tensor::from_array(([1usize, STYLE_DIM], style.to_vec())).map_err(inference_error)?;
        let speed = Tensor::from_array(([1usize], vec![speed])).map_err(inference_error)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| TtsError::internal("ONNX session lock poisoned"))?;
        let outputs = session
            .run(ort::inputs![
                "tokens" => tokens,
                "style" => style,
                "speed" => speed
            ])
            .map_err(inference_error)?;

        let (_, audio) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(inference_error)?;
        Ok(audio.to_vec())
    }
}

impl Synthesizer for KokoroModel {
    #[instrument(skip(self, text), fields(text_len = text.len(), voice = %voice))]
    fn synthesize(&self, text: &str, voice: Voice, speed: f32) -> TtsResult<AudioBuffer> {
        check_speed(speed)?;

        let styles = self.voices.get(voice.as_str())?;
        let phonemes = self.phonemizer.phonemize(text, voice)?;
        let tokens = tokenize(&phonemes);
        let chunks = chunk_tokens(&tokens);
        debug!(phonemes = %phonemes, tokens = tokens.len(), chunks = chunks.len(), "Phonemized");

        let mut samples = Vec::new();
        let last = chunks.len().saturating_sub(1);
        for (index, chunk) in chunks.iter().enumerate() {
            let mut audio = self.infer(chunk, styles.for_length(chunk.len()), speed)?;
            if index > 0 {
                apply_fade_in(&mut audio, JOIN_FADE_MS, SAMPLE_RATE);
            }
            if index < last {
                apply_fade_out(&mut audio, JOIN_FADE_MS, SAMPLE_RATE);
            }
            samples.extend(audio);
        }

        debug!(samples = samples.len(), "Inference completed");
        Ok(AudioBuffer::new(samples, SAMPLE_RATE))
    }

    fn name(&self) -> &str {
        "kokoro-v1.0"
    }
}

/// Reject speeds the model was not trained for. NaN is out of range.
fn check_speed(speed: f32) -> TtsResult<()> {
    if (MIN_SPEED..=MAX_SPEED).contains(&speed) {
        Ok(())
    } else {
        Err(TtsError::inference(format!(
            "speed should be between {MIN_SPEED} and {MAX_SPEED}, got {speed}"
        )))
    }
}

fn open_session(path: &Path) -> TtsResult<Session> {
    let builder = Session::builder().map_err(|e| TtsError::invalid_model(path, e))?;
    let builder = builder
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| TtsError::invalid_model(path, e))?;
    builder
        .commit_from_file(path)
        .map_err(|e| TtsError::invalid_model(path, e))
}

fn inference_error(e: impl std::fmt::Display) -> TtsError {
    TtsError::inference(e.to_string())
}
