//! Core data types for the synthesis pipeline.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{TtsError, TtsResult};

/// Speed used when the request does not name one.
pub const DEFAULT_SPEED: f32 = 1.0;

/// Speaker profiles shipped with the Kokoro v1.0 voice pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Voice {
    /// American English, female (default).
    #[default]
    AfBella,
    AfNicole,
    AfSarah,
    AfSky,
    /// American English, male.
    AmAdam,
    AmMichael,
    /// British English, female.
    BfEmma,
    BfIsabella,
    /// British English, male.
    Bm,
}

impl Voice {
    /// Every supported voice, in listing order.
    pub const ALL: [Voice; 9] = [
        Voice::AfBella,
        Voice::AfNicole,
        Voice::AfSarah,
        Voice::AfSky,
        Voice::AmAdam,
        Voice::AmMichael,
        Voice::BfEmma,
        Voice::BfIsabella,
        Voice::Bm,
    ];

    /// Identifier as it appears on the wire and in the voice pack.
    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::AfBella => "af_bella",
            Voice::AfNicole => "af_nicole",
            Voice::AfSarah => "af_sarah",
            Voice::AfSky => "af_sky",
            Voice::AmAdam => "am_adam",
            Voice::AmMichael => "am_michael",
            Voice::BfEmma => "bf_emma",
            Voice::BfIsabella => "bf_isabella",
            Voice::Bm => "bm",
        }
    }

    /// Whether the profile speaks British English.
    pub fn is_british(&self) -> bool {
        matches!(self, Voice::BfEmma | Voice::BfIsabella | Voice::Bm)
    }
}

impl std::fmt::Display for Voice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Voice {
    type Err = TtsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Voice::ALL
            .into_iter()
            .find(|voice| voice.as_str() == s)
            .ok_or_else(|| TtsError::invalid_input(format!("Invalid voice: {s}")))
    }
}

/// A validated synthesis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisRequest {
    /// Text to synthesize.
    pub text: String,
    /// Speaker profile.
    pub voice: Voice,
    /// Playback speed multiplier.
    pub speed: f32,
}

impl SynthesisRequest {
    /// Create a new synthesis request with default voice and speed.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: Voice::default(),
            speed: DEFAULT_SPEED,
        }
    }

    /// Set the voice.
    pub fn with_voice(mut self, voice: Voice) -> Self {
        self.voice = voice;
        self
    }

    /// Set the speed.
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Validate a decoded JSON body and apply defaults.
    ///
    /// `text` must be present; `voice` must name a known speaker when given.
    /// `speed` takes a number or a numeric string. Nothing else is checked:
    /// there is no cap on text length and no range check on speed.
    ///
    /// Only an absent `text` or an unknown `voice` is the caller's fault.
    /// A field that is present but cannot be used as its type (`"text": null`,
    /// `"speed": null`) is a conversion failure. An explicit `"voice": null`
    /// names no known speaker and is rejected like any other unknown voice.
    pub fn from_json(body: &Value) -> TtsResult<Self> {
        let missing_text = || TtsError::invalid_input("Missing required field: text");

        let fields = body.as_object().ok_or_else(missing_text)?;

        let text = match fields.get("text") {
            None => return Err(missing_text()),
            Some(Value::String(text)) => text.clone(),
            Some(other) => {
                return Err(TtsError::conversion(format!(
                    "text must be a string, not {}",
                    json_type_name(other)
                )));
            }
        };

        let speed = match fields.get("speed") {
            None => DEFAULT_SPEED,
            Some(value) => coerce_speed(value)?,
        };

        let voice = match fields.get("voice") {
            None => Voice::default(),
            Some(Value::String(name)) => name.parse()?,
            Some(other) => {
                return Err(TtsError::invalid_input(format!("Invalid voice: {other}")));
            }
        };

        Ok(Self { text, voice, speed })
    }
}

fn coerce_speed(value: &Value) -> TtsResult<f32> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .map(|v| v as f32)
            .ok_or_else(|| TtsError::conversion(format!("could not convert {n} to float"))),
        Value::String(s) => s
            .trim()
            .parse::<f32>()
            .map_err(|_| TtsError::conversion(format!("could not convert string to float: '{s}'"))),
        other => Err(TtsError::conversion(format!(
            "could not convert {} to float",
            json_type_name(other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Mono float PCM produced by the inference engine.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Samples, nominally in [-1.0, 1.0].
    pub samples: Arc<[f32]>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Create a new audio buffer.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
        }
    }

    /// Get the number of samples.
    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    /// Playback duration in seconds, or `None` for a zero sample rate.
    pub fn duration_secs(&self) -> Option<f64> {
        (self.sample_rate > 0).then(|| self.samples.len() as f64 / self.sample_rate as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_voice_roundtrip_strings() {
        let names: Vec<&str> = Voice::ALL.iter().map(Voice::as_str).collect();
        assert_eq!(
            names,
            [
                "af_bella",
                "af_nicole",
                "af_sarah",
                "af_sky",
                "am_adam",
                "am_michael",
                "bf_emma",
                "bf_isabella",
                "bm"
            ]
        );
        for voice in Voice::ALL {
            assert_eq!(voice.to_string().parse::<Voice>().unwrap(), voice);
        }
    }

    #[test]
    fn test_voice_serde_matches_display() {
        for voice in Voice::ALL {
            let encoded = serde_json::to_value(voice).unwrap();
            assert_eq!(encoded, json!(voice.as_str()));
        }
    }

    #[test]
    fn test_voice_parse_is_case_sensitive() {
        let err = "AF_BELLA".parse::<Voice>().unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "Invalid voice: AF_BELLA");
    }

    #[test]
    fn test_default_voice() {
        assert_eq!(Voice::default(), Voice::AfBella);
        assert!(Voice::Bm.is_british());
        assert!(Voice::BfEmma.is_british());
        assert!(!Voice::AmAdam.is_british());
    }

    #[test]
    fn test_request_defaults() {
        let req = SynthesisRequest::from_json(&json!({"text": "Hello world"})).unwrap();
        assert_eq!(req, SynthesisRequest::new("Hello world"));
        assert_eq!(req.voice, Voice::AfBella);
        assert!((req.speed - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_request_all_fields() {
        let req = SynthesisRequest::from_json(&json!({
            "text": "Hi",
            "voice": "bm",
            "speed": 1.5,
            "temperature": 0.7
        }))
        .unwrap();
        assert_eq!(
            req,
            SynthesisRequest::new("Hi")
                .with_voice(Voice::Bm)
                .with_speed(1.5)
        );
    }

    #[test]
    fn test_request_missing_text() {
        for body in [json!({}), json!({"voice": "bm"}), json!(null), json!([])] {
            let err = SynthesisRequest::from_json(&body).unwrap_err();
            assert!(err.is_client_error());
            assert_eq!(err.to_string(), "Missing required field: text");
        }
    }

    #[test]
    fn test_request_non_string_text() {
        let err = SynthesisRequest::from_json(&json!({"text": 42})).unwrap_err();
        assert!(matches!(err, TtsError::Conversion(_)));
        assert!(!err.is_client_error());

        // Present but null is not the same as absent.
        let err = SynthesisRequest::from_json(&json!({"text": null})).unwrap_err();
        assert!(!err.is_client_error());
        assert_eq!(err.to_string(), "text must be a string, not null");
    }

    #[test]
    fn test_request_null_voice_is_invalid() {
        let err = SynthesisRequest::from_json(&json!({"text": "hi", "voice": null})).unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "Invalid voice: null");
    }

    #[test]
    fn test_request_null_speed_is_conversion_error() {
        let err = SynthesisRequest::from_json(&json!({"text": "hi", "speed": null})).unwrap_err();
        assert!(matches!(err, TtsError::Conversion(_)));
        assert_eq!(err.to_string(), "could not convert null to float");
    }

    #[test]
    fn test_request_empty_text_is_accepted() {
        let req = SynthesisRequest::from_json(&json!({"text": ""})).unwrap();
        assert!(req.text.is_empty());
    }

    #[test]
    fn test_request_invalid_voice() {
        let err = SynthesisRequest::from_json(&json!({"text": "a", "voice": "zz"})).unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "Invalid voice: zz");

        let err = SynthesisRequest::from_json(&json!({"text": "a", "voice": 3})).unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_request_speed_coercion() {
        let req = SynthesisRequest::from_json(&json!({"text": "a", "speed": "1.25"})).unwrap();
        assert!((req.speed - 1.25).abs() < f32::EPSILON);

        let req = SynthesisRequest::from_json(&json!({"text": "a", "speed": 2})).unwrap();
        assert!((req.speed - 2.0).abs() < f32::EPSILON);

        // No range check: the engine decides what it accepts.
        let req = SynthesisRequest::from_json(&json!({"text": "a", "speed": -3.0})).unwrap();
        assert!((req.speed + 3.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_request_unconvertible_speed_is_not_client_error() {
        let err = SynthesisRequest::from_json(&json!({"text": "a", "speed": "fast"})).unwrap_err();
        assert!(!err.is_client_error());
        assert_eq!(err.to_string(), "could not convert string to float: 'fast'");

        let err = SynthesisRequest::from_json(&json!({"text": "a", "speed": [1]})).unwrap_err();
        assert!(matches!(err, TtsError::Conversion(_)));
    }

    #[test]
    fn test_audio_buffer_duration() {
        let audio = AudioBuffer::new(vec![0.0; 12000], 24000);
        assert_eq!(audio.num_samples(), 12000);
        assert_eq!(audio.duration_secs(), Some(0.5));

        let empty = AudioBuffer::new(Vec::new(), 24000);
        assert_eq!(empty.duration_secs(), Some(0.0));

        let broken = AudioBuffer::new(vec![0.0; 10], 0);
        assert_eq!(broken.duration_secs(), None);
    }
}
