//! HTTP handlers for the synthesis service.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderName, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, instrument};

use audio_codec::{EncodedWav, encode_audio};
use runtime::TtsMetrics;
use tts_core::{Synthesizer, SynthesisRequest, TtsError, TtsResult, Voice};

/// Name reported by the health endpoint.
pub const SERVICE_NAME: &str = "kokoro-tts";

/// Response header carrying the audio duration in seconds.
pub const X_AUDIO_DURATION: HeaderName = HeaderName::from_static("x-audio-duration");

/// Response header carrying the sample rate in Hz.
pub const X_SAMPLE_RATE: HeaderName = HeaderName::from_static("x-sample-rate");

/// Shared handler state.
pub struct AppState {
    synthesizer: Arc<dyn Synthesizer>,
    metrics: TtsMetrics,
}

impl AppState {
    /// Create handler state around a loaded model handle.
    pub fn new(synthesizer: Arc<dyn Synthesizer>, metrics: TtsMetrics) -> Self {
        Self {
            synthesizer,
            metrics,
        }
    }
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
}

/// Voice listing response.
#[derive(Serialize)]
struct VoicesResponse {
    voices: [Voice; 9],
    default: Voice,
}

/// Error body for 4xx/5xx responses.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Error returned from handlers, rendered as `{"error": ...}`.
#[derive(Debug)]
pub struct ApiError(TtsError);

impl From<TtsError> for ApiError {
    fn from(err: TtsError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            debug!(error = %self.0, "Rejected synthesis request");
            StatusCode::BAD_REQUEST
        } else {
            error!(error = %self.0, detail = ?self.0, "Error generating speech");
            StatusCode::INTERNAL_SERVER_ERROR
        };

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// `GET /health`
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        service: SERVICE_NAME,
    })
}

/// `GET /voices`
pub async fn voices_handler() -> impl IntoResponse {
    Json(VoicesResponse {
        voices: Voice::ALL,
        default: Voice::default(),
    })
}

/// `POST /synthesize`
pub async fn synthesize_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    state.metrics.request_received();

    match synthesize(&state, &body).await {
        Ok(wav) => {
            state.metrics.request_completed(wav.duration_secs);
            Ok(wav_response(wav))
        }
        Err(err) => {
            if err.is_client_error() {
                state.metrics.request_rejected();
            } else {
                state.metrics.request_failed();
            }
            Err(err.into())
        }
    }
}

#[instrument(skip_all, fields(engine = state.synthesizer.name()))]
async fn synthesize(state: &AppState, body: &[u8]) -> TtsResult<EncodedWav> {
    let request = SynthesisRequest::from_json(&parse_body(body)?)?;

    info!(
        voice = %request.voice,
        speed = request.speed,
        text_len = request.text.len(),
        "Synthesizing speech"
    );

    let started = Instant::now();
    let synthesizer = Arc::clone(&state.synthesizer);
    let audio = tokio::task::spawn_blocking(move || {
        synthesizer.synthesize(&request.text, request.voice, request.speed)
    })
    .await
    .map_err(|e| TtsError::internal(format!("synthesis task failed: {e}")))??;
    let inference_ms = started.elapsed().as_secs_f64() * 1000.0;
    state.metrics.record_inference_latency(inference_ms);

    let wav = encode_audio(&audio)?;

    info!(
        samples = wav.num_samples,
        sample_rate = wav.sample_rate,
        duration_secs = wav.duration_secs,
        inference_ms,
        "Synthesis completed"
    );

    Ok(wav)
}

/// Decode the request body as JSON regardless of its content type.
///
/// A blank body carries no `text` and is left to the validator. Anything
/// else that fails to parse is a decoding failure, not a client error.
fn parse_body(body: &[u8]) -> TtsResult<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|e| TtsError::conversion(format!("Invalid JSON body: {e}")))
}

fn wav_response(wav: EncodedWav) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "audio/wav".to_string()),
            (
                header::CONTENT_DISPOSITION,
                "inline; filename=\"speech.wav\"".to_string(),
            ),
            (X_AUDIO_DURATION, format_seconds(wav.duration_secs)),
            (X_SAMPLE_RATE, wav.sample_rate.to_string()),
        ],
        wav.bytes,
    )
        .into_response()
}

/// Shortest round-trip decimal, laid out like Python's `repr(float)`: fixed
/// notation with a fractional part for magnitudes in [1e-4, 1e16), otherwise
/// scientific with a signed exponent of at least two digits.
fn format_seconds(secs: f64) -> String {
    let magnitude = secs.abs();
    if magnitude == 0.0 || (1e-4..1e16).contains(&magnitude) || !secs.is_finite() {
        return format!("{secs:?}");
    }

    let scientific = format!("{secs:e}");
    match scientific.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => scientific,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(1.0), "1.0");
        assert_eq!(format_seconds(0.5), "0.5");
        assert_eq!(format_seconds(0.0), "0.0");
        assert_eq!(format_seconds(15600.0 / 24000.0), "0.65");
        assert_eq!(format_seconds(0.0001), "0.0001");
    }

    #[test]
    fn test_format_seconds_small_values_use_padded_exponent() {
        // A few samples at 24 kHz fall below 1e-4 seconds.
        assert_eq!(format_seconds(1.5 / 24000.0), "6.25e-05");
        assert_eq!(format_seconds(1.0 / 24000.0), "4.1666666666666665e-05");
        assert_eq!(format_seconds(1e-10), "1e-10");
        assert_eq!(format_seconds(1e16), "1e+16");
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(b"").unwrap(), Value::Null);
        assert_eq!(parse_body(b"  \n").unwrap(), Value::Null);
        assert!(parse_body(br#"{"text": "hi"}"#).unwrap().is_object());

        let err = parse_body(b"{text").unwrap_err();
        assert!(!err.is_client_error());
        assert!(err.to_string().starts_with("Invalid JSON body"));
    }

    #[test]
    fn test_api_error_status() {
        let res = ApiError::from(TtsError::invalid_input("bad")).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = ApiError::from(TtsError::inference("boom")).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let res = ApiError::from(TtsError::conversion("could not convert")).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_wav_response_headers() {
        let wav = EncodedWav {
            bytes: vec![1, 2, 3],
            sample_rate: 24000,
            num_samples: 24000,
            duration_secs: 1.0,
        };
        let res = wav_response(wav);

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "audio/wav");
        assert_eq!(res.headers()[X_AUDIO_DURATION], "1.0");
        assert_eq!(res.headers()[X_SAMPLE_RATE], "24000");
    }
}
