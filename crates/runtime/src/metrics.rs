//! Metrics collection and Prometheus export.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tts_core::{TtsError, TtsResult};

/// Metrics recorder for synthesis requests.
///
/// Without an installed recorder every call is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct TtsMetrics;

impl TtsMetrics {
    /// Install the Prometheus recorder and start its HTTP listener.
    pub fn init(port: u16) -> TtsResult<Self> {
        let addr: SocketAddr = ([0, 0, 0, 0], port).into();

        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .map_err(|e| TtsError::internal(format!("metrics init failed: {e}")))?;

        Self::register_metrics();

        Ok(Self)
    }

    /// Metrics handle without an exporter (for testing).
    pub fn noop() -> Self {
        Self
    }

    fn register_metrics() {
        describe_counter!("tts_requests_total", "Synthesis requests received");
        describe_counter!(
            "tts_requests_completed",
            "Synthesis requests answered with audio"
        );
        describe_counter!(
            "tts_requests_rejected",
            "Synthesis requests refused for bad input"
        );
        describe_counter!(
            "tts_requests_failed",
            "Synthesis requests that failed server-side"
        );
        describe_histogram!(
            "tts_inference_latency_ms",
            "Engine inference latency in milliseconds"
        );
        describe_histogram!(
            "tts_audio_duration_seconds",
            "Duration of returned audio in seconds"
        );
    }

    /// Record a new request received.
    pub fn request_received(&self) {
        counter!("tts_requests_total").increment(1);
    }

    /// Record a request completed successfully.
    pub fn request_completed(&self, audio_secs: f64) {
        counter!("tts_requests_completed").increment(1);
        histogram!("tts_audio_duration_seconds").record(audio_secs);
    }

    /// Record a request refused with a client error.
    pub fn request_rejected(&self) {
        counter!("tts_requests_rejected").increment(1);
    }

    /// Record a request that failed server-side.
    pub fn request_failed(&self) {
        counter!("tts_requests_failed").increment(1);
    }

    /// Record inference latency.
    pub fn record_inference_latency(&self, ms: f64) {
        histogram!("tts_inference_latency_ms").record(ms);
    }
}
