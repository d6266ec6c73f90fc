//! Trait definitions for pipeline components.

use crate::error::TtsResult;
use crate::types::{AudioBuffer, Voice};

/// Text-to-speech inference boundary.
///
/// Implementations convert text into mono float PCM. A call blocks until the
/// engine returns and is made exactly once per request; implementations must
/// tolerate concurrent callers since one handle serves every request.
pub trait Synthesizer: Send + Sync {
    /// Synthesize `text` with the given speaker profile and speed multiplier.
    ///
    /// # Arguments
    /// * `text` - Text to speak, passed through unmodified
    /// * `voice` - Speaker profile
    /// * `speed` - Playback speed multiplier (1.0 = natural)
    ///
    /// # Returns
    /// Samples in [-1.0, 1.0] and their sample rate.
    fn synthesize(&self, text: &str, voice: Voice, speed: f32) -> TtsResult<AudioBuffer>;

    /// Short name of the backing engine, used in logs.
    fn name(&self) -> &str;
}
