mod sim;

use async_trait::async_trait;

use crate::error::PlayerResult;

pub use sim::SimulatedAudioBackend;

/// Platform audio collaborator: owns the real decode/schedule machinery
/// (a Web Audio context in the browser build) and the audio clock every
/// other component aligns to.
///
/// Chunks are scheduled back to back at a play head; `last_start_at` is the
/// audio-clock time the most recent buffer was scheduled to begin, which the
/// controller uses as a slide's clock origin.
#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Streaming-decode a primary-format chunk and schedule it at the play
    /// head. Returns total buffered seconds ahead of the clock.
    async fn append_chunk(&self, bytes: &[u8]) -> PlayerResult<f64>;

    /// Decode a complete buffer (fallback format path) and schedule it.
    /// Returns total buffered seconds ahead of the clock.
    async fn schedule_complete(&self, bytes: &[u8]) -> PlayerResult<f64>;

    /// Seconds of scheduled audio remaining ahead of the clock.
    async fn buffered_seconds(&self) -> f64;

    /// The audio clock, in seconds. All elapsed-time math uses this base.
    async fn clock_now(&self) -> f64;

    /// Scheduled start time of the most recently accepted buffer.
    async fn last_start_at(&self) -> f64;

    /// Live output RMS, for speech-onset detection.
    async fn rms(&self) -> f32;

    /// Fade the currently scheduled audio out and the given buffer in over
    /// `fade_secs`, starting now.
    async fn crossfade_to(&self, bytes: &[u8], fade_secs: f64) -> PlayerResult<()>;

    async fn pause(&self) -> PlayerResult<()>;

    async fn resume(&self) -> PlayerResult<()>;

    /// Stop and drop everything scheduled. The clock keeps running.
    async fn stop(&self) -> PlayerResult<()>;
}
