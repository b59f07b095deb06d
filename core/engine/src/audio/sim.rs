//! Virtual-clock audio backend for tests and headless runs.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{PlayerError, PlayerResult};

use super::AudioBackend;

struct SimState {
    now: f64,
    play_head: f64,
    last_start_at: f64,
    rms: f32,
    paused: bool,
    fail_streaming_decode: bool,
    appended: Vec<Vec<u8>>,
    crossfades: Vec<Vec<u8>>,
}

/// Deterministic [`AudioBackend`]: every accepted chunk contributes a fixed
/// duration, and the clock only moves when `advance` is called. While paused
/// the play head moves with the clock so buffered audio is not consumed.
pub struct SimulatedAudioBackend {
    chunk_duration_secs: f64,
    state: Arc<RwLock<SimState>>,
}

impl SimulatedAudioBackend {
    pub fn new(chunk_duration_secs: f64) -> Self {
        Self {
            chunk_duration_secs,
            state: Arc::new(RwLock::new(SimState {
                now: 0.0,
                play_head: 0.0,
                last_start_at: 0.0,
                rms: 0.0,
                paused: false,
                fail_streaming_decode: false,
                appended: Vec::new(),
                crossfades: Vec::new(),
            })),
        }
    }

    /// Advance the virtual audio clock.
    pub async fn advance(&self, secs: f64) {
        let mut s = self.state.write().await;
        s.now += secs;
        if s.paused {
            s.play_head += secs;
        }
        if s.play_head < s.now {
            s.play_head = s.now;
        }
    }

    pub async fn set_rms(&self, rms: f32) {
        self.state.write().await.rms = rms;
    }

    /// Make `append_chunk` fail, exercising the full-buffer fallback path.
    pub async fn set_fail_streaming_decode(&self, fail: bool) {
        self.state.write().await.fail_streaming_decode = fail;
    }

    /// Payloads accepted so far, in scheduling order.
    pub async fn appended(&self) -> Vec<Vec<u8>> {
        self.state.read().await.appended.clone()
    }

    pub async fn crossfade_count(&self) -> usize {
        self.state.read().await.crossfades.len()
    }

    fn schedule(&self, s: &mut SimState, bytes: &[u8]) -> f64 {
        let start = s.play_head.max(s.now);
        s.last_start_at = start;
        s.play_head = start + self.chunk_duration_secs;
        s.appended.push(bytes.to_vec());
        (s.play_head - s.now).max(0.0)
    }
}

#[async_trait]
impl AudioBackend for SimulatedAudioBackend {
    async fn append_chunk(&self, bytes: &[u8]) -> PlayerResult<f64> {
        let mut s = self.state.write().await;
        if s.fail_streaming_decode {
            return Err(PlayerError::decode("simulated streaming decode failure"));
        }
        Ok(self.schedule(&mut s, bytes))
    }

    async fn schedule_complete(&self, bytes: &[u8]) -> PlayerResult<f64> {
        let mut s = self.state.write().await;
        Ok(self.schedule(&mut s, bytes))
    }

    async fn buffered_seconds(&self) -> f64 {
        let s = self.state.read().await;
        (s.play_head - s.now).max(0.0)
    }

    async fn clock_now(&self) -> f64 {
        self.state.read().await.now
    }

    async fn last_start_at(&self) -> f64 {
        self.state.read().await.last_start_at
    }

    async fn rms(&self) -> f32 {
        self.state.read().await.rms
    }

    async fn crossfade_to(&self, bytes: &[u8], _fade_secs: f64) -> PlayerResult<()> {
        let mut s = self.state.write().await;
        // The outgoing buffer fades instead of playing out; cut it here.
        s.play_head = s.now;
        self.schedule(&mut s, bytes);
        s.crossfades.push(bytes.to_vec());
        Ok(())
    }

    async fn pause(&self) -> PlayerResult<()> {
        self.state.write().await.paused = true;
        Ok(())
    }

    async fn resume(&self) -> PlayerResult<()> {
        self.state.write().await.paused = false;
        Ok(())
    }

    async fn stop(&self) -> PlayerResult<()> {
        let mut s = self.state.write().await;
        s.play_head = s.now;
        s.appended.clear();
        Ok(())
    }
}
