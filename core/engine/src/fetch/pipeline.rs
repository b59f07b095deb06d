//! Sequencing, retry and format fallback for chunked audio.
//!
//! The pipeline does no audio decoding itself; it hands bytes to the
//! [`AudioBackend`] and reacts to its verdicts. Fetches and buffering are
//! deliberately split (`fetch_chunk` / `buffer_chunk`) so a caller can
//! re-check cancellation between the network round trip and the point where
//! bytes would land in the audio buffer.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::audio::AudioBackend;
use crate::error::{PlayerError, PlayerResult};

use super::ChunkFetcher;

/// Attempts per URL before a fetch error propagates.
pub const FETCH_ATTEMPTS: u32 = 3;
/// Exponential backoff base between attempts, jittered.
pub const BACKOFF_BASE_MS: u64 = 250;
/// Primary compressed format, streaming-decoded chunk by chunk.
pub const PRIMARY_EXT: &str = ".opus";
/// Fallback format, decoded as one complete buffer.
pub const FALLBACK_EXT: &str = ".m4a";

/// Sibling URL with the fallback extension, if the URL is primary-format.
pub fn sibling_fallback_url(url: &str) -> Option<String> {
    url.strip_suffix(PRIMARY_EXT)
        .map(|stem| format!("{}{}", stem, FALLBACK_EXT))
}

#[derive(Clone)]
pub struct AudioPipeline {
    fetcher: Arc<dyn ChunkFetcher>,
    backend: Arc<dyn AudioBackend>,
    /// Development CORS proxy prefix; asset URLs are rewritten through it.
    cors_proxy: Option<String>,
}

impl AudioPipeline {
    pub fn new(
        fetcher: Arc<dyn ChunkFetcher>,
        backend: Arc<dyn AudioBackend>,
        cors_proxy: Option<String>,
    ) -> Self {
        Self {
            fetcher,
            backend,
            cors_proxy,
        }
    }

    pub fn rewrite_url(&self, url: &str) -> String {
        match &self.cors_proxy {
            Some(proxy) => format!("{}{}", proxy, url),
            None => url.to_string(),
        }
    }

    /// Fetches one asset with retry: up to [`FETCH_ATTEMPTS`] tries,
    /// exponential backoff with jitter in between.
    pub async fn fetch_chunk(&self, url: &str) -> PlayerResult<Vec<u8>> {
        let resolved = self.rewrite_url(url);
        let mut last_err = PlayerError::fetch(url, "no attempts made");
        for attempt in 0..FETCH_ATTEMPTS {
            match self.fetcher.fetch(&resolved).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    warn!(url, attempt, error = %e, "chunk fetch attempt failed");
                    last_err = e;
                }
            }
            if attempt + 1 < FETCH_ATTEMPTS {
                let backoff = BACKOFF_BASE_MS * 2u64.pow(attempt);
                let jitter = rand::thread_rng().gen_range(0..BACKOFF_BASE_MS);
                tokio::time::sleep(Duration::from_millis(backoff + jitter)).await;
            }
        }
        Err(last_err)
    }

    /// Hands fetched bytes to the audio backend, applying the format
    /// fallback ladder: primary streaming decode, then the same bytes as a
    /// complete buffer, then one fetch of the sibling fallback URL.
    /// Returns total buffered seconds.
    pub async fn buffer_chunk(&self, url: &str, bytes: &[u8]) -> PlayerResult<f64> {
        if url.ends_with(FALLBACK_EXT) {
            return self.backend.schedule_complete(bytes).await;
        }
        match self.backend.append_chunk(bytes).await {
            Ok(buffered) => return Ok(buffered),
            Err(e) => debug!(url, error = %e, "streaming decode failed, trying complete buffer"),
        }
        match self.backend.schedule_complete(bytes).await {
            Ok(buffered) => return Ok(buffered),
            Err(e) => debug!(url, error = %e, "complete-buffer decode failed"),
        }
        let Some(sibling) = sibling_fallback_url(url) else {
            return Err(PlayerError::decode(format!(
                "no fallback format for {}",
                url
            )));
        };
        warn!(url, sibling, "falling back to sibling format");
        let resolved = self.rewrite_url(&sibling);
        let fallback_bytes = self
            .fetcher
            .fetch(&resolved)
            .await
            .map_err(|e| PlayerError::fetch(&sibling, e))?;
        self.backend.schedule_complete(&fallback_bytes).await
    }

    /// `fetch_and_buffer_audio(url) -> buffered_seconds`, the one-call form.
    pub async fn fetch_and_buffer(&self, url: &str) -> PlayerResult<f64> {
        let bytes = self.fetch_chunk(url).await?;
        self.buffer_chunk(url, &bytes).await
    }
}
