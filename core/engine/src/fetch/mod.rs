mod http;
mod pipeline;

use async_trait::async_trait;

use crate::error::PlayerResult;

pub use http::HttpChunkFetcher;
pub use pipeline::{
    sibling_fallback_url, AudioPipeline, BACKOFF_BASE_MS, FALLBACK_EXT, FETCH_ATTEMPTS,
    PRIMARY_EXT,
};

/// Raw byte retrieval for one asset URL. Implementations do a single
/// attempt; retry policy lives in [`AudioPipeline`].
#[async_trait]
pub trait ChunkFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> PlayerResult<Vec<u8>>;
}
