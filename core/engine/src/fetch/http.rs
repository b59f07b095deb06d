use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{PlayerError, PlayerResult};

use super::ChunkFetcher;

/// HTTP fetcher for manifest assets and audio chunks.
pub struct HttpChunkFetcher {
    client: Client,
}

impl HttpChunkFetcher {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(10))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }
}

impl Default for HttpChunkFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChunkFetcher for HttpChunkFetcher {
    async fn fetch(&self, url: &str) -> PlayerResult<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PlayerError::fetch(url, e))?;
        if !response.status().is_success() {
            return Err(PlayerError::fetch(
                url,
                format!("HTTP {}", response.status()),
            ));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| PlayerError::fetch(url, e))?;
        Ok(bytes.to_vec())
    }
}
