use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PlayerResult;
use crate::types::VariantParams;

/// Tunables and environment wiring for the playback engine. Defaults match
/// production behavior; a development build overrides `cors_proxy`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Prefix prepended to asset URLs in development to satisfy CORS.
    pub cors_proxy: Option<String>,
    /// Progress events are POSTed here when set, fire-and-forget.
    pub analytics_endpoint: Option<String>,
    pub variant: VariantParams,
    /// Prefetch keeps this many seconds of audio buffered.
    pub target_buffer_secs: f64,
    /// Below this the slide is considered drained for completion purposes.
    pub low_buffer_secs: f64,
    /// Below this while playing, the stall monitor fires.
    pub stall_threshold_secs: f64,
    pub prefetch_interval_ms: u64,
    pub stall_interval_ms: u64,
    /// Crossfade window for variant changes, also the scheduling lead.
    pub crossfade_ms: u64,
    /// Completion may fire this long before the slide deadline.
    pub completion_slack_ms: u64,
    /// RMS above this counts as audible speech for onset correction.
    pub onset_rms_threshold: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            cors_proxy: None,
            analytics_endpoint: None,
            variant: VariantParams::default(),
            target_buffer_secs: 3.0,
            low_buffer_secs: 0.6,
            stall_threshold_secs: 0.2,
            prefetch_interval_ms: 250,
            stall_interval_ms: 200,
            crossfade_ms: 200,
            completion_slack_ms: 150,
            onset_rms_threshold: 0.01,
        }
    }
}

#[async_trait]
pub trait ConfigManager: Send + Sync {
    async fn load(&self) -> PlayerResult<PlayerConfig>;
    async fn current(&self) -> PlayerResult<PlayerConfig>;
}

/// In-memory configuration, fixed at construction.
pub struct StaticConfigManager {
    config: PlayerConfig,
}

impl StaticConfigManager {
    pub fn new(config: PlayerConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ConfigManager for StaticConfigManager {
    async fn load(&self) -> PlayerResult<PlayerConfig> {
        Ok(self.config.clone())
    }

    async fn current(&self) -> PlayerResult<PlayerConfig> {
        Ok(self.config.clone())
    }
}
