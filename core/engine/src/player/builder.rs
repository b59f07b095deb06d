use std::sync::Arc;

use tokio::sync::RwLock;

use crate::audio::AudioBackend;
use crate::config_manager::PlayerConfig;
use crate::crossfade::{UnconfiguredVariantResolver, VariantResolver};
use crate::error::{PlayerError, PlayerResult};
use crate::events::{
    AnalyticsSink, ChannelEventBus, EventBus, HttpAnalyticsSink, NullAnalyticsSink,
};
use crate::fetch::{AudioPipeline, ChunkFetcher};
use crate::manifest::LessonManifest;

use super::{LessonPlayer, PlayerContext, SlideAssets, SlidePhase};

/// Wires a [`LessonPlayer`] from its collaborators. The manifest, audio
/// backend and fetcher are required; everything else has a sensible default.
pub struct LessonPlayerBuilder {
    manifest: Option<LessonManifest>,
    backend: Option<Arc<dyn AudioBackend>>,
    fetcher: Option<Arc<dyn ChunkFetcher>>,
    bus: Option<Arc<dyn EventBus>>,
    analytics: Option<Arc<dyn AnalyticsSink>>,
    resolver: Option<Arc<dyn VariantResolver>>,
    config: Option<PlayerConfig>,
}

impl LessonPlayerBuilder {
    pub fn new() -> Self {
        Self {
            manifest: None,
            backend: None,
            fetcher: None,
            bus: None,
            analytics: None,
            resolver: None,
            config: None,
        }
    }

    pub fn manifest(mut self, manifest: LessonManifest) -> Self {
        self.manifest = Some(manifest);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn AudioBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn ChunkFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn event_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn analytics(mut self, analytics: Arc<dyn AnalyticsSink>) -> Self {
        self.analytics = Some(analytics);
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn VariantResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn config(mut self, config: PlayerConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> PlayerResult<LessonPlayer> {
        let manifest = self
            .manifest
            .ok_or_else(|| PlayerError::new("manifest is required"))?;
        let backend = self
            .backend
            .ok_or_else(|| PlayerError::new("audio backend is required"))?;
        let fetcher = self
            .fetcher
            .ok_or_else(|| PlayerError::new("chunk fetcher is required"))?;
        let config = self.config.unwrap_or_default();
        let bus = self
            .bus
            .unwrap_or_else(|| Arc::new(ChannelEventBus::new()));
        let analytics = self.analytics.unwrap_or_else(|| {
            match &config.analytics_endpoint {
                Some(endpoint) => {
                    Arc::new(HttpAnalyticsSink::new(endpoint.clone())) as Arc<dyn AnalyticsSink>
                }
                None => Arc::new(NullAnalyticsSink),
            }
        });
        let resolver = self
            .resolver
            .unwrap_or_else(|| Arc::new(UnconfiguredVariantResolver));
        let pipeline = AudioPipeline::new(fetcher, Arc::clone(&backend), config.cors_proxy.clone());
        let ctx = PlayerContext {
            manifest,
            slide_index: 0,
            phase: SlidePhase::Loading,
            origin_secs: 0.0,
            next_chunk: 0,
            playing: false,
            assets: SlideAssets::default(),
            generation: 0,
            onset_corrected: false,
            finished: false,
        };
        Ok(LessonPlayer {
            ctx: Arc::new(RwLock::new(ctx)),
            backend,
            pipeline,
            bus,
            analytics,
            resolver,
            config,
        })
    }
}

impl Default for LessonPlayerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
