//! Manifest-driven synchronized lesson playback engine.
//!
//! Takes a declarative five-slide lesson manifest, streams chunked
//! compressed audio per slide, decodes compact binary viseme/expression
//! timelines, and keeps captions, read-along highlighting, lip-sync
//! animation and interactive overlays aligned to one audio clock — while
//! tolerating network jitter, mid-playback personalization changes and
//! partial asset failures. Rendering and audio decoding live behind
//! collaborator traits; this crate owns sequencing, timing and state.

pub mod audio;
pub mod captions;
pub mod config_manager;
pub mod crossfade;
pub mod error;
pub mod events;
pub mod fetch;
pub mod manifest;
pub mod player;
pub mod scheduler;
pub mod stall;
pub mod timeline;
pub mod types;

pub use audio::{AudioBackend, SimulatedAudioBackend};
pub use captions::{
    caption_view, parse_vtt, window_for, CaptionCue, CaptionView, WordView,
};
pub use config_manager::{ConfigManager, PlayerConfig, StaticConfigManager};
pub use crossfade::{
    next_boundary_after, AppliedBoundary, UnconfiguredVariantResolver, VariantResolver,
};
pub use error::{PlayerError, PlayerResult};
pub use events::{
    AnalyticsSink, ChannelEventBus, EventBus, HttpAnalyticsSink, NullAnalyticsSink, PlayerEvent,
};
pub use fetch::{AudioPipeline, ChunkFetcher, HttpChunkFetcher};
pub use manifest::{
    AudioManifest, LessonManifest, OverlayPlan, QaChoice, QaSet, Slide, SLIDE_COUNT,
};
pub use player::{
    AnimationFrame, ChannelSample, LessonPlayer, LessonPlayerBuilder, OverlayPhase, PlayerContext,
    PopupView, SlideAssets, SlidePhase,
};
pub use scheduler::PrefetchScheduler;
pub use stall::StallMonitor;
pub use timeline::{
    active_viseme, channel_value, decode_expression_tracks, decode_viseme_timeline,
    ExpressionChannel, ExpressionKey, ExpressionTracks, VisemeFrame, VisemeTimeline, WireType,
};
pub use types::{PlayerSnapshot, VariantParams, WordTiming};
