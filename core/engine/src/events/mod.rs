mod analytics;
mod channel;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::PlayerResult;

pub use analytics::{AnalyticsSink, HttpAnalyticsSink, NullAnalyticsSink};
pub use channel::ChannelEventBus;

/// Progress events emitted by the engine. Payload shapes are checked at
/// compile time; the serialized form is what an analytics endpoint receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlayerEvent {
    SlideStarted {
        slide_index: usize,
    },
    SlideCompleted {
        slide_index: usize,
    },
    LessonCompleted,
    VariantChanged {
        applied_boundary_ms: u64,
    },
    PlaybackStalled {
        buffered_seconds: f64,
    },
    Choice {
        choice_id: String,
        feedback: Option<String>,
    },
}

/// Local pub-sub for player events, at-least-once per live subscriber.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, event: PlayerEvent) -> PlayerResult<()>;
    async fn subscribe(&self) -> mpsc::UnboundedReceiver<PlayerEvent>;
}
