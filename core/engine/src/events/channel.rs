use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};

use crate::error::PlayerResult;

use super::{EventBus, PlayerEvent};

/// Channel-backed [`EventBus`]: each subscriber gets an unbounded receiver,
/// publishing fans out to all of them. Subscribers that dropped their
/// receiver are pruned on the next publish.
pub struct ChannelEventBus {
    subscribers: Arc<RwLock<Vec<mpsc::UnboundedSender<PlayerEvent>>>>,
}

impl ChannelEventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl Default for ChannelEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for ChannelEventBus {
    async fn publish(&self, event: PlayerEvent) -> PlayerResult<()> {
        let mut subs = self.subscribers.write().await;
        subs.retain(|tx| tx.send(event.clone()).is_ok());
        Ok(())
    }

    async fn subscribe(&self) -> mpsc::UnboundedReceiver<PlayerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.write().await.push(tx);
        rx
    }
}
