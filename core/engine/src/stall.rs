//! Buffer-underrun detection.
//!
//! Detection only: recovery is a policy decision for the surrounding
//! application. Edge-triggered so a long stall emits one event, re-arming
//! once the buffer recovers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::events::PlayerEvent;
use crate::player::LessonPlayer;

pub struct StallMonitor {
    player: LessonPlayer,
    armed: AtomicBool,
}

impl StallMonitor {
    pub fn new(player: &LessonPlayer) -> Self {
        Self {
            player: player.clone(),
            armed: AtomicBool::new(true),
        }
    }

    /// One detection pass: fires `PlaybackStalled` when playback is active
    /// but buffered audio has dropped below the stall threshold.
    pub async fn tick(&self) {
        let playing = {
            let ctx = self.player.ctx.read().await;
            ctx.playing && !ctx.finished
        };
        let buffered = self.player.backend.buffered_seconds().await;
        if playing && buffered < self.player.config.stall_threshold_secs {
            if self.armed.swap(false, Ordering::SeqCst) {
                self.player
                    .emit(PlayerEvent::PlaybackStalled {
                        buffered_seconds: buffered,
                    })
                    .await;
            }
        } else if buffered >= self.player.config.stall_threshold_secs {
            self.armed.store(true, Ordering::SeqCst);
        }
    }

    pub async fn run(self) {
        let cadence = Duration::from_millis(self.player.config.stall_interval_ms);
        let mut interval = tokio::time::interval(cadence);
        loop {
            interval.tick().await;
            if self.player.finished().await {
                break;
            }
            self.tick().await;
        }
    }
}
