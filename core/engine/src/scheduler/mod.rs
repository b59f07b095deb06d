//! Prefetch and buffer-health maintenance.
//!
//! A periodic task keeps a rolling audio buffer ahead of the clock and, once
//! a slide's chunks are exhausted, watches for the completion criteria and
//! triggers the transition. Each tick captures the context generation before
//! its network round trip and discards the result if a seek or slide change
//! happened in the meantime, so a stale fetch can never land in the wrong
//! slide's buffer.

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::PlayerResult;
use crate::player::{LessonPlayer, SlidePhase};

pub struct PrefetchScheduler {
    player: LessonPlayer,
}

impl PrefetchScheduler {
    pub fn new(player: &LessonPlayer) -> Self {
        Self {
            player: player.clone(),
        }
    }

    /// One maintenance pass: top up the buffer if chunks remain and it is
    /// under target, otherwise check slide completion. No-ops while paused.
    pub async fn tick(&self) -> PlayerResult<()> {
        let (gen, next_chunk, chunk_url, chunk_count) = {
            let ctx = self.player.ctx.read().await;
            if ctx.finished || !ctx.playing {
                return Ok(());
            }
            let Some(slide) = ctx.manifest.slides.get(ctx.slide_index) else {
                return Ok(());
            };
            (
                ctx.generation,
                ctx.next_chunk,
                slide.audio_manifest.chunks.get(ctx.next_chunk).cloned(),
                slide.audio_manifest.chunks.len(),
            )
        };

        let Some(url) = chunk_url else {
            self.player.try_complete().await?;
            return Ok(());
        };

        if self.player.backend.buffered_seconds().await >= self.player.config.target_buffer_secs {
            return Ok(());
        }

        let bytes = self.player.pipeline.fetch_chunk(&url).await?;

        // Re-check and buffer under the context write lock so a seek cannot
        // interleave between the check and the append; seeks invalidate the
        // generation before touching audio, so a stale chunk is either
        // discarded here or cleared by the seek's stop.
        let mut ctx = self.player.ctx.write().await;
        if ctx.generation != gen {
            debug!(url, "discarding stale prefetched chunk");
            return Ok(());
        }
        self.player.pipeline.buffer_chunk(&url, &bytes).await?;
        ctx.next_chunk = next_chunk + 1;
        if ctx.next_chunk >= chunk_count {
            ctx.phase = SlidePhase::Draining;
        }
        Ok(())
    }

    /// Runs ticks at the configured cadence until the lesson finishes.
    /// A failed tick (a chunk whose retries are exhausted) is logged and the
    /// loop continues; the stall monitor reports the consequence.
    pub async fn run(self) {
        let cadence = Duration::from_millis(self.player.config.prefetch_interval_ms);
        let mut interval = tokio::time::interval(cadence);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if self.player.finished().await {
                break;
            }
            if let Err(e) = self.tick().await {
                warn!(error = %e, "prefetch tick failed");
            }
        }
    }
}
