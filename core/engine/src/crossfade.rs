//! Variant crossfade: applies a personalization change at the next safe
//! audio boundary instead of interrupting a word mid-utterance.
//!
//! The swap itself is mechanical (resolve manifest, fetch the slide's first
//! chunk, fade old out / new in over the crossfade window); the contract
//! worth guarding is the timing, so boundary selection is a pure function.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::{PlayerError, PlayerResult};
use crate::events::PlayerEvent;
use crate::manifest::LessonManifest;
use crate::player::{LessonPlayer, SlideAssets, SlidePhase};
use crate::types::VariantParams;

/// Outcome of a variant-change request: when the swap will happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedBoundary {
    pub applied_boundary_ms: u64,
}

/// External collaborator that turns personalization parameters into a fresh
/// lesson manifest. Content resolution itself is out of this engine's hands.
#[async_trait]
pub trait VariantResolver: Send + Sync {
    async fn resolve(&self, params: &VariantParams) -> PlayerResult<LessonManifest>;
}

/// Default resolver when no variant backend is wired up.
pub struct UnconfiguredVariantResolver;

#[async_trait]
impl VariantResolver for UnconfiguredVariantResolver {
    async fn resolve(&self, _params: &VariantParams) -> PlayerResult<LessonManifest> {
        Err(PlayerError::new("no variant resolver configured"))
    }
}

/// First sentence boundary strictly after `elapsed_ms`. With no boundary
/// left (or none authored, the single-window case) the swap point is the
/// end of the slide.
pub fn next_boundary_after(boundaries: &[u64], target_duration_ms: u64, elapsed_ms: i64) -> u64 {
    let slide_end = target_duration_ms.max(boundaries.last().copied().unwrap_or(0));
    boundaries
        .iter()
        .copied()
        .find(|&b| (b as i64) > elapsed_ms)
        .unwrap_or(slide_end)
}

impl LessonPlayer {
    /// Schedules a personalization change for the next sentence boundary
    /// and returns immediately with the chosen boundary. The swap is
    /// abandoned silently if a seek or slide transition happens first.
    pub async fn request_variant_change(
        &self,
        params: VariantParams,
    ) -> PlayerResult<AppliedBoundary> {
        let (gen, index, boundaries, target_ms) = {
            let ctx = self.ctx.read().await;
            if ctx.finished {
                return Err(PlayerError::new("lesson already completed"));
            }
            let slide = ctx
                .manifest
                .slides
                .get(ctx.slide_index)
                .ok_or_else(|| PlayerError::new("no active slide"))?;
            (
                ctx.generation,
                ctx.slide_index,
                slide.sentence_boundaries_ms.clone(),
                slide.target_duration_ms,
            )
        };
        let elapsed = self.elapsed_ms().await;
        let boundary = next_boundary_after(&boundaries, target_ms, elapsed);
        // Start the fade early enough that the blend completes at the
        // boundary itself.
        let lead_ms = (boundary as i64 - self.config.crossfade_ms as i64 - elapsed).max(0) as u64;

        let player = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(lead_ms)).await;
            if let Err(e) = player
                .apply_variant_change(params, gen, index, boundary)
                .await
            {
                warn!(error = %e, "variant change abandoned");
            }
        });
        Ok(AppliedBoundary {
            applied_boundary_ms: boundary,
        })
    }

    pub(crate) async fn apply_variant_change(
        &self,
        params: VariantParams,
        gen: u64,
        index: usize,
        boundary_ms: u64,
    ) -> PlayerResult<()> {
        {
            let ctx = self.ctx.read().await;
            if ctx.generation != gen || ctx.slide_index != index {
                // Superseded while we waited for the boundary.
                return Ok(());
            }
        }
        let manifest = self.resolver.resolve(&params).await?;
        if !manifest.validate() {
            warn!("variant manifest failed validation, degrading");
        }
        let (chunk0, chunk_count) = {
            let slide = manifest
                .slides
                .get(index)
                .ok_or_else(|| PlayerError::new("variant manifest is missing the active slide"))?;
            let chunk0 = slide
                .audio_manifest
                .chunks
                .first()
                .cloned()
                .ok_or_else(|| PlayerError::new("variant slide has no audio"))?;
            (chunk0, slide.audio_manifest.chunks.len())
        };
        let bytes = self.pipeline.fetch_chunk(&chunk0).await?;
        let fade_secs = self.config.crossfade_ms as f64 / 1000.0;

        // Holding the context write lock through the swap keeps the
        // prefetch scheduler from racing a slide transition against it.
        {
            let mut ctx = self.ctx.write().await;
            if ctx.generation != gen || ctx.slide_index != index {
                return Ok(());
            }
            self.backend.crossfade_to(&bytes, fade_secs).await?;
            ctx.manifest = manifest;
            ctx.next_chunk = 1;
            ctx.origin_secs = self.backend.last_start_at().await;
            ctx.onset_corrected = false;
            ctx.assets = SlideAssets::default();
            ctx.phase = if chunk_count == 1 {
                SlidePhase::Draining
            } else {
                SlidePhase::Playing
            };
        }
        self.emit(PlayerEvent::VariantChanged {
            applied_boundary_ms: boundary_ms,
        })
        .await;
        self.load_side_assets(index, gen).await;
        Ok(())
    }
}
