//! Master clock and slide lifecycle controller.
//!
//! One [`LessonPlayer`] owns the single mutable [`PlayerContext`]; every
//! other component (prefetch scheduler, stall monitor, crossfade path) reads
//! snapshots of it and expresses intent through controller methods. A slide
//! moves `Loading -> Primed -> Playing -> Draining -> Completed`; the clock
//! origin is fixed to the scheduled start of the slide's first audio buffer,
//! not wall-clock "now", so fetch latency does not skew caption timing.

mod builder;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::audio::AudioBackend;
use crate::captions::{caption_view, parse_vtt, CaptionCue, CaptionView};
use crate::config_manager::PlayerConfig;
use crate::crossfade::VariantResolver;
use crate::error::{PlayerError, PlayerResult};
use crate::events::{AnalyticsSink, EventBus, PlayerEvent};
use crate::fetch::AudioPipeline;
use crate::manifest::{LessonManifest, Slide};
use crate::timeline::{
    active_viseme, channel_value, decode_expression_tracks, decode_viseme_timeline,
    ExpressionTracks, VisemeFrame, VisemeTimeline,
};
use crate::types::{PlayerSnapshot, WordTiming};

pub use builder::LessonPlayerBuilder;

/// Per-slide lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlidePhase {
    /// First audio chunk requested.
    Loading,
    /// First chunk buffered, clock origin fixed.
    Primed,
    /// Tickers running against the master clock.
    Playing,
    /// Last chunk requested and accepted by the buffer.
    Draining,
    Completed,
}

impl SlidePhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Primed => "primed",
            Self::Playing => "playing",
            Self::Draining => "draining",
            Self::Completed => "completed",
        }
    }
}

/// Decoded side assets for the active slide. Discarded on slide change.
#[derive(Debug, Clone, Default)]
pub struct SlideAssets {
    pub cues: Vec<CaptionCue>,
    pub words: Option<Vec<WordTiming>>,
    pub visemes: Option<VisemeTimeline>,
    pub expressions: Option<ExpressionTracks>,
}

/// The single source of truth all tickers read from.
pub struct PlayerContext {
    pub manifest: LessonManifest,
    pub slide_index: usize,
    pub phase: SlidePhase,
    /// Slide start, in the audio clock's time base (seconds).
    pub origin_secs: f64,
    /// Index of the next audio chunk to fetch for the active slide.
    pub next_chunk: usize,
    pub playing: bool,
    pub assets: SlideAssets,
    /// Bumped on every seek/slide load; async work captures the value it
    /// started under and discards its result if the context moved on.
    pub generation: u64,
    pub onset_corrected: bool,
    pub finished: bool,
}

/// Mouth shape plus expression-channel values at one clock sample.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationFrame {
    pub viseme: Option<VisemeFrame>,
    pub channels: Vec<ChannelSample>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSample {
    pub id: String,
    pub value: f32,
}

/// Current state of a box-breathing overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayPhase {
    pub label: &'static str,
    pub cycle: u32,
    /// 0..1 within the current phase.
    pub progress: f32,
}

/// A revealed popup for the active slide.
#[derive(Debug, Clone, PartialEq)]
pub struct PopupView {
    pub template_id: Option<String>,
    pub payload: serde_json::Value,
}

#[derive(Clone)]
pub struct LessonPlayer {
    pub(crate) ctx: Arc<RwLock<PlayerContext>>,
    pub(crate) backend: Arc<dyn AudioBackend>,
    pub(crate) pipeline: AudioPipeline,
    pub(crate) bus: Arc<dyn EventBus>,
    pub(crate) analytics: Arc<dyn AnalyticsSink>,
    pub(crate) resolver: Arc<dyn VariantResolver>,
    pub(crate) config: PlayerConfig,
}

impl LessonPlayer {
    /// Validates the manifest (non-fatally) and starts the first playable
    /// slide. Errors only when no slide is playable at all.
    pub async fn start(&self) -> PlayerResult<()> {
        {
            let ctx = self.ctx.read().await;
            if !ctx.manifest.validate() {
                warn!("manifest failed validation, degrading to playable slides");
            }
        }
        self.advance_from(0).await
    }

    /// Loads slide `index`: fetches chunk 0, fixes the clock origin to the
    /// scheduled start of that buffer, then pulls side assets best-effort.
    pub(crate) async fn load_slide(&self, index: usize) -> PlayerResult<()> {
        let (gen, chunk0, chunk_count) = {
            let mut ctx = self.ctx.write().await;
            ctx.generation += 1;
            ctx.slide_index = index;
            ctx.phase = SlidePhase::Loading;
            ctx.next_chunk = 0;
            ctx.onset_corrected = false;
            ctx.assets = SlideAssets::default();
            let slide = ctx
                .manifest
                .slides
                .get(index)
                .ok_or_else(|| PlayerError::new(format!("no slide {}", index)))?;
            let chunk0 = slide
                .audio_manifest
                .chunks
                .first()
                .cloned()
                .ok_or_else(|| PlayerError::new(format!("slide {} has no audio", index)))?;
            (ctx.generation, chunk0, slide.audio_manifest.chunks.len())
        };

        self.pipeline.fetch_and_buffer(&chunk0).await?;
        let origin = self.backend.last_start_at().await;
        {
            let mut ctx = self.ctx.write().await;
            if ctx.generation != gen {
                // A seek superseded this load while chunk 0 was in flight.
                return Ok(());
            }
            ctx.phase = SlidePhase::Primed;
            ctx.origin_secs = origin;
            ctx.next_chunk = 1;
        }
        self.backend.resume().await?;
        {
            let mut ctx = self.ctx.write().await;
            if ctx.generation != gen {
                return Ok(());
            }
            ctx.playing = true;
            ctx.phase = if chunk_count == 1 {
                SlidePhase::Draining
            } else {
                SlidePhase::Playing
            };
        }
        self.emit(PlayerEvent::SlideStarted { slide_index: index }).await;
        self.load_side_assets(index, gen).await;
        Ok(())
    }

    /// Captions, word timing and animation timelines. Any of these may fail
    /// without affecting audio; a missing timeline degrades animation to a
    /// neutral state and a missing word-timing file degrades read-along to
    /// whole cues.
    pub(crate) async fn load_side_assets(&self, index: usize, gen: u64) {
        let slide = {
            let ctx = self.ctx.read().await;
            if ctx.generation != gen {
                return;
            }
            match ctx.manifest.slides.get(index) {
                Some(s) => s.clone(),
                None => return,
            }
        };

        let mut assets = SlideAssets::default();
        if let Some(uri) = &slide.captions_vtt_uri {
            match self.pipeline.fetch_chunk(uri).await {
                Ok(bytes) => assets.cues = parse_vtt(&String::from_utf8_lossy(&bytes)),
                Err(e) => warn!(uri, error = %e, "captions unavailable"),
            }
        }
        if let Some(uri) = &slide.word_timing_json_uri {
            match self.pipeline.fetch_chunk(uri).await {
                Ok(bytes) => match serde_json::from_slice::<Vec<WordTiming>>(&bytes) {
                    Ok(words) => assets.words = Some(words),
                    Err(e) => warn!(uri, error = %e, "word timing unparsable"),
                },
                Err(e) => warn!(uri, error = %e, "word timing unavailable"),
            }
        }
        if let Some(uri) = &slide.viseme_timeline_pb_uri {
            match self.pipeline.fetch_chunk(uri).await {
                Ok(bytes) => assets.visemes = Some(decode_viseme_timeline(&bytes)),
                Err(e) => warn!(uri, error = %e, "viseme timeline unavailable"),
            }
        }
        if let Some(uri) = &slide.expression_tracks_pb_uri {
            match self.pipeline.fetch_chunk(uri).await {
                Ok(bytes) => assets.expressions = Some(decode_expression_tracks(&bytes)),
                Err(e) => warn!(uri, error = %e, "expression tracks unavailable"),
            }
        }

        let mut ctx = self.ctx.write().await;
        if ctx.generation == gen && ctx.slide_index == index {
            ctx.assets = assets;
        }
    }

    /// Skips unplayable slides until one loads or the lesson ends.
    pub(crate) async fn advance_from(&self, from: usize) -> PlayerResult<()> {
        let slide_total = self.ctx.read().await.manifest.slides.len();
        let mut candidate = from;
        while candidate < slide_total {
            let playable = {
                let ctx = self.ctx.read().await;
                ctx.manifest
                    .slides
                    .get(candidate)
                    .map(Slide::is_playable)
                    .unwrap_or(false)
            };
            if playable {
                return self.load_slide(candidate).await;
            }
            warn!(slide = candidate, "skipping unplayable slide");
            candidate += 1;
        }
        self.finish().await;
        Ok(())
    }

    async fn finish(&self) {
        {
            let mut ctx = self.ctx.write().await;
            ctx.finished = true;
            ctx.playing = false;
        }
        self.emit(PlayerEvent::LessonCompleted).await;
    }

    /// Slide-completion check: all chunks requested, remaining buffer below
    /// the low threshold, and the clock past the slide deadline (the later
    /// of the last sentence boundary and the target duration, minus slack).
    /// On completion the next slide's first chunk is requested immediately;
    /// completing the last slide ends the lesson.
    pub async fn try_complete(&self) -> PlayerResult<bool> {
        let (gen, index, deadline_ms, drained_all) = {
            let ctx = self.ctx.read().await;
            if ctx.finished || !ctx.playing {
                return Ok(false);
            }
            let Some(slide) = ctx.manifest.slides.get(ctx.slide_index) else {
                return Ok(false);
            };
            (
                ctx.generation,
                ctx.slide_index,
                slide.completion_deadline_ms() as i64,
                ctx.next_chunk >= slide.audio_manifest.chunks.len(),
            )
        };
        if !drained_all {
            return Ok(false);
        }
        if self.backend.buffered_seconds().await >= self.config.low_buffer_secs {
            return Ok(false);
        }
        if self.elapsed_ms().await < deadline_ms - self.config.completion_slack_ms as i64 {
            return Ok(false);
        }

        let slide_total = {
            let mut ctx = self.ctx.write().await;
            if ctx.generation != gen || ctx.slide_index != index {
                return Ok(false);
            }
            ctx.phase = SlidePhase::Completed;
            ctx.manifest.slides.len()
        };
        self.emit(PlayerEvent::SlideCompleted { slide_index: index }).await;
        if index + 1 >= slide_total {
            self.finish().await;
        } else {
            self.advance_from(index + 1).await?;
        }
        Ok(true)
    }

    /// Manual slide transition, bypassing the normal flow: invalidates
    /// in-flight fetches, stops audio and resets to `Loading` for `index`.
    /// The generation bump happens under the context lock before the stop,
    /// so any prefetch buffering at that moment either sees the new
    /// generation and discards, or its chunk is swept away by the stop.
    pub async fn seek_to_slide(&self, index: usize) -> PlayerResult<()> {
        {
            let mut ctx = self.ctx.write().await;
            ctx.generation += 1;
            ctx.playing = false;
        }
        self.backend.stop().await?;
        self.load_slide(index).await
    }

    pub async fn pause(&self) -> PlayerResult<()> {
        self.backend.pause().await?;
        self.ctx.write().await.playing = false;
        Ok(())
    }

    pub async fn resume(&self) -> PlayerResult<()> {
        self.backend.resume().await?;
        let mut ctx = self.ctx.write().await;
        if !ctx.finished {
            ctx.playing = true;
        }
        Ok(())
    }

    /// Elapsed play time for the active slide, in the audio clock base.
    pub async fn elapsed_ms(&self) -> i64 {
        let origin = self.ctx.read().await.origin_secs;
        let now = self.backend.clock_now().await;
        ((now - origin) * 1000.0).round() as i64
    }

    /// Caption ticker. Applies onset correction first: if audible output
    /// (RMS) begins while the computed clock is still before the first
    /// word's start, the slide origin is nudged earlier by the gap so the
    /// read-along catches up to the audio instead of lagging it.
    pub async fn tick_captions(&self) -> CaptionView {
        let rms = self.backend.rms().await;
        let now = self.backend.clock_now().await;
        let mut ctx = self.ctx.write().await;
        let mut elapsed = ((now - ctx.origin_secs) * 1000.0).round() as i64;
        if !ctx.onset_corrected && rms > self.config.onset_rms_threshold {
            if let Some(first) = ctx.assets.words.as_ref().and_then(|w| w.first()) {
                let first_start = first.start_ms as i64;
                if elapsed < first_start {
                    let gap_ms = first_start - elapsed;
                    ctx.origin_secs -= gap_ms as f64 / 1000.0;
                    ctx.onset_corrected = true;
                    elapsed = first_start;
                    debug!(gap_ms, "onset correction applied");
                }
            }
        }
        let Some(slide) = ctx.manifest.slides.get(ctx.slide_index) else {
            return CaptionView::Hidden;
        };
        caption_view(
            elapsed,
            &slide.sentence_boundaries_ms,
            slide.target_duration_ms,
            ctx.assets.words.as_deref(),
            &ctx.assets.cues,
        )
    }

    /// Animation ticker sample. Missing timelines read as a neutral frame.
    pub async fn animation_frame(&self) -> AnimationFrame {
        let elapsed = self.elapsed_ms().await;
        let ctx = self.ctx.read().await;
        let viseme = ctx
            .assets
            .visemes
            .as_ref()
            .and_then(|tl| active_viseme(tl, elapsed))
            .cloned();
        let channels = ctx
            .assets
            .expressions
            .as_ref()
            .map(|tracks| {
                tracks
                    .channels
                    .iter()
                    .map(|ch| ChannelSample {
                        id: ch.id.clone(),
                        value: channel_value(ch, elapsed),
                    })
                    .collect()
            })
            .unwrap_or_default();
        AnimationFrame { viseme, channels }
    }

    /// Box-breathing overlay state, when the active slide carries a plan.
    pub async fn overlay_phase(&self) -> Option<OverlayPhase> {
        let elapsed = self.elapsed_ms().await;
        let ctx = self.ctx.read().await;
        let plan = ctx
            .manifest
            .slides
            .get(ctx.slide_index)?
            .overlay_plan
            .as_ref()?;
        if plan.kind != "box_breath" || elapsed < 0 {
            return None;
        }
        let cadence_ms: [i64; 4] = plan.cadence.map(|s| i64::from(s) * 1000);
        let cycle_len: i64 = cadence_ms.iter().sum();
        if cycle_len == 0 {
            return None;
        }
        let cycle = elapsed / cycle_len;
        if cycle >= i64::from(plan.cycles) {
            return None;
        }
        let mut within = elapsed % cycle_len;
        let labels = ["inhale", "hold", "exhale", "hold"];
        for (label, span) in labels.into_iter().zip(cadence_ms) {
            if within < span {
                return Some(OverlayPhase {
                    label,
                    cycle: cycle as u32,
                    progress: within as f32 / span as f32,
                });
            }
            within -= span;
        }
        None
    }

    /// Popup for the active slide, once the clock reaches its authored
    /// `at_ms`. Stays visible for the rest of the slide.
    pub async fn active_popup(&self) -> Option<PopupView> {
        let elapsed = self.elapsed_ms().await;
        let ctx = self.ctx.read().await;
        let slide = ctx.manifest.slides.get(ctx.slide_index)?;
        let payload = slide.popup_payload.as_ref()?;
        let at_ms = payload
            .get("at_ms")
            .and_then(serde_json::Value::as_i64)
            .unwrap_or(0);
        if elapsed < at_ms.max(0) {
            return None;
        }
        Some(PopupView {
            template_id: slide.popup_template_id.clone(),
            payload: payload.clone(),
        })
    }

    /// Records a quiz answer: looks up the choice's feedback on the active
    /// slide and emits a `Choice` event.
    pub async fn submit_choice(&self, choice_id: &str) -> PlayerResult<()> {
        let feedback = {
            let ctx = self.ctx.read().await;
            ctx.manifest
                .slides
                .get(ctx.slide_index)
                .and_then(|s| s.qa.as_ref())
                .and_then(|qa| qa.choices.iter().find(|c| c.id == choice_id))
                .and_then(|c| c.feedback.clone())
        };
        self.emit(PlayerEvent::Choice {
            choice_id: choice_id.to_string(),
            feedback,
        })
        .await;
        Ok(())
    }

    pub async fn snapshot(&self) -> PlayerSnapshot {
        let elapsed = self.elapsed_ms().await;
        let buffered = self.backend.buffered_seconds().await;
        let ctx = self.ctx.read().await;
        PlayerSnapshot {
            slide_index: ctx.slide_index,
            phase: ctx.phase.as_str().to_string(),
            elapsed_ms: elapsed,
            buffered_seconds: buffered,
            playing: ctx.playing,
            finished: ctx.finished,
        }
    }

    pub async fn finished(&self) -> bool {
        self.ctx.read().await.finished
    }

    pub async fn subscribe(&self) -> tokio::sync::mpsc::UnboundedReceiver<PlayerEvent> {
        self.bus.subscribe().await
    }

    pub(crate) async fn emit(&self, event: PlayerEvent) {
        self.analytics.report(&event);
        if let Err(e) = self.bus.publish(event).await {
            debug!(error = %e, "event publish failed");
        }
    }
}
