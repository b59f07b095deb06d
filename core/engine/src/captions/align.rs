//! Pure read-along alignment against the master clock.

use crate::types::WordTiming;

use super::CaptionCue;

/// Words overlapping a sentence window within this tolerance are kept, so a
/// word straddling a boundary is not cut from either side.
pub const WINDOW_TOLERANCE_MS: i64 = 80;
/// A word is highlighted while the clock is within its span padded by this.
pub const ACTIVE_TOLERANCE_MS: i64 = 20;
/// Nothing renders before audio output begins.
pub const MIN_RENDER_ELAPSED_MS: i64 = -10;

#[derive(Debug, Clone, PartialEq)]
pub struct WordView {
    pub word: String,
    pub active: bool,
}

/// What the caption area should show for a given clock value.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptionView {
    Hidden,
    /// Whole-cue fallback when the slide has no word timing.
    Cue { text: String },
    /// Word-level read-along highlighting.
    Words { words: Vec<WordView> },
}

/// The sentence window `[start, end)` containing `elapsed_ms`.
///
/// An empty boundary list means the whole slide is one window (observed
/// behavior for manifests authored without boundaries). Past the last
/// boundary the window extends to the later of the last boundary and the
/// target duration.
pub fn window_for(boundaries: &[u64], target_duration_ms: u64, elapsed_ms: i64) -> (i64, i64) {
    if boundaries.is_empty() {
        return (0, target_duration_ms as i64);
    }
    let idx = boundaries.partition_point(|&b| (b as i64) <= elapsed_ms);
    if idx == 0 {
        // Before the first boundary; treat the first window as active.
        let end = boundaries.get(1).copied().unwrap_or(target_duration_ms);
        return (boundaries[0] as i64, end as i64);
    }
    let start = boundaries[idx - 1] as i64;
    let end = match boundaries.get(idx) {
        Some(&b) => b as i64,
        None => target_duration_ms.max(boundaries[idx - 1]) as i64,
    };
    (start, end)
}

/// Resolves the caption view for the current clock value.
pub fn caption_view(
    elapsed_ms: i64,
    boundaries: &[u64],
    target_duration_ms: u64,
    words: Option<&[WordTiming]>,
    cues: &[CaptionCue],
) -> CaptionView {
    if elapsed_ms < MIN_RENDER_ELAPSED_MS {
        return CaptionView::Hidden;
    }
    if let Some(words) = words {
        if !words.is_empty() {
            let (win_start, win_end) = window_for(boundaries, target_duration_ms, elapsed_ms);
            let visible: Vec<WordView> = words
                .iter()
                .filter(|w| {
                    (w.end_ms as i64) + WINDOW_TOLERANCE_MS >= win_start
                        && (w.start_ms as i64) - WINDOW_TOLERANCE_MS <= win_end
                })
                .map(|w| WordView {
                    word: w.word.clone(),
                    active: elapsed_ms >= (w.start_ms as i64) - ACTIVE_TOLERANCE_MS
                        && elapsed_ms <= (w.end_ms as i64) + ACTIVE_TOLERANCE_MS,
                })
                .collect();
            if !visible.is_empty() {
                return CaptionView::Words { words: visible };
            }
            return CaptionView::Hidden;
        }
    }
    for cue in cues {
        if elapsed_ms >= cue.start_ms as i64 && elapsed_ms < cue.end_ms as i64 {
            return CaptionView::Cue {
                text: cue.text.clone(),
            };
        }
    }
    CaptionView::Hidden
}
