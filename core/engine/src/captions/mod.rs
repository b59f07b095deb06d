mod align;

pub use align::{
    caption_view, window_for, CaptionView, WordView, ACTIVE_TOLERANCE_MS,
    MIN_RENDER_ELAPSED_MS, WINDOW_TOLERANCE_MS,
};

/// One parsed caption cue.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionCue {
    pub start_ms: u64,
    pub end_ms: u64,
    pub text: String,
}

/// Parses a WebVTT-like document: cue blocks of
/// `HH:MM:SS.mmm --> HH:MM:SS.mmm` followed by text lines until a blank
/// line. Headers, cue identifiers and NOTE blocks are tolerated and skipped;
/// malformed blocks are dropped rather than failing the document.
pub fn parse_vtt(input: &str) -> Vec<CaptionCue> {
    let mut cues = Vec::new();
    let mut lines = input.lines().peekable();
    while let Some(line) = lines.next() {
        let line = line.trim();
        let Some((start, end)) = parse_cue_timing(line) else {
            continue;
        };
        let mut text_lines = Vec::new();
        while let Some(next) = lines.peek() {
            let next = next.trim();
            if next.is_empty() {
                break;
            }
            text_lines.push(next.to_string());
            lines.next();
        }
        if !text_lines.is_empty() {
            cues.push(CaptionCue {
                start_ms: start,
                end_ms: end,
                text: text_lines.join("\n"),
            });
        }
    }
    cues
}

fn parse_cue_timing(line: &str) -> Option<(u64, u64)> {
    let (start, end) = line.split_once("-->")?;
    let start = parse_timestamp_ms(start.trim())?;
    // Cue settings after the end timestamp are ignored.
    let end_token = end.trim().split_whitespace().next()?;
    let end = parse_timestamp_ms(end_token)?;
    (start <= end).then_some((start, end))
}

/// `HH:MM:SS.mmm` with the hours field optional (`MM:SS.mmm`).
fn parse_timestamp_ms(token: &str) -> Option<u64> {
    let (clock, millis) = token.split_once('.')?;
    let millis: u64 = millis.parse().ok()?;
    let mut parts = clock.rsplit(':');
    let seconds: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let hours: u64 = match parts.next() {
        Some(h) => h.parse().ok()?,
        None => 0,
    };
    if parts.next().is_some() || seconds >= 60 || minutes >= 60 || millis >= 1000 {
        return None;
    }
    Some(((hours * 60 + minutes) * 60 + seconds) * 1000 + millis)
}
