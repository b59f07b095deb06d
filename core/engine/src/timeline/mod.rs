mod decode;

use serde::{Deserialize, Serialize};

pub use decode::{decode_expression_tracks, decode_viseme_timeline, WireType};

/// One mouth-shape sample on the lip-sync timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisemeFrame {
    pub t_ms: u64,
    pub viseme_id: u32,
    pub weight: f32,
}

/// Decoded viseme timeline for one slide, sorted ascending by `t_ms`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisemeTimeline {
    pub schema_version: String,
    pub phoneme_map_id: String,
    pub frames: Vec<VisemeFrame>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionKey {
    pub t_ms: u64,
    pub v: f32,
}

/// One animatable facial control (e.g. `blink`, `smile`, `head_nod`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpressionChannel {
    pub id: String,
    pub keys: Vec<ExpressionKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpressionTracks {
    pub schema_version: String,
    pub channels: Vec<ExpressionChannel>,
}

/// Latest frame at or before `elapsed_ms`, i.e. the mouth shape currently
/// held. `None` before the first frame or for a negative clock.
pub fn active_viseme(timeline: &VisemeTimeline, elapsed_ms: i64) -> Option<&VisemeFrame> {
    if elapsed_ms < 0 {
        return None;
    }
    let elapsed = elapsed_ms as u64;
    match timeline.frames.partition_point(|f| f.t_ms <= elapsed) {
        0 => None,
        n => Some(&timeline.frames[n - 1]),
    }
}

/// Linearly interpolated channel value at `elapsed_ms`. Clamps to the first
/// and last key outside the keyed range; a keyless channel reads 0.
pub fn channel_value(channel: &ExpressionChannel, elapsed_ms: i64) -> f32 {
    let keys = &channel.keys;
    let (first, last) = match (keys.first(), keys.last()) {
        (Some(f), Some(l)) => (f, l),
        _ => return 0.0,
    };
    if elapsed_ms <= first.t_ms as i64 {
        return first.v;
    }
    if elapsed_ms >= last.t_ms as i64 {
        return last.v;
    }
    let elapsed = elapsed_ms as u64;
    let idx = keys.partition_point(|k| k.t_ms <= elapsed);
    let (a, b) = (&keys[idx - 1], &keys[idx]);
    if b.t_ms == a.t_ms {
        return b.v;
    }
    let t = (elapsed - a.t_ms) as f32 / (b.t_ms - a.t_ms) as f32;
    a.v + (b.v - a.v) * t
}
