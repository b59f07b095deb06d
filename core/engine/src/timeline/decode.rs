//! Best-effort decoders for the compact binary timeline format.
//!
//! The wire format is a three-wiretype protobuf subset: each field is
//! prefixed with a tag `(field_number << 3) | wire_type` where the wire type
//! is 0 (varint), 2 (length-delimited) or 5 (fixed 32-bit). Unknown field
//! numbers are skipped by wire type so that server-side schema additions do
//! not break older players. Decoding never fails: malformed or truncated
//! trailing bytes simply end the walk, and whatever frames or channels were
//! fully parsed before the cut are returned, because partial animation data
//! beats none at all.

use super::{
    ExpressionChannel, ExpressionKey, ExpressionTracks, VisemeFrame, VisemeTimeline,
};

/// The three wire types the timeline schema uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    Varint,
    LenDelimited,
    Fixed32,
}

impl WireType {
    /// Maps the low 3 tag bits; anything outside {0, 2, 5} is not part of
    /// this schema and ends a best-effort decode.
    pub fn from_raw(raw: u64) -> Option<Self> {
        match raw {
            0 => Some(Self::Varint),
            2 => Some(Self::LenDelimited),
            5 => Some(Self::Fixed32),
            _ => None,
        }
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn done(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn varint(&mut self) -> Option<u64> {
        let mut value: u64 = 0;
        let mut shift = 0u32;
        loop {
            let byte = *self.buf.get(self.pos)?;
            self.pos += 1;
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Some(value);
            }
            shift += 7;
            if shift >= 64 {
                return None;
            }
        }
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        if end > self.buf.len() {
            return None;
        }
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Some(slice)
    }

    fn len_delimited(&mut self) -> Option<&'a [u8]> {
        let len = self.varint()?;
        self.take(usize::try_from(len).ok()?)
    }

    fn fixed32(&mut self) -> Option<f32> {
        let bytes = self.take(4)?;
        Some(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads the next field tag. `None` on truncation or an unknown wire
    /// type, which terminates the walk.
    fn tag(&mut self) -> Option<(u64, WireType)> {
        let raw = self.varint()?;
        Some((raw >> 3, WireType::from_raw(raw & 0x7)?))
    }

    /// Skips one field of the given wire type.
    fn skip(&mut self, wire_type: WireType) -> Option<()> {
        match wire_type {
            WireType::Varint => self.varint().map(|_| ()),
            WireType::LenDelimited => self.len_delimited().map(|_| ()),
            WireType::Fixed32 => self.take(4).map(|_| ()),
        }
    }
}

fn utf8(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn decode_viseme_frame(bytes: &[u8]) -> Option<VisemeFrame> {
    let mut r = Reader::new(bytes);
    let mut frame = VisemeFrame {
        t_ms: 0,
        viseme_id: 0,
        weight: 0.0,
    };
    while !r.done() {
        let (field, wire_type) = r.tag()?;
        match (field, wire_type) {
            (1, WireType::Varint) => frame.t_ms = r.varint()?,
            (2, WireType::Varint) => frame.viseme_id = u32::try_from(r.varint()?).ok()?,
            (3, WireType::Fixed32) => frame.weight = r.fixed32()?,
            (_, wt) => r.skip(wt)?,
        }
    }
    Some(frame)
}

/// Decodes a `VisemeTimeline` message. Never errors; stops at the first
/// malformed byte and returns the frames parsed so far.
pub fn decode_viseme_timeline(bytes: &[u8]) -> VisemeTimeline {
    let mut r = Reader::new(bytes);
    let mut timeline = VisemeTimeline::default();
    while !r.done() {
        let Some((field, wire_type)) = r.tag() else {
            break;
        };
        let parsed = match (field, wire_type) {
            (1, WireType::LenDelimited) => r.len_delimited().map(|b| {
                timeline.schema_version = utf8(b);
            }),
            (2, WireType::LenDelimited) => r.len_delimited().map(|b| {
                timeline.phoneme_map_id = utf8(b);
            }),
            (3, WireType::LenDelimited) => match r.len_delimited() {
                Some(inner) => {
                    if let Some(frame) = decode_viseme_frame(inner) {
                        timeline.frames.push(frame);
                    }
                    Some(())
                }
                None => None,
            },
            (_, wt) => r.skip(wt),
        };
        if parsed.is_none() {
            break;
        }
    }
    timeline
}

fn decode_expression_key(bytes: &[u8]) -> Option<ExpressionKey> {
    let mut r = Reader::new(bytes);
    let mut key = ExpressionKey { t_ms: 0, v: 0.0 };
    while !r.done() {
        let (field, wire_type) = r.tag()?;
        match (field, wire_type) {
            (1, WireType::Varint) => key.t_ms = r.varint()?,
            (2, WireType::Fixed32) => key.v = r.fixed32()?,
            (_, wt) => r.skip(wt)?,
        }
    }
    Some(key)
}

fn decode_expression_channel(bytes: &[u8]) -> Option<ExpressionChannel> {
    let mut r = Reader::new(bytes);
    let mut channel = ExpressionChannel::default();
    while !r.done() {
        let (field, wire_type) = r.tag()?;
        match (field, wire_type) {
            (1, WireType::LenDelimited) => channel.id = utf8(r.len_delimited()?),
            (2, WireType::LenDelimited) => {
                if let Some(key) = decode_expression_key(r.len_delimited()?) {
                    channel.keys.push(key);
                }
            }
            (_, wt) => r.skip(wt)?,
        }
    }
    Some(channel)
}

/// Decodes an `ExpressionTracks` message with the same best-effort contract
/// as [`decode_viseme_timeline`].
pub fn decode_expression_tracks(bytes: &[u8]) -> ExpressionTracks {
    let mut r = Reader::new(bytes);
    let mut tracks = ExpressionTracks::default();
    while !r.done() {
        let Some((field, wire_type)) = r.tag() else {
            break;
        };
        let parsed = match (field, wire_type) {
            (1, WireType::LenDelimited) => r.len_delimited().map(|b| {
                tracks.schema_version = utf8(b);
            }),
            (2, WireType::LenDelimited) => match r.len_delimited() {
                Some(inner) => {
                    if let Some(channel) = decode_expression_channel(inner) {
                        tracks.channels.push(channel);
                    }
                    Some(())
                }
                None => None,
            },
            (_, wt) => r.skip(wt),
        };
        if parsed.is_none() {
            break;
        }
    }
    tracks
}
