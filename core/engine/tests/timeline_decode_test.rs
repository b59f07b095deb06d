//! Round-trip and robustness tests for the binary timeline decoders.
//!
//! The engine ships no encoder (timelines are server-authored), so the
//! reference encoders live here, mirroring the authoring pipeline's output
//! byte for byte.

use rand::Rng;

use playback_engine::{
    decode_expression_tracks, decode_viseme_timeline, ExpressionChannel, ExpressionKey,
    ExpressionTracks, VisemeFrame, VisemeTimeline,
};

fn put_varint(out: &mut Vec<u8>, mut v: u64) {
    while v >= 0x80 {
        out.push((v & 0x7f) as u8 | 0x80);
        v >>= 7;
    }
    out.push(v as u8);
}

fn put_tag(out: &mut Vec<u8>, field: u64, wire_type: u64) {
    put_varint(out, (field << 3) | wire_type);
}

fn put_len_delimited(out: &mut Vec<u8>, bytes: &[u8]) {
    put_varint(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

fn put_f32(out: &mut Vec<u8>, v: f32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn encode_viseme_timeline(timeline: &VisemeTimeline) -> Vec<u8> {
    let mut out = Vec::new();
    put_tag(&mut out, 1, 2);
    put_len_delimited(&mut out, timeline.schema_version.as_bytes());
    put_tag(&mut out, 2, 2);
    put_len_delimited(&mut out, timeline.phoneme_map_id.as_bytes());
    for frame in &timeline.frames {
        let mut inner = Vec::new();
        put_tag(&mut inner, 1, 0);
        put_varint(&mut inner, frame.t_ms);
        put_tag(&mut inner, 2, 0);
        put_varint(&mut inner, u64::from(frame.viseme_id));
        put_tag(&mut inner, 3, 5);
        put_f32(&mut inner, frame.weight);
        put_tag(&mut out, 3, 2);
        put_len_delimited(&mut out, &inner);
    }
    out
}

fn encode_expression_tracks(tracks: &ExpressionTracks) -> Vec<u8> {
    let mut out = Vec::new();
    put_tag(&mut out, 1, 2);
    put_len_delimited(&mut out, tracks.schema_version.as_bytes());
    for channel in &tracks.channels {
        let mut inner = Vec::new();
        put_tag(&mut inner, 1, 2);
        put_len_delimited(&mut inner, channel.id.as_bytes());
        for key in &channel.keys {
            let mut key_buf = Vec::new();
            put_tag(&mut key_buf, 1, 0);
            put_varint(&mut key_buf, key.t_ms);
            put_tag(&mut key_buf, 2, 5);
            put_f32(&mut key_buf, key.v);
            put_tag(&mut inner, 2, 2);
            put_len_delimited(&mut inner, &key_buf);
        }
        put_tag(&mut out, 2, 2);
        put_len_delimited(&mut out, &inner);
    }
    out
}

fn sample_timeline(frame_count: usize) -> VisemeTimeline {
    let mut rng = rand::thread_rng();
    let mut t = 0u64;
    let frames = (0..frame_count)
        .map(|_| {
            t += rng.gen_range(1..200);
            VisemeFrame {
                t_ms: t,
                viseme_id: rng.gen_range(0..16),
                weight: rng.gen_range(0.0f32..1.0),
            }
        })
        .collect();
    VisemeTimeline {
        schema_version: "1.0".to_string(),
        phoneme_map_id: "arpabet_v1".to_string(),
        frames,
    }
}

#[test]
fn viseme_round_trip_randomized() {
    let mut rng = rand::thread_rng();
    for _ in 0..50 {
        let timeline = sample_timeline(rng.gen_range(0..=500));
        let decoded = decode_viseme_timeline(&encode_viseme_timeline(&timeline));
        assert_eq!(decoded, timeline);
    }
}

#[test]
fn expression_round_trip() {
    let tracks = ExpressionTracks {
        schema_version: "1.0".to_string(),
        channels: vec![
            ExpressionChannel {
                id: "blink".to_string(),
                keys: vec![
                    ExpressionKey { t_ms: 0, v: 0.0 },
                    ExpressionKey { t_ms: 120, v: 1.0 },
                    ExpressionKey { t_ms: 240, v: 0.0 },
                ],
            },
            ExpressionChannel {
                id: "smile".to_string(),
                keys: vec![ExpressionKey { t_ms: 500, v: 0.6 }],
            },
            ExpressionChannel {
                id: "head_nod".to_string(),
                keys: vec![],
            },
        ],
    };
    let decoded = decode_expression_tracks(&encode_expression_tracks(&tracks));
    assert_eq!(decoded, tracks);
}

#[test]
fn truncation_yields_strict_prefix() {
    let timeline = sample_timeline(40);
    let encoded = encode_viseme_timeline(&timeline);
    let full = decode_viseme_timeline(&encoded);
    for cut in 0..encoded.len() {
        let partial = decode_viseme_timeline(&encoded[..cut]);
        assert!(
            partial.frames.len() <= full.frames.len(),
            "cut at {} fabricated frames",
            cut
        );
        assert_eq!(
            partial.frames[..],
            full.frames[..partial.frames.len()],
            "cut at {} is not a prefix",
            cut
        );
    }
}

#[test]
fn unknown_fields_are_skipped() {
    let timeline = sample_timeline(3);
    let mut encoded = encode_viseme_timeline(&timeline);
    // Future schema additions: a varint, a length-delimited blob and a
    // fixed32 under unassigned field numbers, appended after known fields.
    put_tag(&mut encoded, 7, 0);
    put_varint(&mut encoded, 123456);
    put_tag(&mut encoded, 8, 2);
    put_len_delimited(&mut encoded, b"future payload");
    put_tag(&mut encoded, 9, 5);
    put_f32(&mut encoded, 42.0);
    let decoded = decode_viseme_timeline(&encoded);
    assert_eq!(decoded, timeline);
}

#[test]
fn unknown_fields_inside_frames_are_skipped() {
    let frame = VisemeFrame {
        t_ms: 100,
        viseme_id: 4,
        weight: 0.9,
    };
    let mut inner = Vec::new();
    put_tag(&mut inner, 1, 0);
    put_varint(&mut inner, frame.t_ms);
    put_tag(&mut inner, 5, 0);
    put_varint(&mut inner, 77); // unknown field mid-frame
    put_tag(&mut inner, 2, 0);
    put_varint(&mut inner, u64::from(frame.viseme_id));
    put_tag(&mut inner, 3, 5);
    put_f32(&mut inner, frame.weight);
    let mut encoded = Vec::new();
    put_tag(&mut encoded, 3, 2);
    put_len_delimited(&mut encoded, &inner);

    let decoded = decode_viseme_timeline(&encoded);
    assert_eq!(decoded.frames, vec![frame]);
}

#[test]
fn unknown_wire_type_ends_decode_without_panic() {
    let timeline = sample_timeline(5);
    let mut encoded = encode_viseme_timeline(&timeline);
    put_varint(&mut encoded, (4 << 3) | 6); // wire type 6 is not in the schema
    encoded.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
    let decoded = decode_viseme_timeline(&encoded);
    assert_eq!(decoded.frames, timeline.frames);
}

#[test]
fn garbage_input_decodes_to_empty() {
    let decoded = decode_viseme_timeline(&[0xff; 64]);
    assert!(decoded.frames.is_empty());
    let tracks = decode_expression_tracks(&[0x80, 0x80, 0x80]);
    assert!(tracks.channels.is_empty());
}
