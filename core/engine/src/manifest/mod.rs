use serde::{Deserialize, Serialize};
use tracing::warn;

/// A lesson is always authored as exactly five slides.
pub const SLIDE_COUNT: usize = 5;

/// Declarative description of one lesson variant's media and timing.
///
/// Every field beyond `slides` is defaulted so that a partially authored
/// manifest still deserializes; validation is a separate, non-fatal pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LessonManifest {
    #[serde(default)]
    pub schema_version: Option<String>,
    #[serde(default)]
    pub module_id: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub slides: Vec<Slide>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Slide {
    #[serde(default)]
    pub slide_index: usize,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub script_text: Option<String>,
    #[serde(default)]
    pub audio_manifest: AudioManifest,
    #[serde(default)]
    pub captions_vtt_uri: Option<String>,
    #[serde(default)]
    pub word_timing_json_uri: Option<String>,
    #[serde(default)]
    pub viseme_timeline_pb_uri: Option<String>,
    #[serde(default)]
    pub expression_tracks_pb_uri: Option<String>,
    /// Monotonically increasing sentence-start timestamps. An empty list is
    /// treated as a single window spanning the whole slide.
    #[serde(default)]
    pub sentence_boundaries_ms: Vec<u64>,
    #[serde(default)]
    pub target_duration_ms: u64,
    #[serde(default)]
    pub popup_template_id: Option<String>,
    /// Free-form popup content; an `at_ms` field inside it times the reveal.
    #[serde(default)]
    pub popup_payload: Option<serde_json::Value>,
    #[serde(default)]
    pub qa: Option<QaSet>,
    #[serde(default)]
    pub overlay_plan: Option<OverlayPlan>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioManifest {
    #[serde(default)]
    pub codec: Option<String>,
    #[serde(default)]
    pub sample_rate: Option<u32>,
    #[serde(default)]
    pub chunk_duration_ms: Option<u64>,
    /// Ordered chunk URLs, each an independently decodable audio segment.
    #[serde(default)]
    pub chunks: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaSet {
    pub choices: Vec<QaChoice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaChoice {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayPlan {
    #[serde(rename = "type")]
    pub kind: String,
    /// Seconds per breathing phase: inhale, hold, exhale, hold.
    pub cadence: [u32; 4],
    pub cycles: u32,
}

impl Slide {
    /// A slide is playable when it has audio chunks and a captions resource.
    pub fn is_playable(&self) -> bool {
        !self.audio_manifest.chunks.is_empty() && self.captions_vtt_uri.is_some()
    }

    /// Completion deadline for the slide: the later of the declared target
    /// duration and the last sentence boundary, so audio is never cut off
    /// mid-sentence.
    pub fn completion_deadline_ms(&self) -> u64 {
        let last_boundary = self.sentence_boundaries_ms.last().copied().unwrap_or(0);
        self.target_duration_ms.max(last_boundary)
    }
}

impl LessonManifest {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Non-fatal validation: logs every defect and reports whether the whole
    /// manifest is well-formed. Playback proceeds with whatever slides pass
    /// `Slide::is_playable`.
    pub fn validate(&self) -> bool {
        let mut ok = true;
        if self.slides.len() != SLIDE_COUNT {
            warn!(
                slides = self.slides.len(),
                expected = SLIDE_COUNT,
                "manifest has wrong slide count"
            );
            ok = false;
        }
        for (i, slide) in self.slides.iter().enumerate() {
            if slide.audio_manifest.chunks.is_empty() {
                warn!(slide = i, "slide has no audio chunks");
                ok = false;
            }
            if slide.captions_vtt_uri.is_none() {
                warn!(slide = i, "slide has no captions resource");
                ok = false;
            }
            if slide
                .sentence_boundaries_ms
                .windows(2)
                .any(|w| w[0] > w[1])
            {
                warn!(slide = i, "sentence boundaries are not non-decreasing");
                ok = false;
            }
        }
        ok
    }
}
