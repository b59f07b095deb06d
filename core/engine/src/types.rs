use serde::{Deserialize, Serialize};

/// One entry of a slide's word-timing resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordTiming {
    pub word: String,
    pub start_ms: u64,
    pub end_ms: u64,
}

/// Personalization parameters resolved into a lesson variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantParams {
    pub language: String,
    pub tone: String,
    pub age_band: String,
    pub avatar_id: String,
}

impl Default for VariantParams {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            tone: "neutral".to_string(),
            age_band: "adult".to_string(),
            avatar_id: "kelly".to_string(),
        }
    }
}

/// Read-only snapshot of the playback state, safe to hand to renderers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub slide_index: usize,
    pub phase: String,
    pub elapsed_ms: i64,
    pub buffered_seconds: f64,
    pub playing: bool,
    pub finished: bool,
}
