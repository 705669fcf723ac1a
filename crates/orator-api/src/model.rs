//! Wire types for the coaching backend.
//!
//! Everything is lenient: older server versions omit fields freely, and
//! feedback sections stored before the structured-agent rollout come back
//! as plain strings instead of objects.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub token_type: String,
}

/// One analysis dimension as produced by the coaching agents.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SectionFeedback {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub score: Option<f32>,
}

/// A feedback section: structured on current servers, a bare string on
/// records predating the structured format.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Section {
    Detailed(SectionFeedback),
    Text(String),
}

impl Section {
    pub fn summary(&self) -> Option<&str> {
        match self {
            Section::Detailed(s) => s.summary.as_deref(),
            Section::Text(t) => Some(t),
        }
    }

    pub fn score(&self) -> Option<f32> {
        match self {
            Section::Detailed(s) => s.score,
            Section::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OverallFeedback {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub score: Option<f32>,
}

/// Numeric per-section scores attached to stored feedback.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ScoreSet {
    #[serde(default)]
    pub opening: Option<f32>,
    #[serde(default)]
    pub content: Option<f32>,
    #[serde(default)]
    pub delivery: Option<f32>,
    #[serde(default)]
    pub grammar: Option<f32>,
    #[serde(default)]
    pub overall: Option<f32>,
}

/// AI-generated evaluation of one speech. Opaque to the recording core;
/// only display layers look inside.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Feedback {
    #[serde(default)]
    pub opening: Option<Section>,
    #[serde(default)]
    pub content: Option<Section>,
    #[serde(default)]
    pub delivery: Option<Section>,
    #[serde(default)]
    pub grammar: Option<Section>,
    #[serde(default)]
    pub overall: Option<OverallFeedback>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub filler_words: BTreeMap<String, u32>,
    #[serde(default)]
    pub word_count: Option<u64>,
    #[serde(default)]
    pub avg_sentence_length: Option<f32>,
    #[serde(default)]
    pub scores: Option<ScoreSet>,
}

/// Response from `/analyze_audio` and `/analyze`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalysisResponse {
    pub speech_id: i64,
    /// Echoed only by the audio endpoint; `/analyze` receives the
    /// transcript from the caller.
    #[serde(default)]
    pub transcript: Option<String>,
    pub feedback: Feedback,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpeechRecord {
    pub id: i64,
    pub transcript: String,
    pub created_at: String,
    #[serde(default)]
    pub feedback: Option<Feedback>,
}

/// Response from `/history`: all speeches for the user, newest first.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct History {
    pub user: UserProfile,
    #[serde(default)]
    pub speeches: Vec<SpeechRecord>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProgressPoint {
    pub speech_id: i64,
    pub date: String,
    #[serde(default)]
    pub score_opening: Option<f32>,
    #[serde(default)]
    pub score_content: Option<f32>,
    #[serde(default)]
    pub score_delivery: Option<f32>,
    #[serde(default)]
    pub score_grammar: Option<f32>,
    #[serde(default)]
    pub score_overall: Option<f32>,
}

/// Response from `/progress`: chronological score series for charts.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Progress {
    pub user: String,
    #[serde(default)]
    pub total_sessions: u64,
    #[serde(default)]
    pub progress: Vec<ProgressPoint>,
}

/// One point of the analytics trend series. Shape varies by server
/// version, so both fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TrendPoint {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub score: Option<f32>,
}

/// Response from `/analytics`: aggregate scores for the user.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Analytics {
    #[serde(default)]
    pub avg_opening: f32,
    #[serde(default)]
    pub avg_content: f32,
    #[serde(default)]
    pub avg_delivery: f32,
    #[serde(default)]
    pub avg_grammar: f32,
    #[serde(default)]
    pub avg_overall: f32,
    #[serde(default)]
    pub total_speeches: u64,
    #[serde(default)]
    pub trend: Vec<TrendPoint>,
    #[serde(default)]
    pub best_score: Option<f32>,
}

/// Raw reply from `/chat` and `/generate-speech`: exactly one of the two
/// fields is set.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatReply {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}
