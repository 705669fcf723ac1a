//! HTTP client for the orator coaching backend.
//!
//! Thin typed wrapper over the backend's REST endpoints: account management,
//! audio/transcript analysis, history and analytics queries, and the coach
//! chat. The client never interprets feedback content; it only gives it a
//! typed shape for display layers.

mod client;
mod model;

pub use client::ApiClient;
pub use model::{
    AnalysisResponse, Analytics, ChatReply, Feedback, History, OverallFeedback, Progress,
    ProgressPoint, ScoreSet, Section, SectionFeedback, SpeechRecord, TokenGrant, TrendPoint,
    UserProfile,
};
use thiserror::Error;

/// Errors that can occur while talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A protected endpoint was called without a bearer token. The request
    /// is never issued anonymously.
    #[error("not logged in: no auth token available")]
    NoToken,

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// Result type for backend operations.
pub type Result<T> = std::result::Result<T, ApiError>;
