//! Backend client.

use orator_core::AudioClip;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::model::{
    AnalysisResponse, Analytics, ChatReply, History, Progress, TokenGrant, UserProfile,
};
use crate::{ApiError, Result};

/// Client for the coaching backend. Holds an optional bearer token;
/// protected endpoints fail fast with [`ApiError::NoToken`] when it is
/// absent rather than issuing anonymous requests.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            token: None,
        }
    }

    /// Attach (or clear) the bearer token used by protected endpoints.
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn bearer(&self) -> Result<&str> {
        self.token.as_deref().ok_or(ApiError::NoToken)
    }

    /// Register a new account.
    pub async fn signup(&self, username: &str, email: &str, password: &str) -> Result<UserProfile> {
        let response = self
            .http
            .post(self.url("/signup"))
            .json(&json!({ "username": username, "email": email, "password": password }))
            .send()
            .await?;
        decode(response).await
    }

    /// Exchange credentials for a bearer token.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenGrant> {
        let response = self
            .http
            .post(self.url("/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        decode(response).await
    }

    /// Upload a finalized clip for transcription and scoring. The optional
    /// language hint rides along as a form field; servers that autodetect
    /// ignore it.
    pub async fn analyze_audio(
        &self,
        clip: &AudioClip,
        language: Option<&str>,
    ) -> Result<AnalysisResponse> {
        let token = self.bearer()?;
        debug!(
            bytes = clip.len(),
            media = clip.media_type().mime(),
            language,
            "uploading recording for analysis"
        );

        let part = reqwest::multipart::Part::stream(clip.data().clone())
            .file_name(clip.file_name())
            .mime_str(clip.media_type().mime())?;
        let mut form = reqwest::multipart::Form::new().part("file", part);
        if let Some(language) = language {
            form = form.text("language", language.to_owned());
        }

        let response = self
            .http
            .post(self.url("/analyze_audio"))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?;
        decode(response).await
    }

    /// Score an already-transcribed speech.
    pub async fn analyze_transcript(&self, transcript: &str) -> Result<AnalysisResponse> {
        let token = self.bearer()?;
        let response = self
            .http
            .post(self.url("/analyze"))
            .bearer_auth(token)
            .json(&json!({ "transcript": transcript }))
            .send()
            .await?;
        decode(response).await
    }

    /// All of the user's speeches with their feedback, newest first.
    pub async fn history(&self) -> Result<History> {
        self.get_authed("/history").await
    }

    /// Chronological per-speech score series.
    pub async fn progress(&self) -> Result<Progress> {
        self.get_authed("/progress").await
    }

    /// Aggregate score averages.
    pub async fn analytics(&self) -> Result<Analytics> {
        self.get_authed("/analytics").await
    }

    /// Send one message to the coach chat. The session id is an opaque key
    /// the server uses to keep conversational context.
    pub async fn chat(&self, session_id: &str, message: &str) -> Result<String> {
        let response = self
            .http
            .post(self.url("/chat"))
            .json(&json!({ "session_id": session_id, "message": message }))
            .send()
            .await?;
        let reply: ChatReply = decode(response).await?;
        reply_text(reply)
    }

    /// Ask the speech generator for a draft.
    pub async fn generate_speech(&self, session_id: &str, prompt: &str) -> Result<String> {
        let response = self
            .http
            .post(self.url("/generate-speech"))
            .json(&json!({ "session_id": session_id, "input": prompt }))
            .send()
            .await?;
        let reply: ChatReply = decode(response).await?;
        reply_text(reply)
    }

    /// Update account details.
    pub async fn update_profile(&self, username: &str, email: &str) -> Result<()> {
        let token = self.bearer()?;
        let response = self
            .http
            .put(self.url("/update_profile"))
            .bearer_auth(token)
            .json(&json!({ "username": username, "email": email }))
            .send()
            .await?;
        // reply body is informational only
        decode::<serde_json::Value>(response).await.map(|_| ())
    }

    async fn get_authed<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let token = self.bearer()?;
        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await?;
        decode(response).await
    }
}

/// FastAPI-style error body.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| e.detail)
            .unwrap_or(body);
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ApiError::Auth(message));
        }
        return Err(ApiError::Api {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}

fn reply_text(reply: ChatReply) -> Result<String> {
    if let Some(error) = reply.error {
        return Err(ApiError::Api {
            status: 200,
            message: error,
        });
    }
    reply
        .answer
        .ok_or_else(|| ApiError::Decode("reply carried neither answer nor error".into()))
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use orator_core::MediaType;

    use super::*;

    #[tokio::test]
    async fn protected_calls_fail_fast_without_token() {
        // No server is contacted: the token check runs before any request.
        let client = ApiClient::new("http://localhost:1");
        let clip = AudioClip::new(Bytes::from_static(b"RIFF"), MediaType::Wav);
        assert!(matches!(
            client.analyze_audio(&clip, Some("en")).await,
            Err(ApiError::NoToken)
        ));
        assert!(matches!(client.history().await, Err(ApiError::NoToken)));
        assert!(matches!(client.progress().await, Err(ApiError::NoToken)));
        assert!(matches!(client.analytics().await, Err(ApiError::NoToken)));
        assert!(matches!(
            client.analyze_transcript("hi").await,
            Err(ApiError::NoToken)
        ));
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client = ApiClient::new("http://localhost:8000/");
        assert_eq!(client.url("/history"), "http://localhost:8000/history");
    }

    #[test]
    fn reply_text_prefers_error() {
        let err = reply_text(ChatReply {
            answer: Some("ignored".into()),
            error: Some("boom".into()),
        })
        .unwrap_err();
        assert!(matches!(err, ApiError::Api { .. }));

        let ok = reply_text(ChatReply {
            answer: Some("hello".into()),
            error: None,
        })
        .unwrap();
        assert_eq!(ok, "hello");
    }
}
