// HTTP client for the story backend.
//
// Two JSON endpoints: `/start_story` opens a session and returns the first
// segment, `/continue_story` sends a choice and returns the next one. Any
// non-2xx status is a failure; the body is only read to recover the backend's
// `detail` message for display.

use std::time::Duration;

use async_trait::async_trait;
use fablepath_core::config::BackendConfig;
use fablepath_core::protocol::{
    Choice, ContinueStoryRequest, ContinueStoryResponse, StartStoryRequest, StartStoryResponse,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const START_STORY_PATH: &str = "/start_story";
const CONTINUE_STORY_PATH: &str = "/continue_story";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure of a single backend call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend answered with a non-2xx status.
    #[error("HTTP error! status: {status}{}", detail_suffix(.detail))]
    Status { status: u16, detail: Option<String> },

    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(#[source] reqwest::Error),
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(d) => format!(" ({d})"),
        None => String::new(),
    }
}

impl ApiError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::Decode(err)
        } else {
            ApiError::Transport(err)
        }
    }
}

// ---------------------------------------------------------------------------
// StoryBackend trait
// ---------------------------------------------------------------------------

/// The operations the story client needs from the backend.
///
/// Implemented over HTTP by [`HttpStoryBackend`]; tests substitute in-memory
/// fakes.
#[async_trait]
pub trait StoryBackend: Send + Sync {
    /// Open a new session seeded with `prompt`.
    async fn start_story(&self, prompt: &str) -> Result<StartStoryResponse, ApiError>;

    /// Advance the session identified by `session_id` with `choice`.
    async fn continue_story(
        &self,
        session_id: &str,
        choice: Choice,
    ) -> Result<ContinueStoryResponse, ApiError>;
}

// ---------------------------------------------------------------------------
// HttpStoryBackend
// ---------------------------------------------------------------------------

/// reqwest-backed [`StoryBackend`].
pub struct HttpStoryBackend {
    http: reqwest::Client,
    base_url: String,
}

impl HttpStoryBackend {
    /// Create a client for `base_url`. With `timeout` unset, requests wait
    /// until the transport settles.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let http = builder.build().map_err(ApiError::Transport)?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Build a client from the `[backend]` config section.
    pub fn from_config(config: &BackendConfig) -> Result<Self, ApiError> {
        Self::new(&config.base_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, ApiError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = self.endpoint(path);
        debug!(%url, "POST");

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(ApiError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            // The body is best-effort context only; a read failure here
            // must not mask the status error.
            let text = response.text().await.unwrap_or_default();
            let detail = parse_error_detail(&text);
            warn!(status = status.as_u16(), ?detail, %url, "backend returned error status");
            return Err(ApiError::Status {
                status: status.as_u16(),
                detail,
            });
        }

        response.json::<Resp>().await.map_err(ApiError::from_reqwest)
    }
}

#[async_trait]
impl StoryBackend for HttpStoryBackend {
    async fn start_story(&self, prompt: &str) -> Result<StartStoryResponse, ApiError> {
        let body = StartStoryRequest {
            prompt: prompt.to_string(),
        };
        let resp: StartStoryResponse = self.post_json(START_STORY_PATH, &body).await?;
        debug!(session_id = %resp.session_id, "story started");
        Ok(resp)
    }

    async fn continue_story(
        &self,
        session_id: &str,
        choice: Choice,
    ) -> Result<ContinueStoryResponse, ApiError> {
        let body = ContinueStoryRequest {
            session_id: session_id.to_string(),
            choice,
        };
        let resp: ContinueStoryResponse = self.post_json(CONTINUE_STORY_PATH, &body).await?;
        debug!(%session_id, %choice, is_final = resp.is_final, "story continued");
        Ok(resp)
    }
}

// ---------------------------------------------------------------------------
// Error body parsing
// ---------------------------------------------------------------------------

/// Extract the `detail` string from an error body.
///
/// Expected shape: `{ "detail": "Story session not found" }`. Validation
/// errors carry a list under `detail` and yield `None`.
pub(crate) fn parse_error_detail(body: &str) -> Option<String> {
    let v: Value = serde_json::from_str(body).ok()?;
    v.get("detail")?.as_str().map(|s| s.to_string())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
