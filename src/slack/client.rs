use crate::config::AppConfig;
use crate::slack::cache::TeamClient;
use crate::slack::Notifier;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secretmessage_types::Message;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

/// Slack error codes that mean the stored token is no longer usable.
const AUTH_ERRORS: &[&str] = &[
    "invalid_auth",
    "not_authed",
    "account_inactive",
    "token_revoked",
    "token_expired",
];

/// Outbound delivery errors
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Slack returned status {0}")]
    Status(StatusCode),

    #[error("Slack rejected the team token: {0}")]
    Unauthorized(String),

    #[error("Slack API error: {0}")]
    Api(String),
}

/// Envelope of every Slack Web API response
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Client for response URLs and the Slack Web API
pub struct SlackClient {
    http: Client,
    api_url: String,
}

impl std::fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackClient")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl SlackClient {
    /// Every request is bounded by `timeout`.
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self, NotifyError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, NotifyError> {
        Self::new(&config.slack.api_url, config.http.timeout())
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{}", self.api_url, method)
    }
}

#[async_trait]
impl Notifier for SlackClient {
    async fn send_response_url(&self, response_url: &str, message: &Message) -> Result<(), NotifyError> {
        let response = self.http.post(response_url).json(message).send().await?;

        if response.status() != StatusCode::OK {
            let status = response.status();
            error!("Response URL delivery failed with status {}", status);
            return Err(NotifyError::Status(status));
        }
        Ok(())
    }

    async fn auth_test(&self, client: &TeamClient) -> Result<(), NotifyError> {
        let url = self.endpoint("auth.test");
        debug!(team = %client.team_fingerprint(), "Checking team token");

        let response = self
            .http
            .post(&url)
            .bearer_auth(client.token())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::Status(response.status()));
        }

        let body: ApiResponse = response.json().await?;
        if body.ok {
            return Ok(());
        }

        let code = body.error.unwrap_or_else(|| "unknown_error".to_string());
        if AUTH_ERRORS.contains(&code.as_str()) {
            Err(NotifyError::Unauthorized(code))
        } else {
            Err(NotifyError::Api(code))
        }
    }
}
