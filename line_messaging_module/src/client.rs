//! Reply API client.
//!
//! `ReplySender` is the seam the router talks to; `LineClient` is the
//! production implementation posting to `/v2/bot/message/reply`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::message::ReplyMessage;

pub const DEFAULT_LINE_API_BASE_URL: &str = "https://api.line.me";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum LineError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("LINE API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("config error: {0}")]
    Config(String),
}

/// Capability to send the single reply for an event.
#[async_trait]
pub trait ReplySender: Send + Sync {
    async fn reply(&self, reply_token: &str, message: &ReplyMessage) -> Result<(), LineError>;
}

#[derive(Debug, Clone)]
pub struct LineClientConfig {
    /// Long-lived channel access token
    pub channel_access_token: String,
    /// API base URL, overridable for tests
    pub api_base_url: String,
    pub timeout: Duration,
}

impl LineClientConfig {
    pub fn new(channel_access_token: impl Into<String>) -> Self {
        Self {
            channel_access_token: channel_access_token.into(),
            api_base_url: DEFAULT_LINE_API_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LineClient {
    config: LineClientConfig,
    client: Client,
}

impl LineClient {
    pub fn new(config: LineClientConfig) -> Result<Self, LineError> {
        if config.channel_access_token.trim().is_empty() {
            return Err(LineError::Config(
                "channel access token is empty".to_string(),
            ));
        }
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    fn api_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: Vec<&'a ReplyMessage>,
}

#[async_trait]
impl ReplySender for LineClient {
    async fn reply(&self, reply_token: &str, message: &ReplyMessage) -> Result<(), LineError> {
        let request = ReplyRequest {
            reply_token,
            messages: vec![message],
        };

        let url = self.api_url("/v2/bot/message/reply");
        debug!("sending LINE {} reply to {}", message.kind(), url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.channel_access_token)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LineError::Api { status, body });
        }

        Ok(())
    }
}
