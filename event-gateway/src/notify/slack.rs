//! Slack Web API notifier.
//!
//! Posts alerts with `chat.postMessage`. Slack reports most failures as
//! HTTP 200 with `"ok": false`, so the reply body is checked as well.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::{NotifyError, Notifier};

#[derive(Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct PostMessageReply {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Notifier backed by a Slack bot token.
#[derive(Clone)]
pub struct SlackNotifier {
    client: Client,
    api_base: String,
    token: String,
    timeout: Duration,
}

impl SlackNotifier {
    pub fn new(client: Client, api_base: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
            timeout: Duration::from_secs(5),
        }
    }

    /// Override the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, channel: &str, text: &str) -> Result<(), NotifyError> {
        let url = format!("{}/chat.postMessage", self.api_base);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .timeout(self.timeout)
            .json(&PostMessage { channel, text })
            .send()
            .await
            .map_err(|e| {
                error!(channel = channel, error = %e, "slack_post_transport_error");
                NotifyError::Transport(e.to_string())
            })?;

        let status = resp.status();
        if !status.is_success() {
            error!(channel = channel, status_code = status.as_u16(), "slack_post_bad_status");
            return Err(NotifyError::Status(status.as_u16()));
        }

        let reply: PostMessageReply = resp
            .json()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        if !reply.ok {
            let reason = reply.error.unwrap_or_else(|| "unknown_error".to_string());
            error!(channel = channel, reason = %reason, "slack_post_rejected");
            return Err(NotifyError::Rejected(reason));
        }

        info!(channel = channel, text_length = text.len(), "slack_post_complete");
        Ok(())
    }
}
