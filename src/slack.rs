// src/slack.rs
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

const POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";

#[derive(Error, Debug)]
pub enum SlackError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Slack API error: {0}")]
    Api(String),

    #[error("Slack API rate limit exceeded")]
    RateLimitExceeded,
}

impl SlackError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, SlackError::RateLimitExceeded)
    }
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

struct SlackInner {
    http_client: Client,
    bot_token: String,
    channel_id: String,
}

/// Posts reports to a Slack channel via `chat.postMessage`.
///
/// Without a bot token the notifier is a no-op; runs still classify and
/// sync the sheet, they just do not announce.
pub struct SlackNotifier {
    inner: Option<SlackInner>,
    mention_user_id: Option<String>,
}

impl SlackNotifier {
    pub fn new(
        bot_token: Option<String>,
        channel_id: String,
        mention_user_id: Option<String>,
    ) -> Result<Self, SlackError> {
        let inner = match bot_token {
            Some(bot_token) => {
                let http_client = Client::builder().timeout(Duration::from_secs(30)).build()?;
                Some(SlackInner {
                    http_client,
                    bot_token,
                    channel_id,
                })
            }
            None => {
                warn!("SLACK_BOT_TOKEN not set; Slack notifications are disabled");
                None
            }
        };
        Ok(Self {
            inner,
            mention_user_id,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// `"<@U123> "` when a mention target is configured, empty otherwise.
    pub fn mention_prefix(&self) -> String {
        self.mention_user_id
            .as_ref()
            .map(|id| format!("<@{}> ", id))
            .unwrap_or_default()
    }

    pub async fn post_message(&self, text: &str) -> Result<(), SlackError> {
        let Some(inner) = &self.inner else {
            return Ok(());
        };

        let response = inner
            .http_client
            .post(POST_MESSAGE_URL)
            .bearer_auth(&inner.bot_token)
            .json(&json!({
                "channel": inner.channel_id,
                "text": text,
            }))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SlackError::RateLimitExceeded);
        }

        let body: PostMessageResponse = response.json().await?;
        if !body.ok {
            let error = body.error.unwrap_or_else(|| "unknown".to_string());
            if error == "ratelimited" {
                return Err(SlackError::RateLimitExceeded);
            }
            return Err(SlackError::Api(error));
        }

        info!("Posted Slack message to {}", inner.channel_id);
        Ok(())
    }
}
