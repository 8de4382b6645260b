// src/email.rs
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::NaiveDate;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::classify::{AbsentRow, DayBuckets, LateRow};
use crate::config::EmailConfig;
use crate::google::{GoogleAuth, GoogleAuthError};

const GMAIL_SEND_URL: &str = "https://gmail.googleapis.com/gmail/v1/users/me/messages/send";
const GMAIL_SCOPE: &str = "https://www.googleapis.com/auth/gmail.send";

#[derive(Error, Debug)]
pub enum EmailError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Gmail API error: Status={status}, Message={message}")]
    Api { status: StatusCode, message: String },

    #[error("Google auth error: {0}")]
    Auth(#[from] GoogleAuthError),
}

/// Substitute `{placeholder}` markers from the map. Unknown markers are
/// left in place so a template typo is visible in the delivered mail
/// instead of silently vanishing.
pub fn render_template(template: &str, values: &HashMap<&str, String>) -> String {
    let mut rendered = template.to_string();
    for (key, value) in values {
        rendered = rendered.replace(&format!("{{{}}}", key), value);
    }
    rendered
}

/// Sends lateness and absence notifications through the Gmail API,
/// impersonating the configured sender via domain-wide delegation.
pub struct EmailNotifier {
    http_client: Client,
    auth: Arc<GoogleAuth>,
    config: EmailConfig,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig, auth: Arc<GoogleAuth>) -> Result<Self, EmailError> {
        let http_client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            http_client,
            auth,
            config,
        })
    }

    fn mime_message(&self, to: &str, subject: &str, body: &str) -> String {
        [
            format!("From: {}", self.config.sender),
            format!("To: {}", to),
            format!("Subject: {}", subject),
            "Content-Type: text/plain; charset=\"UTF-8\"".to_string(),
            String::new(),
            body.to_string(),
        ]
        .join("\r\n")
    }

    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailError> {
        let token = self.auth.bearer_token(&[GMAIL_SCOPE]).await?;
        let raw = URL_SAFE_NO_PAD.encode(self.mime_message(to, subject, body));

        let response = self
            .http_client
            .post(GMAIL_SEND_URL)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .json(&json!({ "raw": raw }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmailError::Api { status, message });
        }

        info!("Sent notification email to {}", to);
        Ok(())
    }

    async fn send_late_notification(
        &self,
        row: &LateRow,
        date: NaiveDate,
        expected_time: &str,
    ) -> Result<(), EmailError> {
        let values = HashMap::from([
            ("name", row.name.clone()),
            ("date", date.format("%Y-%m-%d").to_string()),
            ("check_in_time", row.arrival_time.clone()),
            ("expected_time", expected_time.to_string()),
            ("minutes_late", row.minutes_late.to_string()),
            ("hr_email", self.config.hr_email.clone()),
        ]);
        let subject = render_template(&self.config.late_template.subject, &values);
        let body = render_template(&self.config.late_template.body, &values);
        self.send(&row.email, &subject, &body).await
    }

    async fn send_absent_notification(
        &self,
        row: &AbsentRow,
        date: NaiveDate,
    ) -> Result<(), EmailError> {
        let values = HashMap::from([
            ("name", row.name.clone()),
            ("date", date.format("%Y-%m-%d").to_string()),
            ("hr_email", self.config.hr_email.clone()),
        ]);
        let subject = render_template(&self.config.absent_template.subject, &values);
        let body = render_template(&self.config.absent_template.body, &values);
        self.send(&row.email, &subject, &body).await
    }

    /// Notify every late, very-late and absent employee for the day.
    /// Failures are logged per recipient; one bounced address never
    /// blocks the rest of the batch.
    pub async fn send_batch<F>(&self, buckets: &DayBuckets, date: NaiveDate, expected_time_of: F)
    where
        F: Fn(&str) -> String,
    {
        for row in buckets.late.iter().chain(&buckets.very_late) {
            let expected = expected_time_of(&row.email);
            if let Err(err) = self.send_late_notification(row, date, &expected).await {
                warn!("Failed to email {}: {}", row.email, err);
            }
        }
        for row in &buckets.absent {
            if let Err(err) = self.send_absent_notification(row, date).await {
                warn!("Failed to email {}: {}", row.email, err);
            }
        }
    }
}
