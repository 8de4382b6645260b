// src/webwork.rs
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use chrono::NaiveDate;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

// Error type for the WebWork API client
#[derive(Error, Debug)]
pub enum WebworkError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("WebWork API error: Status={status}, Message={message}")]
    Api { status: StatusCode, message: String },
}

// --- WebWork API Data Structures ---

/// Daily timeline report: employee -> projects -> tasks -> time entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTimeline {
    #[serde(default)]
    pub date_report: Vec<MemberDayReport>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDayReport {
    pub email: Option<String>,
    #[serde(default)]
    pub projects: Vec<ProjectReport>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectReport {
    pub project_name: Option<String>,
    #[serde(default)]
    pub tasks: Vec<TaskReport>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskReport {
    #[serde(default)]
    pub time_entries: Vec<TimeEntry>,
}

/// One logged work interval. `begin_datetime` is a `HH:MM` wall-clock on
/// the day the report was queried for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub begin_datetime: Option<String>,
}

/// User directory entry mapping an email to a display name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub email: Option<String>,
    pub fullname: Option<String>,
}

// --- WebWork API Client Implementation ---

#[derive(Clone)]
pub struct WebworkClient {
    http_client: Client,
    report_url: String,
    users_url: String,
    auth_header: String,
}

impl WebworkClient {
    pub fn new(
        report_url: String,
        users_url: String,
        api_user: &str,
        api_key: &str,
    ) -> Result<Self, WebworkError> {
        let http_client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        let credentials = format!("{}:{}", api_user, api_key);
        let auth_header = format!("Basic {}", BASE64_STANDARD.encode(credentials));

        Ok(Self {
            http_client,
            report_url,
            users_url,
            auth_header,
        })
    }

    /// Fetch the daily timeline report for a single date.
    pub async fn fetch_daily_timeline(&self, date: NaiveDate) -> Result<DailyTimeline, WebworkError> {
        let date_str = date.format("%Y-%m-%d").to_string();
        debug!("Fetching WebWork daily timeline for {}", date_str);
        let timeline: DailyTimeline = self
            .get_json(
                &self.report_url,
                &[("start_date", date_str.as_str()), ("end_date", date_str.as_str())],
            )
            .await?;
        info!(
            "Fetched WebWork timeline for {}: {} member reports",
            date_str,
            timeline.date_report.len()
        );
        Ok(timeline)
    }

    /// Fetch the user directory (email -> display name).
    pub async fn fetch_users(&self) -> Result<Vec<UserInfo>, WebworkError> {
        debug!("Fetching WebWork user directory");
        let users: Vec<UserInfo> = self.get_json(&self.users_url, &[]).await?;
        info!("Fetched {} WebWork users", users.len());
        Ok(users)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, WebworkError> {
        let response = self
            .http_client
            .get(url)
            .query(query)
            .header(AUTHORIZATION, &self.auth_header)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(WebworkError::Api { status, message });
        }

        // The API occasionally serves a UTF-8 BOM; strip it before parsing.
        let body = response.bytes().await?;
        let body = body
            .strip_prefix(b"\xef\xbb\xbf".as_slice())
            .unwrap_or(&body);
        Ok(serde_json::from_slice(body)?)
    }
}
