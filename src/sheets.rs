// src/sheets.rs
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::google::{GoogleAuth, GoogleAuthError};
use crate::sheet::{CellColor, SheetTable};

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

// Error type for the Google Sheets client
#[derive(Error, Debug)]
pub enum SheetsError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Sheets API error: Status={status}, Message={message}")]
    Api { status: StatusCode, message: String },

    #[error("Sheets API rate limit exceeded")]
    RateLimitExceeded,

    #[error("JSON serialization/deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Google auth error: {0}")]
    Auth(#[from] GoogleAuthError),

    #[error("Invalid Sheets URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Worksheet '{0}' not found")]
    WorksheetNotFound(String),
}

impl SheetsError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, SheetsError::RateLimitExceeded)
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

// --- Google Sheets Client Implementation ---

#[derive(Clone)]
pub struct SheetsClient {
    http_client: Client,
    spreadsheet_id: String,
    auth: Arc<GoogleAuth>,
}

impl SheetsClient {
    pub fn new(spreadsheet_id: String, auth: Arc<GoogleAuth>) -> Result<Self, SheetsError> {
        let http_client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            http_client,
            spreadsheet_id,
            auth,
        })
    }

    async fn bearer(&self) -> Result<String, SheetsError> {
        Ok(self.auth.bearer_token(&[SHEETS_SCOPE]).await?)
    }

    // Worksheet titles carry slashes and spaces, so build URLs through
    // path segments instead of format strings.
    fn values_url(&self, title: &str, suffix: Option<&str>) -> Result<Url, SheetsError> {
        let mut url = Url::parse(SHEETS_BASE_URL)?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| url::ParseError::SetHostOnCannotBeABaseUrl)?;
            segments.push(&self.spreadsheet_id);
            segments.push("values");
            match suffix {
                Some(suffix) => segments.push(&format!("{}{}", title, suffix)),
                None => segments.push(title),
            };
        }
        Ok(url)
    }

    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, SheetsError> {
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SheetsError::RateLimitExceeded);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SheetsError::Api { status, message });
        }
        Ok(response)
    }

    /// Numeric sheet id for a worksheet title, if the worksheet exists.
    pub async fn sheet_id_by_title(&self, title: &str) -> Result<Option<i64>, SheetsError> {
        let token = self.bearer().await?;
        let url = format!(
            "{}/{}?fields=sheets.properties",
            SHEETS_BASE_URL, self.spreadsheet_id
        );
        let response = self
            .http_client
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .send()
            .await?;
        let response = Self::check_response(response).await?;
        let meta: SpreadsheetMeta = response.json().await?;
        Ok(meta
            .sheets
            .into_iter()
            .map(|s| s.properties)
            .find(|p| p.title == title)
            .map(|p| p.sheet_id))
    }

    /// Ensure a worksheet with the given title exists, returning its
    /// numeric sheet id.
    pub async fn ensure_worksheet(&self, title: &str) -> Result<i64, SheetsError> {
        if let Some(sheet_id) = self.sheet_id_by_title(title).await? {
            return Ok(sheet_id);
        }

        debug!("Creating worksheet '{}'", title);
        let reply = self
            .batch_update(vec![json!({
                "addSheet": { "properties": { "title": title } }
            })])
            .await?;

        let sheet_id = reply
            .pointer("/replies/0/addSheet/properties/sheetId")
            .and_then(Value::as_i64);
        match sheet_id {
            Some(sheet_id) => {
                info!("Created worksheet '{}' (sheetId {})", title, sheet_id);
                Ok(sheet_id)
            }
            // Another writer may have created it between the lookup and
            // the addSheet call.
            None => self
                .sheet_id_by_title(title)
                .await?
                .ok_or_else(|| SheetsError::WorksheetNotFound(title.to_string())),
        }
    }

    /// Read the full grid of a worksheet.
    pub async fn read_all(&self, title: &str) -> Result<SheetTable, SheetsError> {
        let token = self.bearer().await?;
        let url = self.values_url(title, None)?;
        let response = self
            .http_client
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .send()
            .await?;
        let response = Self::check_response(response).await?;
        let range: ValueRange = response.json().await?;
        Ok(SheetTable::from_rows(range.values))
    }

    /// Replace the full grid of a worksheet: clear, then write RAW values.
    pub async fn replace_all(&self, title: &str, table: &SheetTable) -> Result<(), SheetsError> {
        let token = self.bearer().await?;

        let clear_url = self.values_url(title, Some(":clear"))?;
        let response = self
            .http_client
            .post(clear_url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .json(&json!({}))
            .send()
            .await?;
        Self::check_response(response).await?;

        let mut write_url = self.values_url(title, None)?;
        write_url
            .query_pairs_mut()
            .append_pair("valueInputOption", "RAW");
        let response = self
            .http_client
            .put(write_url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .json(&json!({ "values": table.rows }))
            .send()
            .await?;
        Self::check_response(response).await?;

        debug!("Wrote {} rows to worksheet '{}'", table.rows.len(), title);
        Ok(())
    }

    /// Run a spreadsheet `batchUpdate`, returning the raw reply.
    pub async fn batch_update(&self, requests: Vec<Value>) -> Result<Value, SheetsError> {
        let token = self.bearer().await?;
        let url = format!("{}/{}:batchUpdate", SHEETS_BASE_URL, self.spreadsheet_id);
        let response = self
            .http_client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .json(&json!({ "requests": requests }))
            .send()
            .await?;
        let response = Self::check_response(response).await?;
        Ok(response.json().await?)
    }
}

// --- batchUpdate request builders ---

fn color_json(color: CellColor) -> Value {
    json!({ "red": color.red, "green": color.green, "blue": color.blue })
}

pub const HEADER_COLOR: CellColor = CellColor {
    red: 0.26,
    green: 0.44,
    blue: 0.76,
};
pub const PRESENT_COLOR: CellColor = CellColor {
    red: 0.77,
    green: 0.93,
    blue: 0.80,
};
pub const LATE_COLOR: CellColor = CellColor {
    red: 1.0,
    green: 0.94,
    blue: 0.60,
};
pub const ABSENT_COLOR: CellColor = CellColor {
    red: 1.0,
    green: 0.77,
    blue: 0.80,
};

/// Bold white-on-blue header row.
pub fn header_format_request(sheet_id: i64, columns: usize) -> Value {
    json!({
        "repeatCell": {
            "range": {
                "sheetId": sheet_id,
                "startRowIndex": 0,
                "endRowIndex": 1,
                "startColumnIndex": 0,
                "endColumnIndex": columns
            },
            "cell": {
                "userEnteredFormat": {
                    "backgroundColor": color_json(HEADER_COLOR),
                    "textFormat": {
                        "foregroundColor": { "red": 1.0, "green": 1.0, "blue": 1.0 },
                        "bold": true
                    }
                }
            },
            "fields": "userEnteredFormat(backgroundColor,textFormat)"
        }
    })
}

fn status_rule(sheet_id: i64, column: usize, rows: usize, status: &str, color: CellColor) -> Value {
    json!({
        "addConditionalFormatRule": {
            "rule": {
                "ranges": [{
                    "sheetId": sheet_id,
                    "startRowIndex": 1,
                    "endRowIndex": rows,
                    "startColumnIndex": column,
                    "endColumnIndex": column + 1
                }],
                "booleanRule": {
                    "condition": {
                        "type": "TEXT_EQ",
                        "values": [{ "userEnteredValue": status }]
                    },
                    "format": { "backgroundColor": color_json(color) }
                }
            },
            "index": 0
        }
    })
}

/// Conditional Present/Late/Absent fills for one date column.
pub fn status_color_requests(sheet_id: i64, column: usize, rows: usize) -> Vec<Value> {
    vec![
        status_rule(sheet_id, column, rows, "Present", PRESENT_COLOR),
        status_rule(sheet_id, column, rows, "Late", LATE_COLOR),
        status_rule(sheet_id, column, rows, "Absent", ABSENT_COLOR),
    ]
}

/// Dropdown validation restricting a date column to the three statuses.
pub fn status_validation_request(sheet_id: i64, column: usize, rows: usize) -> Value {
    json!({
        "setDataValidation": {
            "range": {
                "sheetId": sheet_id,
                "startRowIndex": 1,
                "endRowIndex": rows,
                "startColumnIndex": column,
                "endColumnIndex": column + 1
            },
            "rule": {
                "condition": {
                    "type": "ONE_OF_LIST",
                    "values": [
                        { "userEnteredValue": "Present" },
                        { "userEnteredValue": "Late" },
                        { "userEnteredValue": "Absent" }
                    ]
                },
                "showCustomUi": true,
                "strict": false
            }
        }
    })
}

/// Solid fill for one weekly cell.
pub fn cell_fill_request(sheet_id: i64, row: usize, column: usize, color: CellColor) -> Value {
    json!({
        "repeatCell": {
            "range": {
                "sheetId": sheet_id,
                "startRowIndex": row,
                "endRowIndex": row + 1,
                "startColumnIndex": column,
                "endColumnIndex": column + 1
            },
            "cell": {
                "userEnteredFormat": { "backgroundColor": color_json(color) }
            },
            "fields": "userEnteredFormat.backgroundColor"
        }
    })
}
