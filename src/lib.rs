// src/lib.rs

pub mod checkin;
pub mod classify;
pub mod config;
pub mod email;
pub mod google;
pub mod report;
pub mod retry;
pub mod roster;
pub mod runner;
pub mod scheduler;
pub mod sheet;
pub mod sheets;
pub mod slack;
pub mod webwork;

#[cfg(test)]
mod classify_tests;
#[cfg(test)]
mod sheet_tests;

use thiserror::Error;

// Top-level application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("WebWork API client error: {0}")]
    Webwork(#[from] webwork::WebworkError),

    #[error("Google Sheets client error: {0}")]
    Sheets(#[from] sheets::SheetsError),

    #[error("Slack client error: {0}")]
    Slack(#[from] slack::SlackError),

    #[error("Email client error: {0}")]
    Email(#[from] email::EmailError),

    #[error("Google authentication error: {0}")]
    GoogleAuth(#[from] google::GoogleAuthError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization/deserialization failed: {0}")]
    Json(#[from] serde_json::Error),
}
