// src/config.rs
use chrono::{Duration, NaiveTime};
use chrono_tz::Tz;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::classify::{parse_wall_clock, LatenessPolicy};
use crate::roster::normalize_email;
use crate::AppError;

const DEFAULT_GRACE_MINUTES: i64 = 5;
const DEFAULT_LATE_THRESHOLD_MINUTES: i64 = 30;
const DEFAULT_START_TIME: &str = "09:00";
const DEFAULT_END_OF_DAY_CUTOFF: &str = "17:00";
const DEFAULT_EOD_REPORT_TIME: &str = "17:30";
const DEFAULT_REPORT_OFFSET_MINUTES: i64 = 30;

fn default_grace() -> i64 {
    DEFAULT_GRACE_MINUTES
}
fn default_late_threshold() -> i64 {
    DEFAULT_LATE_THRESHOLD_MINUTES
}
fn default_start_time() -> String {
    DEFAULT_START_TIME.to_string()
}
fn default_cutoff() -> String {
    DEFAULT_END_OF_DAY_CUTOFF.to_string()
}
fn default_eod_report_time() -> String {
    DEFAULT_EOD_REPORT_TIME.to_string()
}
fn default_report_offset() -> i64 {
    DEFAULT_REPORT_OFFSET_MINUTES
}

/// One reporting group: which logged project names map into it, manual
/// membership overrides, and an optional group start time.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupConfig {
    #[serde(default)]
    pub projects: Vec<String>,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub start_time: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailTemplate {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,
    pub sender: String,
    pub hr_email: String,
    pub late_template: EmailTemplate,
    pub absent_template: EmailTemplate,
}

/// Application configuration. The structured surface comes from a JSON
/// file; credentials come from the environment (`.env` supported).
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub webwork_report_url: String,
    pub webwork_users_url: String,
    #[serde(skip)]
    pub webwork_api_user: String,
    #[serde(skip)]
    pub webwork_api_key: String,

    /// IANA timezone identifier all time arithmetic happens in.
    pub timezone: String,

    #[serde(default = "default_start_time")]
    pub default_start_time: String,
    /// Per-employee start time overrides, keyed by email.
    #[serde(default)]
    pub custom_start_times: HashMap<String, String>,
    #[serde(default = "default_grace")]
    pub grace_minutes: i64,
    #[serde(default = "default_late_threshold")]
    pub late_threshold_minutes: i64,
    #[serde(default = "default_cutoff")]
    pub end_of_day_cutoff: String,

    /// Group name -> membership configuration. BTreeMap keeps report
    /// ordering stable.
    pub groups: BTreeMap<String, GroupConfig>,

    pub slack_channel_id: String,
    #[serde(default)]
    pub slack_mention_user_id: Option<String>,
    #[serde(skip)]
    pub slack_bot_token: Option<String>,

    pub spreadsheet_id: String,
    #[serde(default)]
    pub service_account_file: Option<String>,

    #[serde(default)]
    pub email: Option<EmailConfig>,

    /// Minutes after a group's start time its morning report fires.
    #[serde(default = "default_report_offset")]
    pub report_offset_minutes: i64,
    #[serde(default = "default_eod_report_time")]
    pub eod_report_time: String,
    /// Wall-clock for the weekly sheet update; absent disables it in
    /// scheduler mode.
    #[serde(default)]
    pub weekly_report_time: Option<String>,
}

impl AppConfig {
    /// Load the JSON config file and overlay credentials from the
    /// environment.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = fs::read_to_string(path)?;
        let mut config: AppConfig = serde_json::from_str(&raw)?;

        config.webwork_api_user = require_env("WEBWORK_API_USER")?;
        config.webwork_api_key = require_env("WEBWORK_API_KEY")?;
        config.slack_bot_token = env::var("SLACK_BOT_TOKEN").ok().filter(|t| !t.is_empty());
        if let Ok(file) = env::var("GOOGLE_SERVICE_ACCOUNT_FILE") {
            if !file.is_empty() {
                config.service_account_file = Some(file);
            }
        }

        config.validate()?;
        info!(
            "Loaded configuration: {} groups, timezone {}",
            config.groups.len(),
            config.timezone
        );
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        self.tz()?;
        for (label, value) in [
            ("default_start_time", &self.default_start_time),
            ("end_of_day_cutoff", &self.end_of_day_cutoff),
            ("eod_report_time", &self.eod_report_time),
        ] {
            if parse_wall_clock(value).is_none() {
                return Err(AppError::Config(format!(
                    "{} is not a valid HH:MM wall-clock: '{}'",
                    label, value
                )));
            }
        }
        for (group, group_config) in &self.groups {
            if let Some(start) = &group_config.start_time {
                if parse_wall_clock(start).is_none() {
                    return Err(AppError::Config(format!(
                        "start_time for group '{}' is not a valid HH:MM wall-clock: '{}'",
                        group, start
                    )));
                }
            }
        }
        for (email, start) in &self.custom_start_times {
            if parse_wall_clock(start).is_none() {
                return Err(AppError::Config(format!(
                    "custom start time for '{}' is not a valid HH:MM wall-clock: '{}'",
                    email, start
                )));
            }
        }
        Ok(())
    }

    pub fn tz(&self) -> Result<Tz, AppError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| AppError::Config(format!("Unknown timezone '{}'", self.timezone)))
    }

    /// Resolve the start time for one employee: per-employee override,
    /// then the group's start time, then the global default. Looked up
    /// fresh on every run so override changes take effect immediately.
    pub fn start_time_for(&self, group: &GroupConfig, email: &str) -> NaiveTime {
        let normalized = normalize_email(email);
        let override_time = self
            .custom_start_times
            .iter()
            .find(|(key, _)| normalize_email(key) == normalized)
            .and_then(|(_, value)| parse_wall_clock(value));
        if let Some(time) = override_time {
            return time;
        }
        group
            .start_time
            .as_deref()
            .and_then(parse_wall_clock)
            .or_else(|| parse_wall_clock(&self.default_start_time))
            .unwrap_or_else(|| NaiveTime::from_hms_opt(9, 0, 0).unwrap())
    }

    pub fn group_start_time(&self, group: &GroupConfig) -> NaiveTime {
        group
            .start_time
            .as_deref()
            .and_then(parse_wall_clock)
            .or_else(|| parse_wall_clock(&self.default_start_time))
            .unwrap_or_else(|| NaiveTime::from_hms_opt(9, 0, 0).unwrap())
    }

    /// The four-bucket policy used by the daily and end-of-day reports.
    pub fn daily_policy(&self) -> LatenessPolicy {
        LatenessPolicy::daily(
            self.grace_minutes,
            self.late_threshold_minutes,
            parse_wall_clock(&self.end_of_day_cutoff)
                .unwrap_or_else(|| NaiveTime::from_hms_opt(17, 0, 0).unwrap()),
        )
    }

    /// The two-cutoff policy used by the weekly sheet.
    pub fn weekly_policy(&self) -> LatenessPolicy {
        LatenessPolicy::two_cutoff(self.grace_minutes, parse_wall_clock(&self.end_of_day_cutoff))
    }

    pub fn email_enabled(&self) -> bool {
        self.email.as_ref().map(|e| e.enabled).unwrap_or(false)
    }

    /// Build the immutable report schedule: groups bucketed by report
    /// time (start time + offset), plus one end-of-day entry covering
    /// every group. Computed once at startup and passed to the
    /// scheduler explicitly.
    pub fn report_schedule(&self) -> ReportSchedule {
        let mut morning: BTreeMap<NaiveTime, Vec<String>> = BTreeMap::new();
        for (name, group) in &self.groups {
            let report_at = add_minutes(self.group_start_time(group), self.report_offset_minutes);
            morning.entry(report_at).or_default().push(name.clone());
        }

        let mut entries: Vec<ScheduleEntry> = morning
            .into_iter()
            .map(|(at, groups)| ScheduleEntry {
                at,
                kind: RunKind::Morning,
                groups,
            })
            .collect();

        entries.push(ScheduleEntry {
            at: parse_wall_clock(&self.eod_report_time)
                .unwrap_or_else(|| NaiveTime::from_hms_opt(17, 30, 0).unwrap()),
            kind: RunKind::EndOfDay,
            groups: self.groups.keys().cloned().collect(),
        });

        ReportSchedule {
            entries,
            weekly_at: self.weekly_report_time.as_deref().and_then(parse_wall_clock),
        }
    }
}

fn require_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Config(format!("Missing environment variable: {}", name)))
}

fn add_minutes(time: NaiveTime, minutes: i64) -> NaiveTime {
    time + Duration::minutes(minutes)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Morning,
    EndOfDay,
}

#[derive(Debug, Clone)]
pub struct ScheduleEntry {
    pub at: NaiveTime,
    pub kind: RunKind,
    pub groups: Vec<String>,
}

/// Immutable grouping of report jobs by wall-clock time, built once at
/// process start.
#[derive(Debug, Clone)]
pub struct ReportSchedule {
    pub entries: Vec<ScheduleEntry>,
    pub weekly_at: Option<NaiveTime>,
}
