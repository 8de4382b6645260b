// src/runner.rs
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::checkin::earliest_check_ins;
use crate::classify::{classify_group, format_arrival, sheet_statuses, DayBuckets};
use crate::config::{AppConfig, GroupConfig, RunKind};
use crate::email::EmailNotifier;
use crate::google::GoogleAuth;
use crate::report::{render_consolidated, render_group_section, report_title};
use crate::retry::{retry, RetryPolicy};
use crate::roster::{resolve_group, RosterMember, UserDirectory};
use crate::sheet::{
    merge_daily, merge_weekly, sheet_name_for_week, weekday_column, SheetTable,
    DAILY_SHEET_HEADER,
};
use crate::sheets::{
    cell_fill_request, header_format_request, status_color_requests, status_validation_request,
    SheetsClient, SheetsError,
};
use crate::slack::{SlackError, SlackNotifier};
use crate::webwork::{DailyTimeline, WebworkClient};
use crate::AppError;

/// Resolve a local wall-clock to an instant in `tz`. An ambiguous time
/// (fall-back overlap) takes the earlier instant; a nonexistent time
/// (spring-forward gap) advances to the next valid wall-clock.
pub fn local_instant(tz: Tz, date: NaiveDate, time: NaiveTime) -> DateTime<Tz> {
    let mut local = date.and_time(time);
    for _ in 0..3 {
        if let Some(instant) = tz.from_local_datetime(&local).earliest() {
            return instant;
        }
        local += Duration::hours(1);
    }
    tz.from_utc_datetime(&local)
}

/// Wires the source, the classifier and the sinks together for one
/// process. Sinks that cannot be configured are disabled with a warning
/// instead of failing startup.
pub struct ReportRunner {
    config: AppConfig,
    tz: Tz,
    webwork: WebworkClient,
    slack: SlackNotifier,
    sheets: Option<SheetsClient>,
    email: Option<EmailNotifier>,
    retry_policy: RetryPolicy,
}

impl ReportRunner {
    pub async fn new(config: AppConfig) -> Result<Self, AppError> {
        let tz = config.tz()?;

        let webwork = WebworkClient::new(
            config.webwork_report_url.clone(),
            config.webwork_users_url.clone(),
            &config.webwork_api_user,
            &config.webwork_api_key,
        )?;

        let slack = SlackNotifier::new(
            config.slack_bot_token.clone(),
            config.slack_channel_id.clone(),
            config.slack_mention_user_id.clone(),
        )?;

        let (sheets, email) = match &config.service_account_file {
            Some(file) => {
                let path = Path::new(file);
                let sheets_auth = Arc::new(GoogleAuth::from_service_account_file(path, None).await?);
                let sheets = SheetsClient::new(config.spreadsheet_id.clone(), sheets_auth)?;

                let email = match &config.email {
                    Some(email_config) if email_config.enabled => {
                        let delegated = Arc::new(
                            GoogleAuth::from_service_account_file(
                                path,
                                Some(&email_config.sender),
                            )
                            .await?,
                        );
                        Some(EmailNotifier::new(email_config.clone(), delegated)?)
                    }
                    _ => None,
                };

                (Some(sheets), email)
            }
            None => {
                warn!("No Google service account configured; sheet sync and email are disabled");
                (None, None)
            }
        };

        Ok(Self {
            config,
            tz,
            webwork,
            slack,
            sheets,
            email,
            retry_policy: RetryPolicy::default(),
        })
    }

    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.tz).date_naive()
    }

    fn instant_at(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Tz> {
        local_instant(self.tz, date, time)
    }

    async fn fetch_directory(&self) -> UserDirectory {
        match self.webwork.fetch_users().await {
            Ok(users) => UserDirectory::from_users(&users),
            // Names degrade to raw emails; the run still proceeds.
            Err(err) => {
                warn!("Failed to fetch user directory: {}", err);
                UserDirectory::new()
            }
        }
    }

    /// Fetch the day's timeline. A source failure aborts the run (there
    /// is nothing trustworthy to report) after alerting the channel.
    async fn fetch_timeline(&self, date: NaiveDate) -> Option<DailyTimeline> {
        match self.webwork.fetch_daily_timeline(date).await {
            Ok(timeline) => Some(timeline),
            Err(err) => {
                error!("Failed to fetch timeline for {}: {}", date, err);
                let alert = format!(
                    "{}:warning: Could not fetch time tracking data for {}; attendance report skipped.",
                    self.slack.mention_prefix(),
                    date
                );
                let posted = retry(
                    &self.retry_policy,
                    SlackError::is_rate_limit,
                    || self.slack.post_message(&alert),
                )
                .await;
                if let Err(slack_err) = posted {
                    warn!("Failed to post source failure alert: {}", slack_err);
                }
                None
            }
        }
    }

    fn classify_for_group(
        &self,
        group: &GroupConfig,
        roster: &[RosterMember],
        check_ins: &HashMap<String, DateTime<Tz>>,
        date: NaiveDate,
        weekly: bool,
    ) -> DayBuckets {
        let policy = if weekly {
            self.config.weekly_policy()
        } else {
            self.config.daily_policy()
        };
        classify_group(
            roster,
            check_ins,
            |email| self.instant_at(date, self.config.start_time_for(group, email)),
            &policy,
        )
    }

    /// Run the named groups' reports for today.
    pub async fn run_groups(&self, groups: &[String], kind: RunKind) -> Result<(), AppError> {
        self.run_groups_for_date(groups, kind, self.today()).await
    }

    pub async fn run_groups_for_date(
        &self,
        groups: &[String],
        kind: RunKind,
        date: NaiveDate,
    ) -> Result<(), AppError> {
        info!("Running {:?} report for {} group(s) on {}", kind, groups.len(), date);

        let directory = self.fetch_directory().await;
        let Some(timeline) = self.fetch_timeline(date).await else {
            return Ok(());
        };
        let check_ins = earliest_check_ins(&timeline, date, self.tz);

        let mut sections = Vec::new();
        for name in groups {
            let Some(group) = self.config.groups.get(name) else {
                warn!("Unknown group '{}' in schedule; skipping", name);
                continue;
            };

            let roster = resolve_group(&timeline, group, &directory);
            let buckets = self.classify_for_group(group, &roster, &check_ins, date, false);

            if kind == RunKind::EndOfDay {
                // A sheet failure for one group must not block the others.
                if let Err(err) = self.sync_group_sheet(name, &roster, &buckets, date).await {
                    error!("Sheet sync failed for group '{}': {}", name, err);
                }

                if let Some(email) = &self.email {
                    email
                        .send_batch(&buckets, date, |member_email| {
                            format_arrival(&self.instant_at(
                                date,
                                self.config.start_time_for(group, member_email),
                            ))
                        })
                        .await;
                }
            }

            sections.push(render_group_section(name, &buckets, kind));
        }

        if sections.is_empty() {
            warn!("No groups produced a report section; nothing to post");
            return Ok(());
        }

        let title = report_title(kind, date, &self.slack.mention_prefix());
        let message = render_consolidated(&title, &sections);
        retry(
            &self.retry_policy,
            |err: &SlackError| err.is_rate_limit(),
            || self.slack.post_message(&message),
        )
        .await?;

        Ok(())
    }

    /// Write the merged attendance grid for one group, then reapply
    /// header and status formatting. Values are written before
    /// formatting so a formatting failure never loses data.
    async fn sync_group_sheet(
        &self,
        worksheet: &str,
        roster: &[RosterMember],
        buckets: &DayBuckets,
        date: NaiveDate,
    ) -> Result<(), SheetsError> {
        let Some(sheets) = &self.sheets else {
            return Ok(());
        };

        let statuses = sheet_statuses(buckets);

        let sheet_id = retry(
            &self.retry_policy,
            SheetsError::is_rate_limit,
            || sheets.ensure_worksheet(worksheet),
        )
        .await?;
        let existing = retry(
            &self.retry_policy,
            SheetsError::is_rate_limit,
            || sheets.read_all(worksheet),
        )
        .await?;

        let merged = merge_daily(existing, roster, &statuses, date);
        retry(
            &self.retry_policy,
            SheetsError::is_rate_limit,
            || sheets.replace_all(worksheet, &merged),
        )
        .await?;

        let rows = merged.rows.len();
        let columns = merged.width();
        let mut requests = vec![header_format_request(sheet_id, columns)];
        for column in DAILY_SHEET_HEADER.len()..columns {
            requests.extend(status_color_requests(sheet_id, column, rows));
            requests.push(status_validation_request(sheet_id, column, rows));
        }
        retry(
            &self.retry_policy,
            SheetsError::is_rate_limit,
            || sheets.batch_update(requests.clone()),
        )
        .await?;

        info!("Synced worksheet '{}' ({} rows)", worksheet, rows);
        Ok(())
    }

    /// Rebuild the current ISO week's sheet from Monday through `date`.
    /// Weekend invocations are a no-op.
    pub async fn run_weekly(&self, date: NaiveDate) -> Result<(), AppError> {
        if weekday_column(date).is_none() {
            info!("{} is a weekend; skipping weekly sheet update", date);
            return Ok(());
        }
        let Some(sheets) = &self.sheets else {
            warn!("Sheets sink disabled; skipping weekly sheet update");
            return Ok(());
        };

        let directory = self.fetch_directory().await;
        let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);

        let mut table = SheetTable::default();
        let mut fills: Vec<(usize, usize, crate::sheet::CellColor)> = Vec::new();

        let mut day = monday;
        while day <= date {
            if let Some(timeline) = self.fetch_timeline(day).await {
                let check_ins = earliest_check_ins(&timeline, day, self.tz);
                for group in self.config.groups.values() {
                    let roster = resolve_group(&timeline, group, &directory);
                    let buckets = self.classify_for_group(group, &roster, &check_ins, day, true);
                    let (next, day_fills) = merge_weekly(table, &buckets, day);
                    table = next;
                    fills.extend(day_fills);
                }
            }
            day += Duration::days(1);
        }

        if table.rows.is_empty() {
            warn!("Weekly sheet has no data for the week of {}; nothing to write", monday);
            return Ok(());
        }

        let title = sheet_name_for_week(date);
        let sheet_id = retry(
            &self.retry_policy,
            SheetsError::is_rate_limit,
            || sheets.ensure_worksheet(&title),
        )
        .await?;
        retry(
            &self.retry_policy,
            SheetsError::is_rate_limit,
            || sheets.replace_all(&title, &table),
        )
        .await?;

        let mut requests = vec![header_format_request(sheet_id, table.width())];
        for (row, column, color) in &fills {
            requests.push(cell_fill_request(sheet_id, *row, *column, *color));
        }
        retry(
            &self.retry_policy,
            SheetsError::is_rate_limit,
            || sheets.batch_update(requests.clone()),
        )
        .await?;

        info!("Updated weekly sheet '{}'", title);
        Ok(())
    }

    /// Run every scheduled report for today in order, morning entries
    /// first and the end-of-day pass last.
    pub async fn run_complete(&self) -> Result<(), AppError> {
        let schedule = self.config.report_schedule();
        for entry in &schedule.entries {
            self.run_groups(&entry.groups, entry.kind).await?;
        }
        Ok(())
    }
}
