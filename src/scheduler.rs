// src/scheduler.rs
use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::config::ReportSchedule;
use crate::runner::ReportRunner;

/// Time until the next occurrence of `at` local wall-clock, today or
/// tomorrow. Falls back to a one-hour wait when the wall-clock does not
/// exist on either day (DST gap).
pub fn duration_until_next(now: DateTime<Tz>, at: NaiveTime) -> Duration {
    let tz = now.timezone();
    for offset in 0..=2 {
        let date = now.date_naive() + ChronoDuration::days(offset);
        if let Some(next) = tz.from_local_datetime(&date.and_time(at)).earliest() {
            if next > now {
                return (next - now).to_std().unwrap_or(Duration::from_secs(60));
            }
        }
    }
    Duration::from_secs(3600)
}

/// Run the report schedule forever: one task per schedule entry, each
/// sleeping until its wall-clock comes around, then firing its report.
/// Returns when the process receives ctrl-c.
pub async fn run_scheduler(
    runner: Arc<ReportRunner>,
    schedule: ReportSchedule,
    tz: Tz,
) -> std::io::Result<()> {
    for entry in schedule.entries {
        let runner = Arc::clone(&runner);
        tokio::spawn(async move {
            loop {
                let now = Utc::now().with_timezone(&tz);
                let wait = duration_until_next(now, entry.at);
                info!(
                    "Next {:?} report for {:?} in {}s (at {})",
                    entry.kind,
                    entry.groups,
                    wait.as_secs(),
                    entry.at
                );
                tokio::time::sleep(wait).await;

                if let Err(err) = runner.run_groups(&entry.groups, entry.kind).await {
                    error!("Scheduled {:?} report failed: {}", entry.kind, err);
                }
            }
        });
    }

    if let Some(at) = schedule.weekly_at {
        let runner = Arc::clone(&runner);
        tokio::spawn(async move {
            loop {
                let now = Utc::now().with_timezone(&tz);
                let wait = duration_until_next(now, at);
                info!("Next weekly sheet update in {}s (at {})", wait.as_secs(), at);
                tokio::time::sleep(wait).await;

                let date = Utc::now().with_timezone(&tz).date_naive();
                if let Err(err) = runner.run_weekly(date).await {
                    error!("Weekly sheet update failed: {}", err);
                }
            }
        });
    }

    info!("Scheduler started; waiting for ctrl-c");
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    Ok(())
}
