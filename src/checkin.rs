// src/checkin.rs
use chrono::{DateTime, NaiveDate, TimeZone};
use chrono_tz::Tz;
use std::collections::HashMap;
use tracing::warn;

use crate::classify::parse_wall_clock;
use crate::roster::normalize_email;
use crate::webwork::DailyTimeline;

/// Reduce a day's timeline payload to the earliest check-in per employee,
/// keyed by normalized email.
///
/// Each `beginDatetime` is a `HH:MM` wall-clock combined with the target
/// date in the configured timezone. Malformed time strings are skipped
/// with a warning; a missing or malformed payload yields an empty map so
/// one bad upstream response never crashes a scheduled run. The caller is
/// responsible for treating "no data" as a failed fetch where that
/// distinction matters.
pub fn earliest_check_ins(
    payload: &DailyTimeline,
    target_date: NaiveDate,
    tz: Tz,
) -> HashMap<String, DateTime<Tz>> {
    let mut first_entries: HashMap<String, DateTime<Tz>> = HashMap::new();

    for report in &payload.date_report {
        let Some(email) = &report.email else { continue };
        let email = normalize_email(email);

        for project in &report.projects {
            for task in &project.tasks {
                for entry in &task.time_entries {
                    let Some(raw) = &entry.begin_datetime else {
                        continue;
                    };
                    let Some(time) = parse_wall_clock(raw) else {
                        warn!("Skipping unparseable begin time '{}' for {}", raw, email);
                        continue;
                    };
                    let local = target_date.and_time(time);
                    let Some(instant) = tz.from_local_datetime(&local).single() else {
                        warn!(
                            "Begin time '{}' for {} is ambiguous or invalid in {}; skipping",
                            raw, email, tz
                        );
                        continue;
                    };

                    first_entries
                        .entry(email.clone())
                        .and_modify(|current| {
                            if instant < *current {
                                *current = instant;
                            }
                        })
                        .or_insert(instant);
                }
            }
        }
    }

    first_entries
}
