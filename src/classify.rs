// src/classify.rs
use chrono::{DateTime, Duration, NaiveTime, TimeZone};
use chrono_tz::Tz;
use std::collections::HashMap;

use crate::roster::{normalize_email, RosterMember};

/// Parse a `HH:MM` wall-clock string.
pub fn parse_wall_clock(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").ok()
}

/// Thresholds for one classification run.
///
/// Both report variants are derived from the same comparison ladder:
/// the full daily/EOD reports use a grace period, a late threshold and an
/// end-of-day cutoff (four buckets), while the weekly sheet sets
/// `late_threshold_minutes` to `None` so everything between the grace
/// period and the cutoff lands in `Late` (three buckets).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatenessPolicy {
    pub grace_minutes: i64,
    pub late_threshold_minutes: Option<i64>,
    pub end_of_day_cutoff: Option<NaiveTime>,
}

impl LatenessPolicy {
    pub fn daily(grace_minutes: i64, late_threshold_minutes: i64, cutoff: NaiveTime) -> Self {
        Self {
            grace_minutes,
            late_threshold_minutes: Some(late_threshold_minutes),
            end_of_day_cutoff: Some(cutoff),
        }
    }

    /// Two-cutoff variant: on-time / late / absent only.
    pub fn two_cutoff(grace_minutes: i64, cutoff: Option<NaiveTime>) -> Self {
        Self {
            grace_minutes,
            late_threshold_minutes: None,
            end_of_day_cutoff: cutoff,
        }
    }
}

/// Outcome of classifying one employee's day.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    OnTime { arrival: DateTime<Tz> },
    Late { arrival: DateTime<Tz>, minutes_late: i64 },
    VeryLate { arrival: DateTime<Tz>, minutes_late: i64 },
    Absent,
}

/// Classify a single check-in against a start time.
///
/// `minutes_late` is always measured from the start time, not from the
/// late threshold. A check-in at or after the end-of-day cutoff counts
/// as absent; that is a business rule, not an oversight.
pub fn classify(
    check_in: Option<DateTime<Tz>>,
    start: DateTime<Tz>,
    policy: &LatenessPolicy,
) -> Classification {
    let Some(arrival) = check_in else {
        return Classification::Absent;
    };

    if arrival <= start + Duration::minutes(policy.grace_minutes) {
        return Classification::OnTime { arrival };
    }

    let minutes_late = (arrival - start).num_seconds().div_euclid(60);

    if let Some(late_threshold) = policy.late_threshold_minutes {
        if arrival < start + Duration::minutes(late_threshold) {
            return Classification::Late {
                arrival,
                minutes_late,
            };
        }
    }

    let before_cutoff = match cutoff_instant(start, policy) {
        Some(cutoff) => arrival < cutoff,
        None => true,
    };

    if !before_cutoff {
        return Classification::Absent;
    }

    if policy.late_threshold_minutes.is_some() {
        Classification::VeryLate {
            arrival,
            minutes_late,
        }
    } else {
        Classification::Late {
            arrival,
            minutes_late,
        }
    }
}

// The cutoff is a wall-clock on the same calendar day as the start time,
// resolved in the start time's zone. An ambiguous cutoff (fall-back
// overlap) takes the earlier instant; a nonexistent one (spring-forward
// gap) advances to the next valid wall-clock, so the cutoff is never
// silently dropped for the day.
fn cutoff_instant(start: DateTime<Tz>, policy: &LatenessPolicy) -> Option<DateTime<Tz>> {
    let cutoff = policy.end_of_day_cutoff?;
    let tz = start.timezone();
    let mut local = start.date_naive().and_time(cutoff);
    for _ in 0..3 {
        if let Some(instant) = tz.from_local_datetime(&local).earliest() {
            return Some(instant);
        }
        local += Duration::hours(1);
    }
    None
}

// --- Tagged status rows ---

#[derive(Debug, Clone, PartialEq)]
pub struct OnTimeRow {
    pub name: String,
    pub email: String,
    pub arrival_time: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LateRow {
    pub name: String,
    pub email: String,
    pub arrival_time: String,
    pub minutes_late: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AbsentRow {
    pub name: String,
    pub email: String,
}

/// One group's classification results for a day.
#[derive(Debug, Clone, Default)]
pub struct DayBuckets {
    pub on_time: Vec<OnTimeRow>,
    pub late: Vec<LateRow>,
    pub very_late: Vec<LateRow>,
    pub absent: Vec<AbsentRow>,
}

impl DayBuckets {
    pub fn is_empty(&self) -> bool {
        self.on_time.is_empty()
            && self.late.is_empty()
            && self.very_late.is_empty()
            && self.absent.is_empty()
    }
}

pub fn format_arrival(arrival: &DateTime<Tz>) -> String {
    arrival.format("%I:%M %p").to_string()
}

/// Classify every roster member for the day.
///
/// `start_of` resolves the start time per employee so per-user overrides
/// are honored on every run without caching.
pub fn classify_group<F>(
    roster: &[RosterMember],
    check_ins: &HashMap<String, DateTime<Tz>>,
    start_of: F,
    policy: &LatenessPolicy,
) -> DayBuckets
where
    F: Fn(&str) -> DateTime<Tz>,
{
    let mut buckets = DayBuckets::default();

    for member in roster {
        let email = normalize_email(&member.email);
        let check_in = check_ins.get(&email).copied();
        let start = start_of(&email);

        match classify(check_in, start, policy) {
            Classification::OnTime { arrival } => buckets.on_time.push(OnTimeRow {
                name: member.name.clone(),
                email: member.email.clone(),
                arrival_time: format_arrival(&arrival),
            }),
            Classification::Late {
                arrival,
                minutes_late,
            } => buckets.late.push(LateRow {
                name: member.name.clone(),
                email: member.email.clone(),
                arrival_time: format_arrival(&arrival),
                minutes_late,
            }),
            Classification::VeryLate {
                arrival,
                minutes_late,
            } => buckets.very_late.push(LateRow {
                name: member.name.clone(),
                email: member.email.clone(),
                arrival_time: format_arrival(&arrival),
                minutes_late,
            }),
            Classification::Absent => buckets.absent.push(AbsentRow {
                name: member.name.clone(),
                email: member.email.clone(),
            }),
        }
    }

    buckets
}

// --- Sheet storage collapse ---

/// Three-bucket status stored in the attendance sheet. The chat report
/// keeps very-late distinct; the sheet intentionally folds it into
/// "Absent".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetStatus {
    Present,
    Late,
    Absent,
}

impl SheetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SheetStatus::Present => "Present",
            SheetStatus::Late => "Late",
            SheetStatus::Absent => "Absent",
        }
    }
}

impl From<&Classification> for SheetStatus {
    fn from(c: &Classification) -> Self {
        match c {
            Classification::OnTime { .. } => SheetStatus::Present,
            Classification::Late { .. } => SheetStatus::Late,
            Classification::VeryLate { .. } | Classification::Absent => SheetStatus::Absent,
        }
    }
}

/// Collapse a day's buckets into the per-email sheet statuses.
pub fn sheet_statuses(buckets: &DayBuckets) -> HashMap<String, SheetStatus> {
    let mut statuses = HashMap::new();
    for row in &buckets.on_time {
        statuses.insert(normalize_email(&row.email), SheetStatus::Present);
    }
    for row in &buckets.late {
        statuses.insert(normalize_email(&row.email), SheetStatus::Late);
    }
    for row in &buckets.very_late {
        statuses.insert(normalize_email(&row.email), SheetStatus::Absent);
    }
    for row in &buckets.absent {
        statuses.insert(normalize_email(&row.email), SheetStatus::Absent);
    }
    statuses
}
