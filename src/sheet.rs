// src/sheet.rs
//! Pure in-memory merge of attendance results into the wide per-date
//! sheet layout. The Sheets API never sees partial state: callers read
//! the whole grid, merge here, and write the whole grid back.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::HashMap;

use crate::classify::{DayBuckets, SheetStatus};
use crate::roster::{normalize_email, RosterMember};

pub const DAILY_SHEET_HEADER: [&str; 2] = ["Name", "Email"];
pub const DATE_COLUMN_FORMAT: &str = "%Y-%m-%d";

/// A worksheet grid as rows of cells. Row 0 is the header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetTable {
    pub rows: Vec<Vec<String>>,
}

impl SheetTable {
    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn width(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    fn pad_to_width(&mut self, width: usize) {
        for row in &mut self.rows {
            while row.len() < width {
                row.push(String::new());
            }
        }
    }
}

/// Merge one day's statuses into the cumulative attendance table.
///
/// The layout is one row per employee and one column per date. Existing
/// rows are never removed, so employees who left the roster keep their
/// history; for the merged date they are marked "Absent". Re-running the
/// merge with the same inputs leaves the table unchanged.
pub fn merge_daily(
    mut table: SheetTable,
    roster: &[RosterMember],
    statuses: &HashMap<String, SheetStatus>,
    date: NaiveDate,
) -> SheetTable {
    if table.rows.is_empty() {
        table
            .rows
            .push(DAILY_SHEET_HEADER.iter().map(|s| s.to_string()).collect());
    }

    let date_label = date.format(DATE_COLUMN_FORMAT).to_string();
    let column = match table.rows[0].iter().position(|c| c == &date_label) {
        Some(index) => index,
        None => {
            table.rows[0].push(date_label);
            table.rows[0].len() - 1
        }
    };
    let width = table.rows[0].len();
    table.pad_to_width(width);

    // Email (column 1) is the row identity.
    let mut row_of: HashMap<String, usize> = HashMap::new();
    for (index, row) in table.rows.iter().enumerate().skip(1) {
        if let Some(email) = row.get(1) {
            row_of.insert(normalize_email(email), index);
        }
    }

    let mut seen: Vec<bool> = vec![false; table.rows.len()];

    for member in roster {
        let status = statuses
            .get(&member.email)
            .copied()
            .unwrap_or(SheetStatus::Absent);

        match row_of.get(&member.email) {
            Some(&index) => {
                // Display names can change upstream; the email stays.
                table.rows[index][0] = member.name.clone();
                table.rows[index][column] = status.as_str().to_string();
                seen[index] = true;
            }
            None => {
                let mut row = vec![String::new(); width];
                row[0] = member.name.clone();
                row[1] = member.email.clone();
                row[column] = status.as_str().to_string();
                table.rows.push(row);
                seen.push(true);
            }
        }
    }

    // Former members stay in the table but read as absent for this date.
    for (index, row) in table.rows.iter_mut().enumerate().skip(1) {
        if !seen[index] {
            row[column] = SheetStatus::Absent.as_str().to_string();
        }
    }

    table
}

// --- Weekly sheet ---

pub const WEEKLY_SHEET_HEADER: [&str; 6] = [
    "Employee Name",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
];

/// Monday and Friday of the ISO week containing `date`.
pub fn week_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
    (monday, monday + Duration::days(4))
}

/// Worksheet title for one ISO week, e.g. "18/08/2025 - 22/08/2025".
pub fn sheet_name_for_week(date: NaiveDate) -> String {
    let (monday, friday) = week_bounds(date);
    format!(
        "{} - {}",
        monday.format("%d/%m/%Y"),
        friday.format("%d/%m/%Y")
    )
}

/// Header column for a weekday; `None` on weekends.
pub fn weekday_column(date: NaiveDate) -> Option<usize> {
    match date.weekday() {
        Weekday::Mon => Some(1),
        Weekday::Tue => Some(2),
        Weekday::Wed => Some(3),
        Weekday::Thu => Some(4),
        Weekday::Fri => Some(5),
        Weekday::Sat | Weekday::Sun => None,
    }
}

/// Cell fill for the weekly sheet, as Sheets API RGB components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellColor {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

pub const WEEKLY_ON_TIME_COLOR: CellColor = CellColor {
    red: 1.0,
    green: 1.0,
    blue: 1.0,
};
pub const WEEKLY_LATE_COLOR: CellColor = CellColor {
    red: 1.0,
    green: 1.0,
    blue: 0.6,
};
pub const WEEKLY_ABSENT_COLOR: CellColor = CellColor {
    red: 1.0,
    green: 0.6,
    blue: 0.6,
};

/// One weekly cell: the rendered value plus its fill color.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyCell {
    pub value: String,
    pub color: CellColor,
}

/// Merge one weekday's buckets into the weekly grid, returning the new
/// table and the colored cells the caller must format.
///
/// Arrival cells are prefixed with an apostrophe so Sheets stores them
/// as text instead of re-parsing the clock value.
pub fn merge_weekly(
    mut table: SheetTable,
    buckets: &DayBuckets,
    date: NaiveDate,
) -> (SheetTable, Vec<(usize, usize, CellColor)>) {
    let Some(column) = weekday_column(date) else {
        return (table, Vec::new());
    };

    if table.rows.is_empty() {
        table
            .rows
            .push(WEEKLY_SHEET_HEADER.iter().map(|s| s.to_string()).collect());
    }
    table.pad_to_width(WEEKLY_SHEET_HEADER.len());

    let mut row_of: HashMap<String, usize> = HashMap::new();
    for (index, row) in table.rows.iter().enumerate().skip(1) {
        if let Some(name) = row.first() {
            row_of.insert(name.clone(), index);
        }
    }

    let mut colors: Vec<(usize, usize, CellColor)> = Vec::new();
    let mut place = |table: &mut SheetTable,
                     row_of: &mut HashMap<String, usize>,
                     name: &str,
                     cell: WeeklyCell| {
        let index = match row_of.get(name) {
            Some(&index) => index,
            None => {
                let mut row = vec![String::new(); WEEKLY_SHEET_HEADER.len()];
                row[0] = name.to_string();
                table.rows.push(row);
                let index = table.rows.len() - 1;
                row_of.insert(name.to_string(), index);
                index
            }
        };
        table.rows[index][column] = cell.value;
        colors.push((index, column, cell.color));
    };

    for row in &buckets.on_time {
        place(
            &mut table,
            &mut row_of,
            &row.name,
            WeeklyCell {
                value: format!("'{}", row.arrival_time),
                color: WEEKLY_ON_TIME_COLOR,
            },
        );
    }
    for row in buckets.late.iter().chain(&buckets.very_late) {
        place(
            &mut table,
            &mut row_of,
            &row.name,
            WeeklyCell {
                value: format!("'{}", row.arrival_time),
                color: WEEKLY_LATE_COLOR,
            },
        );
    }
    for row in &buckets.absent {
        place(
            &mut table,
            &mut row_of,
            &row.name,
            WeeklyCell {
                value: "Absent".to_string(),
                color: WEEKLY_ABSENT_COLOR,
            },
        );
    }

    (table, colors)
}
