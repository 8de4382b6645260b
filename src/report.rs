// src/report.rs
//! Renders classification buckets into the fixed-width ASCII tables
//! posted to Slack. Tables are wrapped in code fences so the columns
//! survive proportional fonts.

use chrono::NaiveDate;

use crate::classify::{AbsentRow, DayBuckets, LateRow, OnTimeRow};
use crate::config::RunKind;

/// Render one fixed-width table. Column widths are the max of the header
/// and every cell in that column; rows are padded or truncated to the
/// header's column count.
pub fn build_table(headers: &[&str], rows: &[Vec<String>], empty_placeholder: &str) -> String {
    if rows.is_empty() {
        return format!("```\n{}\n```", empty_placeholder);
    }

    let columns = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (index, cell) in row.iter().take(columns).enumerate() {
            widths[index] = widths[index].max(cell.len());
        }
    }

    let render_row = |cells: &[String]| -> String {
        (0..columns)
            .map(|index| {
                let cell = cells.get(index).map(String::as_str).unwrap_or("");
                format!("{:<width$}", cell, width = widths[index])
            })
            .collect::<Vec<_>>()
            .join(" | ")
    };

    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    let rule = widths
        .iter()
        .map(|w| "-".repeat(*w))
        .collect::<Vec<_>>()
        .join("-|-");

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(render_row(&header_cells));
    lines.push(rule);
    for row in rows {
        lines.push(render_row(row));
    }

    format!("```\n{}\n```", lines.join("\n"))
}

fn on_time_rows(rows: &[OnTimeRow]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|r| vec![r.name.clone(), r.arrival_time.clone()])
        .collect()
}

fn late_rows(rows: &[LateRow]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|r| {
            vec![
                r.name.clone(),
                r.arrival_time.clone(),
                format!("{} min", r.minutes_late),
            ]
        })
        .collect()
}

fn absent_rows(rows: &[AbsentRow]) -> Vec<Vec<String>> {
    rows.iter().map(|r| vec![r.name.clone()]).collect()
}

/// Render the tables for one group.
///
/// The morning report shows on-time and late arrivals only; everyone
/// else may still check in. The end-of-day report adds the very-late
/// and absent sections.
pub fn render_group_section(group: &str, buckets: &DayBuckets, kind: RunKind) -> String {
    let mut sections = Vec::new();
    sections.push(format!("*{}*", group));

    sections.push("_On Time:_".to_string());
    sections.push(build_table(
        &["Name", "Check-in"],
        &on_time_rows(&buckets.on_time),
        "No on-time arrivals.",
    ));

    sections.push("_Late:_".to_string());
    sections.push(build_table(
        &["Name", "Check-in", "Late by"],
        &late_rows(&buckets.late),
        "No late arrivals.",
    ));

    if kind == RunKind::EndOfDay {
        sections.push("_Checked in after the late window:_".to_string());
        sections.push(build_table(
            &["Name", "Check-in", "Late by"],
            &late_rows(&buckets.very_late),
            "None.",
        ));

        sections.push("_Absent:_".to_string());
        sections.push(build_table(
            &["Name"],
            &absent_rows(&buckets.absent),
            "No absentees.",
        ));
    }

    sections.join("\n")
}

pub fn report_title(kind: RunKind, date: NaiveDate, mention_prefix: &str) -> String {
    let label = match kind {
        RunKind::Morning => "Attendance Report",
        RunKind::EndOfDay => "End-of-Day Attendance Report",
    };
    format!(
        "{}:loudspeaker: *{} - {}*",
        mention_prefix,
        label,
        date.format("%A, %B %d, %Y")
    )
}

/// One consolidated message: title, then each group's section.
pub fn render_consolidated(title: &str, sections: &[String]) -> String {
    let mut parts = Vec::with_capacity(sections.len() + 1);
    parts.push(title.to_string());
    parts.extend(sections.iter().cloned());
    parts.join("\n\n")
}
