// src/sheet_tests.rs

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use std::collections::HashMap;

    use crate::classify::{AbsentRow, DayBuckets, LateRow, OnTimeRow, SheetStatus};
    use crate::roster::RosterMember;
    use crate::sheet::{
        merge_daily, merge_weekly, sheet_name_for_week, week_bounds, weekday_column, SheetTable,
        WEEKLY_ABSENT_COLOR, WEEKLY_LATE_COLOR, WEEKLY_ON_TIME_COLOR,
    };

    fn member(name: &str, email: &str) -> RosterMember {
        RosterMember {
            name: name.to_string(),
            email: email.to_string(),
        }
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn statuses(pairs: &[(&str, SheetStatus)]) -> HashMap<String, SheetStatus> {
        pairs
            .iter()
            .map(|(email, status)| (email.to_string(), *status))
            .collect()
    }

    fn assert_rectangular(table: &SheetTable) {
        let width = table.rows[0].len();
        for row in &table.rows {
            assert_eq!(row.len(), width);
        }
    }

    #[test]
    fn empty_table_gains_header_and_member_rows() {
        let roster = vec![
            member("Alice", "alice@example.com"),
            member("Bob", "bob@example.com"),
        ];
        let day = statuses(&[
            ("alice@example.com", SheetStatus::Present),
            ("bob@example.com", SheetStatus::Late),
        ]);

        let table = merge_daily(SheetTable::default(), &roster, &day, monday());

        assert_eq!(table.rows[0], vec!["Name", "Email", "2025-03-10"]);
        assert_eq!(
            table.rows[1],
            vec!["Alice", "alice@example.com", "Present"]
        );
        assert_eq!(table.rows[2], vec!["Bob", "bob@example.com", "Late"]);
        assert_rectangular(&table);
    }

    #[test]
    fn merge_is_idempotent() {
        let roster = vec![member("Alice", "alice@example.com")];
        let day = statuses(&[("alice@example.com", SheetStatus::Present)]);

        let once = merge_daily(SheetTable::default(), &roster, &day, monday());
        let twice = merge_daily(once.clone(), &roster, &day, monday());
        assert_eq!(once, twice);
    }

    #[test]
    fn new_date_appends_a_column_and_pads_existing_rows() {
        let roster = vec![member("Alice", "alice@example.com")];
        let day_one = statuses(&[("alice@example.com", SheetStatus::Present)]);
        let day_two = statuses(&[("alice@example.com", SheetStatus::Late)]);

        let table = merge_daily(SheetTable::default(), &roster, &day_one, monday());
        let tuesday = monday().succ_opt().unwrap();
        let table = merge_daily(table, &roster, &day_two, tuesday);

        assert_eq!(
            table.rows[0],
            vec!["Name", "Email", "2025-03-10", "2025-03-11"]
        );
        assert_eq!(
            table.rows[1],
            vec!["Alice", "alice@example.com", "Present", "Late"]
        );
        assert_rectangular(&table);
    }

    #[test]
    fn new_member_is_appended_with_blank_history() {
        let day_one_roster = vec![member("Alice", "alice@example.com")];
        let table = merge_daily(
            SheetTable::default(),
            &day_one_roster,
            &statuses(&[("alice@example.com", SheetStatus::Present)]),
            monday(),
        );

        let day_two_roster = vec![
            member("Alice", "alice@example.com"),
            member("Carol", "carol@example.com"),
        ];
        let tuesday = monday().succ_opt().unwrap();
        let table = merge_daily(
            table,
            &day_two_roster,
            &statuses(&[
                ("alice@example.com", SheetStatus::Present),
                ("carol@example.com", SheetStatus::Present),
            ]),
            tuesday,
        );

        // Carol has no Monday history; her Monday cell stays blank.
        assert_eq!(
            table.rows[2],
            vec!["Carol", "carol@example.com", "", "Present"]
        );
        assert_rectangular(&table);
    }

    #[test]
    fn departed_member_keeps_row_and_reads_absent() {
        let roster = vec![
            member("Alice", "alice@example.com"),
            member("Bob", "bob@example.com"),
        ];
        let table = merge_daily(
            SheetTable::default(),
            &roster,
            &statuses(&[
                ("alice@example.com", SheetStatus::Present),
                ("bob@example.com", SheetStatus::Present),
            ]),
            monday(),
        );

        // Bob is gone on Tuesday; his row survives and reads Absent.
        let tuesday = monday().succ_opt().unwrap();
        let table = merge_daily(
            table,
            &[member("Alice", "alice@example.com")],
            &statuses(&[("alice@example.com", SheetStatus::Present)]),
            tuesday,
        );

        assert_eq!(table.rows.len(), 3);
        assert_eq!(
            table.rows[2],
            vec!["Bob", "bob@example.com", "Present", "Absent"]
        );
    }

    #[test]
    fn renamed_member_row_is_updated_in_place() {
        let table = merge_daily(
            SheetTable::default(),
            &[member("A. Smith", "alice@example.com")],
            &statuses(&[("alice@example.com", SheetStatus::Present)]),
            monday(),
        );
        let table = merge_daily(
            table,
            &[member("Alice Smith", "alice@example.com")],
            &statuses(&[("alice@example.com", SheetStatus::Present)]),
            monday(),
        );

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1][0], "Alice Smith");
    }

    #[test]
    fn member_without_status_defaults_to_absent() {
        let roster = vec![member("Alice", "alice@example.com")];
        let table = merge_daily(SheetTable::default(), &roster, &HashMap::new(), monday());
        assert_eq!(table.rows[1][2], "Absent");
    }

    // --- Weekly sheet ---

    #[test]
    fn week_bounds_span_monday_to_friday() {
        let wednesday = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
        let (start, end) = week_bounds(wednesday);
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 3, 14).unwrap());
        assert_eq!(sheet_name_for_week(wednesday), "10/03/2025 - 14/03/2025");
    }

    #[test]
    fn weekday_columns_map_monday_first() {
        assert_eq!(weekday_column(monday()), Some(1));
        let friday = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        assert_eq!(weekday_column(friday), Some(5));
        let saturday = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        assert_eq!(weekday_column(saturday), None);
    }

    #[test]
    fn weekly_merge_places_values_and_colors() {
        let buckets = DayBuckets {
            on_time: vec![OnTimeRow {
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
                arrival_time: "09:02 AM".to_string(),
            }],
            late: vec![LateRow {
                name: "Bob".to_string(),
                email: "bob@example.com".to_string(),
                arrival_time: "09:40 AM".to_string(),
                minutes_late: 40,
            }],
            very_late: vec![],
            absent: vec![AbsentRow {
                name: "Carol".to_string(),
                email: "carol@example.com".to_string(),
            }],
        };

        let (table, fills) = merge_weekly(SheetTable::default(), &buckets, monday());

        assert_eq!(
            table.rows[0],
            vec!["Employee Name", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday"]
        );
        // Arrival cells are stored as text via the apostrophe prefix.
        assert_eq!(table.rows[1][0], "Alice");
        assert_eq!(table.rows[1][1], "'09:02 AM");
        assert_eq!(table.rows[2][1], "'09:40 AM");
        assert_eq!(table.rows[3][1], "Absent");

        assert_eq!(fills.len(), 3);
        assert_eq!(fills[0], (1, 1, WEEKLY_ON_TIME_COLOR));
        assert_eq!(fills[1], (2, 1, WEEKLY_LATE_COLOR));
        assert_eq!(fills[2], (3, 1, WEEKLY_ABSENT_COLOR));
        assert_rectangular(&table);
    }

    #[test]
    fn weekly_merge_reuses_rows_across_days() {
        let monday_buckets = DayBuckets {
            on_time: vec![OnTimeRow {
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
                arrival_time: "09:02 AM".to_string(),
            }],
            ..Default::default()
        };
        let tuesday_buckets = DayBuckets {
            absent: vec![AbsentRow {
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
            }],
            ..Default::default()
        };

        let (table, _) = merge_weekly(SheetTable::default(), &monday_buckets, monday());
        let tuesday = monday().succ_opt().unwrap();
        let (table, _) = merge_weekly(table, &tuesday_buckets, tuesday);

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1][1], "'09:02 AM");
        assert_eq!(table.rows[1][2], "Absent");
    }

    #[test]
    fn weekend_weekly_merge_is_a_no_op() {
        let saturday = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        let buckets = DayBuckets::default();
        let (table, fills) = merge_weekly(SheetTable::default(), &buckets, saturday);
        assert!(table.rows.is_empty());
        assert!(fills.is_empty());
    }
}
