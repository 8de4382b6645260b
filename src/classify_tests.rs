// src/classify_tests.rs

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone};
    use chrono_tz::Tz;
    use std::collections::HashMap;

    use crate::classify::{
        classify, classify_group, parse_wall_clock, sheet_statuses, Classification,
        LatenessPolicy, SheetStatus,
    };
    use crate::roster::RosterMember;

    const TZ: Tz = chrono_tz::Asia::Karachi;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<Tz> {
        TZ.from_local_datetime(&date().and_hms_opt(h, m, s).unwrap())
            .single()
            .unwrap()
    }

    fn daily_policy() -> LatenessPolicy {
        LatenessPolicy::daily(5, 30, NaiveTime::from_hms_opt(17, 0, 0).unwrap())
    }

    #[test]
    fn no_check_in_is_absent() {
        assert_eq!(
            classify(None, at(9, 0, 0), &daily_policy()),
            Classification::Absent
        );
    }

    #[test]
    fn arrival_exactly_at_start_is_on_time() {
        let result = classify(Some(at(9, 0, 0)), at(9, 0, 0), &daily_policy());
        assert!(matches!(result, Classification::OnTime { .. }));
    }

    #[test]
    fn grace_boundary_is_inclusive() {
        // Exactly start + grace is still on time.
        let result = classify(Some(at(9, 5, 0)), at(9, 0, 0), &daily_policy());
        assert!(matches!(result, Classification::OnTime { .. }));

        // One second past the grace period is late.
        let result = classify(Some(at(9, 5, 1)), at(9, 0, 0), &daily_policy());
        assert!(matches!(result, Classification::Late { .. }));
    }

    #[test]
    fn minutes_late_is_floored_from_start() {
        let result = classify(Some(at(9, 12, 59)), at(9, 0, 0), &daily_policy());
        match result {
            Classification::Late { minutes_late, .. } => assert_eq!(minutes_late, 12),
            other => panic!("expected Late, got {:?}", other),
        }
    }

    #[test]
    fn late_threshold_boundary_is_very_late() {
        // Just under the threshold stays late.
        let result = classify(Some(at(9, 29, 59)), at(9, 0, 0), &daily_policy());
        assert!(matches!(result, Classification::Late { .. }));

        // At the threshold and beyond is very late, measured from start.
        let result = classify(Some(at(9, 31, 0)), at(9, 0, 0), &daily_policy());
        match result {
            Classification::VeryLate { minutes_late, .. } => assert_eq!(minutes_late, 31),
            other => panic!("expected VeryLate, got {:?}", other),
        }
    }

    #[test]
    fn check_in_at_or_after_cutoff_is_absent() {
        let result = classify(Some(at(17, 0, 0)), at(9, 0, 0), &daily_policy());
        assert_eq!(result, Classification::Absent);

        let result = classify(Some(at(18, 30, 0)), at(9, 0, 0), &daily_policy());
        assert_eq!(result, Classification::Absent);

        let result = classify(Some(at(16, 59, 59)), at(9, 0, 0), &daily_policy());
        assert!(matches!(result, Classification::VeryLate { .. }));
    }

    #[test]
    fn ambiguous_cutoff_still_marks_absent() {
        // US fall-back: 2025-11-02 01:30 occurs twice in New York. The
        // cutoff must resolve (to the earlier instant) rather than
        // being dropped for the day.
        let tz = chrono_tz::America::New_York;
        let date = NaiveDate::from_ymd_opt(2025, 11, 2).unwrap();
        let local = |h, m| {
            tz.from_local_datetime(&date.and_hms_opt(h, m, 0).unwrap())
                .earliest()
                .unwrap()
        };

        let policy = LatenessPolicy::daily(5, 30, NaiveTime::from_hms_opt(1, 30, 0).unwrap());
        let result = classify(Some(local(3, 0)), local(0, 0), &policy);
        assert_eq!(result, Classification::Absent);
    }

    #[test]
    fn gap_cutoff_resolves_to_next_valid_wall_clock() {
        // US spring-forward: 2025-03-09 02:30 does not exist in New
        // York; the cutoff lands on the next valid wall-clock (03:30).
        let tz = chrono_tz::America::New_York;
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        let local = |h, m| {
            tz.from_local_datetime(&date.and_hms_opt(h, m, 0).unwrap())
                .earliest()
                .unwrap()
        };

        let policy = LatenessPolicy::daily(5, 30, NaiveTime::from_hms_opt(2, 30, 0).unwrap());
        let result = classify(Some(local(3, 0)), local(0, 0), &policy);
        assert!(matches!(result, Classification::VeryLate { .. }));

        let result = classify(Some(local(4, 0)), local(0, 0), &policy);
        assert_eq!(result, Classification::Absent);
    }

    #[test]
    fn two_cutoff_policy_has_no_very_late_band() {
        let policy = LatenessPolicy::two_cutoff(5, NaiveTime::from_hms_opt(17, 0, 0));

        let result = classify(Some(at(11, 45, 0)), at(9, 0, 0), &policy);
        match result {
            Classification::Late { minutes_late, .. } => assert_eq!(minutes_late, 165),
            other => panic!("expected Late, got {:?}", other),
        }

        let result = classify(Some(at(17, 0, 0)), at(9, 0, 0), &policy);
        assert_eq!(result, Classification::Absent);
    }

    #[test]
    fn two_cutoff_without_cutoff_never_yields_absent_for_check_ins() {
        let policy = LatenessPolicy::two_cutoff(5, None);
        let result = classify(Some(at(23, 30, 0)), at(9, 0, 0), &policy);
        assert!(matches!(result, Classification::Late { .. }));
    }

    #[test]
    fn wall_clock_parsing() {
        assert_eq!(
            parse_wall_clock("09:30"),
            NaiveTime::from_hms_opt(9, 30, 0)
        );
        assert_eq!(
            parse_wall_clock(" 17:05 "),
            NaiveTime::from_hms_opt(17, 5, 0)
        );
        assert_eq!(parse_wall_clock("9am"), None);
        assert_eq!(parse_wall_clock(""), None);
    }

    fn member(name: &str, email: &str) -> RosterMember {
        RosterMember {
            name: name.to_string(),
            email: email.to_string(),
        }
    }

    #[test]
    fn group_classification_honors_per_member_start_times() {
        let roster = vec![
            member("Alice", "alice@example.com"),
            member("Bob", "bob@example.com"),
            member("Carol", "carol@example.com"),
        ];
        let check_ins = HashMap::from([
            ("alice@example.com".to_string(), at(10, 2, 0)),
            ("bob@example.com".to_string(), at(9, 20, 0)),
        ]);

        // Alice starts at 10:00, everyone else at 09:00.
        let buckets = classify_group(
            &roster,
            &check_ins,
            |email| {
                if email == "alice@example.com" {
                    at(10, 0, 0)
                } else {
                    at(9, 0, 0)
                }
            },
            &daily_policy(),
        );

        assert_eq!(buckets.on_time.len(), 1);
        assert_eq!(buckets.on_time[0].name, "Alice");
        assert_eq!(buckets.late.len(), 1);
        assert_eq!(buckets.late[0].name, "Bob");
        assert_eq!(buckets.late[0].minutes_late, 20);
        assert_eq!(buckets.absent.len(), 1);
        assert_eq!(buckets.absent[0].name, "Carol");
        assert!(buckets.very_late.is_empty());
    }

    #[test]
    fn sheet_statuses_fold_very_late_into_absent() {
        let roster = vec![
            member("Alice", "alice@example.com"),
            member("Bob", "bob@example.com"),
            member("Carol", "carol@example.com"),
        ];
        let check_ins = HashMap::from([
            ("alice@example.com".to_string(), at(9, 3, 0)),
            ("bob@example.com".to_string(), at(10, 15, 0)),
        ]);

        let buckets = classify_group(&roster, &check_ins, |_| at(9, 0, 0), &daily_policy());
        let statuses = sheet_statuses(&buckets);

        assert_eq!(statuses["alice@example.com"], SheetStatus::Present);
        // Bob checked in past the late window; the sheet records Absent.
        assert_eq!(statuses["bob@example.com"], SheetStatus::Absent);
        assert_eq!(statuses["carol@example.com"], SheetStatus::Absent);
    }

    #[test]
    fn arrival_times_render_as_twelve_hour_clock() {
        let buckets = classify_group(
            &[member("Alice", "alice@example.com")],
            &HashMap::from([("alice@example.com".to_string(), at(9, 3, 0))]),
            |_| at(9, 0, 0),
            &daily_policy(),
        );
        assert_eq!(buckets.on_time[0].arrival_time, "09:03 AM");
    }
}
