//! Demo loan tests
//!
//! Partial returns, loan status and overdue tracking.

use chrono::{NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use shared::{Demo, DemoStatus};
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn demo(serials: &[&str], returned: &[&str], due: NaiveDate) -> Demo {
    let serial_numbers: Vec<String> = serials.iter().map(|s| s.to_string()).collect();
    let returned_serials: Vec<String> = returned.iter().map(|s| s.to_string()).collect();
    let mut demo = Demo {
        id: Uuid::new_v4(),
        demo_number: "DEMO-2025-0042".to_string(),
        customer_name: "Riverside Hospital".to_string(),
        contact: Some("Dr. Lee".to_string()),
        serial_numbers,
        returned_serials,
        loaned_at: Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap(),
        expected_return_date: due,
        returned_at: None,
        status: DemoStatus::Active,
        created_by: None,
    };
    demo.status = demo.status_after_return(&demo.returned_serials);
    demo
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_partial_return() {
        let d = demo(&["SN-1", "SN-2", "SN-3"], &["SN-2"], date(2025, 6, 15));

        assert_eq!(d.status, DemoStatus::PartiallyReturned);
        assert_eq!(d.outstanding_serials(), vec!["SN-1".to_string(), "SN-3".to_string()]);
    }

    #[test]
    fn test_full_return() {
        let d = demo(&["SN-1", "SN-2"], &["sn-1", "SN-2 "], date(2025, 6, 15));

        assert_eq!(d.status, DemoStatus::Returned);
        assert!(d.outstanding_serials().is_empty());
        assert!(!d.is_overdue(date(2025, 12, 31)));
    }

    #[test]
    fn test_unknown_serials_do_not_count() {
        let d = demo(&["SN-1"], &[], date(2025, 6, 15));
        assert_eq!(d.status_after_return(&["SN-9".to_string()]), DemoStatus::Active);
    }

    #[test]
    fn test_overdue_days() {
        let d = demo(&["SN-1"], &[], date(2025, 6, 15));

        assert!(!d.is_overdue(date(2025, 6, 15)));
        assert_eq!(d.days_overdue(date(2025, 6, 15)), 0);
        assert!(d.is_overdue(date(2025, 6, 16)));
        assert_eq!(d.days_overdue(date(2025, 7, 1)), 16);
    }

    #[test]
    fn test_partially_returned_can_be_overdue() {
        let d = demo(&["SN-1", "SN-2"], &["SN-1"], date(2025, 6, 15));
        assert_eq!(d.days_overdue(date(2025, 6, 20)), 5);
    }

    #[test]
    fn test_status_labels() {
        for status in [DemoStatus::Active, DemoStatus::PartiallyReturned, DemoStatus::Returned] {
            assert_eq!(DemoStatus::parse_label(status.as_str()), Some(status));
        }
        assert_eq!(DemoStatus::parse_label("lost"), None);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Outstanding and returned serials partition the loan
        #[test]
        fn prop_outstanding_partition(count in 1usize..12, mask in prop::collection::vec(any::<bool>(), 12)) {
            let serials: Vec<String> = (0..count).map(|i| format!("SN-{:03}", i)).collect();
            let returned: Vec<String> = serials
                .iter()
                .zip(mask.iter())
                .filter(|(_, back)| **back)
                .map(|(s, _)| s.to_lowercase())
                .collect();
            let refs: Vec<&str> = serials.iter().map(String::as_str).collect();
            let returned_refs: Vec<&str> = returned.iter().map(String::as_str).collect();

            let d = demo(&refs, &returned_refs, date(2025, 6, 15));

            prop_assert_eq!(d.outstanding_serials().len() + returned.len(), count);
            let expected = if returned.is_empty() {
                DemoStatus::Active
            } else if returned.len() == count {
                DemoStatus::Returned
            } else {
                DemoStatus::PartiallyReturned
            };
            prop_assert_eq!(d.status, expected);
        }

        /// Overdue days are never negative and grow one per day
        #[test]
        fn prop_days_overdue(offset in -60i64..60) {
            let due = date(2025, 6, 15);
            let d = demo(&["SN-1"], &[], due);
            let today = due + chrono::Duration::days(offset);

            prop_assert!(d.days_overdue(today) >= 0);
            prop_assert_eq!(d.days_overdue(today), offset.max(0));
            prop_assert_eq!(d.is_overdue(today), offset > 0);
        }
    }
}
