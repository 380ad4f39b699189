//! Item activity history tests
//!
//! Timelines merged from item records, transactions and documents:
//! - document and transaction records for one event are merged
//! - demo time is accumulated across loans
//! - events come out in chronological order

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use shared::{
    build_item_activity, ActivityKind, ActivitySource, ActivitySources, Demo, DemoStatus,
    InventoryItem, ItemStatus, Order, OrderStatus, ReturnRecord, TransactionRecord,
    TransactionType,
};
use uuid::Uuid;

fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, d, 9, 0, 0).unwrap()
}

fn tx(serial: &str, kind: TransactionType, at: DateTime<Utc>, reference: Option<&str>) -> TransactionRecord {
    TransactionRecord {
        id: Uuid::new_v4(),
        serial_number: serial.to_string(),
        transaction_type: kind,
        reference: reference.map(str::to_string),
        customer: None,
        occurred_at: at,
        created_by: None,
        notes: None,
    }
}

fn item(serial: &str, status: ItemStatus) -> InventoryItem {
    InventoryItem {
        id: Uuid::new_v4(),
        serial_number: serial.to_string(),
        equipment_category: "Ultrasound".to_string(),
        model: "US-200".to_string(),
        size: None,
        batch: Some("B-7".to_string()),
        status,
        location: None,
        remark: None,
        unit_price: None,
        created_at: day(1),
        updated_at: day(1),
    }
}

fn delivered_order(serials: &[&str]) -> Order {
    Order {
        id: Uuid::new_v4(),
        order_number: "ORD-2025-0010".to_string(),
        customer_name: "North Clinic".to_string(),
        dealer_name: None,
        serial_numbers: serials.iter().map(|s| s.to_string()).collect(),
        status: OrderStatus::Delivered,
        created_at: day(3),
        invoiced_at: Some(day(4)),
        delivered_at: Some(day(6)),
        cancelled_at: None,
        cancellation_reason: None,
        created_by: None,
    }
}

fn demo(serials: &[&str], returned_at: Option<DateTime<Utc>>) -> Demo {
    Demo {
        id: Uuid::new_v4(),
        demo_number: "DEMO-2025-0003".to_string(),
        customer_name: "South Clinic".to_string(),
        contact: None,
        serial_numbers: serials.iter().map(|s| s.to_string()).collect(),
        returned_serials: if returned_at.is_some() {
            serials.iter().map(|s| s.to_string()).collect()
        } else {
            Vec::new()
        },
        loaned_at: day(1),
        expected_return_date: NaiveDate::from_ymd_opt(2025, 5, 15).unwrap(),
        returned_at,
        status: if returned_at.is_some() {
            DemoStatus::Returned
        } else {
            DemoStatus::Active
        },
        created_by: None,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_order_and_transaction_merge() {
        let sources = ActivitySources {
            item: Some(item("SN-100", ItemStatus::Delivered)),
            transactions: vec![
                tx("SN-100", TransactionType::StockIn, day(1), Some("B-7")),
                tx("SN-100", TransactionType::StockOut, day(7), Some("ORD-2025-0010")),
            ],
            orders: vec![delivered_order(&["SN-100"])],
            ..Default::default()
        };

        let history = build_item_activity("sn-100", &sources, day(20));

        assert_eq!(history.serial_number, "SN-100");
        let kinds: Vec<ActivityKind> = history.events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ActivityKind::StockedIn,
                ActivityKind::OrderPlaced,
                ActivityKind::Invoiced,
                ActivityKind::Delivered,
            ]
        );

        let delivered = &history.events[3];
        assert_eq!(delivered.record_count, 2);
        assert_eq!(delivered.occurred_at, day(6));
        assert!(delivered.sources.contains(&ActivitySource::Order));
        assert!(delivered.sources.contains(&ActivitySource::Transaction));
        assert!(delivered.transaction_id.is_some());
        assert_eq!(delivered.customer.as_deref(), Some("North Clinic"));

        assert_eq!(history.summary.delivery_count, 1);
        assert_eq!(history.summary.current_status, Some(ItemStatus::Delivered));
        assert_eq!(history.summary.first_seen, Some(day(1)));
        assert_eq!(history.summary.last_activity, Some(day(6)));
    }

    #[test]
    fn test_returned_demo_counts_days() {
        let sources = ActivitySources {
            transactions: vec![
                tx("SN-101", TransactionType::Demo, day(1), Some("DEMO-2025-0003")),
                tx("SN-101", TransactionType::Returned, day(5), Some("DEMO-2025-0003")),
            ],
            demos: vec![demo(&["SN-101"], Some(day(5)))],
            ..Default::default()
        };

        let history = build_item_activity("SN-101", &sources, day(20));

        assert_eq!(history.summary.demo_count, 1);
        assert_eq!(history.summary.return_count, 0);
        assert_eq!(history.summary.days_on_demo, 4);
        let demo_returned = history
            .events
            .iter()
            .find(|e| e.kind == ActivityKind::DemoReturned)
            .unwrap();
        assert_eq!(demo_returned.record_count, 2);
    }

    #[test]
    fn test_open_demo_counts_until_as_of() {
        let sources = ActivitySources {
            demos: vec![demo(&["SN-102"], None)],
            ..Default::default()
        };

        let history = build_item_activity("SN-102", &sources, day(11));

        assert_eq!(history.summary.days_on_demo, 10);
        assert_eq!(history.events.len(), 1);
        assert_eq!(history.events[0].kind, ActivityKind::DemoOut);
    }

    #[test]
    fn test_customer_return() {
        let ret = ReturnRecord {
            id: Uuid::new_v4(),
            return_number: "RET-2025-0001".to_string(),
            order_id: Uuid::new_v4(),
            order_number: "ORD-2025-0010".to_string(),
            serial_numbers: vec!["SN-103".to_string()],
            reason: "Damaged in transit".to_string(),
            returned_at: day(9),
            created_by: None,
        };
        let sources = ActivitySources {
            transactions: vec![
                tx("SN-103", TransactionType::StockOut, day(6), Some("ORD-2025-0010")),
                tx("SN-103", TransactionType::Returned, day(9), Some("RET-2025-0001")),
            ],
            returns: vec![ret],
            ..Default::default()
        };

        let history = build_item_activity("SN-103", &sources, day(20));

        assert_eq!(history.summary.return_count, 1);
        let returned = history
            .events
            .iter()
            .find(|e| e.kind == ActivityKind::Returned)
            .unwrap();
        assert_eq!(returned.record_count, 2);
        assert!(returned.description.contains("Damaged in transit"));
    }

    #[test]
    fn test_registered_when_no_stock_in() {
        let sources = ActivitySources {
            item: Some(item("SN-104", ItemStatus::Active)),
            ..Default::default()
        };

        let history = build_item_activity("SN-104", &sources, day(20));

        assert_eq!(history.events.len(), 1);
        assert_eq!(history.events[0].kind, ActivityKind::Registered);
        assert_eq!(history.events[0].sources, vec![ActivitySource::Item]);
    }

    #[test]
    fn test_other_serials_ignored() {
        let sources = ActivitySources {
            transactions: vec![
                tx("SN-105", TransactionType::StockIn, day(1), None),
                tx("SN-999", TransactionType::StockOut, day(2), Some("ORD-2025-0011")),
            ],
            orders: vec![delivered_order(&["SN-999"])],
            ..Default::default()
        };

        let history = build_item_activity("SN-105", &sources, day(20));

        assert_eq!(history.events.len(), 1);
        assert_eq!(history.summary.delivery_count, 0);
    }

    #[test]
    fn test_cancelled_order() {
        let mut order = delivered_order(&["SN-106"]);
        order.status = OrderStatus::Cancelled;
        order.cancelled_at = Some(day(8));
        order.cancellation_reason = Some("Customer withdrew".to_string());
        let sources = ActivitySources {
            orders: vec![order],
            transactions: vec![tx(
                "SN-106",
                TransactionType::Cancellation,
                day(8),
                Some("ORD-2025-0010"),
            )],
            ..Default::default()
        };

        let history = build_item_activity("SN-106", &sources, day(20));

        assert_eq!(history.summary.cancellation_count, 1);
        let cancelled = history.events.last().unwrap();
        assert_eq!(cancelled.kind, ActivityKind::Cancelled);
        assert!(cancelled.description.contains("Customer withdrew"));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn transaction_type() -> impl Strategy<Value = TransactionType> {
        prop::sample::select(TransactionType::ALL.to_vec())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Events are chronological and bounded by the summary
        #[test]
        fn prop_events_sorted(
            moves in prop::collection::vec((transaction_type(), 1u32..28, 0u32..5), 0..30)
        ) {
            let transactions: Vec<TransactionRecord> = moves
                .iter()
                .map(|(kind, d, r)| {
                    let reference = format!("REF-{}", r);
                    tx("SN-200", *kind, day(*d), Some(reference.as_str()))
                })
                .collect();
            let sources = ActivitySources { transactions, ..Default::default() };

            let history = build_item_activity("SN-200", &sources, day(28));

            prop_assert!(history
                .events
                .windows(2)
                .all(|w| w[0].occurred_at <= w[1].occurred_at));
            let merged: usize = history.events.iter().map(|e| e.record_count).sum();
            prop_assert_eq!(merged, moves.len());
            prop_assert_eq!(history.summary.first_seen, history.events.first().map(|e| e.occurred_at));
            prop_assert_eq!(history.summary.last_activity, history.events.last().map(|e| e.occurred_at));
            prop_assert!(history.summary.days_on_demo >= 0);
        }

        /// Lookup is insensitive to case and surrounding whitespace
        #[test]
        fn prop_serial_lookup_normalized(serial in "[a-z][a-z0-9]{2,10}", pad in 0usize..3) {
            let padded = format!("{}{}{}", " ".repeat(pad), serial, " ".repeat(pad));
            let sources = ActivitySources {
                transactions: vec![tx(&serial.to_uppercase(), TransactionType::StockIn, day(1), None)],
                ..Default::default()
            };

            let history = build_item_activity(&padded, &sources, day(2));

            prop_assert_eq!(history.events.len(), 1);
            prop_assert_eq!(history.serial_number, serial.to_uppercase());
        }
    }
}
