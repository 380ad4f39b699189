//! Inventory item tests
//!
//! Covers:
//! - item status transitions
//! - serial number validation and normalization
//! - stored status and transaction labels

use proptest::prelude::*;
use shared::{
    normalize_serial, validate_serial_batch, validate_serial_number, DomainError, ItemStatus,
    TransactionType,
};

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_order_flow_transitions() {
        let status = ItemStatus::Active
            .transition(ItemStatus::Reserved)
            .and_then(|s| s.transition(ItemStatus::Invoiced))
            .and_then(|s| s.transition(ItemStatus::Delivered))
            .and_then(|s| s.transition(ItemStatus::Active));
        assert_eq!(status, Ok(ItemStatus::Active));
    }

    #[test]
    fn test_demo_transitions() {
        assert!(ItemStatus::Active.can_transition_to(ItemStatus::Demo));
        assert!(ItemStatus::Demo.can_transition_to(ItemStatus::Active));
        assert!(!ItemStatus::Demo.can_transition_to(ItemStatus::Reserved));
        assert!(!ItemStatus::Reserved.can_transition_to(ItemStatus::Demo));
    }

    #[test]
    fn test_disposed_is_terminal() {
        for next in ItemStatus::ALL {
            assert!(!ItemStatus::Disposed.can_transition_to(next));
        }
    }

    #[test]
    fn test_rejected_transition_error() {
        let err = ItemStatus::Active.transition(ItemStatus::Delivered).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                from: "active".to_string(),
                to: "delivered".to_string(),
            }
        );
        assert_eq!(err.to_string(), "Invalid status transition from active to delivered");
    }

    #[test]
    fn test_legacy_status_labels() {
        assert_eq!(ItemStatus::parse_label("Stock In"), Ok(ItemStatus::Active));
        assert_eq!(ItemStatus::parse_label("stock-out"), Ok(ItemStatus::Delivered));
        assert_eq!(ItemStatus::parse_label(" DEMO "), Ok(ItemStatus::Demo));
        assert!(ItemStatus::parse_label("lost").is_err());
    }

    #[test]
    fn test_transaction_labels() {
        assert_eq!(TransactionType::parse_label("Stock_Out"), Ok(TransactionType::StockOut));
        assert_eq!(TransactionType::parse_label("returned"), Ok(TransactionType::Returned));
        assert!(TransactionType::parse_label("Transfer").is_err());
        assert!(TransactionType::Demo.is_outbound());
        assert!(TransactionType::Cancellation.is_closing());
        assert!(!TransactionType::StockIn.is_outbound());
    }

    #[test]
    fn test_serial_validation() {
        assert!(validate_serial_number("SN-2025/001").is_ok());
        assert!(validate_serial_number("ab").is_err());
        assert!(validate_serial_number("_SN001").is_err());
        assert!(validate_serial_number("SN 001").is_err());
        assert!(validate_serial_number(&"X".repeat(51)).is_err());
    }

    #[test]
    fn test_serial_batch() {
        let batch = vec!["sn-1a".to_string(), " SN-2B ".to_string()];
        assert_eq!(
            validate_serial_batch(&batch),
            Ok(vec!["SN-1A".to_string(), "SN-2B".to_string()])
        );

        let dup = vec!["SN-1A".to_string(), "sn-1a".to_string()];
        assert!(validate_serial_batch(&dup).is_err());
        assert!(validate_serial_batch(&[]).is_err());
    }

    #[test]
    fn test_status_serde() {
        let json = serde_json::to_string(&ItemStatus::Reserved).unwrap();
        assert_eq!(json, "\"reserved\"");
        let json = serde_json::to_string(&TransactionType::StockIn).unwrap();
        assert_eq!(json, "\"Stock_In\"");
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn status() -> impl Strategy<Value = ItemStatus> {
        prop::sample::select(ItemStatus::ALL.to_vec())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// `transition` agrees with `can_transition_to`
        #[test]
        fn prop_transition_matches_table(from in status(), to in status()) {
            prop_assert_eq!(from.transition(to).is_ok(), from.can_transition_to(to));
            prop_assert!(!from.can_transition_to(from));
        }

        /// Every status except disposed can get back to active
        #[test]
        fn prop_active_reachable(from in status()) {
            let reachable = from == ItemStatus::Active
                || from.can_transition_to(ItemStatus::Active)
                || ItemStatus::ALL
                    .iter()
                    .any(|mid| from.can_transition_to(*mid) && mid.can_transition_to(ItemStatus::Active));
            prop_assert_eq!(reachable, from != ItemStatus::Disposed);
        }

        /// Stored labels parse back to the same status
        #[test]
        fn prop_status_label_round_trip(s in status()) {
            prop_assert_eq!(ItemStatus::parse_label(s.as_str()), Ok(s));
        }

        /// Normalization is idempotent and case-insensitive
        #[test]
        fn prop_normalize_idempotent(serial in "[ ]{0,2}[a-zA-Z0-9\\-]{1,20}[ ]{0,2}") {
            let once = normalize_serial(&serial);
            prop_assert_eq!(normalize_serial(&once), once.clone());
            prop_assert_eq!(normalize_serial(&serial.to_lowercase()), once);
        }

        /// Well-formed serials pass validation
        #[test]
        fn prop_valid_serials_accepted(serial in "[A-Za-z0-9][A-Za-z0-9\\-/._]{2,49}") {
            prop_assert!(validate_serial_number(&serial).is_ok());
        }

        /// Serials with spaces inside are rejected
        #[test]
        fn prop_inner_space_rejected(head in "[A-Z0-9]{2,10}", tail in "[A-Z0-9]{2,10}") {
            let serial = format!("{} {}", head, tail);
            prop_assert!(validate_serial_number(&serial).is_err());
        }
    }
}
