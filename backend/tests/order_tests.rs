//! Order and invoice tests
//!
//! Tests for the stock-out document flow:
//! - order status lifecycle
//! - invoice totals and tax rounding
//! - document numbering

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    format_document_number, validate_document_number, DomainError, Invoice, InvoiceLine,
    OrderStatus, MAX_INVOICE_AMOUNT, MAX_UNIT_PRICE,
};
use std::str::FromStr;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn line(serial: &str, price: Decimal) -> InvoiceLine {
    InvoiceLine {
        serial_number: serial.to_string(),
        description: "Infusion Pump IP-5".to_string(),
        unit_price: price,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_order_happy_path() {
        let status = OrderStatus::Pending
            .transition(OrderStatus::Invoiced)
            .and_then(|s| s.transition(OrderStatus::Delivered))
            .and_then(|s| s.transition(OrderStatus::Returned));
        assert_eq!(status, Ok(OrderStatus::Returned));
    }

    #[test]
    fn test_order_cannot_skip_invoice() {
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Delivered));
        assert!(OrderStatus::Pending.transition(OrderStatus::Returned).is_err());
    }

    #[test]
    fn test_cancellation() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Invoiced.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Delivered.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Returned.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_open_orders() {
        assert!(OrderStatus::Pending.is_open());
        assert!(OrderStatus::Invoiced.is_open());
        assert!(!OrderStatus::Delivered.is_open());
        assert!(!OrderStatus::Cancelled.is_open());
    }

    #[test]
    fn test_order_labels() {
        assert_eq!(OrderStatus::parse_label("Canceled"), Ok(OrderStatus::Cancelled));
        assert_eq!(OrderStatus::parse_label("invoiced"), Ok(OrderStatus::Invoiced));
        assert!(OrderStatus::parse_label("shipped").is_err());
    }

    #[test]
    fn test_invoice_totals() {
        let lines = vec![line("SN-1", dec("100.00")), line("SN-2", dec("250.50"))];

        let totals = Invoice::compute_totals(&lines, dec("0.07")).unwrap();

        assert_eq!(totals.subtotal, dec("350.50"));
        // 24.535 rounds half away from zero
        assert_eq!(totals.tax_amount, dec("24.54"));
        assert_eq!(totals.total, dec("375.04"));
    }

    #[test]
    fn test_invoice_without_tax() {
        let lines = vec![line("SN-1", dec("99.99"))];

        let totals = Invoice::compute_totals(&lines, Decimal::ZERO).unwrap();

        assert_eq!(totals.tax_amount, Decimal::ZERO);
        assert_eq!(totals.total, dec("99.99"));
    }

    #[test]
    fn test_empty_invoice() {
        let totals = Invoice::compute_totals(&[], dec("0.07")).unwrap();
        assert_eq!(totals.subtotal, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::ZERO);
    }

    #[test]
    fn test_invoice_totals_overflow_is_an_error() {
        let lines = vec![line("SN-1", Decimal::MAX), line("SN-2", Decimal::MAX)];

        let result = std::panic::catch_unwind(|| Invoice::compute_totals(&lines, dec("0.07")));

        assert!(matches!(
            result,
            Ok(Err(DomainError::InvalidAmount { .. }))
        ));
    }

    #[test]
    fn test_invoice_total_must_fit_storage() {
        let lines: Vec<InvoiceLine> = (0..100)
            .map(|i| line(&format!("SN-{}", i), MAX_UNIT_PRICE))
            .collect();

        let untaxed = Invoice::compute_totals(&lines, Decimal::ZERO).unwrap();
        assert!(untaxed.total <= MAX_INVOICE_AMOUNT);
        assert!(matches!(
            Invoice::compute_totals(&lines, dec("0.07")),
            Err(DomainError::InvalidAmount { field: "total", .. })
        ));
    }

    #[test]
    fn test_document_numbers() {
        assert_eq!(format_document_number("ORD", 2025, 7), "ORD-2025-0007");
        assert_eq!(format_document_number("INV", 2025, 12345), "INV-2025-12345");
        assert!(validate_document_number("ORD", "ORD-2025-0007").is_ok());
        assert!(validate_document_number("ORD", "INV-2025-0007").is_err());
        assert!(validate_document_number("RET", "RET-25-0001").is_err());
        assert!(validate_document_number("RET", "RET-2025-01").is_err());
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn price() -> impl Strategy<Value = Decimal> {
        // cents up to 1,000,000.00
        (0i64..100_000_000).prop_map(|cents| Decimal::new(cents, 2))
    }

    fn tax_rate() -> impl Strategy<Value = Decimal> {
        // basis points below 100%
        (0i64..10_000).prop_map(|bp| Decimal::new(bp, 4))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Totals add up and tax is rounded to cents
        #[test]
        fn prop_invoice_totals(
            prices in prop::collection::vec(price(), 0..20),
            rate in tax_rate(),
        ) {
            let lines: Vec<InvoiceLine> = prices
                .iter()
                .enumerate()
                .map(|(i, p)| line(&format!("SN-{}", i), *p))
                .collect();

            let totals = Invoice::compute_totals(&lines, rate).unwrap();

            let subtotal: Decimal = prices.iter().copied().sum();
            prop_assert_eq!(totals.subtotal, subtotal);
            prop_assert_eq!(totals.total, totals.subtotal + totals.tax_amount);
            prop_assert!(totals.tax_amount >= Decimal::ZERO);
            prop_assert!(totals.tax_amount <= totals.subtotal);
            prop_assert!(totals.tax_amount.scale() <= 2);
        }

        /// Formatted numbers always validate against their own prefix
        #[test]
        fn prop_document_numbers_valid(
            prefix in prop::sample::select(vec!["ORD", "INV", "DEMO", "RET"]),
            year in 2000i32..2100,
            sequence in 1i32..100_000,
        ) {
            let number = format_document_number(prefix, year, sequence);
            prop_assert!(validate_document_number(prefix, &number).is_ok());
            let expected_prefix = format!("{}-{}-", prefix, year);
            prop_assert!(number.starts_with(&expected_prefix));
        }

        /// Cancelled and returned orders are final
        #[test]
        fn prop_closed_orders_stay_closed(
            next in prop::sample::select(vec![
                OrderStatus::Pending,
                OrderStatus::Invoiced,
                OrderStatus::Delivered,
                OrderStatus::Cancelled,
                OrderStatus::Returned,
            ])
        ) {
            prop_assert!(!OrderStatus::Cancelled.can_transition_to(next));
            prop_assert!(!OrderStatus::Returned.can_transition_to(next));
        }
    }
}
