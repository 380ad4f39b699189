//! Stock-out orders, invoices and customer returns

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Invoiced,
    Delivered,
    Cancelled,
    /// Every line was returned after delivery
    Returned,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Invoiced => "invoiced",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Returned => "returned",
        }
    }

    pub fn parse_label(label: &str) -> Result<Self, DomainError> {
        match label.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "invoiced" => Ok(OrderStatus::Invoiced),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" | "canceled" => Ok(OrderStatus::Cancelled),
            "returned" => Ok(OrderStatus::Returned),
            _ => Err(DomainError::UnknownLabel(label.to_string())),
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Invoiced)
                | (Invoiced, Delivered)
                | (Pending, Cancelled)
                | (Invoiced, Cancelled)
                | (Delivered, Cancelled)
                | (Delivered, Returned)
        )
    }

    pub fn transition(self, next: OrderStatus) -> Result<OrderStatus, DomainError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::InvalidTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Invoiced)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stock-out order for one customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub customer_name: String,
    pub dealer_name: Option<String>,
    pub serial_numbers: Vec<String>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub invoiced_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub created_by: Option<Uuid>,
}

/// Largest unit price a `NUMERIC(12, 2)` column holds
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

/// Largest invoice amount a `NUMERIC(14, 2)` column holds
pub const MAX_INVOICE_AMOUNT: Decimal = Decimal::from_parts(0x107A_3FFF, 0x5AF3, 0, false, 2);

/// One invoiced serial number
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvoiceLine {
    pub serial_number: String,
    pub description: String,
    pub unit_price: Decimal,
}

/// Invoice money totals
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

/// Invoice issued for an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub invoice_number: String,
    pub order_id: Uuid,
    pub order_number: String,
    pub customer_name: String,
    pub lines: Vec<InvoiceLine>,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    pub invoice_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    /// Sum the lines and apply `tax_rate` (a fraction, e.g. 0.07)
    ///
    /// Fails instead of overflowing when a line price or the resulting
    /// totals fall outside what an invoice can store.
    pub fn compute_totals(lines: &[InvoiceLine], tax_rate: Decimal) -> Result<InvoiceTotals, DomainError> {
        let too_large = |field| DomainError::InvalidAmount {
            field,
            reason: "exceeds the largest storable amount",
        };

        let mut subtotal = Decimal::ZERO;
        for line in lines {
            crate::validation::validate_unit_price(line.unit_price)?;
            subtotal = subtotal
                .checked_add(line.unit_price)
                .ok_or_else(|| too_large("subtotal"))?;
        }
        let tax_amount = subtotal
            .checked_mul(tax_rate)
            .ok_or_else(|| too_large("tax_amount"))?
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let total = subtotal
            .checked_add(tax_amount)
            .ok_or_else(|| too_large("total"))?;
        if total > MAX_INVOICE_AMOUNT {
            return Err(too_large("total"));
        }

        Ok(InvoiceTotals {
            subtotal,
            tax_amount,
            total,
        })
    }
}

/// Items returned by a customer after delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnRecord {
    pub id: Uuid,
    pub return_number: String,
    pub order_id: Uuid,
    pub order_number: String,
    pub serial_numbers: Vec<String>,
    pub reason: String,
    pub returned_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
}
