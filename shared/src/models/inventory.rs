//! Inventory item and stock transaction models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Lifecycle status of a serialized inventory item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// In stock and available
    Active,
    /// Allocated to an open order
    Reserved,
    Invoiced,
    Delivered,
    /// Out on a demo loan
    Demo,
    Disposed,
}

impl ItemStatus {
    pub const ALL: [ItemStatus; 6] = [
        ItemStatus::Active,
        ItemStatus::Reserved,
        ItemStatus::Invoiced,
        ItemStatus::Delivered,
        ItemStatus::Demo,
        ItemStatus::Disposed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Active => "active",
            ItemStatus::Reserved => "reserved",
            ItemStatus::Invoiced => "invoiced",
            ItemStatus::Delivered => "delivered",
            ItemStatus::Demo => "demo",
            ItemStatus::Disposed => "disposed",
        }
    }

    /// Parse a stored status, accepting the labels written by older clients
    pub fn parse_label(label: &str) -> Result<Self, DomainError> {
        let normalized = label.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "active" | "stock_in" | "in_stock" => Ok(ItemStatus::Active),
            "reserved" => Ok(ItemStatus::Reserved),
            "invoiced" => Ok(ItemStatus::Invoiced),
            "delivered" | "stock_out" => Ok(ItemStatus::Delivered),
            "demo" => Ok(ItemStatus::Demo),
            "disposed" => Ok(ItemStatus::Disposed),
            _ => Err(DomainError::UnknownLabel(label.to_string())),
        }
    }

    /// Whether an item may move from this status to `next`
    pub fn can_transition_to(&self, next: ItemStatus) -> bool {
        use ItemStatus::*;
        matches!(
            (self, next),
            (Active, Reserved)
                | (Active, Demo)
                | (Active, Disposed)
                | (Reserved, Active)
                | (Reserved, Invoiced)
                | (Invoiced, Active)
                | (Invoiced, Delivered)
                | (Delivered, Active)
                | (Demo, Active)
        )
    }

    pub fn transition(self, next: ItemStatus) -> Result<ItemStatus, DomainError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::InvalidTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A serialized piece of equipment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: Uuid,
    pub serial_number: String,
    pub equipment_category: String,
    pub model: String,
    pub size: Option<String>,
    pub batch: Option<String>,
    pub status: ItemStatus,
    pub location: Option<String>,
    pub remark: Option<String>,
    pub unit_price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Kinds of stock transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    #[serde(rename = "Stock_In")]
    StockIn,
    #[serde(rename = "Stock_Out")]
    StockOut,
    Demo,
    Returned,
    Cancellation,
}

impl TransactionType {
    pub const ALL: [TransactionType; 5] = [
        TransactionType::StockIn,
        TransactionType::StockOut,
        TransactionType::Demo,
        TransactionType::Returned,
        TransactionType::Cancellation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::StockIn => "Stock_In",
            TransactionType::StockOut => "Stock_Out",
            TransactionType::Demo => "Demo",
            TransactionType::Returned => "Returned",
            TransactionType::Cancellation => "Cancellation",
        }
    }

    pub fn parse_label(label: &str) -> Result<Self, DomainError> {
        match label.trim() {
            "Stock_In" | "stock_in" => Ok(TransactionType::StockIn),
            "Stock_Out" | "stock_out" => Ok(TransactionType::StockOut),
            "Demo" | "demo" => Ok(TransactionType::Demo),
            "Returned" | "returned" => Ok(TransactionType::Returned),
            "Cancellation" | "cancellation" => Ok(TransactionType::Cancellation),
            other => Err(DomainError::UnknownLabel(other.to_string())),
        }
    }

    /// Transactions that take an item out of the warehouse
    pub fn is_outbound(&self) -> bool {
        matches!(self, TransactionType::StockOut | TransactionType::Demo)
    }

    /// Transactions that close an earlier outbound transaction
    pub fn is_closing(&self) -> bool {
        matches!(self, TransactionType::Returned | TransactionType::Cancellation)
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stock movement for a single serial number
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub serial_number: String,
    pub transaction_type: TransactionType,
    /// Order, demo or return number the movement belongs to
    pub reference: Option<String>,
    pub customer: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub notes: Option<String>,
}

/// Canonical form used to match serial numbers across collections
pub fn normalize_serial(serial: &str) -> String {
    serial.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        assert!(ItemStatus::Active.can_transition_to(ItemStatus::Reserved));
        assert!(ItemStatus::Invoiced.can_transition_to(ItemStatus::Delivered));
        assert!(ItemStatus::Demo.can_transition_to(ItemStatus::Active));
        assert!(!ItemStatus::Active.can_transition_to(ItemStatus::Delivered));
        assert!(!ItemStatus::Disposed.can_transition_to(ItemStatus::Active));
        assert!(!ItemStatus::Demo.can_transition_to(ItemStatus::Reserved));
    }

    #[test]
    fn test_transition_error_names_both_states() {
        let err = ItemStatus::Delivered.transition(ItemStatus::Demo).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                from: "delivered".to_string(),
                to: "demo".to_string(),
            }
        );
    }

    #[test]
    fn test_legacy_status_labels() {
        assert_eq!(ItemStatus::parse_label("Stock_In").unwrap(), ItemStatus::Active);
        assert_eq!(ItemStatus::parse_label("In Stock").unwrap(), ItemStatus::Active);
        assert_eq!(ItemStatus::parse_label("Stock_Out").unwrap(), ItemStatus::Delivered);
        assert_eq!(ItemStatus::parse_label(" Demo ").unwrap(), ItemStatus::Demo);
        assert!(ItemStatus::parse_label("lost").is_err());
    }

    #[test]
    fn test_transaction_type_wire_labels() {
        let json = serde_json::to_string(&TransactionType::StockOut).unwrap();
        assert_eq!(json, "\"Stock_Out\"");
        let parsed: TransactionType = serde_json::from_str("\"Stock_In\"").unwrap();
        assert_eq!(parsed, TransactionType::StockIn);
        for t in TransactionType::ALL {
            assert_eq!(TransactionType::parse_label(t.as_str()).unwrap(), t);
        }
    }

    #[test]
    fn test_outbound_and_closing_are_disjoint() {
        for t in TransactionType::ALL {
            assert!(!(t.is_outbound() && t.is_closing()));
        }
        assert!(!TransactionType::StockIn.is_outbound());
        assert!(!TransactionType::StockIn.is_closing());
    }

    #[test]
    fn test_normalize_serial() {
        assert_eq!(normalize_serial("  sn-001a "), "SN-001A");
        assert_eq!(normalize_serial("SN-001A"), "SN-001A");
    }
}
