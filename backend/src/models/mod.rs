//! Database models for the Equipment Inventory Management server
//!
//! Re-exports models from the shared crate and adds the row types that map
//! PostgreSQL columns onto them. Status columns are stored as text and parsed
//! through the shared label parsers so legacy values keep loading.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

pub use shared::models::*;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: String,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    pub fn role(&self) -> AppResult<UserRole> {
        UserRole::parse_label(&self.role)
            .ok_or_else(|| AppError::Internal(format!("Unrecognized stored role: {}", self.role)))
    }

    pub fn into_user(self) -> AppResult<User> {
        let role = self.role()?;
        Ok(User {
            id: self.id,
            email: self.email,
            name: self.name,
            role,
            is_active: self.is_active,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ItemRow {
    pub id: Uuid,
    pub serial_number: String,
    pub equipment_category: String,
    pub model: String,
    pub size: Option<String>,
    pub batch: Option<String>,
    pub status: String,
    pub location: Option<String>,
    pub remark: Option<String>,
    pub unit_price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ItemRow> for InventoryItem {
    type Error = AppError;

    fn try_from(row: ItemRow) -> AppResult<Self> {
        Ok(InventoryItem {
            id: row.id,
            status: ItemStatus::parse_label(&row.status)?,
            serial_number: row.serial_number,
            equipment_category: row.equipment_category,
            model: row.model,
            size: row.size,
            batch: row.batch,
            location: row.location,
            remark: row.remark,
            unit_price: row.unit_price,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct TransactionRow {
    pub id: Uuid,
    pub serial_number: String,
    pub transaction_type: String,
    pub reference: Option<String>,
    pub customer: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub notes: Option<String>,
}

impl TryFrom<TransactionRow> for TransactionRecord {
    type Error = AppError;

    fn try_from(row: TransactionRow) -> AppResult<Self> {
        Ok(TransactionRecord {
            id: row.id,
            transaction_type: TransactionType::parse_label(&row.transaction_type)?,
            serial_number: row.serial_number,
            reference: row.reference,
            customer: row.customer,
            occurred_at: row.occurred_at,
            created_by: row.created_by,
            notes: row.notes,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub order_number: String,
    pub customer_name: String,
    pub dealer_name: Option<String>,
    pub serial_numbers: Vec<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub invoiced_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub created_by: Option<Uuid>,
}

impl TryFrom<OrderRow> for Order {
    type Error = AppError;

    fn try_from(row: OrderRow) -> AppResult<Self> {
        Ok(Order {
            id: row.id,
            status: OrderStatus::parse_label(&row.status)?,
            order_number: row.order_number,
            customer_name: row.customer_name,
            dealer_name: row.dealer_name,
            serial_numbers: row.serial_numbers,
            created_at: row.created_at,
            invoiced_at: row.invoiced_at,
            delivered_at: row.delivered_at,
            cancelled_at: row.cancelled_at,
            cancellation_reason: row.cancellation_reason,
            created_by: row.created_by,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct InvoiceRow {
    pub id: Uuid,
    pub invoice_number: String,
    pub order_id: Uuid,
    pub order_number: String,
    pub customer_name: String,
    pub lines: Json<Vec<InvoiceLine>>,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    pub invoice_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl From<InvoiceRow> for Invoice {
    fn from(row: InvoiceRow) -> Self {
        Invoice {
            id: row.id,
            invoice_number: row.invoice_number,
            order_id: row.order_id,
            order_number: row.order_number,
            customer_name: row.customer_name,
            lines: row.lines.0,
            subtotal: row.subtotal,
            tax_rate: row.tax_rate,
            tax_amount: row.tax_amount,
            total: row.total,
            invoice_date: row.invoice_date,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DemoRow {
    pub id: Uuid,
    pub demo_number: String,
    pub customer_name: String,
    pub contact: Option<String>,
    pub serial_numbers: Vec<String>,
    pub returned_serials: Vec<String>,
    pub loaned_at: DateTime<Utc>,
    pub expected_return_date: NaiveDate,
    pub returned_at: Option<DateTime<Utc>>,
    pub status: String,
    pub created_by: Option<Uuid>,
}

impl TryFrom<DemoRow> for Demo {
    type Error = AppError;

    fn try_from(row: DemoRow) -> AppResult<Self> {
        let status = DemoStatus::parse_label(&row.status).ok_or_else(|| {
            AppError::Internal(format!("Unrecognized stored demo status: {}", row.status))
        })?;
        Ok(Demo {
            id: row.id,
            demo_number: row.demo_number,
            customer_name: row.customer_name,
            contact: row.contact,
            serial_numbers: row.serial_numbers,
            returned_serials: row.returned_serials,
            loaned_at: row.loaned_at,
            expected_return_date: row.expected_return_date,
            returned_at: row.returned_at,
            status,
            created_by: row.created_by,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ReturnRow {
    pub id: Uuid,
    pub return_number: String,
    pub order_id: Uuid,
    pub order_number: String,
    pub serial_numbers: Vec<String>,
    pub reason: String,
    pub returned_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
}

impl From<ReturnRow> for ReturnRecord {
    fn from(row: ReturnRow) -> Self {
        ReturnRecord {
            id: row.id,
            return_number: row.return_number,
            order_id: row.order_id,
            order_number: row.order_number,
            serial_numbers: row.serial_numbers,
            reason: row.reason,
            returned_at: row.returned_at,
            created_by: row.created_by,
        }
    }
}

/// Convert a batch of rows, failing on the first unparseable one
pub fn convert_rows<R, T>(rows: Vec<R>) -> AppResult<Vec<T>>
where
    T: TryFrom<R, Error = AppError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// Column lists shared by the services
pub const ITEM_COLUMNS: &str = "id, serial_number, equipment_category, model, size, batch, status, \
     location, remark, unit_price, created_at, updated_at";

pub const TRANSACTION_COLUMNS: &str =
    "id, serial_number, transaction_type, reference, customer, occurred_at, created_by, notes";

pub const ORDER_COLUMNS: &str = "id, order_number, customer_name, dealer_name, serial_numbers, status, \
     created_at, invoiced_at, delivered_at, cancelled_at, cancellation_reason, created_by";

pub const INVOICE_COLUMNS: &str = "id, invoice_number, order_id, order_number, customer_name, lines, \
     subtotal, tax_rate, tax_amount, total, invoice_date, created_at";

pub const DEMO_COLUMNS: &str = "id, demo_number, customer_name, contact, serial_numbers, returned_serials, \
     loaned_at, expected_return_date, returned_at, status, created_by";

pub const RETURN_COLUMNS: &str =
    "id, return_number, order_id, order_number, serial_numbers, reason, returned_at, created_by";

pub const USER_COLUMNS: &str =
    "id, email, password_hash, name, role, is_active, last_login_at, created_at, updated_at";

#[cfg(test)]
mod tests {
    use super::*;

    fn item_row(status: &str) -> ItemRow {
        ItemRow {
            id: Uuid::new_v4(),
            serial_number: "SN-001".into(),
            equipment_category: "Wheelchair".into(),
            model: "WC-1".into(),
            size: None,
            batch: None,
            status: status.into(),
            location: None,
            remark: None,
            unit_price: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_item_row_accepts_legacy_status() {
        let item = InventoryItem::try_from(item_row("Stock_In")).unwrap();
        assert_eq!(item.status, ItemStatus::Active);
    }

    #[test]
    fn test_item_row_rejects_unknown_status() {
        assert!(InventoryItem::try_from(item_row("lost")).is_err());
    }

    #[test]
    fn test_transaction_row_conversion() {
        let row = TransactionRow {
            id: Uuid::new_v4(),
            serial_number: "SN-001".into(),
            transaction_type: "Stock_Out".into(),
            reference: Some("ORD-2024-0001".into()),
            customer: None,
            occurred_at: Utc::now(),
            created_by: None,
            notes: None,
        };
        let records: Vec<TransactionRecord> = convert_rows(vec![row]).unwrap();
        assert_eq!(records[0].transaction_type, TransactionType::StockOut);
    }
}
