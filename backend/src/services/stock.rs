//! Stock movement helpers shared by the document services
//!
//! Every function takes an open database transaction so that the status
//! change, the movement records and the owning document commit together.

use chrono::{Datelike, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    convert_rows, InventoryItem, ItemRow, ItemStatus, TransactionType, ITEM_COLUMNS,
};

/// Allocate the next `PREFIX-YYYY-NNNN` number for the current year
pub async fn next_document_number(conn: &mut PgConnection, prefix: &str) -> AppResult<String> {
    let year = Utc::now().year();
    let sequence = sqlx::query_scalar::<_, i32>("SELECT next_document_sequence($1, $2)")
        .bind(prefix)
        .bind(year)
        .fetch_one(&mut *conn)
        .await?;

    Ok(shared::format_document_number(prefix, year, sequence))
}

/// Lock the items for the given (normalized) serials, in request order.
/// Fails with `NotFound` naming the first missing serial.
pub async fn lock_items(conn: &mut PgConnection, serials: &[String]) -> AppResult<Vec<InventoryItem>> {
    let rows = sqlx::query_as::<_, ItemRow>(&format!(
        "SELECT {} FROM inventory_items WHERE serial_number = ANY($1) ORDER BY serial_number FOR UPDATE",
        ITEM_COLUMNS
    ))
    .bind(serials)
    .fetch_all(&mut *conn)
    .await?;
    let mut items: Vec<InventoryItem> = convert_rows(rows)?;

    let mut ordered = Vec::with_capacity(serials.len());
    for serial in serials {
        let position = items
            .iter()
            .position(|item| &item.serial_number == serial)
            .ok_or_else(|| AppError::NotFound(format!("Inventory item {}", serial)))?;
        ordered.push(items.swap_remove(position));
    }
    Ok(ordered)
}

/// Require every item to currently have `expected` status
pub fn require_status(items: &[InventoryItem], expected: ItemStatus) -> AppResult<()> {
    match items.iter().find(|item| item.status != expected) {
        Some(item) => Err(AppError::ItemUnavailable(format!(
            "{} is {}, expected {}",
            item.serial_number, item.status, expected
        ))),
        None => Ok(()),
    }
}

/// Move every item to `next`, checking each transition
pub async fn move_items(
    conn: &mut PgConnection,
    items: &[InventoryItem],
    next: ItemStatus,
) -> AppResult<()> {
    for item in items {
        item.status.transition(next)?;
    }

    let ids: Vec<Uuid> = items.iter().map(|item| item.id).collect();
    sqlx::query("UPDATE inventory_items SET status = $1 WHERE id = ANY($2)")
        .bind(next.as_str())
        .bind(&ids)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// A movement to record for each serial of a document
pub struct Movement<'a> {
    pub transaction_type: TransactionType,
    pub reference: Option<&'a str>,
    pub customer: Option<&'a str>,
    pub created_by: Uuid,
    pub notes: Option<&'a str>,
}

/// Insert one transaction row per serial
pub async fn record_movements(
    conn: &mut PgConnection,
    serials: &[String],
    movement: &Movement<'_>,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO transactions (serial_number, transaction_type, reference, customer, created_by, notes)
        SELECT s, $2, $3, $4, $5, $6 FROM UNNEST($1::text[]) AS s
        "#,
    )
    .bind(serials)
    .bind(movement.transaction_type.as_str())
    .bind(movement.reference)
    .bind(movement.customer)
    .bind(movement.created_by)
    .bind(movement.notes)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
