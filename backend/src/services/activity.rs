//! Per-serial activity history

use chrono::Utc;
use shared::{build_item_activity, normalize_serial, ActivitySources, ItemActivityHistory};
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::models::{
    convert_rows, DemoRow, InventoryItem, Invoice, InvoiceRow, ItemRow, OrderRow, ReturnRecord,
    ReturnRow, TransactionRow, DEMO_COLUMNS, INVOICE_COLUMNS, ITEM_COLUMNS, ORDER_COLUMNS,
    RETURN_COLUMNS, TRANSACTION_COLUMNS,
};

/// Activity history service
#[derive(Clone)]
pub struct ActivityService {
    db: PgPool,
}

impl ActivityService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Gather every record mentioning the serial and build its timeline
    pub async fn get_item_activity_history(&self, serial: &str) -> AppResult<ItemActivityHistory> {
        let sources = self.load_sources(&normalize_serial(serial)).await?;

        let nothing_found = sources.item.is_none()
            && sources.transactions.is_empty()
            && sources.orders.is_empty()
            && sources.invoices.is_empty()
            && sources.demos.is_empty()
            && sources.returns.is_empty();
        if nothing_found {
            return Err(AppError::NotFound(format!(
                "Activity for serial {}",
                normalize_serial(serial)
            )));
        }

        Ok(build_item_activity(serial, &sources, Utc::now()))
    }

    async fn load_sources(&self, serial: &str) -> AppResult<ActivitySources> {
        let item = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {} FROM inventory_items WHERE serial_number = $1",
            ITEM_COLUMNS
        ))
        .bind(serial)
        .fetch_optional(&self.db)
        .await?
        .map(InventoryItem::try_from)
        .transpose()?;

        // Older rows may carry unnormalized serials
        let transactions = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {} FROM transactions WHERE UPPER(TRIM(serial_number)) = $1 ORDER BY occurred_at, id",
            TRANSACTION_COLUMNS
        ))
        .bind(serial)
        .fetch_all(&self.db)
        .await?;

        let orders = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE $1 = ANY(serial_numbers)",
            ORDER_COLUMNS
        ))
        .bind(serial)
        .fetch_all(&self.db)
        .await?;

        let invoices = sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {} FROM invoices WHERE $1 = ANY(serial_numbers)",
            INVOICE_COLUMNS
        ))
        .bind(serial)
        .fetch_all(&self.db)
        .await?;

        let demos = sqlx::query_as::<_, DemoRow>(&format!(
            "SELECT {} FROM demos WHERE $1 = ANY(serial_numbers)",
            DEMO_COLUMNS
        ))
        .bind(serial)
        .fetch_all(&self.db)
        .await?;

        let returns = sqlx::query_as::<_, ReturnRow>(&format!(
            "SELECT {} FROM returns WHERE $1 = ANY(serial_numbers)",
            RETURN_COLUMNS
        ))
        .bind(serial)
        .fetch_all(&self.db)
        .await?;

        Ok(ActivitySources {
            item,
            transactions: convert_rows(transactions)?,
            orders: convert_rows(orders)?,
            invoices: invoices.into_iter().map(Invoice::from).collect(),
            demos: convert_rows(demos)?,
            returns: returns.into_iter().map(ReturnRecord::from).collect(),
        })
    }
}
