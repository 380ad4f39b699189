//! Reconciliation of stock transactions against inventory state

use shared::{count_by_type, DiscrepancyReport, TransactionDiscrepancyAnalyzer};
use sqlx::PgPool;

use crate::error::AppResult;
use crate::models::{
    convert_rows, InventoryItem, ItemRow, TransactionRecord, TransactionRow, ITEM_COLUMNS,
    TRANSACTION_COLUMNS,
};

/// Reconciliation service
#[derive(Clone)]
pub struct ReconciliationService {
    db: PgPool,
}

impl ReconciliationService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Run a full discrepancy analysis over every transaction and item
    pub async fn analyze(&self) -> AppResult<DiscrepancyReport> {
        let transaction_rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {} FROM transactions",
            TRANSACTION_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;
        let transactions: Vec<TransactionRecord> = convert_rows(transaction_rows)?;

        let item_rows = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {} FROM inventory_items",
            ITEM_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;
        let items: Vec<InventoryItem> = convert_rows(item_rows)?;

        tracing::debug!(by_type = ?count_by_type(&transactions), "Loaded transactions for reconciliation");

        let report = TransactionDiscrepancyAnalyzer::analyze(&transactions, &items);

        if report.is_consistent() {
            tracing::info!(
                transactions = report.analyzed_transactions,
                items = report.inventory_items,
                "Reconciliation found no discrepancies"
            );
        } else {
            tracing::warn!(
                transactions = report.analyzed_transactions,
                items = report.inventory_items,
                orphaned = report.orphaned_transactions.len(),
                duplicate_deliveries = report.duplicate_deliveries.len(),
                duplicate_demos = report.duplicate_demos.len(),
                unmatched_closures = report.unmatched_closures.len(),
                stock_in_anomalies = report.stock_in_anomalies.len(),
                status_mismatches = report.status_mismatches.len(),
                duplicate_item_serials = report.duplicate_item_serials.len(),
                delivery_discrepancy = report.delivery_discrepancy,
                "Reconciliation found discrepancies"
            );
        }

        Ok(report)
    }
}
