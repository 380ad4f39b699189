//! Inventory service for stock-in, item maintenance and stock movement queries

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    normalize_serial, validate_serial_number, validate_unit_price, PaginatedResponse, Pagination,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{
    convert_rows, InventoryItem, ItemRow, ItemStatus, TransactionRecord, TransactionRow,
    TransactionType, ITEM_COLUMNS, TRANSACTION_COLUMNS,
};
use crate::services::stock::{self, Movement};

/// Inventory service for managing serialized items
#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
}

/// Input for stocking in a new item
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StockInInput {
    pub serial_number: String,
    #[validate(length(min = 1, max = 100, message = "Equipment category is required"))]
    pub equipment_category: String,
    #[validate(length(min = 1, max = 100, message = "Model is required"))]
    pub model: String,
    #[validate(length(max = 50))]
    pub size: Option<String>,
    #[validate(length(max = 50))]
    pub batch: Option<String>,
    #[validate(length(max = 100))]
    pub location: Option<String>,
    pub remark: Option<String>,
    pub unit_price: Option<Decimal>,
}

/// Descriptive fields that may be edited after stock-in
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateItemInput {
    #[validate(length(min = 1, max = 100, message = "Equipment category must not be empty"))]
    pub equipment_category: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Model must not be empty"))]
    pub model: Option<String>,
    #[validate(length(max = 50))]
    pub size: Option<String>,
    #[validate(length(max = 50))]
    pub batch: Option<String>,
    #[validate(length(max = 100))]
    pub location: Option<String>,
    pub remark: Option<String>,
    pub unit_price: Option<Decimal>,
}

/// Filter for listing items
#[derive(Debug, Default, Deserialize)]
pub struct ItemFilter {
    pub status: Option<ItemStatus>,
    pub category: Option<String>,
    /// Matches serial number or model
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Filter for listing stock transactions
#[derive(Debug, Default, Deserialize)]
pub struct TransactionFilter {
    pub serial_number: Option<String>,
    pub transaction_type: Option<TransactionType>,
    pub reference: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Item count for one category and status
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InventorySummaryRow {
    pub equipment_category: String,
    pub status: String,
    pub item_count: i64,
}

/// Category at or below the low-stock threshold
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LowStockCategory {
    pub equipment_category: String,
    pub active_count: i64,
    pub threshold: i64,
}

impl InventoryService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Register a new item as `active` with its `Stock_In` movement
    pub async fn stock_in(&self, user_id: Uuid, input: StockInInput) -> AppResult<InventoryItem> {
        let mut tx = self.db.begin().await?;
        let item = Self::stock_in_with(&mut tx, user_id, input).await?;
        tx.commit().await?;

        tracing::info!(serial = %item.serial_number, "Stocked in item");
        Ok(item)
    }

    /// Stock-in inside a caller-owned transaction (used by bulk import)
    pub async fn stock_in_with(
        conn: &mut PgConnection,
        user_id: Uuid,
        input: StockInInput,
    ) -> AppResult<InventoryItem> {
        input.validate()?;
        validate_serial_number(&input.serial_number)?;
        if let Some(price) = input.unit_price {
            validate_unit_price(price)?;
        }
        let serial = normalize_serial(&input.serial_number);

        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM inventory_items WHERE serial_number = $1",
        )
        .bind(&serial)
        .fetch_one(&mut *conn)
        .await?;
        if existing > 0 {
            return Err(AppError::conflict(
                "serial_number",
                format!("Serial number {} already exists", serial),
            ));
        }

        let row = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            INSERT INTO inventory_items
                (serial_number, equipment_category, model, size, batch, status, location, remark, unit_price)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(&serial)
        .bind(input.equipment_category.trim())
        .bind(input.model.trim())
        .bind(&input.size)
        .bind(&input.batch)
        .bind(ItemStatus::Active.as_str())
        .bind(&input.location)
        .bind(&input.remark)
        .bind(input.unit_price)
        .fetch_one(&mut *conn)
        .await?;

        stock::record_movements(
            conn,
            std::slice::from_ref(&serial),
            &Movement {
                transaction_type: TransactionType::StockIn,
                reference: input.batch.as_deref(),
                customer: None,
                created_by: user_id,
                notes: input.remark.as_deref(),
            },
        )
        .await?;

        row.try_into()
    }

    /// List items with optional status, category and text filters
    pub async fn list_items(&self, filter: &ItemFilter) -> AppResult<PaginatedResponse<InventoryItem>> {
        let pagination = Pagination::from_query(filter.page, filter.per_page);
        let status = filter.status.map(|s| s.as_str());
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM inventory_items
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR equipment_category = $2)
              AND ($3::text IS NULL OR serial_number ILIKE $3 OR model ILIKE $3)
            "#,
        )
        .bind(status)
        .bind(&filter.category)
        .bind(&search)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            SELECT {} FROM inventory_items
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR equipment_category = $2)
              AND ($3::text IS NULL OR serial_number ILIKE $3 OR model ILIKE $3)
            ORDER BY created_at DESC, serial_number
            LIMIT $4 OFFSET $5
            "#,
            ITEM_COLUMNS
        ))
        .bind(status)
        .bind(&filter.category)
        .bind(&search)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(convert_rows(rows)?, &pagination, total as u64))
    }

    pub async fn get_item(&self, serial: &str) -> AppResult<InventoryItem> {
        self.find_item(serial)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Inventory item {}", normalize_serial(serial))))
    }

    pub async fn find_item(&self, serial: &str) -> AppResult<Option<InventoryItem>> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {} FROM inventory_items WHERE serial_number = $1",
            ITEM_COLUMNS
        ))
        .bind(normalize_serial(serial))
        .fetch_optional(&self.db)
        .await?;

        row.map(InventoryItem::try_from).transpose()
    }

    /// Update descriptive fields; status only changes through documents
    pub async fn update_item(&self, serial: &str, input: UpdateItemInput) -> AppResult<InventoryItem> {
        input.validate()?;
        if let Some(price) = input.unit_price {
            validate_unit_price(price)?;
        }

        let row = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            UPDATE inventory_items SET
                equipment_category = COALESCE($2, equipment_category),
                model = COALESCE($3, model),
                size = COALESCE($4, size),
                batch = COALESCE($5, batch),
                location = COALESCE($6, location),
                remark = COALESCE($7, remark),
                unit_price = COALESCE($8, unit_price)
            WHERE serial_number = $1
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(normalize_serial(serial))
        .bind(&input.equipment_category)
        .bind(&input.model)
        .bind(&input.size)
        .bind(&input.batch)
        .bind(&input.location)
        .bind(&input.remark)
        .bind(input.unit_price)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Inventory item {}", normalize_serial(serial))))?;

        row.try_into()
    }

    /// Write an item off. Only in-stock items can be disposed.
    pub async fn dispose_item(&self, serial: &str, reason: &str) -> AppResult<InventoryItem> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::validation("reason", "A disposal reason is required"));
        }
        let serial = normalize_serial(serial);

        let mut tx = self.db.begin().await?;
        let items = stock::lock_items(&mut tx, std::slice::from_ref(&serial)).await?;
        stock::move_items(&mut tx, &items, ItemStatus::Disposed).await?;

        let row = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            UPDATE inventory_items
            SET remark = CASE WHEN remark IS NULL OR remark = '' THEN $2 ELSE remark || E'\n' || $2 END
            WHERE serial_number = $1
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(&serial)
        .bind(format!("Disposed: {}", reason))
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(serial = %serial, "Disposed item");
        row.try_into()
    }

    /// Delete an item that has never moved beyond its stock-in
    pub async fn delete_item(&self, serial: &str) -> AppResult<()> {
        let serial = normalize_serial(serial);
        let mut tx = self.db.begin().await?;
        let items = stock::lock_items(&mut tx, std::slice::from_ref(&serial)).await?;

        let movements = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM transactions WHERE serial_number = $1 AND transaction_type <> $2",
        )
        .bind(&serial)
        .bind(TransactionType::StockIn.as_str())
        .fetch_one(&mut *tx)
        .await?;
        if movements > 0 || items.iter().any(|i| i.status != ItemStatus::Active) {
            return Err(AppError::conflict(
                "serial_number",
                format!("{} has stock movements and cannot be deleted", serial),
            ));
        }

        sqlx::query("DELETE FROM transactions WHERE serial_number = $1")
            .bind(&serial)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM inventory_items WHERE serial_number = $1")
            .bind(&serial)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(serial = %serial, "Deleted item");
        Ok(())
    }

    /// List stock transactions, newest first
    pub async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> AppResult<PaginatedResponse<TransactionRecord>> {
        let pagination = Pagination::from_query(filter.page, filter.per_page);
        let serial = filter.serial_number.as_deref().map(normalize_serial);
        let transaction_type = filter.transaction_type.map(|t| t.as_str());

        let conditions = r#"
            WHERE ($1::text IS NULL OR serial_number = $1)
              AND ($2::text IS NULL OR transaction_type = $2)
              AND ($3::text IS NULL OR reference = $3)
              AND ($4::timestamptz IS NULL OR occurred_at >= $4)
              AND ($5::timestamptz IS NULL OR occurred_at < $5)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM transactions {}", conditions))
            .bind(&serial)
            .bind(transaction_type)
            .bind(&filter.reference)
            .bind(filter.from)
            .bind(filter.to)
            .fetch_one(&self.db)
            .await?;

        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {} FROM transactions {} ORDER BY occurred_at DESC, id LIMIT $6 OFFSET $7",
            TRANSACTION_COLUMNS, conditions
        ))
        .bind(&serial)
        .bind(transaction_type)
        .bind(&filter.reference)
        .bind(filter.from)
        .bind(filter.to)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(convert_rows(rows)?, &pagination, total as u64))
    }

    /// Item counts by category and status
    pub async fn get_summary(&self) -> AppResult<Vec<InventorySummaryRow>> {
        let rows = sqlx::query_as::<_, InventorySummaryRow>(
            r#"
            SELECT equipment_category, status, COUNT(*) AS item_count
            FROM inventory_items
            GROUP BY equipment_category, status
            ORDER BY equipment_category, status
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    /// Categories whose active count is at or below `threshold`
    pub async fn low_stock(&self, threshold: i64) -> AppResult<Vec<LowStockCategory>> {
        let rows = sqlx::query_as::<_, LowStockCategory>(
            r#"
            SELECT equipment_category,
                   COUNT(*) FILTER (WHERE status = 'active') AS active_count,
                   $1::bigint AS threshold
            FROM inventory_items
            WHERE status <> 'disposed'
            GROUP BY equipment_category
            HAVING COUNT(*) FILTER (WHERE status = 'active') <= $1
            ORDER BY active_count, equipment_category
            "#,
        )
        .bind(threshold)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }
}
