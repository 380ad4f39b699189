//! Order service: stock-out orders that reserve serialized items

use serde::Deserialize;
use shared::{validate_serial_batch, PaginatedResponse, Pagination};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{convert_rows, ItemStatus, Order, OrderRow, OrderStatus, ORDER_COLUMNS};
use crate::services::stock;

/// Order service
#[derive(Clone)]
pub struct OrderService {
    db: PgPool,
}

/// Input for creating an order
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderInput {
    #[validate(length(min = 1, max = 255, message = "Customer name is required"))]
    pub customer_name: String,
    #[validate(length(max = 255))]
    pub dealer_name: Option<String>,
    pub serial_numbers: Vec<String>,
}

/// Filter for listing orders
#[derive(Debug, Default, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub customer: Option<String>,
    pub serial_number: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl OrderService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a pending order; every serial must be in stock and becomes reserved
    pub async fn create_order(&self, user_id: Uuid, input: CreateOrderInput) -> AppResult<Order> {
        input.validate()?;
        let serials = validate_serial_batch(&input.serial_numbers)?;

        let mut tx = self.db.begin().await?;
        let items = stock::lock_items(&mut tx, &serials).await?;
        stock::require_status(&items, ItemStatus::Active)?;
        stock::move_items(&mut tx, &items, ItemStatus::Reserved).await?;

        let order_number = stock::next_document_number(&mut tx, "ORD").await?;
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            INSERT INTO orders (order_number, customer_name, dealer_name, serial_numbers, status, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(&order_number)
        .bind(input.customer_name.trim())
        .bind(input.dealer_name.as_deref().map(str::trim))
        .bind(&serials)
        .bind(OrderStatus::Pending.as_str())
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(order_number = %order_number, serials = serials.len(), "Created order");
        row.try_into()
    }

    /// List orders, newest first
    pub async fn list_orders(&self, filter: &OrderFilter) -> AppResult<PaginatedResponse<Order>> {
        let pagination = Pagination::from_query(filter.page, filter.per_page);
        let status = filter.status.map(|s| s.as_str());
        let customer = filter
            .customer
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(|c| format!("%{}%", c));
        let serial = filter.serial_number.as_deref().map(shared::normalize_serial);

        let conditions = r#"
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR customer_name ILIKE $2 OR dealer_name ILIKE $2)
              AND ($3::text IS NULL OR $3 = ANY(serial_numbers))
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM orders {}", conditions))
            .bind(status)
            .bind(&customer)
            .bind(&serial)
            .fetch_one(&self.db)
            .await?;

        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders {} ORDER BY created_at DESC LIMIT $4 OFFSET $5",
            ORDER_COLUMNS, conditions
        ))
        .bind(status)
        .bind(&customer)
        .bind(&serial)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(convert_rows(rows)?, &pagination, total as u64))
    }

    pub async fn get_order(&self, order_id: Uuid) -> AppResult<Order> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE id = $1",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        row.try_into()
    }
}

/// Lock an order row for a state change
pub async fn lock_order(conn: &mut PgConnection, order_id: Uuid) -> AppResult<Order> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {} FROM orders WHERE id = $1 FOR UPDATE",
        ORDER_COLUMNS
    ))
    .bind(order_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

    row.try_into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_order_requires_customer() {
        let input = CreateOrderInput {
            customer_name: String::new(),
            dealer_name: None,
            serial_numbers: vec!["SN-001".to_string()],
        };
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("customer_name"));
    }

    #[test]
    fn test_order_filter_status() {
        let filter: OrderFilter = serde_json::from_str(r#"{"status":"invoiced"}"#).unwrap();
        assert_eq!(filter.status, Some(OrderStatus::Invoiced));
    }
}
