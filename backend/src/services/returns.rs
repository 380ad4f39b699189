//! Customer returns after delivery

use std::collections::HashSet;

use serde::Deserialize;
use shared::{normalize_serial, validate_serial_batch, PaginatedResponse, Pagination};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{
    ItemStatus, Order, OrderStatus, ReturnRecord, ReturnRow, TransactionType, RETURN_COLUMNS,
};
use crate::services::{
    order::lock_order,
    stock::{self, Movement},
};

/// Returns service
#[derive(Clone)]
pub struct ReturnService {
    db: PgPool,
}

/// Input for returning delivered items
#[derive(Debug, Deserialize, Validate)]
pub struct ReturnItemsInput {
    pub order_id: Uuid,
    pub serial_numbers: Vec<String>,
    #[validate(length(min = 1, message = "A return reason is required"))]
    pub reason: String,
}

/// Filter for listing returns
#[derive(Debug, Default, Deserialize)]
pub struct ReturnFilter {
    pub order_id: Option<Uuid>,
    pub serial_number: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Check the requested serials against the order and earlier returns.
/// Returns whether the order is fully returned afterwards.
pub fn check_return(
    order: &Order,
    requested: &[String],
    already_returned: &HashSet<String>,
) -> AppResult<bool> {
    let on_order: HashSet<String> = order.serial_numbers.iter().map(|s| normalize_serial(s)).collect();

    for serial in requested {
        if !on_order.contains(serial) {
            return Err(AppError::validation(
                "serial_numbers",
                format!("{} is not part of order {}", serial, order.order_number),
            ));
        }
        if already_returned.contains(serial) {
            return Err(AppError::ItemUnavailable(format!("{} was already returned", serial)));
        }
    }

    let returned_after = already_returned.len() + requested.len();
    Ok(returned_after >= on_order.len())
}

impl ReturnService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Take delivered items back into stock under a new return number
    pub async fn return_items(&self, user_id: Uuid, input: ReturnItemsInput) -> AppResult<ReturnRecord> {
        input.validate()?;
        let serials = validate_serial_batch(&input.serial_numbers)?;
        let reason = input.reason.trim();

        let mut tx = self.db.begin().await?;
        let order = lock_order(&mut tx, input.order_id).await?;
        if order.status != OrderStatus::Delivered {
            return Err(AppError::InvalidStateTransition(format!(
                "Order {} is {}; only delivered orders accept returns",
                order.order_number, order.status
            )));
        }

        let already_returned: HashSet<String> = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT UNNEST(serial_numbers) FROM returns WHERE order_id = $1",
        )
        .bind(order.id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .collect();
        let fully_returned = check_return(&order, &serials, &already_returned)?;

        let items = stock::lock_items(&mut tx, &serials).await?;
        stock::require_status(&items, ItemStatus::Delivered)?;
        stock::move_items(&mut tx, &items, ItemStatus::Active).await?;

        let return_number = stock::next_document_number(&mut tx, "RET").await?;
        stock::record_movements(
            &mut tx,
            &serials,
            &Movement {
                transaction_type: TransactionType::Returned,
                reference: Some(&return_number),
                customer: Some(&order.customer_name),
                created_by: user_id,
                notes: Some(reason),
            },
        )
        .await?;

        let row = sqlx::query_as::<_, ReturnRow>(&format!(
            r#"
            INSERT INTO returns (return_number, order_id, order_number, serial_numbers, reason, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            RETURN_COLUMNS
        ))
        .bind(&return_number)
        .bind(order.id)
        .bind(&order.order_number)
        .bind(&serials)
        .bind(reason)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        if fully_returned {
            sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
                .bind(order.id)
                .bind(order.status.transition(OrderStatus::Returned)?.as_str())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        tracing::info!(
            return_number = %return_number,
            order_number = %order.order_number,
            serials = serials.len(),
            fully_returned,
            "Recorded customer return"
        );
        Ok(row.into())
    }

    /// List returns, newest first
    pub async fn list_returns(&self, filter: &ReturnFilter) -> AppResult<PaginatedResponse<ReturnRecord>> {
        let pagination = Pagination::from_query(filter.page, filter.per_page);
        let serial = filter.serial_number.as_deref().map(normalize_serial);

        let conditions = r#"
            WHERE ($1::uuid IS NULL OR order_id = $1)
              AND ($2::text IS NULL OR $2 = ANY(serial_numbers))
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM returns {}", conditions))
            .bind(filter.order_id)
            .bind(&serial)
            .fetch_one(&self.db)
            .await?;

        let rows = sqlx::query_as::<_, ReturnRow>(&format!(
            "SELECT {} FROM returns {} ORDER BY returned_at DESC LIMIT $3 OFFSET $4",
            RETURN_COLUMNS, conditions
        ))
        .bind(filter.order_id)
        .bind(&serial)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let returns: Vec<ReturnRecord> = rows.into_iter().map(ReturnRecord::from).collect();
        Ok(PaginatedResponse::new(returns, &pagination, total as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn delivered_order(serials: &[&str]) -> Order {
        Order {
            id: Uuid::new_v4(),
            order_number: "ORD-2024-0007".to_string(),
            customer_name: "City Hospital".to_string(),
            dealer_name: None,
            serial_numbers: serials.iter().map(|s| s.to_string()).collect(),
            status: OrderStatus::Delivered,
            created_at: Utc::now(),
            invoiced_at: Some(Utc::now()),
            delivered_at: Some(Utc::now()),
            cancelled_at: None,
            cancellation_reason: None,
            created_by: None,
        }
    }

    #[test]
    fn test_partial_then_full_return() {
        let order = delivered_order(&["SN-1", "SN-2"]);
        let none = HashSet::new();
        assert!(!check_return(&order, &["SN-1".to_string()], &none).unwrap());

        let first: HashSet<String> = ["SN-1".to_string()].into_iter().collect();
        assert!(check_return(&order, &["SN-2".to_string()], &first).unwrap());
    }

    #[test]
    fn test_rejects_foreign_or_repeated_serials() {
        let order = delivered_order(&["SN-1", "SN-2"]);
        let first: HashSet<String> = ["SN-1".to_string()].into_iter().collect();

        assert!(matches!(
            check_return(&order, &["SN-9".to_string()], &first),
            Err(AppError::Validation { .. })
        ));
        assert!(matches!(
            check_return(&order, &["SN-1".to_string()], &first),
            Err(AppError::ItemUnavailable(_))
        ));
    }
}
