//! Cancellation service: voids orders and puts their items back in stock

use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{ItemStatus, Order, OrderRow, OrderStatus, TransactionType, ORDER_COLUMNS};
use crate::services::{
    order::lock_order,
    stock::{self, Movement},
};

/// Cancellation service
#[derive(Clone)]
pub struct CancellationService {
    db: PgPool,
}

/// Input for cancelling an order
#[derive(Debug, Deserialize, Validate)]
pub struct CancelOrderInput {
    #[validate(length(min = 1, message = "A cancellation reason is required"))]
    pub reason: String,
}

/// Item status an order's serials must have while the order is in `status`
pub fn held_item_status(status: OrderStatus) -> Option<ItemStatus> {
    match status {
        OrderStatus::Pending => Some(ItemStatus::Reserved),
        OrderStatus::Invoiced => Some(ItemStatus::Invoiced),
        OrderStatus::Delivered => Some(ItemStatus::Delivered),
        OrderStatus::Cancelled | OrderStatus::Returned => None,
    }
}

impl CancellationService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Cancel a pending, invoiced or delivered order. Delivered orders also get
    /// one `Cancellation` movement per serial to close their `Stock_Out`.
    pub async fn cancel_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        input: CancelOrderInput,
    ) -> AppResult<Order> {
        let reason = input.reason.trim().to_string();
        CancelOrderInput { reason: reason.clone() }.validate()?;

        let mut tx = self.db.begin().await?;
        let order = lock_order(&mut tx, order_id).await?;
        let next = order.status.transition(OrderStatus::Cancelled)?;
        let held = held_item_status(order.status).ok_or_else(|| {
            AppError::InvalidStateTransition(format!("Order {} is {}", order.order_number, order.status))
        })?;

        let items = stock::lock_items(&mut tx, &order.serial_numbers).await?;
        // Items already returned individually are back in stock; leave them
        let held_items: Vec<_> = items.into_iter().filter(|i| i.status == held).collect();
        stock::move_items(&mut tx, &held_items, ItemStatus::Active).await?;

        if order.status == OrderStatus::Delivered {
            let serials: Vec<String> = held_items.iter().map(|i| i.serial_number.clone()).collect();
            stock::record_movements(
                &mut tx,
                &serials,
                &Movement {
                    transaction_type: TransactionType::Cancellation,
                    reference: Some(&order.order_number),
                    customer: Some(&order.customer_name),
                    created_by: user_id,
                    notes: Some(&reason),
                },
            )
            .await?;
        }

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            UPDATE orders SET status = $2, cancelled_at = NOW(), cancellation_reason = $3
            WHERE id = $1
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(order.id)
        .bind(next.as_str())
        .bind(&reason)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(
            order_number = %order.order_number,
            serials = held_items.len(),
            previous_status = %order.status,
            "Cancelled order"
        );
        row.try_into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_held_item_status() {
        assert_eq!(held_item_status(OrderStatus::Pending), Some(ItemStatus::Reserved));
        assert_eq!(held_item_status(OrderStatus::Delivered), Some(ItemStatus::Delivered));
        assert_eq!(held_item_status(OrderStatus::Cancelled), None);
    }

    #[test]
    fn test_reason_required() {
        let input = CancelOrderInput {
            reason: String::new(),
        };
        assert!(input.validate().is_err());
    }
}
