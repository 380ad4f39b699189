//! Delivery service: hands invoiced orders to the customer

use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{ItemStatus, Order, OrderRow, OrderStatus, TransactionType, ORDER_COLUMNS};
use crate::services::{
    order::lock_order,
    stock::{self, Movement},
};

/// Delivery service
#[derive(Clone)]
pub struct DeliveryService {
    db: PgPool,
}

/// Optional delivery details
#[derive(Debug, Default, Deserialize)]
pub struct DeliverOrderInput {
    pub notes: Option<String>,
}

impl DeliveryService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Deliver an invoiced order: items become delivered and one `Stock_Out`
    /// movement referencing the order number is written per serial
    pub async fn deliver_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        input: DeliverOrderInput,
    ) -> AppResult<Order> {
        let mut tx = self.db.begin().await?;
        let order = lock_order(&mut tx, order_id).await?;
        if order.status != OrderStatus::Invoiced {
            return Err(AppError::InvalidStateTransition(format!(
                "Order {} is {} and cannot be delivered",
                order.order_number, order.status
            )));
        }

        let items = stock::lock_items(&mut tx, &order.serial_numbers).await?;
        stock::require_status(&items, ItemStatus::Invoiced)?;
        stock::move_items(&mut tx, &items, ItemStatus::Delivered).await?;
        stock::record_movements(
            &mut tx,
            &order.serial_numbers,
            &Movement {
                transaction_type: TransactionType::StockOut,
                reference: Some(&order.order_number),
                customer: Some(&order.customer_name),
                created_by: user_id,
                notes: input.notes.as_deref(),
            },
        )
        .await?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "UPDATE orders SET status = $2, delivered_at = NOW() WHERE id = $1 RETURNING {}",
            ORDER_COLUMNS
        ))
        .bind(order.id)
        .bind(order.status.transition(OrderStatus::Delivered)?.as_str())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(
            order_number = %order.order_number,
            serials = order.serial_numbers.len(),
            "Delivered order"
        );
        row.try_into()
    }
}
