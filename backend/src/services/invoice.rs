//! Invoice service

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{normalize_serial, validate_unit_price, PaginatedResponse, Pagination};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    convert_rows, InventoryItem, Invoice, InvoiceLine, InvoiceRow, ItemStatus, OrderStatus,
    INVOICE_COLUMNS,
};
use crate::services::{order::lock_order, stock};

/// Invoice service
#[derive(Clone)]
pub struct InvoiceService {
    db: PgPool,
    default_tax_rate: Decimal,
}

/// Input for invoicing an order
#[derive(Debug, Default, Deserialize)]
pub struct CreateInvoiceInput {
    /// Fraction, e.g. 0.07. Falls back to the configured default.
    pub tax_rate: Option<Decimal>,
    pub invoice_date: Option<NaiveDate>,
    /// Per-serial price overrides
    #[serde(default)]
    pub prices: HashMap<String, Decimal>,
}

/// Filter for listing invoices
#[derive(Debug, Default, Deserialize)]
pub struct InvoiceFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub customer: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Price each item from the override map or its stored unit price
pub fn build_invoice_lines(
    items: &[InventoryItem],
    overrides: &HashMap<String, Decimal>,
) -> AppResult<Vec<InvoiceLine>> {
    let overrides: HashMap<String, Decimal> = overrides
        .iter()
        .map(|(serial, price)| (normalize_serial(serial), *price))
        .collect();

    items
        .iter()
        .map(|item| {
            let unit_price = overrides
                .get(&item.serial_number)
                .copied()
                .or(item.unit_price)
                .ok_or_else(|| {
                    AppError::validation(
                        "prices",
                        format!("No price given for {}", item.serial_number),
                    )
                })?;
            validate_unit_price(unit_price).map_err(|e| {
                AppError::validation("prices", format!("{}: {}", item.serial_number, e))
            })?;

            let description = match &item.size {
                Some(size) => format!("{} {} ({})", item.equipment_category, item.model, size),
                None => format!("{} {}", item.equipment_category, item.model),
            };

            Ok(InvoiceLine {
                serial_number: item.serial_number.clone(),
                description,
                unit_price,
            })
        })
        .collect()
}

impl InvoiceService {
    pub fn new(db: PgPool, default_tax_rate: Decimal) -> Self {
        Self {
            db,
            default_tax_rate,
        }
    }

    /// Invoice a pending order; its items move from reserved to invoiced
    pub async fn create_invoice(&self, order_id: Uuid, input: CreateInvoiceInput) -> AppResult<Invoice> {
        let tax_rate = input.tax_rate.unwrap_or(self.default_tax_rate);
        if tax_rate.is_sign_negative() || tax_rate >= Decimal::ONE {
            return Err(AppError::validation("tax_rate", "Tax rate must be a fraction between 0 and 1"));
        }

        let mut tx = self.db.begin().await?;
        let order = lock_order(&mut tx, order_id).await?;
        if order.status != OrderStatus::Pending {
            return Err(AppError::InvalidStateTransition(format!(
                "Order {} is {} and cannot be invoiced",
                order.order_number, order.status
            )));
        }
        order.status.transition(OrderStatus::Invoiced)?;

        let items = stock::lock_items(&mut tx, &order.serial_numbers).await?;
        stock::require_status(&items, ItemStatus::Reserved)?;
        let lines = build_invoice_lines(&items, &input.prices)?;
        let totals = Invoice::compute_totals(&lines, tax_rate)?;
        stock::move_items(&mut tx, &items, ItemStatus::Invoiced).await?;

        let invoice_number = stock::next_document_number(&mut tx, "INV").await?;
        let row = sqlx::query_as::<_, InvoiceRow>(&format!(
            r#"
            INSERT INTO invoices
                (invoice_number, order_id, order_number, customer_name, lines, serial_numbers,
                 subtotal, tax_rate, tax_amount, total, invoice_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            INVOICE_COLUMNS
        ))
        .bind(&invoice_number)
        .bind(order.id)
        .bind(&order.order_number)
        .bind(&order.customer_name)
        .bind(Json(&lines))
        .bind(&order.serial_numbers)
        .bind(totals.subtotal)
        .bind(tax_rate)
        .bind(totals.tax_amount)
        .bind(totals.total)
        .bind(input.invoice_date.unwrap_or_else(|| Utc::now().date_naive()))
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE orders SET status = $2, invoiced_at = NOW() WHERE id = $1")
            .bind(order.id)
            .bind(OrderStatus::Invoiced.as_str())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(
            invoice_number = %invoice_number,
            order_number = %order.order_number,
            serials = lines.len(),
            "Created invoice"
        );
        Ok(row.into())
    }

    pub async fn get_invoice(&self, invoice_id: Uuid) -> AppResult<Invoice> {
        let row = sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {} FROM invoices WHERE id = $1",
            INVOICE_COLUMNS
        ))
        .bind(invoice_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Invoice".to_string()))?;

        Ok(row.into())
    }

    /// List invoices, newest first
    pub async fn list_invoices(&self, filter: &InvoiceFilter) -> AppResult<PaginatedResponse<Invoice>> {
        let pagination = Pagination::from_query(filter.page, filter.per_page);
        let range = shared::DateRange::from_bounds(filter.start_date, filter.end_date);
        let customer = filter
            .customer
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(|c| format!("%{}%", c));

        let conditions = r#"
            WHERE invoice_date BETWEEN $1 AND $2
              AND ($3::text IS NULL OR customer_name ILIKE $3)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM invoices {}", conditions))
            .bind(range.start)
            .bind(range.end)
            .bind(&customer)
            .fetch_one(&self.db)
            .await?;

        let rows = sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {} FROM invoices {} ORDER BY invoice_date DESC, invoice_number DESC LIMIT $4 OFFSET $5",
            INVOICE_COLUMNS, conditions
        ))
        .bind(range.start)
        .bind(range.end)
        .bind(&customer)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let invoices: Vec<Invoice> = rows.into_iter().map(Invoice::from).collect();
        Ok(PaginatedResponse::new(invoices, &pagination, total as u64))
    }
}
