//! Order, invoice, delivery and cancellation handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{Action, PaginatedResponse, Resource};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::models::{Invoice, Order};
use crate::services::cancellation::CancelOrderInput;
use crate::services::delivery::DeliverOrderInput;
use crate::services::invoice::{CreateInvoiceInput, InvoiceFilter};
use crate::services::order::{CreateOrderInput, OrderFilter};
use crate::services::{CancellationService, DeliveryService, InvoiceService, OrderService};
use crate::AppState;

pub async fn create_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateOrderInput>,
) -> AppResult<(StatusCode, Json<Order>)> {
    check_permission(&user, Resource::Order, Action::Create)?;
    let service = OrderService::new(state.db);
    let order = service.create_order(user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_orders(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<OrderFilter>,
) -> AppResult<Json<PaginatedResponse<Order>>> {
    check_permission(&user, Resource::Order, Action::View)?;
    let service = OrderService::new(state.db);
    Ok(Json(service.list_orders(&filter).await?))
}

pub async fn get_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<Order>> {
    check_permission(&user, Resource::Order, Action::View)?;
    let service = OrderService::new(state.db);
    Ok(Json(service.get_order(order_id).await?))
}

pub async fn invoice_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
    body: Option<Json<CreateInvoiceInput>>,
) -> AppResult<(StatusCode, Json<Invoice>)> {
    check_permission(&user, Resource::Invoice, Action::Create)?;
    let input = body.map(|Json(b)| b).unwrap_or_default();
    let service = InvoiceService::new(state.db, state.config.inventory.default_tax_rate);
    let invoice = service.create_invoice(order_id, input).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn deliver_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
    body: Option<Json<DeliverOrderInput>>,
) -> AppResult<Json<Order>> {
    check_permission(&user, Resource::Delivery, Action::Create)?;
    let input = body.map(|Json(b)| b).unwrap_or_default();
    let service = DeliveryService::new(state.db);
    Ok(Json(service.deliver_order(user.user_id, order_id, input).await?))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(input): Json<CancelOrderInput>,
) -> AppResult<Json<Order>> {
    check_permission(&user, Resource::Order, Action::Edit)?;
    let service = CancellationService::new(state.db);
    Ok(Json(service.cancel_order(user.user_id, order_id, input).await?))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<InvoiceFilter>,
) -> AppResult<Json<PaginatedResponse<Invoice>>> {
    check_permission(&user, Resource::Invoice, Action::View)?;
    let service = InvoiceService::new(state.db, state.config.inventory.default_tax_rate);
    Ok(Json(service.list_invoices(&filter).await?))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(invoice_id): Path<Uuid>,
) -> AppResult<Json<Invoice>> {
    check_permission(&user, Resource::Invoice, Action::View)?;
    let service = InvoiceService::new(state.db, state.config.inventory.default_tax_rate);
    Ok(Json(service.get_invoice(invoice_id).await?))
}
