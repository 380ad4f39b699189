//! HTTP handlers for inventory management endpoints

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::{Action, ItemActivityHistory, PaginatedResponse, Resource};

use crate::error::{AppError, AppResult};
use crate::middleware::{check_permission, CurrentUser};
use crate::models::{InventoryItem, TransactionRecord};
use crate::services::import::ImportReport;
use crate::services::inventory::{
    InventorySummaryRow, ItemFilter, LowStockCategory, StockInInput, TransactionFilter,
    UpdateItemInput,
};
use crate::services::{ActivityService, ImportService, InventoryService};
use crate::AppState;

#[derive(Deserialize)]
pub struct DisposeRequest {
    pub reason: String,
}

/// Stock in a new item
pub async fn stock_in(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<StockInInput>,
) -> AppResult<(StatusCode, Json<InventoryItem>)> {
    check_permission(&user, Resource::Inventory, Action::Create)?;
    let service = InventoryService::new(state.db);
    let item = service.stock_in(user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Bulk stock-in from an uploaded CSV (multipart field `file`)
pub async fn import_items(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Json<ImportReport>> {
    check_permission(&user, Resource::Inventory, Action::Create)?;

    let mut body = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation("file", format!("Invalid upload: {}", e)))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::validation("file", format!("Invalid upload: {}", e)))?;
            body = Some(bytes);
            break;
        }
    }
    let body = body.ok_or_else(|| AppError::validation("file", "A CSV file is required"))?;

    let service = ImportService::new(state.db);
    Ok(Json(service.import_csv(user.user_id, &body).await?))
}

pub async fn list_items(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<ItemFilter>,
) -> AppResult<Json<PaginatedResponse<InventoryItem>>> {
    check_permission(&user, Resource::Inventory, Action::View)?;
    let service = InventoryService::new(state.db);
    Ok(Json(service.list_items(&filter).await?))
}

pub async fn get_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(serial): Path<String>,
) -> AppResult<Json<InventoryItem>> {
    check_permission(&user, Resource::Inventory, Action::View)?;
    let service = InventoryService::new(state.db);
    Ok(Json(service.get_item(&serial).await?))
}

pub async fn update_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(serial): Path<String>,
    Json(input): Json<UpdateItemInput>,
) -> AppResult<Json<InventoryItem>> {
    check_permission(&user, Resource::Inventory, Action::Edit)?;
    let service = InventoryService::new(state.db);
    Ok(Json(service.update_item(&serial, input).await?))
}

pub async fn dispose_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(serial): Path<String>,
    Json(body): Json<DisposeRequest>,
) -> AppResult<Json<InventoryItem>> {
    check_permission(&user, Resource::Inventory, Action::Delete)?;
    let service = InventoryService::new(state.db);
    Ok(Json(service.dispose_item(&serial, &body.reason).await?))
}

pub async fn delete_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(serial): Path<String>,
) -> AppResult<StatusCode> {
    check_permission(&user, Resource::Inventory, Action::Delete)?;
    let service = InventoryService::new(state.db);
    service.delete_item(&serial).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Full activity timeline of one serial number
pub async fn get_item_activity(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(serial): Path<String>,
) -> AppResult<Json<ItemActivityHistory>> {
    check_permission(&user, Resource::Inventory, Action::View)?;
    let service = ActivityService::new(state.db);
    Ok(Json(service.get_item_activity_history(&serial).await?))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<TransactionFilter>,
) -> AppResult<Json<PaginatedResponse<TransactionRecord>>> {
    check_permission(&user, Resource::Inventory, Action::View)?;
    let service = InventoryService::new(state.db);
    Ok(Json(service.list_transactions(&filter).await?))
}

pub async fn get_summary(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<InventorySummaryRow>>> {
    check_permission(&user, Resource::Inventory, Action::View)?;
    let service = InventoryService::new(state.db);
    Ok(Json(service.get_summary().await?))
}

pub async fn low_stock(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<LowStockCategory>>> {
    check_permission(&user, Resource::Inventory, Action::View)?;
    let threshold = state.config.inventory.low_stock_threshold;
    let service = InventoryService::new(state.db);
    Ok(Json(service.low_stock(threshold).await?))
}
