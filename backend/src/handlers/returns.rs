//! Customer return handlers

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use shared::{Action, PaginatedResponse, Resource};

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::models::ReturnRecord;
use crate::services::returns::{ReturnFilter, ReturnItemsInput};
use crate::services::ReturnService;
use crate::AppState;

pub async fn return_items(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<ReturnItemsInput>,
) -> AppResult<(StatusCode, Json<ReturnRecord>)> {
    check_permission(&user, Resource::Return, Action::Create)?;
    let service = ReturnService::new(state.db);
    let record = service.return_items(user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn list_returns(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<ReturnFilter>,
) -> AppResult<Json<PaginatedResponse<ReturnRecord>>> {
    check_permission(&user, Resource::Return, Action::View)?;
    let service = ReturnService::new(state.db);
    Ok(Json(service.list_returns(&filter).await?))
}
