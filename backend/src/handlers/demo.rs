//! Demo loan handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use shared::{Action, PaginatedResponse, Resource};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::models::Demo;
use crate::services::demo::{CreateDemoInput, DemoFilter, OverdueDemo, ReturnDemoInput};
use crate::services::DemoService;
use crate::AppState;

fn demo_service(state: AppState) -> DemoService {
    DemoService::new(state.db, state.config.inventory.demo_default_days)
}

pub async fn create_demo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateDemoInput>,
) -> AppResult<(StatusCode, Json<Demo>)> {
    check_permission(&user, Resource::Demo, Action::Create)?;
    let demo = demo_service(state).create_demo(user.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(demo)))
}

pub async fn list_demos(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<DemoFilter>,
) -> AppResult<Json<PaginatedResponse<Demo>>> {
    check_permission(&user, Resource::Demo, Action::View)?;
    Ok(Json(demo_service(state).list_demos(&filter).await?))
}

pub async fn get_demo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(demo_id): Path<Uuid>,
) -> AppResult<Json<Demo>> {
    check_permission(&user, Resource::Demo, Action::View)?;
    Ok(Json(demo_service(state).get_demo(demo_id).await?))
}

pub async fn return_demo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(demo_id): Path<Uuid>,
    body: Option<Json<ReturnDemoInput>>,
) -> AppResult<Json<Demo>> {
    check_permission(&user, Resource::Demo, Action::Edit)?;
    let input = body.map(|Json(b)| b).unwrap_or_default();
    Ok(Json(demo_service(state).return_demo(user.user_id, demo_id, input).await?))
}

pub async fn overdue_demos(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<OverdueDemo>>> {
    check_permission(&user, Resource::Demo, Action::View)?;
    let today = Utc::now().date_naive();
    Ok(Json(demo_service(state).overdue_demos(today).await?))
}
