//! User management handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{Action, PaginatedResponse, Resource};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::models::User;
use crate::services::user::{ChangePasswordInput, CreateUserInput, UpdateUserInput, UserFilter};
use crate::services::UserService;
use crate::AppState;

pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<UserFilter>,
) -> AppResult<Json<PaginatedResponse<User>>> {
    check_permission(&user, Resource::User, Action::View)?;
    let service = UserService::new(state.db);
    Ok(Json(service.list_users(&filter).await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<User>> {
    if user.user_id != user_id {
        check_permission(&user, Resource::User, Action::View)?;
    }
    let service = UserService::new(state.db);
    Ok(Json(service.get_user(user_id).await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateUserInput>,
) -> AppResult<(StatusCode, Json<User>)> {
    check_permission(&user, Resource::User, Action::Create)?;
    let service = UserService::new(state.db);
    let created = service.create_user(input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(input): Json<UpdateUserInput>,
) -> AppResult<Json<User>> {
    check_permission(&user, Resource::User, Action::Edit)?;
    let service = UserService::new(state.db);
    Ok(Json(service.update_user(user.user_id, user_id, input).await?))
}

/// Deactivate a user (accounts are never hard-deleted)
pub async fn deactivate_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<User>> {
    check_permission(&user, Resource::User, Action::Delete)?;
    let service = UserService::new(state.db);
    Ok(Json(service.deactivate_user(user.user_id, user_id).await?))
}

/// Users may only change their own password
pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(input): Json<ChangePasswordInput>,
) -> AppResult<StatusCode> {
    if user.user_id != user_id {
        return Err(crate::error::AppError::InsufficientPermissions);
    }
    let service = UserService::new(state.db);
    service.change_password(user_id, input).await?;
    Ok(StatusCode::NO_CONTENT)
}
