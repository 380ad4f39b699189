//! Reconciliation handlers

use axum::{extract::State, Json};
use shared::{Action, DiscrepancyReport, Resource};

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::ReconciliationService;
use crate::AppState;

/// Run the discrepancy analysis
pub async fn get_discrepancies(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<DiscrepancyReport>> {
    check_permission(&user, Resource::Report, Action::View)?;
    let service = ReconciliationService::new(state.db);
    Ok(Json(service.analyze().await?))
}
