//! Reporting handlers for analytics and data export

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use shared::{Action, Resource};

use crate::error::AppResult;
use crate::middleware::auth::{check_permission, AuthUser, CurrentUser};
use crate::services::reporting::{ReportFilter, ReportingService};
use crate::AppState;

#[derive(Deserialize)]
pub struct ReportQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub category: Option<String>,
    pub format: Option<String>, // "json" or "csv"
}

impl ReportQuery {
    fn filter(&self) -> ReportFilter {
        ReportFilter {
            start_date: self.start_date.as_deref().and_then(|s| s.parse().ok()),
            end_date: self.end_date.as_deref().and_then(|s| s.parse().ok()),
            category: self.category.clone(),
        }
    }

    fn wants_csv(&self) -> bool {
        self.format.as_deref() == Some("csv")
    }
}

fn csv_attachment<T: Serialize>(user: &AuthUser, rows: &[T], name: &str) -> AppResult<Response> {
    check_permission(user, Resource::Report, Action::Export)?;
    let csv = ReportingService::export_to_csv(rows)?;
    let disposition = format!("attachment; filename=\"{}.csv\"", name);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

/// JSON by default, CSV attachment on `?format=csv`
fn respond<T: Serialize>(user: &AuthUser, query: &ReportQuery, data: Vec<T>, name: &str) -> AppResult<Response> {
    if query.wants_csv() {
        csv_attachment(user, &data, name)
    } else {
        Ok(Json(data).into_response())
    }
}

/// Get dashboard metrics; the CSV form is a single row
pub async fn get_dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    check_permission(&user, Resource::Report, Action::View)?;
    let threshold = state.config.inventory.low_stock_threshold;
    let service = ReportingService::new(state.db.clone());
    let metrics = service.get_dashboard_metrics(threshold).await?;

    if query.wants_csv() {
        csv_attachment(&user, std::slice::from_ref(&metrics), "dashboard")
    } else {
        Ok(Json(metrics).into_response())
    }
}

/// Stock position by category and model
pub async fn get_stock_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    check_permission(&user, Resource::Report, Action::View)?;
    let service = ReportingService::new(state.db.clone());
    let data = service.get_stock_report(&query.filter()).await?;
    respond(&user, &query, data, "stock_report")
}

/// Monthly transaction counts by type
pub async fn get_movement_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    check_permission(&user, Resource::Report, Action::View)?;
    let service = ReportingService::new(state.db.clone());
    let data = service.get_movement_report(&query.filter()).await?;
    respond(&user, &query, data, "movement_report")
}

/// Demo loans with overdue days
pub async fn get_demo_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    check_permission(&user, Resource::Report, Action::View)?;
    let service = ReportingService::new(state.db.clone());
    let today = Utc::now().date_naive();
    let data = service.get_demo_report(&query.filter(), today).await?;
    respond(&user, &query, data, "demo_report")
}
