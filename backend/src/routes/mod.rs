//! Route definitions for the Equipment Inventory Management server

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .merge(session_routes())
        .nest("/users", user_routes())
        .nest("/inventory", inventory_routes())
        .nest("/orders", order_routes())
        .nest("/invoices", invoice_routes())
        .nest("/returns", return_routes())
        .nest("/demos", demo_routes())
        .nest("/reconciliation", reconciliation_routes())
        .nest("/reports", report_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public)
        .nest("/auth", auth_routes())
        .merge(protected)
}

/// Authentication routes (public)
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
}

/// Session routes that need a valid access token
fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/me", get(handlers::me))
}

/// User management routes (protected)
fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_users).post(handlers::create_user))
        .route(
            "/:user_id",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::deactivate_user),
        )
        .route("/:user_id/password", post(handlers::change_password))
}

/// Inventory routes (protected)
fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/items", get(handlers::list_items).post(handlers::stock_in))
        .route(
            "/items/:serial",
            get(handlers::get_item)
                .put(handlers::update_item)
                .delete(handlers::delete_item),
        )
        .route("/items/:serial/dispose", post(handlers::dispose_item))
        .route("/items/:serial/activity", get(handlers::get_item_activity))
        .route("/import", post(handlers::import_items))
        .route("/transactions", get(handlers::list_transactions))
        .route("/summary", get(handlers::get_summary))
        .route("/low-stock", get(handlers::low_stock))
}

/// Order routes (protected)
fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_orders).post(handlers::create_order))
        .route("/:order_id", get(handlers::get_order))
        .route("/:order_id/invoice", post(handlers::invoice_order))
        .route("/:order_id/deliver", post(handlers::deliver_order))
        .route("/:order_id/cancel", post(handlers::cancel_order))
}

/// Invoice routes (protected)
fn invoice_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_invoices))
        .route("/:invoice_id", get(handlers::get_invoice))
}

/// Customer return routes (protected)
fn return_routes() -> Router<AppState> {
    Router::new().route("/", get(handlers::list_returns).post(handlers::return_items))
}

/// Demo loan routes (protected)
fn demo_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_demos).post(handlers::create_demo))
        .route("/overdue", get(handlers::overdue_demos))
        .route("/:demo_id", get(handlers::get_demo))
        .route("/:demo_id/return", post(handlers::return_demo))
}

/// Reconciliation routes (protected)
fn reconciliation_routes() -> Router<AppState> {
    Router::new().route("/discrepancies", get(handlers::get_discrepancies))
}

/// Reporting routes (protected)
fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(handlers::get_dashboard))
        .route("/stock", get(handlers::get_stock_report))
        .route("/movements", get(handlers::get_movement_report))
        .route("/demos", get(handlers::get_demo_report))
}
