//! HTTP API route definitions

use axum::{
    routing::{get, patch, post},
    Router,
};

use super::handlers::{self, AppState};

/// Create the API router with all routes mounted under `/api/v1`.
pub fn create_router(app_state: AppState) -> Router {
    let api_v1 = Router::new()
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        .route("/items", get(handlers::list_items).post(handlers::create_item))
        .route(
            "/items/:id",
            patch(handlers::update_item).delete(handlers::delete_item),
        )
        .route("/sweep", post(handlers::trigger_sweep))
        .route("/diagnostics", get(handlers::get_diagnostics))
        .route(
            "/settings/alerts",
            get(handlers::get_alert_rules).put(handlers::put_alert_rules),
        )
        .with_state(app_state);

    Router::new().nest("/api/v1", api_v1)
}
