//! HTTP layer for subgate.
//!
//! Exposes the subscription read-side (`/s/:token/{v2rayn,clash}`), the
//! admin write-side under HTTP Basic auth (`/admin/customers/...`), and a
//! health endpoint. The router is exported for integration tests and
//! embedding.

mod admin;
mod auth;
pub mod cli;
mod error;
mod state;
mod subscribe;

use axum::routing::{get, post};
use axum::{Json, Router};

pub use cli::ServerArgs;
pub use error::ApiError;
pub use state::AppState;

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/s/:token/v2rayn", get(subscribe::v2rayn))
        .route("/s/:token/clash", get(subscribe::clash))
        .route(
            "/admin/customers",
            post(admin::create).get(admin::list),
        )
        .route(
            "/admin/customers/:token",
            get(admin::get).patch(admin::update).delete(admin::delete),
        )
        .route("/admin/customers/:token/rotate", post(admin::rotate))
        .route(
            "/admin/customers/:token/override",
            post(admin::set_override).delete(admin::clear_override),
        )
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "subgate",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}
