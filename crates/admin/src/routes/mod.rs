//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness check
//! GET  /health/ready                - Readiness check (store round trip)
//!
//! # Orders
//! GET  /orders?status=&q=&page=&limit= - Order listing, newest first
//! GET  /orders/{id}                 - Order detail
//! DELETE /orders/{id}               - Delete a delivered or cancelled order
//! POST /orders/{id}/status          - Status transition
//! POST /orders/{id}/tracking        - Set or clear tracking number
//! POST /orders/{id}/note            - Set or clear internal note
//!
//! # Settings
//! GET  /settings/delivery           - Delivery fee and threshold
//! PUT  /settings/delivery           - Update delivery fee and threshold
//! ```
//!
//! Admin has no login of its own; access is restricted at the network layer.

pub mod orders;
pub mod settings;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use lustre_core::store::{CatalogStore, Store};

use crate::state::AppState;

/// Create the order management router.
pub fn order_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(orders::index::<S>))
        .route("/{id}", get(orders::show::<S>).delete(orders::destroy::<S>))
        .route("/{id}/status", post(orders::update_status::<S>))
        .route("/{id}/tracking", post(orders::update_tracking::<S>))
        .route("/{id}/note", post(orders::update_note::<S>))
}

/// Create all routes for admin.
pub fn routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness::<S>))
        .nest("/orders", order_routes())
        .route(
            "/settings/delivery",
            get(settings::show_delivery::<S>).put(settings::update_delivery::<S>),
        )
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness<S: Store>(State(state): State<AppState<S>>) -> StatusCode {
    match state.store().delivery_policy().await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
