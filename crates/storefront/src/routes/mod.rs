//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (store round trip)
//!
//! # Cart (JSON, session-backed)
//! GET  /cart                   - Priced cart
//! POST /cart/add               - Add product
//! POST /cart/update            - Set line quantity (<= 0 removes)
//! POST /cart/remove            - Remove product
//!
//! # Checkout
//! POST /checkout               - Place order from the session cart
//!
//! # Orders
//! GET  /orders/{order_number}  - Order confirmation
//! ```

pub mod cart;
pub mod checkout;
pub mod orders;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use lustre_core::store::{CatalogStore, Store};

use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(cart::show::<S>))
        .route("/add", post(cart::add::<S>))
        .route("/update", post(cart::update::<S>))
        .route("/remove", post(cart::remove::<S>))
}

/// Create all routes for the storefront.
pub fn routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness::<S>))
        .nest("/cart", cart_routes())
        .route("/checkout", post(checkout::place_order::<S>))
        .route("/orders/{order_number}", get(orders::show::<S>))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Reads the delivery policy as a store round trip; 503 if it fails.
async fn readiness<S: Store>(State(state): State<AppState<S>>) -> StatusCode {
    match state.store().delivery_policy().await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
