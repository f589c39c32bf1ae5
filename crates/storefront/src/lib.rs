//! Lustre Storefront library.
//!
//! The public JSON API: session cart, checkout, and order confirmation.
//! Built as a library so the router can be driven in tests against an
//! in-memory store.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::Router;
use lustre_core::store::Store;
use tower_http::trace::TraceLayer;
use tower_sessions::{SessionManagerLayer, SessionStore};

use state::AppState;

/// Assemble the storefront router with its middleware stack.
pub fn app<S, SS>(state: AppState<S>, session_layer: SessionManagerLayer<SS>) -> Router
where
    S: Store,
    SS: SessionStore + Clone,
{
    routes::routes()
        .layer(session_layer)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::extract::Request| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}
