//! Database connection for the storefront.
//!
//! # Tables
//!
//! - `products`, `categories` - Catalog (read, plus `stock` decrements)
//! - `orders`, `order_items` - Placed orders and price snapshots
//! - `site_settings` - Delivery fee and free-delivery threshold
//! - `tower_sessions.session` - Session storage (holds the cart)
//!
//! All order-pipeline queries live in `lustre_core::store::PgStore`.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p lustre-cli -- migrate
//! ```

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Create a `PostgreSQL` connection pool.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
