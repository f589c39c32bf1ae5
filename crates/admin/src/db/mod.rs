//! Database connection for admin.
//!
//! Admin shares the storefront database: it reads and updates `orders`,
//! `order_items`, `products.stock` (on cancellation) and `site_settings`.
//! All queries live in `lustre_core::store::PgStore`.
//!
//! Migrations are owned by the storefront crate and run via:
//! ```bash
//! cargo run -p lustre-cli -- migrate
//! ```

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Create a `PostgreSQL` connection pool sized for a handful of operators.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
