//! Subcommand implementations.

pub mod delivery;
pub mod migrate;
pub mod seed;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Database URL from `STOREFRONT_DATABASE_URL`, falling back to `DATABASE_URL`.
fn database_url() -> Result<SecretString, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| "STOREFRONT_DATABASE_URL (or DATABASE_URL) not set".into())
}

/// A single-connection pool; CLI commands run one statement at a time.
async fn connect() -> Result<PgPool, Box<dyn std::error::Error>> {
    let url = database_url()?;
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(url.expose_secret())
        .await?;
    tracing::info!("Connected to database");
    Ok(pool)
}
