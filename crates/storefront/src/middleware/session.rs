//! Session middleware and cart persistence.
//!
//! The cart lives in the session under [`CART_KEY`]. Sessions are stored in
//! `PostgreSQL` via tower-sessions; the cookie only carries the session id.

use lustre_core::Cart;
use sqlx::PgPool;
use tower_sessions::{Expiry, Session, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "lustre_session";

/// Session key for the serialized [`Cart`].
pub const CART_KEY: &str = "cart";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer with `PostgreSQL` store.
///
/// The sessions table is created by the storefront migrations.
#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &StorefrontConfig,
) -> SessionManagerLayer<PostgresStore> {
    let store = PostgresStore::new(pool.clone());

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_https())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Load the session cart, or an empty one, with the configured quantity cap.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn load_cart(
    session: &Session,
    max_qty_per_line: u32,
) -> Result<Cart, tower_sessions::session::Error> {
    let cart = session
        .get::<Cart>(CART_KEY)
        .await?
        .map_or_else(|| Cart::new(max_qty_per_line), |c| c.with_max_qty(max_qty_per_line));
    Ok(cart)
}

/// Write the cart back to the session.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn save_cart(session: &Session, cart: &Cart) -> Result<(), tower_sessions::session::Error> {
    session.insert(CART_KEY, cart).await
}
