//! Checkout route handler.

use axum::{Json, extract::State, http::StatusCode};
use lustre_core::store::Store;
use lustre_core::{Cart, CheckoutError, CustomerDetails, CustomerForm};
use tower_sessions::Session;
use tracing::{error, instrument};

use super::orders::OrderView;
use crate::error::{Result, add_breadcrumb};
use crate::middleware::{load_cart, save_cart};
use crate::state::AppState;

/// Place an order for the session cart.
///
/// The cart is cleared only when the order is created; on any error it is
/// left as it was so the customer can adjust and retry. Once the order exists
/// the response is always 201, even if the emptied cart cannot be saved.
#[instrument(skip(state, session, form))]
pub async fn place_order<S: Store>(
    State(state): State<AppState<S>>,
    session: Session,
    Json(form): Json<CustomerForm>,
) -> Result<(StatusCode, Json<OrderView>)> {
    let customer = CustomerDetails::try_from(form).map_err(CheckoutError::from)?;
    let mut cart = load_cart(&session, state.cart_max_qty_per_line()).await?;

    add_breadcrumb(
        "checkout",
        "Checkout submitted",
        &[("item_count", cart.item_count().to_string())],
    );

    let order = state.checkout().checkout(&mut cart, customer).await?;
    store_emptied_cart(&session, &cart, &order.order_number).await;

    Ok((StatusCode::CREATED, Json(OrderView::from(&order))))
}

/// Save the cart cleared by a committed checkout. Returns whether it was saved.
async fn store_emptied_cart(session: &Session, cart: &Cart, order_number: &str) -> bool {
    match save_cart(session, cart).await {
        Ok(()) => true,
        Err(e) => {
            let event_id = sentry::capture_error(&e);
            error!(
                error = %e,
                order_number,
                sentry_event_id = %event_id,
                "Order placed but session cart was not cleared"
            );
            false
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use lustre_core::ProductId;
    use tower_sessions::MemoryStore;
    use tower_sessions::session::{Id, Record};
    use tower_sessions::session_store::{self, SessionStore};

    use super::*;

    /// A session backend that is down.
    #[derive(Debug)]
    struct UnreachableStore;

    #[async_trait]
    impl SessionStore for UnreachableStore {
        async fn save(&self, _record: &Record) -> session_store::Result<()> {
            Err(session_store::Error::Backend("connection refused".to_string()))
        }

        async fn load(&self, _id: &Id) -> session_store::Result<Option<Record>> {
            Err(session_store::Error::Backend("connection refused".to_string()))
        }

        async fn delete(&self, _id: &Id) -> session_store::Result<()> {
            Err(session_store::Error::Backend("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_emptied_cart_failure_is_swallowed() {
        let session = Session::new(Some(Id::default()), Arc::new(UnreachableStore), None);
        assert!(!store_emptied_cart(&session, &Cart::default(), "ORD-20260101-DEADBEEF").await);
    }

    #[tokio::test]
    async fn test_emptied_cart_is_saved() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let mut stale = Cart::default();
        stale.add(ProductId::new(1), 2);
        save_cart(&session, &stale).await.unwrap();

        assert!(store_emptied_cart(&session, &Cart::default(), "ORD-20260101-CAFEF00D").await);
        let cart = crate::middleware::load_cart(&session, 10).await.unwrap();
        assert!(cart.is_empty());
    }
}
