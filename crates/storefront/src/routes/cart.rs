//! Cart route handlers.
//!
//! The cart itself is a [`Cart`] value kept in the session. Every response
//! prices it fresh against the catalog, so the customer always sees current
//! prices and delivery fees.

use axum::{Json, extract::State};
use lustre_core::store::{CatalogStore, Store};
use lustre_core::{Cart, CheckoutError, Money, PricedLine, ProductId, Quote};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{instrument, warn};

use crate::error::{AppError, Result};
use crate::middleware::{load_cart, save_cart};
use crate::state::AppState;

/// Priced cart returned by every cart endpoint.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub lines: Vec<PricedLine>,
    pub item_count: u32,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub total: Money,
    pub max_qty_per_line: u32,
}

impl CartView {
    fn new(quote: Quote, max_qty_per_line: u32) -> Self {
        Self {
            lines: quote.lines,
            item_count: quote.item_count,
            subtotal: quote.subtotal,
            delivery_fee: quote.delivery_fee,
            total: quote.total,
            max_qty_per_line,
        }
    }
}

/// Add to cart request.
#[derive(Debug, Deserialize)]
pub struct AddToCart {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
}

/// Update quantity request. Zero or negative removes the line.
#[derive(Debug, Deserialize)]
pub struct UpdateCart {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Remove from cart request.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCart {
    pub product_id: ProductId,
}

/// Price the cart, dropping lines whose product has gone away.
///
/// A pruned cart is written back to the session.
pub(crate) async fn priced_view<S: Store>(
    state: &AppState<S>,
    session: &Session,
    cart: &mut Cart,
) -> Result<CartView> {
    let mut pruned = false;
    loop {
        match state.checkout().quote(cart).await {
            Ok(quote) => {
                if pruned {
                    save_cart(session, cart).await?;
                }
                return Ok(CartView::new(quote, cart.max_qty_per_line()));
            }
            Err(CheckoutError::ProductUnavailable(id)) if cart.quantity_of(id).is_some() => {
                warn!(product_id = %id, "Dropping unavailable product from cart");
                cart.remove(id);
                pruned = true;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Show the priced cart.
#[instrument(skip(state, session))]
pub async fn show<S: Store>(
    State(state): State<AppState<S>>,
    session: Session,
) -> Result<Json<CartView>> {
    let mut cart = load_cart(&session, state.cart_max_qty_per_line()).await?;
    Ok(Json(priced_view(&state, &session, &mut cart).await?))
}

/// Add a product to the cart, merging with an existing line.
#[instrument(skip(state, session))]
pub async fn add<S: Store>(
    State(state): State<AppState<S>>,
    session: Session,
    Json(body): Json<AddToCart>,
) -> Result<Json<CartView>> {
    let available = state
        .store()
        .products_by_ids(&[body.product_id])
        .await?
        .into_iter()
        .any(|p| p.is_active);
    if !available {
        return Err(AppError::NotFound(format!("product {}", body.product_id)));
    }

    let mut cart = load_cart(&session, state.cart_max_qty_per_line()).await?;
    cart.add(body.product_id, body.quantity.unwrap_or(1));
    save_cart(&session, &cart).await?;

    Ok(Json(priced_view(&state, &session, &mut cart).await?))
}

/// Set a line's quantity.
#[instrument(skip(state, session))]
pub async fn update<S: Store>(
    State(state): State<AppState<S>>,
    session: Session,
    Json(body): Json<UpdateCart>,
) -> Result<Json<CartView>> {
    let mut cart = load_cart(&session, state.cart_max_qty_per_line()).await?;
    if cart.quantity_of(body.product_id).is_none() {
        return Err(AppError::BadRequest(format!(
            "product {} is not in the cart",
            body.product_id
        )));
    }
    cart.set_quantity(body.product_id, body.quantity);
    save_cart(&session, &cart).await?;

    Ok(Json(priced_view(&state, &session, &mut cart).await?))
}

/// Remove a line. Removing an absent product is a no-op.
#[instrument(skip(state, session))]
pub async fn remove<S: Store>(
    State(state): State<AppState<S>>,
    session: Session,
    Json(body): Json<RemoveFromCart>,
) -> Result<Json<CartView>> {
    let mut cart = load_cart(&session, state.cart_max_qty_per_line()).await?;
    cart.remove(body.product_id);
    save_cart(&session, &cart).await?;

    Ok(Json(priced_view(&state, &session, &mut cart).await?))
}
