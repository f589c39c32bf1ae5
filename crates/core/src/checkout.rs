//! Cart to order.
//!
//! [`CheckoutOrchestrator`] prices a cart against the live catalog, works out
//! delivery, and hands the store a fully snapshotted [`NewOrder`] to persist
//! together with the stock reservation. Nothing is written unless every step
//! succeeds, and the cart is only cleared once the order exists.

use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::cart::Cart;
use crate::catalog::Product;
use crate::inventory::InventoryError;
use crate::order::{
    CustomerDetails, CustomerDetailsError, NewOrder, NewOrderItem, Order, generate_order_number,
};
use crate::pricing::{self, PriceTier, PricingError};
use crate::store::{CatalogStore, OrderStore, StoreError};
use crate::types::{Money, ProductId};

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("your cart is empty")]
    EmptyCart,

    #[error("product {0} is no longer available")]
    ProductUnavailable(ProductId),

    #[error("only {available} left in stock for product {product_id} ({requested} requested)")]
    InsufficientStock {
        product_id: ProductId,
        available: i32,
        requested: u32,
    },

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    InvalidCustomer(#[from] CustomerDetailsError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for CheckoutError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Inventory(InventoryError::InsufficientStock {
                product_id,
                available,
                requested,
            }) => Self::InsufficientStock {
                product_id,
                available,
                requested,
            },
            // Deleted or deactivated between pricing and reservation
            StoreError::Inventory(
                InventoryError::UnknownProduct(id) | InventoryError::Inactive(id),
            ) => Self::ProductUnavailable(id),
            other => Self::Store(other),
        }
    }
}

/// A cart line with its price resolved against the current catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub name: String,
    pub sku: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
    pub tier: PriceTier,
    /// List price for strike-through display, when cheaper tier applies.
    pub compare_at: Option<Money>,
    /// Whole-percent saving against `compare_at`, zero without one.
    pub discount_percent: u32,
    pub line_total: Money,
}

/// Priced view of a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub lines: Vec<PricedLine>,
    pub item_count: u32,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub total: Money,
}

impl Quote {
    fn empty() -> Self {
        Self {
            lines: Vec::new(),
            item_count: 0,
            subtotal: Money::ZERO,
            delivery_fee: Money::ZERO,
            total: Money::ZERO,
        }
    }
}

/// Turns carts into orders.
pub struct CheckoutOrchestrator<'a, S> {
    store: &'a S,
}

impl<'a, S> CheckoutOrchestrator<'a, S>
where
    S: CatalogStore + OrderStore,
{
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Price `cart` with fresh catalog data.
    ///
    /// An empty cart quotes to all zeros with no delivery fee.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::ProductUnavailable`] for a missing or inactive
    /// product and [`CheckoutError::Pricing`] for a product with no usable price.
    #[instrument(skip(self, cart), fields(lines = cart.items().len()))]
    pub async fn quote(&self, cart: &Cart) -> Result<Quote, CheckoutError> {
        if cart.is_empty() {
            return Ok(Quote::empty());
        }
        self.price(cart).await
    }

    /// Place an order for everything in `cart`.
    ///
    /// On success the cart is cleared. On any error the cart, stock and
    /// order tables are left exactly as they were.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::EmptyCart`] for an empty cart,
    /// [`CheckoutError::ProductUnavailable`] or [`CheckoutError::Pricing`] when
    /// a line cannot be priced, [`CheckoutError::InsufficientStock`] when the
    /// reservation fails, and [`CheckoutError::Store`] for storage failures.
    #[instrument(skip(self, cart, customer), fields(lines = cart.items().len()))]
    pub async fn checkout(
        &self,
        cart: &mut Cart,
        customer: CustomerDetails,
    ) -> Result<Order, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let quote = self.price(cart).await?;
        let new_order = NewOrder {
            order_number: generate_order_number(Utc::now().date_naive()),
            customer,
            subtotal: quote.subtotal,
            delivery_fee: quote.delivery_fee,
            total: quote.total,
            items: quote
                .lines
                .into_iter()
                .map(|line| NewOrderItem {
                    product_id: line.product_id,
                    product_name: line.name,
                    product_sku: line.sku,
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    tier: line.tier,
                    line_total: line.line_total,
                })
                .collect(),
        };

        let order = self.store.create_order(new_order).await.map_err(|e| {
            let err = CheckoutError::from(e);
            match &err {
                CheckoutError::Store(e) => error!(error = %e, "Failed to persist order"),
                other => warn!(reason = %other, "Checkout rejected at reservation"),
            }
            err
        })?;

        cart.clear();
        info!(
            order_number = %order.order_number,
            total = %order.total,
            items = order.item_count(),
            "Order placed"
        );
        Ok(order)
    }

    async fn price(&self, cart: &Cart) -> Result<Quote, CheckoutError> {
        let ids: Vec<ProductId> = cart.items().iter().map(|l| l.product_id).collect();
        let products: HashMap<ProductId, Product> = self
            .store
            .products_by_ids(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut lines = Vec::with_capacity(cart.items().len());
        for line in cart.items() {
            let product = products
                .get(&line.product_id)
                .filter(|p| p.is_active)
                .ok_or(CheckoutError::ProductUnavailable(line.product_id))?;

            let resolved = pricing::resolve(product).inspect_err(|e| {
                error!(product_id = %product.id, error = %e, "Catalog pricing defect");
            })?;

            lines.push(PricedLine {
                product_id: product.id,
                name: product.name.clone(),
                sku: product.sku.clone(),
                quantity: line.quantity,
                unit_price: resolved.unit_price,
                tier: resolved.tier,
                compare_at: product
                    .pricing
                    .original
                    .filter(|original| *original > resolved.unit_price),
                discount_percent: product.discount_percent(),
                line_total: resolved.unit_price * line.quantity,
            });
        }

        let subtotal: Money = lines.iter().map(|l| l.line_total).sum();
        let delivery_fee = self.store.delivery_policy().await?.fee(subtotal);
        Ok(Quote {
            item_count: cart.item_count(),
            lines,
            subtotal,
            delivery_fee,
            total: subtotal + delivery_fee,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::catalog::ProductPricing;
    use crate::catalog::fixtures::product;
    use crate::delivery::DeliveryPolicy;
    use crate::order::CustomerForm;
    use crate::store::MemoryStore;
    use crate::types::OrderStatus;

    fn customer() -> CustomerDetails {
        CustomerDetails::try_from(CustomerForm {
            name: "Grace Hopper".to_string(),
            email: "grace@example.com".to_string(),
            shipping_address: "1 Compiler Way".to_string(),
            ..CustomerForm::default()
        })
        .unwrap()
    }

    fn priced(id: i32, original: Option<Money>, discounted: Option<Money>) -> Product {
        product(
            id,
            ProductPricing {
                original,
                discounted,
                deal: None,
            },
        )
    }

    async fn store_with_spec_catalog() -> MemoryStore {
        let store = MemoryStore::with_products([
            priced(1, Some(Money::new(dec!(70))), Some(Money::new(dec!(50)))),
            priced(2, Some(Money::new(dec!(30))), None),
        ]);
        store
            .set_delivery_policy(
                DeliveryPolicy::new(Money::new(dec!(5)), Some(Money::new(dec!(200)))).unwrap(),
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_checkout_totals() {
        let store = store_with_spec_catalog().await;
        let mut cart = Cart::default();
        cart.add(ProductId::new(1), 2);
        cart.add(ProductId::new(2), 1);

        let order = CheckoutOrchestrator::new(&store)
            .checkout(&mut cart, customer())
            .await
            .unwrap();

        assert_eq!(order.subtotal, Money::new(dec!(130)));
        assert_eq!(order.delivery_fee, Money::new(dec!(5)));
        assert_eq!(order.total, Money::new(dec!(135)));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.items[0].tier, PriceTier::Discounted);
        assert_eq!(order.items[1].tier, PriceTier::Original);
        assert!(cart.is_empty());

        assert_eq!(store.stock_of(ProductId::new(1)).await, Some(98));
        assert_eq!(store.stock_of(ProductId::new(2)).await, Some(99));
    }

    #[tokio::test]
    async fn test_empty_cart_has_no_side_effects() {
        let store = store_with_spec_catalog().await;
        let mut cart = Cart::default();

        let err = CheckoutOrchestrator::new(&store)
            .checkout(&mut cart, customer())
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::EmptyCart));
        assert!(store.list_orders(Default::default()).await.unwrap().is_empty());
        assert_eq!(store.stock_of(ProductId::new(1)).await, Some(100));
    }

    #[tokio::test]
    async fn test_insufficient_stock_leaves_cart_and_stock() {
        let mut low = priced(3, Some(Money::new(dec!(10))), None);
        low.stock = 1;
        let store = MemoryStore::with_products([
            low,
            priced(4, Some(Money::new(dec!(20))), None),
        ]);
        let mut cart = Cart::default();
        cart.add(ProductId::new(4), 1);
        cart.add(ProductId::new(3), 2);

        let err = CheckoutOrchestrator::new(&store)
            .checkout(&mut cart, customer())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::InsufficientStock {
                available: 1,
                requested: 2,
                ..
            }
        ));
        assert_eq!(cart.item_count(), 3);
        assert_eq!(store.stock_of(ProductId::new(3)).await, Some(1));
        assert_eq!(store.stock_of(ProductId::new(4)).await, Some(100));
        assert!(store.list_orders(Default::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inactive_or_missing_product_is_unavailable() {
        let mut hidden = priced(5, Some(Money::new(dec!(10))), None);
        hidden.is_active = false;
        let store = MemoryStore::with_products([hidden]);
        let orchestrator = CheckoutOrchestrator::new(&store);

        let mut cart = Cart::default();
        cart.add(ProductId::new(5), 1);
        assert!(matches!(
            orchestrator.checkout(&mut cart, customer()).await,
            Err(CheckoutError::ProductUnavailable(id)) if id == ProductId::new(5)
        ));

        let mut cart = Cart::default();
        cart.add(ProductId::new(404), 1);
        assert!(matches!(
            orchestrator.quote(&cart).await,
            Err(CheckoutError::ProductUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_unpriceable_product_fails_checkout() {
        let store = MemoryStore::with_products([priced(6, None, None)]);
        let mut cart = Cart::default();
        cart.add(ProductId::new(6), 1);

        let err = CheckoutOrchestrator::new(&store)
            .checkout(&mut cart, customer())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Pricing(PricingError::NoPrice(_))));
        assert!(!cart.is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_survives_price_change() {
        let store = store_with_spec_catalog().await;
        let mut cart = Cart::default();
        cart.add(ProductId::new(2), 1);
        let order = CheckoutOrchestrator::new(&store)
            .checkout(&mut cart, customer())
            .await
            .unwrap();

        let mut repriced = store.product(ProductId::new(2)).await.unwrap();
        repriced.pricing.original = Some(Money::new(dec!(99)));
        store.put_product(repriced).await;

        let stored = store.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.items[0].unit_price, Money::new(dec!(30)));
        assert_eq!(stored.items[0].line_total, Money::new(dec!(30)));
        assert_eq!(stored.total, order.total);
    }

    #[tokio::test]
    async fn test_quote_resolves_prices_at_read_time() {
        let store = store_with_spec_catalog().await;
        let orchestrator = CheckoutOrchestrator::new(&store);
        let mut cart = Cart::default();
        cart.add(ProductId::new(1), 1);

        let before = orchestrator.quote(&cart).await.unwrap();
        assert_eq!(before.subtotal, Money::new(dec!(50)));
        assert_eq!(before.lines[0].compare_at, Some(Money::new(dec!(70))));
        assert_eq!(before.lines[0].discount_percent, 28);

        let mut deal = store.product(ProductId::new(1)).await.unwrap();
        deal.is_deal = true;
        deal.pricing.deal = Some(Money::new(dec!(40)));
        store.put_product(deal).await;

        let after = orchestrator.quote(&cart).await.unwrap();
        assert_eq!(after.lines[0].tier, PriceTier::Deal);
        assert_eq!(after.lines[0].discount_percent, 42);
        assert_eq!(after.total, Money::new(dec!(45)));
    }

    #[tokio::test]
    async fn test_free_delivery_at_threshold() {
        let store = store_with_spec_catalog().await;
        let mut cart = Cart::default();
        cart.add(ProductId::new(1), 4);

        let quote = CheckoutOrchestrator::new(&store).quote(&cart).await.unwrap();
        assert_eq!(quote.subtotal, Money::new(dec!(200)));
        assert_eq!(quote.delivery_fee, Money::ZERO);
        assert_eq!(quote.total, Money::new(dec!(200)));
    }

    #[tokio::test]
    async fn test_empty_quote_is_zero() {
        let store = MemoryStore::new();
        let quote = CheckoutOrchestrator::new(&store)
            .quote(&Cart::default())
            .await
            .unwrap();
        assert_eq!(quote.total, Money::ZERO);
        assert!(quote.lines.is_empty());
    }
}
