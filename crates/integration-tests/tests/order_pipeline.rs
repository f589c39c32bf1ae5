//! End-to-end order pipeline against the in-memory store.
//!
//! Covers cart pricing, checkout, and the admin lifecycle as one flow.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use lustre_core::inventory::InventoryError;
use lustre_core::store::{CatalogStore, MemoryStore, OrderFilter, OrderStore, StoreError};
use lustre_core::{
    CheckoutError, CheckoutOrchestrator, DeliveryPolicy, LifecycleError, OrderLifecycleManager,
    OrderStatus, PriceTier, ProductId,
};
use lustre_integration_tests::{cart_of, customer, money, new_order_for, product};

const NECKLACE: ProductId = ProductId::new(1);
const EARRINGS: ProductId = ProductId::new(2);

async fn store() -> MemoryStore {
    let store = MemoryStore::with_products([
        product(1, Some(money(70)), Some(money(50)), 10),
        product(2, Some(money(30)), None, 10),
    ]);
    store
        .set_delivery_policy(DeliveryPolicy::new(money(5), Some(money(200))).unwrap())
        .await
        .unwrap();
    store
}

#[tokio::test]
async fn test_checkout_totals_and_snapshot() {
    let store = store().await;
    let checkout = CheckoutOrchestrator::new(&store);
    let mut cart = cart_of(&[(NECKLACE, 2), (EARRINGS, 1)]);

    let quote = checkout.quote(&cart).await.unwrap();
    assert_eq!(quote.subtotal, money(130));
    assert_eq!(quote.delivery_fee, money(5));
    assert_eq!(quote.total, money(135));

    let order = checkout.checkout(&mut cart, customer()).await.unwrap();
    assert!(cart.is_empty());
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total, money(135));
    assert_eq!(order.items[0].tier, PriceTier::Discounted);
    assert_eq!(order.items[1].tier, PriceTier::Original);
    assert_eq!(store.stock_of(NECKLACE).await, Some(8));
    assert_eq!(store.stock_of(EARRINGS).await, Some(9));

    // Later price changes do not touch the stored order
    let mut repriced = store.product(NECKLACE).await.unwrap();
    repriced.pricing.discounted = Some(money(65));
    store.put_product(repriced).await;

    let stored = store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.items[0].unit_price, money(50));
    assert_eq!(stored.total, money(135));
}

#[tokio::test]
async fn test_failed_checkout_leaves_no_trace() {
    let store = store().await;
    let checkout = CheckoutOrchestrator::new(&store);

    let mut empty = cart_of(&[]);
    assert!(matches!(
        checkout.checkout(&mut empty, customer()).await,
        Err(CheckoutError::EmptyCart)
    ));

    let mut greedy = cart_of(&[(NECKLACE, 1), (EARRINGS, 11)]);
    let err = checkout.checkout(&mut greedy, customer()).await.unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::InsufficientStock { product_id, available: 10, requested: 11 }
            if product_id == EARRINGS
    ));

    assert_eq!(greedy.item_count(), 12);
    assert_eq!(store.stock_of(NECKLACE).await, Some(10));
    assert_eq!(store.stock_of(EARRINGS).await, Some(10));
    assert!(store.list_orders(OrderFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_lifecycle_after_checkout() {
    let store = store().await;
    let mut cart = cart_of(&[(NECKLACE, 3)]);
    let order = CheckoutOrchestrator::new(&store)
        .checkout(&mut cart, customer())
        .await
        .unwrap();
    assert_eq!(store.stock_of(NECKLACE).await, Some(7));

    let lifecycle = OrderLifecycleManager::new(&store);
    let order = lifecycle.update_tracking(order.id, Some("TRK-1")).await.unwrap();
    assert_eq!(order.tracking_number.as_deref(), Some("TRK-1"));

    lifecycle.cancel(order.id).await.unwrap();
    assert_eq!(store.stock_of(NECKLACE).await, Some(10));

    // Cancelling twice must not restock twice
    let err = lifecycle.cancel(order.id).await.unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::InvalidTransition { from: OrderStatus::Cancelled, .. }
    ));
    assert_eq!(store.stock_of(NECKLACE).await, Some(10));

    let err = lifecycle.update_note(order.id, Some("late")).await.unwrap_err();
    assert!(matches!(err, LifecycleError::AnnotationsLocked { .. }));
}

#[tokio::test]
async fn test_delivered_orders_stay_delivered() {
    let store = store().await;
    let mut cart = cart_of(&[(EARRINGS, 1)]);
    let order = CheckoutOrchestrator::new(&store)
        .checkout(&mut cart, customer())
        .await
        .unwrap();

    let lifecycle = OrderLifecycleManager::new(&store);
    for next in [OrderStatus::Processing, OrderStatus::Shipped, OrderStatus::Delivered] {
        lifecycle.transition(order.id, next).await.unwrap();
    }

    let err = lifecycle
        .transition(order.id, OrderStatus::Processing)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::InvalidTransition {
            from: OrderStatus::Delivered,
            to: OrderStatus::Processing
        }
    ));
    assert_eq!(lifecycle.get(order.id).await.unwrap().status, OrderStatus::Delivered);
}

#[tokio::test]
async fn test_cancel_skips_deleted_products() {
    let store = store().await;
    let mut cart = cart_of(&[(NECKLACE, 1), (EARRINGS, 2)]);
    let order = CheckoutOrchestrator::new(&store)
        .checkout(&mut cart, customer())
        .await
        .unwrap();

    assert!(store.delete_product(NECKLACE).await);
    let cancelled = OrderLifecycleManager::new(&store).cancel(order.id).await.unwrap();

    assert_eq!(cancelled.items[0].product_id, None);
    assert_eq!(cancelled.items[0].product_name, "Piece 1");
    assert_eq!(store.stock_of(EARRINGS).await, Some(10));
}

#[tokio::test]
async fn test_listing_is_newest_first_and_filtered() {
    let store = store().await;
    let checkout = CheckoutOrchestrator::new(&store);
    let first = checkout
        .checkout(&mut cart_of(&[(EARRINGS, 1)]), customer())
        .await
        .unwrap();
    let second = checkout
        .checkout(&mut cart_of(&[(EARRINGS, 1)]), customer())
        .await
        .unwrap();

    let lifecycle = OrderLifecycleManager::new(&store);
    lifecycle
        .transition(first.id, OrderStatus::Processing)
        .await
        .unwrap();

    let all = lifecycle.list(OrderFilter::default()).await.unwrap();
    assert_eq!(
        all.iter().map(|o| o.id).collect::<Vec<_>>(),
        vec![second.id, first.id]
    );

    let processing = lifecycle
        .list(OrderFilter {
            status: Some(OrderStatus::Processing),
            ..OrderFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(processing.len(), 1);
    assert_eq!(processing[0].id, first.id);
}

#[tokio::test]
async fn test_cancel_from_processing_restocks() {
    let store = store().await;
    let mut cart = cart_of(&[(NECKLACE, 4), (EARRINGS, 1)]);
    let order = CheckoutOrchestrator::new(&store)
        .checkout(&mut cart, customer())
        .await
        .unwrap();

    let lifecycle = OrderLifecycleManager::new(&store);
    lifecycle
        .transition(order.id, OrderStatus::Processing)
        .await
        .unwrap();
    assert_eq!(store.stock_of(NECKLACE).await, Some(6));

    let cancelled = lifecycle.cancel(order.id).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(store.stock_of(NECKLACE).await, Some(10));
    assert_eq!(store.stock_of(EARRINGS).await, Some(10));
}

#[tokio::test]
async fn test_product_deactivated_after_pricing_is_not_sold() {
    let store = store().await;
    let quote = CheckoutOrchestrator::new(&store)
        .quote(&cart_of(&[(EARRINGS, 2)]))
        .await
        .unwrap();

    let mut retired = store.product(EARRINGS).await.unwrap();
    retired.is_active = false;
    store.put_product(retired).await;

    let err = store
        .create_order(new_order_for(EARRINGS, 2, quote.lines[0].unit_price))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Inventory(InventoryError::Inactive(id)) if id == EARRINGS
    ));
    assert!(matches!(
        CheckoutError::from(err),
        CheckoutError::ProductUnavailable(id) if id == EARRINGS
    ));
    assert_eq!(store.stock_of(EARRINGS).await, Some(10));
    assert!(store.list_orders(OrderFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_search_page_and_delete() {
    let store = store().await;
    let checkout = CheckoutOrchestrator::new(&store);
    let first = checkout
        .checkout(&mut cart_of(&[(EARRINGS, 1)]), customer())
        .await
        .unwrap();
    let second = checkout
        .checkout(&mut cart_of(&[(EARRINGS, 1)]), customer())
        .await
        .unwrap();

    let lifecycle = OrderLifecycleManager::new(&store);
    let found = lifecycle
        .list(OrderFilter {
            query: Some(second.order_number.clone()),
            ..OrderFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, second.id);

    let page_two = lifecycle
        .list(OrderFilter {
            query: Some("lovelace".to_string()),
            limit: Some(1),
            offset: 1,
            ..OrderFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(page_two.len(), 1);
    assert_eq!(page_two[0].id, first.id);

    assert!(matches!(
        lifecycle.delete(first.id).await,
        Err(LifecycleError::NotDeletable { status: OrderStatus::Pending })
    ));
    lifecycle.cancel(first.id).await.unwrap();
    lifecycle.delete(first.id).await.unwrap();

    let remaining = lifecycle.list(OrderFilter::default()).await.unwrap();
    assert_eq!(remaining.iter().map(|o| o.id).collect::<Vec<_>>(), vec![second.id]);
    assert_eq!(store.stock_of(EARRINGS).await, Some(9));
}
