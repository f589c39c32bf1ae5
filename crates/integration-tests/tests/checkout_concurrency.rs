//! Concurrent checkouts competing for the same stock.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use lustre_core::store::{MemoryStore, OrderFilter, OrderStore};
use lustre_core::{CheckoutError, CheckoutOrchestrator, ProductId};
use lustre_integration_tests::{cart_of, customer, money, product};

const LAST_RING: ProductId = ProductId::new(9);

async fn race(store: Arc<MemoryStore>, shoppers: usize, quantity: u32) -> (usize, usize) {
    let handles: Vec<_> = (0..shoppers)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let mut cart = cart_of(&[(LAST_RING, quantity)]);
                CheckoutOrchestrator::new(store.as_ref())
                    .checkout(&mut cart, customer())
                    .await
            })
        })
        .collect();

    let mut placed = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => placed += 1,
            Err(CheckoutError::InsufficientStock { .. }) => rejected += 1,
            Err(e) => panic!("unexpected checkout error: {e}"),
        }
    }
    (placed, rejected)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_unit_sells_once() {
    let store = Arc::new(MemoryStore::with_products([product(
        9,
        Some(money(400)),
        None,
        1,
    )]));

    let (placed, rejected) = race(Arc::clone(&store), 2, 1).await;

    assert_eq!(placed, 1);
    assert_eq!(rejected, 1);
    assert_eq!(store.stock_of(LAST_RING).await, Some(0));
    assert_eq!(store.list_orders(OrderFilter::default()).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stock_never_goes_negative_under_contention() {
    let store = Arc::new(MemoryStore::with_products([product(
        9,
        Some(money(400)),
        None,
        7,
    )]));

    let (placed, rejected) = race(Arc::clone(&store), 16, 2).await;

    // 7 units in pairs: three orders fit, one unit is left over
    assert_eq!(placed, 3);
    assert_eq!(rejected, 13);
    assert_eq!(store.stock_of(LAST_RING).await, Some(1));
}
