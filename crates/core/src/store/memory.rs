//! In-process store.
//!
//! All state sits behind one async mutex, so each store call is a critical
//! section and multi-step writes are atomic by construction. Used by tests
//! and for running the pipeline without a database.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::Mutex;

use super::{Annotation, CatalogStore, OrderFilter, OrderStore, StoreError, UpdateOutcome};
use crate::catalog::Product;
use crate::delivery::DeliveryPolicy;
use crate::inventory::{self, StockCells, StockRequest};
use crate::order::{NewOrder, Order, OrderItem};
use crate::types::{OrderId, OrderItemId, OrderStatus, ProductId};

#[derive(Debug, Default)]
struct State {
    products: Vec<Product>,
    index: HashMap<ProductId, usize>,
    orders: Vec<Order>,
    next_order_id: i32,
    next_item_id: i32,
    policy: DeliveryPolicy,
}

impl StockCells for State {
    fn stock_mut(&mut self, product_id: ProductId) -> Option<&mut i32> {
        let idx = *self.index.get(&product_id)?;
        self.products.get_mut(idx).map(|p| &mut p.stock)
    }

    fn is_reservable(&self, product_id: ProductId) -> bool {
        self.product(product_id).is_some_and(|p| p.is_active)
    }
}

impl State {
    fn product(&self, id: ProductId) -> Option<&Product> {
        self.index.get(&id).and_then(|&idx| self.products.get(idx))
    }

    fn upsert_product(&mut self, product: Product) {
        if let Some(existing) = self
            .index
            .get(&product.id)
            .and_then(|&idx| self.products.get_mut(idx))
        {
            *existing = product;
        } else {
            self.index.insert(product.id, self.products.len());
            self.products.push(product);
        }
    }

    fn next_order_id(&mut self) -> OrderId {
        self.next_order_id += 1;
        OrderId::new(self.next_order_id)
    }

    fn next_item_id(&mut self) -> OrderItemId {
        self.next_item_id += 1;
        OrderItemId::new(self.next_item_id)
    }
}

/// A [`CatalogStore`] and [`OrderStore`] held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-loaded with `products`.
    #[must_use]
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let mut state = State::default();
        for product in products {
            state.upsert_product(product);
        }
        Self {
            state: Mutex::new(state),
        }
    }

    /// Insert or replace a product, as an admin edit would.
    pub async fn put_product(&self, product: Product) {
        self.state.lock().await.upsert_product(product);
    }

    pub async fn product(&self, id: ProductId) -> Option<Product> {
        self.state.lock().await.product(id).cloned()
    }

    pub async fn stock_of(&self, id: ProductId) -> Option<i32> {
        self.state.lock().await.product(id).map(|p| p.stock)
    }

    /// Delete a product. Order items keep their snapshot and lose the link.
    pub async fn delete_product(&self, id: ProductId) -> bool {
        let mut state = self.state.lock().await;
        let Some(idx) = state.index.remove(&id) else {
            return false;
        };
        state.products.swap_remove(idx);
        if let Some(moved) = state.products.get(idx).map(|p| p.id) {
            state.index.insert(moved, idx);
        }
        for item in state.orders.iter_mut().flat_map(|o| o.items.iter_mut()) {
            if item.product_id == Some(id) {
                item.product_id = None;
            }
        }
        true
    }
}

impl CatalogStore for MemoryStore {
    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError> {
        let state = self.state.lock().await;
        Ok(ids.iter().filter_map(|&id| state.product(id).cloned()).collect())
    }

    async fn delivery_policy(&self) -> Result<DeliveryPolicy, StoreError> {
        Ok(self.state.lock().await.policy)
    }

    async fn set_delivery_policy(&self, policy: DeliveryPolicy) -> Result<(), StoreError> {
        self.state.lock().await.policy = policy;
        Ok(())
    }
}

impl OrderStore for MemoryStore {
    async fn create_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        let mut state = self.state.lock().await;

        let requests: Vec<StockRequest> = order
            .items
            .iter()
            .map(|item| StockRequest::new(item.product_id, item.quantity))
            .collect();
        inventory::reserve(&mut *state, &requests)?;

        let now = Utc::now();
        let id = state.next_order_id();
        let items = order
            .items
            .into_iter()
            .map(|item| OrderItem {
                id: state.next_item_id(),
                product_id: Some(item.product_id),
                product_name: item.product_name,
                product_sku: item.product_sku,
                quantity: item.quantity,
                unit_price: item.unit_price,
                tier: item.tier,
                line_total: item.line_total,
            })
            .collect();

        let placed = Order {
            id,
            order_number: order.order_number,
            status: OrderStatus::Pending,
            customer: order.customer,
            subtotal: order.subtotal,
            delivery_fee: order.delivery_fee,
            total: order.total,
            tracking_number: None,
            admin_note: None,
            items,
            created_at: now,
            updated_at: now,
        };
        state.orders.push(placed.clone());
        Ok(placed)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn get_order_by_number(&self, order_number: &str) -> Result<Option<Order>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .orders
            .iter()
            .find(|o| o.order_number == order_number)
            .cloned())
    }

    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, StoreError> {
        let state = self.state.lock().await;
        let limit = filter
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        let offset = usize::try_from(filter.offset).unwrap_or(usize::MAX);
        Ok(state
            .orders
            .iter()
            .rev()
            .filter(|o| filter.matches(o))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn transition_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        to: OrderStatus,
        restock: bool,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut state = self.state.lock().await;

        let Some(current) = state.orders.iter().find(|o| o.id == id) else {
            return Ok(UpdateOutcome::NotFound);
        };
        if current.status != expected {
            return Ok(UpdateOutcome::Conflict(current.status));
        }

        if restock {
            let returned: Vec<StockRequest> = current
                .items
                .iter()
                .filter_map(|i| i.product_id.map(|p| StockRequest::new(p, i.quantity)))
                .collect();
            inventory::release(&mut *state, &returned);
        }

        let order = state
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or_else(|| StoreError::Corrupt(format!("order {id} vanished mid-update")))?;
        order.status = to;
        order.updated_at = Utc::now();
        Ok(UpdateOutcome::Updated(Box::new(order.clone())))
    }

    async fn delete_order(&self, id: OrderId) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let before = state.orders.len();
        state.orders.retain(|o| o.id != id);
        Ok(state.orders.len() != before)
    }

    async fn annotate(&self, id: OrderId, annotation: Annotation) -> Result<UpdateOutcome, StoreError> {
        let mut state = self.state.lock().await;
        let Some(order) = state.orders.iter_mut().find(|o| o.id == id) else {
            return Ok(UpdateOutcome::NotFound);
        };
        if !order.status.accepts_annotations() {
            return Ok(UpdateOutcome::Conflict(order.status));
        }

        match annotation {
            Annotation::TrackingNumber(value) => order.tracking_number = value,
            Annotation::AdminNote(value) => order.admin_note = value,
        }
        order.updated_at = Utc::now();
        Ok(UpdateOutcome::Updated(Box::new(order.clone())))
    }
}
