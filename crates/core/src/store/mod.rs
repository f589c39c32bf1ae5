//! Persistence seams for the order pipeline.
//!
//! [`CatalogStore`] serves product and delivery-policy reads, [`OrderStore`]
//! owns order writes. Both are implemented by [`MemoryStore`] and, with the
//! `postgres` feature, by [`PgStore`].
//!
//! Every write that must be atomic with a stock change (placing an order,
//! cancelling one) is a single store call so implementations can wrap it in
//! one transaction or one critical section.

mod memory;
#[cfg(feature = "postgres")]
mod postgres;

use std::future::Future;

use thiserror::Error;

pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgStore;

use crate::catalog::Product;
use crate::delivery::DeliveryPolicy;
use crate::inventory::InventoryError;
use crate::order::{NewOrder, Order};
use crate::types::{OrderId, OrderStatus, ProductId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[cfg(feature = "postgres")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// A stored row could not be turned back into a domain value.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Result of a conditional order update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated(Box<Order>),
    NotFound,
    /// The order exists but its status did not allow the update.
    Conflict(OrderStatus),
}

/// A field the admin collaborator may annotate on an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    TrackingNumber(Option<String>),
    AdminNote(Option<String>),
}

/// Filter for order listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    /// Case-insensitive substring of the order number, customer name or
    /// customer email.
    pub query: Option<String>,
    pub limit: Option<u32>,
    /// Orders to skip, counted after filtering.
    pub offset: u32,
}

impl OrderFilter {
    /// Whether `order` passes the status and search filters.
    #[must_use]
    pub fn matches(&self, order: &Order) -> bool {
        if self.status.is_some_and(|s| order.status != s) {
            return false;
        }
        let Some(query) = self.query.as_deref() else {
            return true;
        };
        let needle = query.to_lowercase();
        [
            order.order_number.as_str(),
            order.customer.name.as_str(),
            order.customer.email.as_str(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

pub trait CatalogStore: Send + Sync {
    /// Products for the given ids, in any order. Missing ids are omitted.
    fn products_by_ids(
        &self,
        ids: &[ProductId],
    ) -> impl Future<Output = Result<Vec<Product>, StoreError>> + Send;

    /// The current delivery policy, falling back to defaults when unset.
    fn delivery_policy(&self) -> impl Future<Output = Result<DeliveryPolicy, StoreError>> + Send;

    fn set_delivery_policy(
        &self,
        policy: DeliveryPolicy,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

pub trait OrderStore: Send + Sync {
    /// Reserve stock for every item and persist the order, atomically.
    ///
    /// On [`StoreError::Inventory`] nothing was written.
    fn create_order(&self, order: NewOrder) -> impl Future<Output = Result<Order, StoreError>> + Send;

    fn get_order(&self, id: OrderId) -> impl Future<Output = Result<Option<Order>, StoreError>> + Send;

    fn get_order_by_number(
        &self,
        order_number: &str,
    ) -> impl Future<Output = Result<Option<Order>, StoreError>> + Send;

    /// Orders, newest first.
    fn list_orders(
        &self,
        filter: OrderFilter,
    ) -> impl Future<Output = Result<Vec<Order>, StoreError>> + Send;

    /// Move an order from `expected` to `to`.
    ///
    /// Applies only if the stored status still equals `expected`. With
    /// `restock`, item quantities go back to their products in the same
    /// atomic step.
    fn transition_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        to: OrderStatus,
        restock: bool,
    ) -> impl Future<Output = Result<UpdateOutcome, StoreError>> + Send;

    /// Delete an order and its items. Stock is not touched.
    ///
    /// Returns `false` when no such order exists.
    fn delete_order(&self, id: OrderId) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Set an annotation unless the order is in a status that rejects them.
    fn annotate(
        &self,
        id: OrderId,
        annotation: Annotation,
    ) -> impl Future<Output = Result<UpdateOutcome, StoreError>> + Send;
}

/// A store that can back an HTTP binary: both halves, owned, shareable.
pub trait Store: CatalogStore + OrderStore + 'static {}

impl<T: CatalogStore + OrderStore + 'static> Store for T {}
