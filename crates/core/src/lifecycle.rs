//! Post-checkout order management.
//!
//! Status moves follow [`OrderStatus::can_transition_to`]. Every write is a
//! conditional update against the status the caller observed, so two admins
//! acting on the same order cannot both win.

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::order::{MAX_TRACKING_NUMBER_LENGTH, Order, normalize_annotation};
use crate::store::{Annotation, OrderFilter, OrderStore, StoreError, UpdateOutcome};
use crate::types::{OrderId, OrderStatus};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("order not found")]
    NotFound,

    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("{status} orders cannot be annotated")]
    AnnotationsLocked { status: OrderStatus },

    #[error("only delivered or cancelled orders can be deleted (order is {status})")]
    NotDeletable { status: OrderStatus },

    #[error("tracking number must be at most {max} characters")]
    TrackingNumberTooLong { max: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Admin-side operations on placed orders.
pub struct OrderLifecycleManager<'a, S> {
    store: &'a S,
}

impl<'a, S: OrderStore> OrderLifecycleManager<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// # Errors
    ///
    /// Returns [`LifecycleError::Store`] if the store fails.
    pub async fn list(&self, filter: OrderFilter) -> Result<Vec<Order>, LifecycleError> {
        Ok(self.store.list_orders(filter).await?)
    }

    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] for an unknown id.
    pub async fn get(&self, id: OrderId) -> Result<Order, LifecycleError> {
        self.store
            .get_order(id)
            .await?
            .ok_or(LifecycleError::NotFound)
    }

    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] for an unknown order number.
    pub async fn get_by_number(&self, order_number: &str) -> Result<Order, LifecycleError> {
        self.store
            .get_order_by_number(order_number)
            .await?
            .ok_or(LifecycleError::NotFound)
    }

    /// Move an order to `to`.
    ///
    /// Moving to [`OrderStatus::Cancelled`] returns every item's quantity to
    /// its product (items whose product was deleted are skipped) in the same
    /// atomic step as the status change.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] when the table forbids the
    /// move, including when another writer changed the status first; the
    /// error then carries the status actually stored.
    #[instrument(skip(self))]
    pub async fn transition(&self, id: OrderId, to: OrderStatus) -> Result<Order, LifecycleError> {
        let current = self.get(id).await?;
        let from = current.status;
        if !from.can_transition_to(to) {
            warn!(%from, %to, "Rejected order status change");
            return Err(LifecycleError::InvalidTransition { from, to });
        }

        let restock = to == OrderStatus::Cancelled;
        match self.store.transition_status(id, from, to, restock).await? {
            UpdateOutcome::Updated(order) => {
                info!(order_number = %order.order_number, %from, %to, restock, "Order status changed");
                Ok(*order)
            }
            UpdateOutcome::NotFound => Err(LifecycleError::NotFound),
            UpdateOutcome::Conflict(actual) => {
                warn!(expected = %from, %actual, %to, "Order status changed concurrently");
                Err(LifecycleError::InvalidTransition { from: actual, to })
            }
        }
    }

    /// Cancel an order and restock its items.
    ///
    /// # Errors
    ///
    /// Same as [`Self::transition`].
    pub async fn cancel(&self, id: OrderId) -> Result<Order, LifecycleError> {
        self.transition(id, OrderStatus::Cancelled).await
    }

    /// Delete a delivered or cancelled order together with its items.
    ///
    /// Live orders still hold reserved stock, so they must be cancelled first.
    /// Terminal statuses have no exits, which makes the check race-free.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotDeletable`] for an order that is not in a
    /// terminal status.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: OrderId) -> Result<(), LifecycleError> {
        let order = self.get(id).await?;
        if !order.status.is_terminal() {
            return Err(LifecycleError::NotDeletable {
                status: order.status,
            });
        }
        if !self.store.delete_order(id).await? {
            return Err(LifecycleError::NotFound);
        }
        info!(order_number = %order.order_number, status = %order.status, "Order deleted");
        Ok(())
    }

    /// Set or clear (`None` or blank) the tracking number.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::AnnotationsLocked`] for cancelled orders and
    /// [`LifecycleError::TrackingNumberTooLong`] past 100 characters.
    #[instrument(skip(self))]
    pub async fn update_tracking(
        &self,
        id: OrderId,
        tracking_number: Option<&str>,
    ) -> Result<Order, LifecycleError> {
        let value = normalize_annotation(tracking_number);
        if value
            .as_ref()
            .is_some_and(|v| v.chars().count() > MAX_TRACKING_NUMBER_LENGTH)
        {
            return Err(LifecycleError::TrackingNumberTooLong {
                max: MAX_TRACKING_NUMBER_LENGTH,
            });
        }
        self.annotate(id, Annotation::TrackingNumber(value)).await
    }

    /// Set or clear (`None` or blank) the internal note.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::AnnotationsLocked`] for cancelled orders.
    #[instrument(skip(self, note))]
    pub async fn update_note(&self, id: OrderId, note: Option<&str>) -> Result<Order, LifecycleError> {
        self.annotate(id, Annotation::AdminNote(normalize_annotation(note)))
            .await
    }

    async fn annotate(&self, id: OrderId, annotation: Annotation) -> Result<Order, LifecycleError> {
        match self.store.annotate(id, annotation).await? {
            UpdateOutcome::Updated(order) => Ok(*order),
            UpdateOutcome::NotFound => Err(LifecycleError::NotFound),
            UpdateOutcome::Conflict(status) => Err(LifecycleError::AnnotationsLocked { status }),
        }
    }
}
