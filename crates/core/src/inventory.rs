//! Stock reservation.
//!
//! A checkout reserves every line or none of them. Requests are coalesced per
//! product and applied in ascending product-id order so concurrent
//! reservations always lock rows in the same sequence.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use crate::types::ProductId;

/// Units of one product that a checkout wants to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl StockRequest {
    #[must_use]
    pub const fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }

    /// Quantity as a stock delta, `None` when it cannot fit a stock column.
    #[must_use]
    pub fn delta(&self) -> Option<i32> {
        i32::try_from(self.quantity).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    #[error("insufficient stock for product {product_id}: {available} available, {requested} requested")]
    InsufficientStock {
        product_id: ProductId,
        available: i32,
        requested: u32,
    },

    #[error("product {0} not found")]
    UnknownProduct(ProductId),

    /// Deactivated after the cart was priced.
    #[error("product {0} is not for sale")]
    Inactive(ProductId),
}

/// Merge duplicate products and sort by product id.
///
/// Zero-quantity requests are dropped.
#[must_use]
pub fn coalesce(requests: impl IntoIterator<Item = StockRequest>) -> Vec<StockRequest> {
    let mut merged: BTreeMap<ProductId, u32> = BTreeMap::new();
    for request in requests {
        let entry = merged.entry(request.product_id).or_default();
        *entry = entry.saturating_add(request.quantity);
    }
    merged
        .into_iter()
        .filter(|&(_, quantity)| quantity > 0)
        .map(|(product_id, quantity)| StockRequest::new(product_id, quantity))
        .collect()
}

/// Mutable access to on-hand stock counts.
pub trait StockCells {
    fn stock_mut(&mut self, product_id: ProductId) -> Option<&mut i32>;

    /// Whether new reservations may take units of this product.
    ///
    /// Releases ignore this, so a cancelled order still restocks an inactive
    /// product.
    fn is_reservable(&self, _product_id: ProductId) -> bool {
        true
    }
}

impl StockCells for HashMap<ProductId, i32> {
    fn stock_mut(&mut self, product_id: ProductId) -> Option<&mut i32> {
        self.get_mut(&product_id)
    }
}

/// Decrement stock for every request, or for none.
///
/// Every request is checked before any count changes, so a failure leaves
/// `cells` untouched. The first failing product in id order is reported.
///
/// # Errors
///
/// Returns [`InventoryError::UnknownProduct`] for a missing product,
/// [`InventoryError::Inactive`] for one that is no longer for sale, and
/// [`InventoryError::InsufficientStock`] when a product has too few units.
pub fn reserve<C: StockCells>(cells: &mut C, requests: &[StockRequest]) -> Result<(), InventoryError> {
    let requests = coalesce(requests.iter().copied());

    for request in &requests {
        let available = *cells
            .stock_mut(request.product_id)
            .ok_or(InventoryError::UnknownProduct(request.product_id))?;
        if !cells.is_reservable(request.product_id) {
            return Err(InventoryError::Inactive(request.product_id));
        }
        let enough = request.delta().is_some_and(|delta| available >= delta);
        if !enough {
            return Err(InventoryError::InsufficientStock {
                product_id: request.product_id,
                available,
                requested: request.quantity,
            });
        }
    }

    for request in &requests {
        if let (Some(stock), Some(delta)) = (cells.stock_mut(request.product_id), request.delta()) {
            *stock -= delta;
        }
    }
    Ok(())
}

/// Return reserved units to stock.
///
/// Products that no longer exist are skipped.
pub fn release<C: StockCells>(cells: &mut C, requests: &[StockRequest]) {
    for request in coalesce(requests.iter().copied()) {
        if let (Some(stock), Some(delta)) = (cells.stock_mut(request.product_id), request.delta()) {
            *stock = stock.saturating_add(delta);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn id(n: i32) -> ProductId {
        ProductId::new(n)
    }

    fn cells(levels: &[(i32, i32)]) -> HashMap<ProductId, i32> {
        levels.iter().map(|&(p, s)| (id(p), s)).collect()
    }

    #[test]
    fn test_coalesce_merges_and_sorts() {
        let merged = coalesce([
            StockRequest::new(id(9), 1),
            StockRequest::new(id(2), 2),
            StockRequest::new(id(9), 3),
            StockRequest::new(id(5), 0),
        ]);
        assert_eq!(
            merged,
            vec![StockRequest::new(id(2), 2), StockRequest::new(id(9), 4)]
        );
    }

    #[test]
    fn test_reserve_decrements_all() {
        let mut stock = cells(&[(1, 5), (2, 1)]);
        reserve(
            &mut stock,
            &[StockRequest::new(id(1), 2), StockRequest::new(id(2), 1)],
        )
        .unwrap();
        assert_eq!(stock[&id(1)], 3);
        assert_eq!(stock[&id(2)], 0);
    }

    #[test]
    fn test_reserve_is_all_or_nothing() {
        let mut stock = cells(&[(1, 5), (2, 1)]);
        let err = reserve(
            &mut stock,
            &[StockRequest::new(id(1), 2), StockRequest::new(id(2), 2)],
        )
        .unwrap_err();

        assert_eq!(
            err,
            InventoryError::InsufficientStock {
                product_id: id(2),
                available: 1,
                requested: 2,
            }
        );
        assert_eq!(stock[&id(1)], 5);
        assert_eq!(stock[&id(2)], 1);
    }

    #[test]
    fn test_reserve_checks_merged_quantity() {
        let mut stock = cells(&[(1, 3)]);
        let result = reserve(
            &mut stock,
            &[StockRequest::new(id(1), 2), StockRequest::new(id(1), 2)],
        );
        assert!(matches!(
            result,
            Err(InventoryError::InsufficientStock { requested: 4, .. })
        ));
    }

    #[test]
    fn test_reserve_unknown_product() {
        let mut stock = cells(&[(1, 3)]);
        assert_eq!(
            reserve(&mut stock, &[StockRequest::new(id(4), 1)]),
            Err(InventoryError::UnknownProduct(id(4)))
        );
    }

    /// Stock levels plus a set of deactivated products.
    struct Shelf {
        stock: HashMap<ProductId, i32>,
        inactive: Vec<ProductId>,
    }

    impl StockCells for Shelf {
        fn stock_mut(&mut self, product_id: ProductId) -> Option<&mut i32> {
            self.stock.get_mut(&product_id)
        }

        fn is_reservable(&self, product_id: ProductId) -> bool {
            !self.inactive.contains(&product_id)
        }
    }

    #[test]
    fn test_reserve_rejects_inactive_product_untouched() {
        let mut shelf = Shelf {
            stock: cells(&[(1, 5), (2, 5)]),
            inactive: vec![id(2)],
        };
        assert_eq!(
            reserve(
                &mut shelf,
                &[StockRequest::new(id(1), 1), StockRequest::new(id(2), 1)],
            ),
            Err(InventoryError::Inactive(id(2)))
        );
        assert_eq!(shelf.stock[&id(1)], 5);
        assert_eq!(shelf.stock[&id(2)], 5);

        // Releasing still works, so cancellations restock
        release(&mut shelf, &[StockRequest::new(id(2), 2)]);
        assert_eq!(shelf.stock[&id(2)], 7);
    }

    #[test]
    fn test_reserve_rejects_oversized_request() {
        let mut stock = cells(&[(1, i32::MAX)]);
        assert!(reserve(&mut stock, &[StockRequest::new(id(1), u32::MAX)]).is_err());
        assert_eq!(stock[&id(1)], i32::MAX);
    }

    #[test]
    fn test_release_restores_and_skips_missing() {
        let mut stock = cells(&[(1, 0)]);
        release(
            &mut stock,
            &[StockRequest::new(id(1), 3), StockRequest::new(id(99), 1)],
        );
        assert_eq!(stock[&id(1)], 3);
        assert!(!stock.contains_key(&id(99)));
    }
}
