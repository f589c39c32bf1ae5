//! Session cart contents.
//!
//! A [`Cart`] is a plain value: product ids and quantities in the order they
//! were first added. It never stores prices; those are resolved at read time
//! so an admin price change between add-to-cart and checkout is always seen.
//! Callers own persistence (the storefront keeps it in the session).

use serde::{Deserialize, Serialize};

use crate::types::ProductId;

/// Default upper bound on a single line's quantity.
pub const DEFAULT_MAX_QTY_PER_LINE: u32 = 10;

/// One product in the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A customer's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
    #[serde(skip, default = "default_max_qty")]
    max_qty_per_line: u32,
}

const fn default_max_qty() -> u32 {
    DEFAULT_MAX_QTY_PER_LINE
}

impl Default for Cart {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_QTY_PER_LINE)
    }
}

impl Cart {
    /// Create an empty cart. A `max_qty_per_line` of zero is treated as one.
    #[must_use]
    pub fn new(max_qty_per_line: u32) -> Self {
        Self {
            lines: Vec::new(),
            max_qty_per_line: max_qty_per_line.max(1),
        }
    }

    /// Apply a quantity cap, re-clamping existing lines.
    ///
    /// The cap is configuration, not cart data, so it is not serialized; call
    /// this after loading a cart from storage.
    #[must_use]
    pub fn with_max_qty(mut self, max_qty_per_line: u32) -> Self {
        self.max_qty_per_line = max_qty_per_line.max(1);
        let max = self.max_qty_per_line;
        for line in &mut self.lines {
            line.quantity = line.quantity.clamp(1, max);
        }
        self
    }

    #[must_use]
    pub const fn max_qty_per_line(&self) -> u32 {
        self.max_qty_per_line
    }

    fn line_mut(&mut self, product_id: ProductId) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|l| l.product_id == product_id)
    }

    /// Add `quantity` units, merging with an existing line.
    ///
    /// The resulting line quantity is clamped to `[1, max_qty_per_line]`.
    pub fn add(&mut self, product_id: ProductId, quantity: u32) {
        let max = self.max_qty_per_line;
        if let Some(line) = self.line_mut(product_id) {
            line.quantity = clamp_qty(u64::from(line.quantity) + u64::from(quantity), max);
        } else {
            self.lines.push(CartLine {
                product_id,
                quantity: clamp_qty(u64::from(quantity), max),
            });
        }
    }

    /// Set an exact quantity. Zero or negative removes the line.
    ///
    /// Setting a quantity for a product not in the cart adds it.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: i64) {
        let quantity = match u64::try_from(quantity) {
            Ok(q) if q > 0 => clamp_qty(q, self.max_qty_per_line),
            _ => {
                self.remove(product_id);
                return;
            }
        };

        if let Some(line) = self.line_mut(product_id) {
            line.quantity = quantity;
        } else {
            self.lines.push(CartLine {
                product_id,
                quantity,
            });
        }
    }

    /// Remove a product. Removing an absent product is a no-op.
    pub fn remove(&mut self, product_id: ProductId) {
        self.lines.retain(|l| l.product_id != product_id);
    }

    /// Lines in the order they were first added.
    #[must_use]
    pub fn items(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total units across all lines (the cart badge count).
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> Option<u32> {
        self.lines
            .iter()
            .find(|l| l.product_id == product_id)
            .map(|l| l.quantity)
    }
}

fn clamp_qty(quantity: u64, max: u32) -> u32 {
    u32::try_from(quantity.clamp(1, u64::from(max))).unwrap_or(max)
}
