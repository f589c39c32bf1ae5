//! Catalog records as the order pipeline sees them.
//!
//! Products are created and edited by the admin collaborator. The pipeline
//! reads them at checkout and only ever writes `stock`.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::types::{CategoryId, Money, ProductId};

/// The three price tiers a product may carry.
///
/// Which tier applies is decided by [`crate::pricing::resolve`]; nothing else
/// should inspect these fields to pick a price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProductPricing {
    /// The "was" / list price, shown struck through when a cheaper tier applies.
    pub original: Option<Money>,
    /// The everyday selling price.
    pub discounted: Option<Money>,
    /// Limited-time price, effective only while the product is flagged as a deal.
    pub deal: Option<Money>,
}

/// A sellable product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub sku: Option<String>,
    pub category_id: Option<CategoryId>,
    pub pricing: ProductPricing,
    /// Units on hand. Never negative.
    pub stock: i32,
    pub is_active: bool,
    /// Deal eligibility; also lists the product in the deals section.
    pub is_deal: bool,
    pub is_featured: bool,
}

impl Product {
    /// Whole-percent saving of the effective price against the original price.
    ///
    /// Zero when there is no original price, no cheaper tier, or the product
    /// has no resolvable price at all.
    #[must_use]
    pub fn discount_percent(&self) -> u32 {
        let Some(original) = self.pricing.original.filter(|p| !p.is_zero()) else {
            return 0;
        };
        let Ok(resolved) = crate::pricing::resolve(self) else {
            return 0;
        };
        if resolved.unit_price >= original {
            return 0;
        }

        let saving = (original - resolved.unit_price).amount() / original.amount()
            * Decimal::ONE_HUNDRED;
        saving.trunc().to_u32().unwrap_or(0)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// An active, non-deal product with plenty of stock.
    pub fn product(id: i32, pricing: ProductPricing) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            slug: format!("product-{id}"),
            sku: Some(format!("SKU-{id:04}")),
            category_id: None,
            pricing,
            stock: 100,
            is_active: true,
            is_deal: false,
            is_featured: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::fixtures::product;
    use super::*;

    #[test]
    fn test_discount_percent_truncates() {
        let p = product(
            1,
            ProductPricing {
                original: Some(Money::new(dec!(90))),
                discounted: Some(Money::new(dec!(60))),
                deal: None,
            },
        );
        // 33.33% saving
        assert_eq!(p.discount_percent(), 33);
    }

    #[test]
    fn test_discount_percent_zero_without_saving() {
        let p = product(
            1,
            ProductPricing {
                original: Some(Money::new(dec!(40))),
                discounted: None,
                deal: None,
            },
        );
        assert_eq!(p.discount_percent(), 0);

        let pricier = product(
            2,
            ProductPricing {
                original: Some(Money::new(dec!(40))),
                discounted: Some(Money::new(dec!(45))),
                deal: None,
            },
        );
        assert_eq!(pricier.discount_percent(), 0);
    }

    #[test]
    fn test_deal_price_counts_only_while_flagged() {
        let mut p = product(
            3,
            ProductPricing {
                original: Some(Money::new(dec!(100))),
                discounted: None,
                deal: Some(Money::new(dec!(70))),
            },
        );
        assert_eq!(p.discount_percent(), 0);

        p.is_deal = true;
        assert_eq!(p.discount_percent(), 30);
    }
}
