//! Effective unit price resolution.
//!
//! A product can carry up to three prices. Exactly one is effective at any
//! moment, chosen by a fixed priority table:
//!
//! | Priority | Tier         | Applies when                              |
//! |----------|--------------|-------------------------------------------|
//! | 1        | `deal`       | deal price set **and** product is a deal  |
//! | 2        | `discounted` | discounted price set                      |
//! | 3        | `original`   | original price set                        |
//!
//! Deal eligibility and deal-price presence are checked independently: a deal
//! price on a product that is not flagged as a deal is ignored, and a deal
//! flag without a deal price falls through to the next tier. A deal price
//! higher than the discounted price still wins while the deal is running.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::Product;
use crate::types::{Money, ProductId};

/// Which of a product's prices was charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "price_tier", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PriceTier {
    Deal,
    Discounted,
    Original,
}

impl PriceTier {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deal => "deal",
            Self::Discounted => "discounted",
            Self::Original => "original",
        }
    }
}

impl std::fmt::Display for PriceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single price a product sells at right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPrice {
    pub unit_price: Money,
    pub tier: PriceTier,
}

/// Catalog data that cannot produce a price.
///
/// These are cataloging defects, not customer errors; they must reach the
/// admin collaborator rather than being defaulted to zero.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("product {0} has no applicable price")]
    NoPrice(ProductId),

    #[error("product {product_id} has a negative {tier} price")]
    NegativePrice {
        product_id: ProductId,
        tier: PriceTier,
    },
}

/// Pick the effective price for `product`.
///
/// # Errors
///
/// Returns [`PricingError::NoPrice`] when no tier applies and
/// [`PricingError::NegativePrice`] when the winning tier is below zero.
pub fn resolve(product: &Product) -> Result<ResolvedPrice, PricingError> {
    let pricing = &product.pricing;
    let table = [
        (PriceTier::Deal, pricing.deal.filter(|_| product.is_deal)),
        (PriceTier::Discounted, pricing.discounted),
        (PriceTier::Original, pricing.original),
    ];

    let (tier, unit_price) = table
        .into_iter()
        .find_map(|(tier, price)| price.map(|p| (tier, p)))
        .ok_or(PricingError::NoPrice(product.id))?;

    if unit_price.is_negative() {
        return Err(PricingError::NegativePrice {
            product_id: product.id,
            tier,
        });
    }

    Ok(ResolvedPrice { unit_price, tier })
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::catalog::ProductPricing;
    use crate::catalog::fixtures::product;

    fn money(amount: rust_decimal::Decimal) -> Option<Money> {
        Some(Money::new(amount))
    }

    #[test]
    fn test_deal_wins_regardless_of_other_tiers() {
        let combos = [
            (None, None),
            (money(dec!(100)), None),
            (None, money(dec!(80))),
            (money(dec!(100)), money(dec!(80))),
            (money(dec!(10)), money(dec!(5))),
        ];
        for (original, discounted) in combos {
            let mut p = product(
                1,
                ProductPricing {
                    original,
                    discounted,
                    deal: money(dec!(60)),
                },
            );
            p.is_deal = true;

            let resolved = resolve(&p).expect("deal price resolves");
            assert_eq!(resolved.tier, PriceTier::Deal);
            assert_eq!(resolved.unit_price, Money::new(dec!(60)));
        }
    }

    #[test]
    fn test_deal_price_ignored_without_deal_flag() {
        let p = product(
            1,
            ProductPricing {
                original: money(dec!(100)),
                discounted: money(dec!(80)),
                deal: money(dec!(60)),
            },
        );
        let resolved = resolve(&p).expect("discounted resolves");
        assert_eq!(resolved.tier, PriceTier::Discounted);
        assert_eq!(resolved.unit_price, Money::new(dec!(80)));
    }

    #[test]
    fn test_deal_flag_without_deal_price_falls_through() {
        let mut p = product(
            1,
            ProductPricing {
                original: money(dec!(100)),
                discounted: None,
                deal: None,
            },
        );
        p.is_deal = true;
        assert_eq!(resolve(&p).map(|r| r.tier), Ok(PriceTier::Original));
    }

    #[test]
    fn test_original_only() {
        let p = product(
            1,
            ProductPricing {
                original: money(dec!(30)),
                discounted: None,
                deal: None,
            },
        );
        assert_eq!(
            resolve(&p),
            Ok(ResolvedPrice {
                unit_price: Money::new(dec!(30)),
                tier: PriceTier::Original,
            })
        );
    }

    #[test]
    fn test_higher_deal_price_still_applies() {
        let mut p = product(
            1,
            ProductPricing {
                original: money(dec!(100)),
                discounted: money(dec!(50)),
                deal: money(dec!(75)),
            },
        );
        p.is_deal = true;
        assert_eq!(resolve(&p).map(|r| r.unit_price), Ok(Money::new(dec!(75))));
    }

    #[test]
    fn test_no_price_is_an_error() {
        let p = product(7, ProductPricing::default());
        assert_eq!(resolve(&p), Err(PricingError::NoPrice(ProductId::new(7))));
    }

    #[test]
    fn test_negative_price_is_an_error() {
        let p = product(
            8,
            ProductPricing {
                original: money(dec!(-1)),
                discounted: None,
                deal: None,
            },
        );
        assert!(matches!(
            resolve(&p),
            Err(PricingError::NegativePrice {
                tier: PriceTier::Original,
                ..
            })
        ));
    }

    #[test]
    fn test_zero_price_is_allowed() {
        let p = product(
            9,
            ProductPricing {
                original: money(dec!(20)),
                discounted: money(dec!(0)),
                deal: None,
            },
        );
        assert_eq!(resolve(&p).map(|r| r.unit_price), Ok(Money::ZERO));
    }
}
