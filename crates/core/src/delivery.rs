//! Delivery fee calculation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Money;

/// Default flat delivery fee when no setting is stored.
pub const DEFAULT_FLAT_FEE_CENTS: i64 = 500;

/// Default free-delivery threshold when no setting is stored.
pub const DEFAULT_FREE_THRESHOLD_CENTS: i64 = 5000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryPolicyError {
    #[error("delivery fee cannot be negative (got {0})")]
    NegativeFee(Money),

    #[error("free delivery threshold cannot be negative (got {0})")]
    NegativeThreshold(Money),
}

/// Store-wide delivery pricing.
///
/// Read-only to the order pipeline; the admin collaborator owns updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryPolicy {
    flat_fee: Money,
    /// `None` means delivery is always charged.
    free_threshold: Option<Money>,
}

impl DeliveryPolicy {
    /// Create a policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the fee or threshold is negative.
    pub fn new(flat_fee: Money, free_threshold: Option<Money>) -> Result<Self, DeliveryPolicyError> {
        if flat_fee.is_negative() {
            return Err(DeliveryPolicyError::NegativeFee(flat_fee));
        }
        if let Some(threshold) = free_threshold.filter(|t| t.is_negative()) {
            return Err(DeliveryPolicyError::NegativeThreshold(threshold));
        }
        Ok(Self {
            flat_fee,
            free_threshold,
        })
    }

    /// Build a policy from the stored settings pair.
    ///
    /// A stored threshold of zero disables free delivery, matching the
    /// "free delivery above (0 = always charged)" admin setting.
    ///
    /// # Errors
    ///
    /// Returns an error if either value is negative.
    pub fn from_settings(flat_fee: Money, threshold: Money) -> Result<Self, DeliveryPolicyError> {
        let threshold = (!threshold.is_zero()).then_some(threshold);
        Self::new(flat_fee, threshold)
    }

    /// Delivery fee for an order with the given subtotal.
    ///
    /// Free when a threshold is configured and `subtotal >= threshold`.
    #[must_use]
    pub fn fee(&self, subtotal: Money) -> Money {
        match self.free_threshold {
            Some(threshold) if subtotal >= threshold => Money::ZERO,
            _ => self.flat_fee,
        }
    }

    #[must_use]
    pub const fn flat_fee(&self) -> Money {
        self.flat_fee
    }

    #[must_use]
    pub const fn free_threshold(&self) -> Option<Money> {
        self.free_threshold
    }

    /// The threshold as stored in settings, zero when disabled.
    #[must_use]
    pub fn stored_threshold(&self) -> Money {
        self.free_threshold.unwrap_or(Money::ZERO)
    }
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            flat_fee: Money::from_cents(DEFAULT_FLAT_FEE_CENTS),
            free_threshold: Some(Money::from_cents(DEFAULT_FREE_THRESHOLD_CENTS)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn policy(fee: rust_decimal::Decimal, threshold: rust_decimal::Decimal) -> DeliveryPolicy {
        DeliveryPolicy::new(Money::new(fee), Some(Money::new(threshold))).unwrap()
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let p = policy(dec!(5), dec!(200));
        assert_eq!(p.fee(Money::new(dec!(199.99))), Money::new(dec!(5)));
        assert_eq!(p.fee(Money::new(dec!(200))), Money::ZERO);
        assert_eq!(p.fee(Money::new(dec!(200.01))), Money::ZERO);
    }

    #[test]
    fn test_fee_is_non_increasing_step() {
        let p = policy(dec!(7.50), dec!(50));
        let mut previous = p.fee(Money::ZERO);
        for cents in (0..10_000).step_by(25) {
            let subtotal = Money::from_cents(cents);
            let fee = p.fee(subtotal);
            assert!(fee <= previous, "fee rose at {subtotal}");
            assert_eq!(fee.is_zero(), subtotal >= Money::new(dec!(50)));
            previous = fee;
        }
    }

    #[test]
    fn test_without_threshold_always_charged() {
        let p = DeliveryPolicy::new(Money::new(dec!(5)), None).unwrap();
        assert_eq!(p.fee(Money::new(dec!(1_000_000))), Money::new(dec!(5)));
    }

    #[test]
    fn test_zero_setting_disables_threshold() {
        let p = DeliveryPolicy::from_settings(Money::new(dec!(5)), Money::ZERO).unwrap();
        assert_eq!(p.free_threshold(), None);
        assert_eq!(p.stored_threshold(), Money::ZERO);
        assert_eq!(p.fee(Money::new(dec!(500))), Money::new(dec!(5)));
    }

    #[test]
    fn test_free_delivery_when_fee_is_zero() {
        let p = policy(dec!(0), dec!(100));
        assert_eq!(p.fee(Money::new(dec!(1))), Money::ZERO);
    }

    #[test]
    fn test_rejects_negative_values() {
        assert_eq!(
            DeliveryPolicy::new(Money::new(dec!(-1)), None),
            Err(DeliveryPolicyError::NegativeFee(Money::new(dec!(-1))))
        );
        assert!(matches!(
            DeliveryPolicy::from_settings(Money::new(dec!(5)), Money::new(dec!(-10))),
            Err(DeliveryPolicyError::NegativeThreshold(_))
        ));
    }

    #[test]
    fn test_default_matches_store_defaults() {
        let p = DeliveryPolicy::default();
        assert_eq!(p.flat_fee(), Money::new(dec!(5.00)));
        assert_eq!(p.free_threshold(), Some(Money::new(dec!(50.00))));
    }
}
