//! Catalog price representation using decimal arithmetic.
//!
//! A product carries three figures:
//! - `org`: the selling price. Filters, cart totals and orders use this one.
//! - `mrp`: the list price shown struck through.
//! - `off`: the advertised discount in percent.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when a [`Price`] breaks its invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    #[error("{field} must not be negative")]
    Negative { field: &'static str },
    #[error("discount must be between 0 and 100 percent")]
    DiscountOutOfRange,
}

/// Price block of a catalog product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Selling price.
    pub org: Decimal,
    /// List price before discount.
    #[serde(default)]
    pub mrp: Decimal,
    /// Discount percentage.
    #[serde(default)]
    pub off: Decimal,
}

impl Price {
    #[must_use]
    pub const fn new(org: Decimal, mrp: Decimal, off: Decimal) -> Self {
        Self { org, mrp, off }
    }

    /// A price with no list price or discount.
    #[must_use]
    pub const fn flat(org: Decimal) -> Self {
        Self {
            org,
            mrp: org,
            off: Decimal::ZERO,
        }
    }

    /// Check the amounts are non-negative and the discount is a percentage.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule.
    pub fn validate(&self) -> Result<(), PriceError> {
        if self.org < Decimal::ZERO {
            return Err(PriceError::Negative { field: "price.org" });
        }
        if self.mrp < Decimal::ZERO {
            return Err(PriceError::Negative { field: "price.mrp" });
        }
        if self.off < Decimal::ZERO || self.off > Decimal::ONE_HUNDRED {
            return Err(PriceError::DiscountOutOfRange);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_price() {
        let price = Price::flat(Decimal::new(1999, 2));
        assert_eq!(price.mrp, price.org);
        assert!(price.off.is_zero());
        assert!(price.validate().is_ok());
    }

    #[test]
    fn test_negative_amounts_rejected() {
        let price = Price::new(Decimal::NEGATIVE_ONE, Decimal::ONE, Decimal::ZERO);
        assert_eq!(
            price.validate(),
            Err(PriceError::Negative { field: "price.org" })
        );

        let price = Price::new(Decimal::ONE, Decimal::NEGATIVE_ONE, Decimal::ZERO);
        assert_eq!(
            price.validate(),
            Err(PriceError::Negative { field: "price.mrp" })
        );
    }

    #[test]
    fn test_discount_range() {
        let price = Price::new(Decimal::TEN, Decimal::TEN, Decimal::new(101, 0));
        assert_eq!(price.validate(), Err(PriceError::DiscountOutOfRange));
    }

    #[test]
    fn test_deserialize_numbers_and_defaults() {
        let price: Price = serde_json::from_str(r#"{"org": 450}"#).unwrap();
        assert_eq!(price.org, Decimal::new(450, 0));
        assert!(price.mrp.is_zero());
        assert!(price.off.is_zero());
    }
}
