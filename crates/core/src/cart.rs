//! Cart and favorites rules.
//!
//! These are the in-memory semantics every store must reproduce:
//!
//! - Adding a product already in the cart increments its quantity.
//! - Removing decrements by the requested quantity and drops the line when it
//!   reaches zero. Removing a product that is not in the cart changes nothing.
//! - Favorites behave as an ordered set: adding twice keeps one entry.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ProductId;

/// Upper bound for the quantity of a single cart line.
pub const MAX_LINE_QUANTITY: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    #[error("quantity for a single product cannot exceed {max}")]
    QuantityLimit { max: u32 },
}

/// Validate a requested quantity, defaulting to 1 when absent.
///
/// # Errors
///
/// Returns [`CartError::ZeroQuantity`] for 0 and
/// [`CartError::QuantityLimit`] above [`MAX_LINE_QUANTITY`].
pub const fn requested_quantity(quantity: Option<u32>) -> Result<u32, CartError> {
    match quantity {
        None => Ok(1),
        Some(0) => Err(CartError::ZeroQuantity),
        Some(q) if q > MAX_LINE_QUANTITY => Err(CartError::QuantityLimit {
            max: MAX_LINE_QUANTITY,
        }),
        Some(q) => Ok(q),
    }
}

/// Validate a quantity to remove, defaulting to 1 when absent.
///
/// Anything above [`MAX_LINE_QUANTITY`] is clamped to it, which is enough to
/// drop any line.
///
/// # Errors
///
/// Returns [`CartError::ZeroQuantity`] for 0.
pub const fn removal_quantity(quantity: Option<u32>) -> Result<u32, CartError> {
    match quantity {
        None => Ok(1),
        Some(0) => Err(CartError::ZeroQuantity),
        Some(q) if q > MAX_LINE_QUANTITY => Ok(MAX_LINE_QUANTITY),
        Some(q) => Ok(q),
    }
}

/// One product in a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A shopper's cart, one line per product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> Option<u32> {
        self.lines
            .iter()
            .find(|line| line.product_id == product_id)
            .map(|line| line.quantity)
    }

    /// Add `quantity` of a product, merging with an existing line.
    ///
    /// # Errors
    ///
    /// Returns a [`CartError`] if `quantity` is zero or the merged line would
    /// exceed [`MAX_LINE_QUANTITY`]. The cart is unchanged on error.
    pub fn add(&mut self, product_id: ProductId, quantity: u32) -> Result<u32, CartError> {
        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }
        let limit = CartError::QuantityLimit {
            max: MAX_LINE_QUANTITY,
        };
        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            let merged = line
                .quantity
                .checked_add(quantity)
                .filter(|q| *q <= MAX_LINE_QUANTITY)
                .ok_or(limit)?;
            line.quantity = merged;
            return Ok(merged);
        }
        if quantity > MAX_LINE_QUANTITY {
            return Err(limit);
        }
        self.lines.push(CartLine {
            product_id,
            quantity,
        });
        Ok(quantity)
    }

    /// Remove `quantity` of a product. Returns the quantity left on the line,
    /// or `None` if the line is gone or never existed.
    pub fn remove(&mut self, product_id: ProductId, quantity: u32) -> Option<u32> {
        let index = self.lines.iter().position(|l| l.product_id == product_id)?;
        let line = self.lines.get_mut(index)?;
        if quantity >= line.quantity {
            self.lines.remove(index);
            return None;
        }
        line.quantity -= quantity;
        Some(line.quantity)
    }

    /// Drop every line for a product, e.g. when it leaves the catalog.
    pub fn purge(&mut self, product_id: ProductId) {
        self.lines.retain(|line| line.product_id != product_id);
    }

    /// Empty the cart, returning what it held.
    pub fn take(&mut self) -> Vec<CartLine> {
        std::mem::take(&mut self.lines)
    }
}

/// Ordered set of favorite products.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Favorites {
    items: Vec<ProductId>,
}

impl Favorites {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    #[must_use]
    pub fn items(&self) -> &[ProductId] {
        &self.items
    }

    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.items.contains(&product_id)
    }

    /// Returns `true` if the product was not already a favorite.
    pub fn add(&mut self, product_id: ProductId) -> bool {
        if self.contains(product_id) {
            return false;
        }
        self.items.push(product_id);
        true
    }

    /// Returns `true` if the product was a favorite.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|id| *id != product_id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// A cart line with the unit price captured at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl PricedLine {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Sum of unit price times quantity over all lines.
#[must_use]
pub fn order_total(lines: &[PricedLine]) -> Decimal {
    lines.iter().map(PricedLine::line_total).sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_requested_quantity() {
        assert_eq!(requested_quantity(None), Ok(1));
        assert_eq!(requested_quantity(Some(3)), Ok(3));
        assert_eq!(requested_quantity(Some(0)), Err(CartError::ZeroQuantity));
        assert!(matches!(
            requested_quantity(Some(MAX_LINE_QUANTITY + 1)),
            Err(CartError::QuantityLimit { .. })
        ));
    }

    #[test]
    fn test_removal_quantity_clamps() {
        assert_eq!(removal_quantity(None), Ok(1));
        assert_eq!(removal_quantity(Some(0)), Err(CartError::ZeroQuantity));
        assert_eq!(
            removal_quantity(Some(MAX_LINE_QUANTITY * 2)),
            Ok(MAX_LINE_QUANTITY)
        );

        let mut cart = Cart::new();
        let a = ProductId::new_v4();
        cart.add(a, MAX_LINE_QUANTITY).unwrap();
        assert_eq!(cart.remove(a, removal_quantity(Some(u32::MAX)).unwrap()), None);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_appends_then_increments() {
        let mut cart = Cart::new();
        let a = ProductId::new_v4();
        assert_eq!(cart.add(a, 1), Ok(1));
        assert_eq!(cart.add(a, 2), Ok(3));
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.quantity_of(a), Some(3));
    }

    #[test]
    fn test_add_respects_limit_without_mutating() {
        let mut cart = Cart::new();
        let a = ProductId::new_v4();
        cart.add(a, MAX_LINE_QUANTITY).unwrap();
        assert!(cart.add(a, 1).is_err());
        assert_eq!(cart.quantity_of(a), Some(MAX_LINE_QUANTITY));
    }

    #[test]
    fn test_remove_decrements_then_deletes() {
        let mut cart = Cart::new();
        let a = ProductId::new_v4();
        cart.add(a, 3).unwrap();
        assert_eq!(cart.remove(a, 1), Some(2));
        assert_eq!(cart.remove(a, 5), None);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut cart = Cart::new();
        let a = ProductId::new_v4();
        cart.add(a, 1).unwrap();
        assert_eq!(cart.remove(ProductId::new_v4(), 1), None);
        assert_eq!(cart.quantity_of(a), Some(1));
    }

    #[test]
    fn test_take_clears() {
        let mut cart = Cart::new();
        cart.add(ProductId::new_v4(), 2).unwrap();
        let lines = cart.take();
        assert_eq!(lines.len(), 1);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_favorites_idempotent() {
        let mut favorites = Favorites::new();
        let a = ProductId::new_v4();
        assert!(favorites.add(a));
        assert!(!favorites.add(a));
        assert_eq!(favorites.items(), &[a]);
        assert!(favorites.remove(a));
        assert!(!favorites.remove(a));
    }

    #[test]
    fn test_order_total() {
        let lines = [
            PricedLine {
                product_id: ProductId::new_v4(),
                quantity: 2,
                unit_price: Decimal::TEN,
            },
            PricedLine {
                product_id: ProductId::new_v4(),
                quantity: 1,
                unit_price: Decimal::new(5, 0),
            },
        ];
        assert_eq!(order_total(&lines), Decimal::new(25, 0));
        assert_eq!(order_total(&[]), Decimal::ZERO);
    }
}
