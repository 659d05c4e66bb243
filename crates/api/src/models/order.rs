//! Placed orders.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use bazaar_core::{OrderId, OrderStatus, PricedLine, ProductId, UserId};

/// One line of a placed order, frozen at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLine {
    #[serde(rename = "product")]
    pub product_id: ProductId,
    pub title: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl OrderLine {
    #[must_use]
    pub const fn priced(&self) -> PricedLine {
        PricedLine {
            product_id: self.product_id,
            quantity: self.quantity,
            unit_price: self.unit_price,
        }
    }
}

/// An order. Only `status` and `updated_at` change after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(rename = "user")]
    pub user_id: UserId,
    pub products: Vec<OrderLine>,
    pub total_amount: Decimal,
    pub address: String,
    pub status: OrderStatus,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}
