//! Order lifecycle.
//!
//! ```text
//! PaymentDone -> Processing -> Shipped -> Delivered
//!      \             |            |
//!       +------------+------------+--> Cancelled
//! ```
//!
//! Forward moves may skip steps. `Delivered` and `Cancelled` are terminal.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("order is already {0}")]
    Terminal(OrderStatus),
    #[error("order is already {0}")]
    Unchanged(OrderStatus),
    #[error("order cannot move back from {from} to {to}")]
    Backward { from: OrderStatus, to: OrderStatus },
}

/// Status of a placed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.order_status", rename_all = "snake_case")
)]
pub enum OrderStatus {
    #[default]
    #[serde(rename = "Payment Done")]
    PaymentDone,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [Self; 5] = [
        Self::PaymentDone,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Position along the fulfilment path. `Cancelled` sits outside it.
    const fn step(self) -> Option<u8> {
        match self {
            Self::PaymentDone => Some(0),
            Self::Processing => Some(1),
            Self::Shipped => Some(2),
            Self::Delivered => Some(3),
            Self::Cancelled => None,
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Validate a move from `self` to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] when `self` is terminal, `next == self`,
    /// or `next` lies behind `self` on the fulfilment path.
    pub fn transition(self, next: Self) -> Result<Self, TransitionError> {
        if self.is_terminal() {
            return Err(TransitionError::Terminal(self));
        }
        if self == next {
            return Err(TransitionError::Unchanged(self));
        }
        match (self.step(), next.step()) {
            (Some(from), Some(to)) if to < from => Err(TransitionError::Backward {
                from: self,
                to: next,
            }),
            _ => Ok(next),
        }
    }

    #[must_use]
    pub fn can_transition(self, next: Self) -> bool {
        self.transition(next).is_ok()
    }

    /// Human-readable label, matching the JSON representation.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::PaymentDone => "Payment Done",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    /// Accepts the label (`Payment Done`) or snake case (`payment_done`), any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "paymentdone" => Ok(Self::PaymentDone),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_payment_done() {
        assert_eq!(OrderStatus::default(), OrderStatus::PaymentDone);
    }

    #[test]
    fn test_forward_transitions() {
        use OrderStatus::*;
        assert_eq!(PaymentDone.transition(Processing), Ok(Processing));
        assert_eq!(Processing.transition(Shipped), Ok(Shipped));
        assert_eq!(Shipped.transition(Delivered), Ok(Delivered));
        assert_eq!(PaymentDone.transition(Shipped), Ok(Shipped));
    }

    #[test]
    fn test_cancel_from_any_open_state() {
        use OrderStatus::*;
        for from in [PaymentDone, Processing, Shipped] {
            assert_eq!(from.transition(Cancelled), Ok(Cancelled));
        }
    }

    #[test]
    fn test_no_backward_moves() {
        use OrderStatus::*;
        assert_eq!(
            Shipped.transition(Processing),
            Err(TransitionError::Backward {
                from: Shipped,
                to: Processing
            })
        );
        assert_eq!(
            Delivered.transition(Processing),
            Err(TransitionError::Terminal(Delivered))
        );
    }

    #[test]
    fn test_terminal_states_are_final() {
        for next in OrderStatus::ALL {
            assert!(!OrderStatus::Delivered.can_transition(next));
            assert!(!OrderStatus::Cancelled.can_transition(next));
        }
    }

    #[test]
    fn test_same_state_rejected() {
        assert_eq!(
            OrderStatus::Processing.transition(OrderStatus::Processing),
            Err(TransitionError::Unchanged(OrderStatus::Processing))
        );
    }

    #[test]
    fn test_serde_labels() {
        let json = serde_json::to_string(&OrderStatus::PaymentDone).unwrap();
        assert_eq!(json, "\"Payment Done\"");
        let parsed: OrderStatus = serde_json::from_str("\"Shipped\"").unwrap();
        assert_eq!(parsed, OrderStatus::Shipped);
    }

    #[test]
    fn test_from_str_variants() {
        assert_eq!(
            "payment_done".parse::<OrderStatus>().unwrap(),
            OrderStatus::PaymentDone
        );
        assert_eq!(
            "Payment Done".parse::<OrderStatus>().unwrap(),
            OrderStatus::PaymentDone
        );
        assert_eq!(
            "CANCELED".parse::<OrderStatus>().unwrap(),
            OrderStatus::Cancelled
        );
        assert!("lost".parse::<OrderStatus>().is_err());
    }
}
