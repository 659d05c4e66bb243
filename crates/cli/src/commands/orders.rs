//! Order administration.
//!
//! Shoppers can only cancel their own orders; every other status change
//! (processing, shipped, delivered) happens here.

use bazaar_api::db::{OrderStore, RepositoryError};
use bazaar_core::{OrderId, OrderStatus};

use super::{CommandError, store};

/// Print an order as pretty JSON.
pub async fn show(id: OrderId) -> Result<(), CommandError> {
    let order = store()
        .await?
        .get_order(id)
        .await?
        .ok_or(CommandError::OrderNotFound(id))?;

    let json = serde_json::to_string_pretty(&order)?;
    #[allow(clippy::print_stdout)]
    {
        println!("{json}");
    }
    Ok(())
}

/// Move an order to `status`. Backward and terminal moves are rejected.
pub async fn set_status(id: OrderId, status: OrderStatus) -> Result<(), CommandError> {
    let order = store()
        .await?
        .set_order_status(id, None, status)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => CommandError::OrderNotFound(id),
            other => other.into(),
        })?;

    tracing::info!(order_id = %order.id, status = %order.status, "Order status updated");
    Ok(())
}
