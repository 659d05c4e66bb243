//! Order route handlers.

use axum::{
    Json,
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use bazaar_core::{OrderId, OrderStatus};

use crate::db::RepositoryError;
use crate::error::{AppError, Result};
use crate::extract::ApiPath;
use crate::middleware::RequireUser;
use crate::models::Order;
use crate::state::AppState;

/// Longest shipping address accepted.
const MAX_ADDRESS_LENGTH: usize = 500;

/// Checkout form.
#[derive(Debug, Default, Deserialize)]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub address: Option<String>,
}

/// Order history, newest first.
///
/// GET /api/user/order
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.store().orders_for_user(user.id).await?))
}

/// Turn the cart into an order.
///
/// POST /api/user/order
///
/// The body is optional; without one the order has an empty address.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn place(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, Json<Order>)> {
    let body = body?;
    let body: PlaceOrderRequest = if body.iter().all(u8::is_ascii_whitespace) {
        PlaceOrderRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid order body: {e}")))?
    };
    let address = body.address.as_deref().map_or("", str::trim);
    if address.chars().count() > MAX_ADDRESS_LENGTH {
        return Err(AppError::BadRequest(format!(
            "address cannot exceed {MAX_ADDRESS_LENGTH} characters"
        )));
    }

    let order = state.store().place_order(user.id, address).await?;
    tracing::info!(
        order_id = %order.id,
        total = %order.total_amount,
        lines = order.products.len(),
        "Order placed"
    );
    Ok((StatusCode::CREATED, Json(order)))
}

/// Cancel one of the signed-in user's orders.
///
/// POST /api/user/order/{id}/cancel
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<Order>> {
    let id = OrderId::parse(id.trim())
        .map_err(|_| AppError::BadRequest("Invalid order ID".to_owned()))?;
    let order = state
        .store()
        .set_order_status(id, Some(user.id), OrderStatus::Cancelled)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("Order not found".to_owned()),
            other => other.into(),
        })?;
    tracing::info!(order_id = %order.id, "Order cancelled");
    Ok(Json(order))
}
