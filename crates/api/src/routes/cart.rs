//! Cart route handlers.
//!
//! Both mutations answer with the full cart so clients never need a second
//! round trip.

use axum::{Json, extract::State};
use tracing::instrument;

use bazaar_core::{removal_quantity, requested_quantity};

use super::ProductRef;
use crate::error::Result;
use crate::extract::ApiJson;
use crate::middleware::RequireUser;
use crate::models::CartItem;
use crate::state::AppState;

/// Cart contents.
///
/// GET /api/user/cart
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Vec<CartItem>>> {
    Ok(Json(state.store().cart(user.id).await?))
}

/// Add a product, merging with an existing line.
///
/// POST /api/user/cart
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiJson(body): ApiJson<ProductRef>,
) -> Result<Json<Vec<CartItem>>> {
    let product = body.product_id()?;
    let quantity = requested_quantity(body.quantity)?;

    let total = state
        .store()
        .add_to_cart(user.id, product, quantity)
        .await?;
    tracing::debug!(product_id = %product, quantity = total, "Cart line added");

    Ok(Json(state.store().cart(user.id).await?))
}

/// Remove `quantity` (default 1) of a product. A line reaching zero is
/// dropped; a product not in the cart leaves it unchanged.
///
/// PATCH /api/user/cart
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiJson(body): ApiJson<ProductRef>,
) -> Result<Json<Vec<CartItem>>> {
    let product = body.product_id()?;
    let quantity = removal_quantity(body.quantity)?;

    let remaining = state
        .store()
        .remove_from_cart(user.id, product, quantity)
        .await?;
    tracing::debug!(product_id = %product, ?remaining, "Cart line decremented");

    Ok(Json(state.store().cart(user.id).await?))
}
