//! Favorite route handlers.

use axum::{Json, extract::State};
use tracing::instrument;

use super::ProductRef;
use crate::error::Result;
use crate::extract::ApiJson;
use crate::middleware::RequireUser;
use crate::models::Product;
use crate::state::AppState;

/// Favorite products.
///
/// GET /api/user/favorite
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.store().favorites(user.id).await?))
}

/// Add a favorite. Adding one twice keeps a single entry.
///
/// POST /api/user/favorite
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiJson(body): ApiJson<ProductRef>,
) -> Result<Json<Vec<Product>>> {
    let product = body.product_id()?;
    let added = state.store().add_favorite(user.id, product).await?;
    tracing::debug!(product_id = %product, added, "Favorite added");
    Ok(Json(state.store().favorites(user.id).await?))
}

/// Remove a favorite. Removing a non-member is a no-op.
///
/// PATCH /api/user/favorite
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiJson(body): ApiJson<ProductRef>,
) -> Result<Json<Vec<Product>>> {
    let product = body.product_id()?;
    let removed = state.store().remove_favorite(user.id, product).await?;
    tracing::debug!(product_id = %product, removed, "Favorite removed");
    Ok(Json(state.store().favorites(user.id).await?))
}
