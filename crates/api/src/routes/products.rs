//! Catalog route handlers.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

use bazaar_core::{ProductFilter, ProductQuery};

use super::parse_product_id;
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::models::{NewProduct, Product, ProductUpdate};
use crate::state::AppState;

/// Response for a bulk insert.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedProducts {
    pub message: &'static str,
    pub created_products: Vec<Product>,
}

/// Response for a delete.
#[derive(Debug, Serialize)]
pub struct Deleted {
    pub message: &'static str,
}

/// Bulk-insert products.
///
/// POST /api/products/add
///
/// The body must be a JSON array. Every element is validated before anything
/// is written, so one bad product rejects the whole batch.
#[instrument(skip(state, body))]
pub async fn add(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> Result<(StatusCode, Json<CreatedProducts>)> {
    let Value::Array(items) = body else {
        return Err(AppError::BadRequest(
            "Invalid request. Expected an array of products.".to_owned(),
        ));
    };

    let products = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<NewProduct>(item)
                .map_err(|e| AppError::BadRequest(format!("product {index}: {e}")))?
                .normalize()
                .map_err(|e| AppError::BadRequest(format!("product {index}: {e}")))
        })
        .collect::<Result<Vec<_>>>()?;

    let created = state.store().insert_products(&products).await?;
    tracing::info!(count = created.len(), "Products added");

    Ok((
        StatusCode::CREATED,
        Json(CreatedProducts {
            message: "Products added successfully",
            created_products: created,
        }),
    ))
}

/// List products matching the query filters.
///
/// GET /api/products
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> Result<Json<Vec<Product>>> {
    let filter = ProductFilter::from_query(&query)?;
    let products = state.store().find_products(&filter).await?;
    Ok(Json(products))
}

/// Product detail.
///
/// GET /api/products/{id}
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<Product>> {
    let id = parse_product_id(&id)?;
    state
        .store()
        .get_product(id)
        .await?
        .map(Json)
        .ok_or_else(product_not_found)
}

/// Partial update. Absent fields keep their values.
///
/// PUT /api/products/{id}
#[instrument(skip(state, update))]
pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(update): ApiJson<ProductUpdate>,
) -> Result<Json<Product>> {
    let id = parse_product_id(&id)?;
    state
        .store()
        .update_product(id, &update)
        .await?
        .map(Json)
        .ok_or_else(product_not_found)
}

/// Delete a product. Cart lines and favorites referencing it go with it.
///
/// DELETE /api/products/{id}
#[instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<Deleted>> {
    let id = parse_product_id(&id)?;
    if !state.store().delete_product(id).await? {
        return Err(product_not_found());
    }
    tracing::info!(product_id = %id, "Product deleted");
    Ok(Json(Deleted {
        message: "Product deleted successfully",
    }))
}

fn product_not_found() -> AppError {
    AppError::NotFound("Product not found".to_owned())
}
