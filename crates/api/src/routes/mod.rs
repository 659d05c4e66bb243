//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! # Catalog
//! POST   /api/products/add          - Bulk-insert products (array body)
//! GET    /api/products              - List products (categories, minPrice, maxPrice, sizes, search)
//! GET    /api/products/{id}         - Product detail
//! PUT    /api/products/{id}         - Partial product update
//! DELETE /api/products/{id}         - Delete a product
//!
//! # Accounts
//! POST   /api/user/signup           - Create an account, returns a token
//! POST   /api/user/signin           - Sign in, returns a token
//! PUT    /api/user/profile          - Update name, image or password (bearer)
//! DELETE /api/user/profile          - Deactivate the account (bearer)
//!
//! # Cart (bearer)
//! GET    /api/user/cart             - Cart contents
//! POST   /api/user/cart             - Add a product
//! PATCH  /api/user/cart             - Remove or decrement a product
//!
//! # Orders (bearer)
//! GET    /api/user/order            - Order history
//! POST   /api/user/order            - Place an order from the cart
//! POST   /api/user/order/{id}/cancel - Cancel an order
//!
//! # Favorites (bearer)
//! GET    /api/user/favorite         - Favorite products
//! POST   /api/user/favorite         - Add a favorite
//! PATCH  /api/user/favorite         - Remove a favorite
//! ```

pub mod cart;
pub mod favorites;
pub mod orders;
pub mod products;
pub mod users;

use axum::{
    Router,
    routing::{get, post, put},
};
use serde::Deserialize;

use bazaar_core::ProductId;

use crate::error::AppError;
use crate::state::AppState;

/// Create the catalog routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/add", post(products::add))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
}

/// Create the account routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(users::signup))
        .route("/signin", post(users::signin))
        .route(
            "/profile",
            put(users::update_profile).delete(users::delete_profile),
        )
        .route(
            "/cart",
            get(cart::show).post(cart::add).patch(cart::remove),
        )
        .route("/order", get(orders::index).post(orders::place))
        .route("/order/{id}/cancel", post(orders::cancel))
        .route(
            "/favorite",
            get(favorites::index)
                .post(favorites::add)
                .patch(favorites::remove),
        )
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/products", product_routes())
        .nest("/api/user", user_routes())
}

/// Body naming a product, shared by the cart and favorite endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRef {
    pub product_id: String,
    #[serde(default)]
    pub quantity: Option<u32>,
}

impl ProductRef {
    /// Parse the referenced product id.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for a malformed id.
    pub fn product_id(&self) -> Result<ProductId, AppError> {
        parse_product_id(&self.product_id)
    }
}

/// Parse a product id from a path segment or body field.
///
/// # Errors
///
/// Returns `AppError::BadRequest("Invalid product ID")` for a malformed id.
pub fn parse_product_id(raw: &str) -> Result<ProductId, AppError> {
    ProductId::parse(raw.trim()).map_err(|e| {
        tracing::debug!(error = %e, "Rejected product id");
        AppError::BadRequest("Invalid product ID".to_owned())
    })
}
