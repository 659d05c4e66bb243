//! Persistence boundary.
//!
//! Handlers talk to storage only through the [`Store`] trait so the same
//! routes run against PostgreSQL in production and against the in-process
//! [`MemoryStore`] in tests and local development.
//!
//! # Database schema: `shop`
//!
//! - `product` - Catalog
//! - `account` - Shoppers (soft-deleted via `deleted_at`)
//! - `cart_item` - One row per (account, product)
//! - `favorite` - One row per (account, product)
//! - `purchase_order` / `order_line` - Orders and their frozen lines
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p bazaar-cli -- migrate
//! ```

pub mod memory;
pub mod orders;
pub mod postgres;
pub mod products;
pub mod retry;
pub mod users;

use async_trait::async_trait;
use thiserror::Error;

use bazaar_core::{
    CartError, Email, OrderId, OrderStatus, ProductFilter, ProductId, TransitionError, UserId,
};

use crate::models::{
    CartItem, NewProduct, Order, Product, ProductError, ProductUpdate, ProfileChanges, User,
};

pub use memory::MemoryStore;
pub use postgres::{PgStore, create_pool};
pub use retry::RetryPolicy;

/// Which timeout fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    /// No pooled connection became available in time; nothing reached the server.
    Acquire,
    /// The server cancelled a running statement.
    Statement,
}

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(sqlx::Error),

    /// The store did not answer in time.
    #[error("storage timed out ({0:?})")]
    Timeout(TimeoutKind),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A cart or favorite referenced a product that does not exist.
    #[error("product {0} does not exist")]
    UnknownProduct(ProductId),

    /// Checkout was attempted with nothing in the cart.
    #[error("cart is empty")]
    EmptyCart,

    /// A stored product failed validation after an update was merged in.
    #[error(transparent)]
    InvalidProduct(#[from] ProductError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl RepositoryError {
    /// Failures worth retrying for an idempotent read.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout(TimeoutKind::Acquire)
                | Self::Database(sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut)
        )
    }

    /// Failures where the request never reached the server, so even a
    /// non-idempotent write can be retried.
    #[must_use]
    pub const fn never_reached_server(&self) -> bool {
        matches!(
            self,
            Self::Timeout(TimeoutKind::Acquire) | Self::Database(sqlx::Error::PoolTimedOut)
        )
    }
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        /// SQLSTATE for `query_canceled`, raised when `statement_timeout` fires.
        const QUERY_CANCELED: &str = "57014";

        match err {
            sqlx::Error::PoolTimedOut => Self::Timeout(TimeoutKind::Acquire),
            sqlx::Error::Database(ref db_err)
                if db_err.code().as_deref() == Some(QUERY_CANCELED) =>
            {
                Self::Timeout(TimeoutKind::Statement)
            }
            other => Self::Database(other),
        }
    }
}

/// Catalog persistence.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Insert every product or none.
    async fn insert_products(&self, products: &[NewProduct])
    -> Result<Vec<Product>, RepositoryError>;

    /// Products matching the filter, newest first.
    async fn find_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Returns `None` if the product does not exist.
    async fn update_product(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Option<Product>, RepositoryError>;

    /// Delete a product and every cart line and favorite pointing at it.
    /// Returns `false` if it did not exist.
    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError>;
}

/// Accounts, carts and favorites.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Returns `RepositoryError::Conflict` if an active account has this email.
    async fn create_user(
        &self,
        name: &str,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError>;

    /// Active account and its password hash.
    async fn get_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Active account by id.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn get_password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError>;

    /// Returns `None` if the account is missing or deleted.
    async fn update_profile(
        &self,
        id: UserId,
        changes: &ProfileChanges,
    ) -> Result<Option<User>, RepositoryError>;

    /// Soft-delete the account and empty its cart and favorites.
    /// Returns `false` if it was already gone.
    async fn deactivate_user(&self, id: UserId) -> Result<bool, RepositoryError>;

    async fn cart(&self, user: UserId) -> Result<Vec<CartItem>, RepositoryError>;

    /// Atomically add `quantity` to the line for `product`, creating it if
    /// needed. Returns the line's new quantity.
    async fn add_to_cart(
        &self,
        user: UserId,
        product: ProductId,
        quantity: u32,
    ) -> Result<u32, RepositoryError>;

    /// Atomically take `quantity` off the line for `product`, deleting it at
    /// zero. Returns the remaining quantity, `None` if the line is gone or
    /// never existed.
    async fn remove_from_cart(
        &self,
        user: UserId,
        product: ProductId,
        quantity: u32,
    ) -> Result<Option<u32>, RepositoryError>;

    async fn favorites(&self, user: UserId) -> Result<Vec<Product>, RepositoryError>;

    /// Returns `true` if the product was newly added.
    async fn add_favorite(&self, user: UserId, product: ProductId)
    -> Result<bool, RepositoryError>;

    /// Returns `true` if the product was a favorite.
    async fn remove_favorite(
        &self,
        user: UserId,
        product: ProductId,
    ) -> Result<bool, RepositoryError>;
}

/// Orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Turn the user's cart into an order and empty the cart, atomically.
    ///
    /// Returns `RepositoryError::EmptyCart` without writing anything when the
    /// cart has no lines.
    async fn place_order(&self, user: UserId, address: &str) -> Result<Order, RepositoryError>;

    /// The user's orders, newest first.
    async fn orders_for_user(&self, user: UserId) -> Result<Vec<Order>, RepositoryError>;

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Move an order to `next`, enforcing the status state machine.
    ///
    /// When `owner` is set, an order belonging to someone else is reported as
    /// `RepositoryError::NotFound`.
    async fn set_order_status(
        &self,
        id: OrderId,
        owner: Option<UserId>,
        next: OrderStatus,
    ) -> Result<Order, RepositoryError>;
}

/// Everything the API needs from storage.
#[async_trait]
pub trait Store: ProductStore + UserStore + OrderStore {
    /// Cheap round trip used by the readiness probe.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Convert a bounded quantity to the database integer type.
pub(crate) fn quantity_to_db(quantity: u32) -> i32 {
    i32::try_from(quantity).unwrap_or(i32::MAX)
}

/// Convert a database integer back to a quantity, rejecting negatives.
pub(crate) fn quantity_from_db(value: i32, column: &str) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative {column}: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_maps_to_acquire_timeout() {
        let err = RepositoryError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, RepositoryError::Timeout(TimeoutKind::Acquire)));
        assert!(err.is_transient());
        assert!(err.never_reached_server());
    }

    #[test]
    fn test_io_error_is_transient_for_reads_only() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = RepositoryError::from(sqlx::Error::Io(io));
        assert!(err.is_transient());
        assert!(!err.never_reached_server());
    }

    #[test]
    fn test_domain_errors_are_not_transient() {
        for err in [
            RepositoryError::NotFound,
            RepositoryError::EmptyCart,
            RepositoryError::UnknownProduct(ProductId::new_v4()),
            RepositoryError::Timeout(TimeoutKind::Statement),
        ] {
            assert!(!err.is_transient(), "{err} should not be retried");
        }
    }

    #[test]
    fn test_quantity_conversions() {
        assert_eq!(quantity_to_db(3), 3);
        assert_eq!(quantity_to_db(u32::MAX), i32::MAX);
        assert_eq!(quantity_from_db(4, "quantity").unwrap_or_default(), 4);
        assert!(matches!(
            quantity_from_db(-1, "quantity"),
            Err(RepositoryError::DataCorruption(_))
        ));
    }
}
