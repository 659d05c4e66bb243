//! Domain models for the API.
//!
//! These are the validated shapes handlers and stores exchange. Database row
//! types live next to the queries in [`crate::db`].

pub mod order;
pub mod product;
pub mod user;

pub use order::{Order, OrderLine};
pub use product::{CartItem, NewProduct, Product, ProductError, ProductUpdate};
pub use user::{ProfileChanges, User};
