//! Bazaar Core - domain types and rules.
//!
//! This crate provides the types shared by every Bazaar component:
//! - `api` - The HTTP backend (catalog, cart, favorites, orders, accounts)
//! - `cli` - Command-line tools for migrations, seeding and order administration
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP. Everything here can be unit tested without a runtime.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, emails, prices and order statuses
//! - [`filter`] - Translates catalog query parameters into typed predicate clauses
//! - [`cart`] - Cart and favorites rules, order totals

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod filter;
pub mod types;

pub use cart::{
    Cart, CartError, CartLine, Favorites, MAX_LINE_QUANTITY, PricedLine, order_total,
    removal_quantity, requested_quantity,
};
pub use filter::{Clause, FilterError, ProductFields, ProductFilter, ProductQuery};
pub use types::*;
