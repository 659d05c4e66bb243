//! Business logic services.
//!
//! - `auth` - Password accounts and bearer tokens

pub mod auth;
