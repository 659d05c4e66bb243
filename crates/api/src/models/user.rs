//! Shopper account types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bazaar_core::{Email, UserId};

/// A shopper account. The password hash never leaves the store layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub img: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Already-validated profile changes handed to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub img: Option<String>,
    pub password_hash: Option<String>,
}

impl ProfileChanges {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.img.is_none() && self.password_hash.is_none()
    }
}
