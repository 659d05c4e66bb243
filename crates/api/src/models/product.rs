//! Catalog product types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bazaar_core::{Price, PriceError, ProductFields, ProductId};

/// Why a product payload was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductError {
    #[error("title cannot be empty")]
    EmptyTitle,
    #[error("{0}")]
    Price(#[from] PriceError),
    #[error("stock cannot exceed {max}")]
    StockTooLarge { max: u32 },
}

/// Largest stock value the store can hold.
pub const MAX_STOCK: u32 = i32::MAX.unsigned_abs();

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub name: String,
    pub description: String,
    pub img: String,
    pub price: Price,
    pub sizes: Vec<String>,
    pub category: String,
    pub stock: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// The fields a catalog filter inspects.
    #[must_use]
    pub fn fields(&self) -> ProductFields<'_> {
        ProductFields {
            title: &self.title,
            description: &self.description,
            category: &self.category,
            price: self.price.org,
            sizes: &self.sizes,
        }
    }
}

/// Payload for one product in `POST /api/products/add`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewProduct {
    pub title: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "desc")]
    pub description: String,
    #[serde(default)]
    pub img: String,
    pub price: Price,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub stock: u32,
}

impl NewProduct {
    /// Trim text fields and check invariants.
    ///
    /// # Errors
    ///
    /// Returns a [`ProductError`] for an empty title, an invalid price or
    /// stock beyond [`MAX_STOCK`].
    pub fn normalize(mut self) -> Result<Self, ProductError> {
        self.title = self.title.trim().to_owned();
        self.category = self.category.trim().to_owned();
        self.sizes = clean_sizes(self.sizes);
        if self.title.is_empty() {
            return Err(ProductError::EmptyTitle);
        }
        self.price.validate()?;
        check_stock(self.stock)?;
        Ok(self)
    }

    /// Materialize into a product with a fresh id.
    #[must_use]
    pub fn into_product(self, now: DateTime<Utc>) -> Product {
        Product {
            id: ProductId::new_v4(),
            title: self.title,
            name: self.name,
            description: self.description,
            img: self.img,
            price: self.price,
            sizes: self.sizes,
            category: self.category,
            stock: self.stock,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for `PUT /api/products/{id}`. Absent fields are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProductUpdate {
    pub title: Option<String>,
    pub name: Option<String>,
    #[serde(alias = "desc")]
    pub description: Option<String>,
    pub img: Option<String>,
    pub price: Option<Price>,
    pub sizes: Option<Vec<String>>,
    pub category: Option<String>,
    pub stock: Option<u32>,
}

impl ProductUpdate {
    /// Apply the update to `product`. The id and creation time never change.
    ///
    /// # Errors
    ///
    /// Returns a [`ProductError`] if the merged product breaks an invariant;
    /// `product` is left untouched in that case.
    pub fn apply(self, product: &Product, now: DateTime<Utc>) -> Result<Product, ProductError> {
        let mut next = product.clone();
        if let Some(title) = self.title {
            next.title = title.trim().to_owned();
        }
        if let Some(name) = self.name {
            next.name = name;
        }
        if let Some(description) = self.description {
            next.description = description;
        }
        if let Some(img) = self.img {
            next.img = img;
        }
        if let Some(price) = self.price {
            next.price = price;
        }
        if let Some(sizes) = self.sizes {
            next.sizes = clean_sizes(sizes);
        }
        if let Some(category) = self.category {
            next.category = category.trim().to_owned();
        }
        if let Some(stock) = self.stock {
            next.stock = stock;
        }

        if next.title.is_empty() {
            return Err(ProductError::EmptyTitle);
        }
        next.price.validate()?;
        check_stock(next.stock)?;
        next.updated_at = now;
        Ok(next)
    }
}

/// A cart line joined with its product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartItem {
    pub product: Product,
    pub quantity: u32,
}

fn clean_sizes(sizes: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(sizes.len());
    for size in sizes {
        let size = size.trim();
        if !size.is_empty() && !cleaned.iter().any(|s| s == size) {
            cleaned.push(size.to_owned());
        }
    }
    cleaned
}

const fn check_stock(stock: u32) -> Result<(), ProductError> {
    if stock > MAX_STOCK {
        return Err(ProductError::StockTooLarge { max: MAX_STOCK });
    }
    Ok(())
}
