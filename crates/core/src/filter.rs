//! Catalog filter builder.
//!
//! Turns the flat query string of `GET /api/products` into a list of typed
//! [`Clause`]s. Clauses are combined with AND; the values inside a single
//! `CategoryIn` or `SizesAny` clause are combined with OR.
//!
//! The filter knows nothing about storage. The PostgreSQL store renders the
//! clauses to SQL and the in-process store calls [`ProductFilter::matches`].
//!
//! ```
//! use bazaar_core::{Clause, ProductFilter, ProductQuery};
//!
//! let query = ProductQuery {
//!     categories: Some("Women,Men".into()),
//!     max_price: Some("500".into()),
//!     ..ProductQuery::default()
//! };
//! let filter = ProductFilter::from_query(&query).unwrap();
//! assert_eq!(filter.clauses().len(), 2);
//! assert!(matches!(filter.clauses()[0], Clause::CategoryIn(_)));
//! ```

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

/// Raw query parameters accepted by the product listing.
///
/// Every field is the untouched query-string value; parsing happens in
/// [`ProductFilter::from_query`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    /// Comma-separated category names.
    pub categories: Option<String>,
    /// Inclusive lower bound on the selling price.
    pub min_price: Option<String>,
    /// Inclusive upper bound on the selling price.
    pub max_price: Option<String>,
    /// Comma-separated size labels.
    pub sizes: Option<String>,
    /// Free text matched against title and description.
    pub search: Option<String>,
}

/// Why a query could not be turned into a filter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("{param} must be a number, got {value:?}")]
    InvalidPrice { param: &'static str, value: String },
    #[error("minPrice ({min}) must not exceed maxPrice ({max})")]
    InvertedRange { min: Decimal, max: Decimal },
}

/// One typed predicate over a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    /// Category equals one of the values.
    CategoryIn(Vec<String>),
    /// Selling price is at least the bound.
    PriceAtLeast(Decimal),
    /// Selling price is at most the bound.
    PriceAtMost(Decimal),
    /// Product sizes share at least one value with the list.
    SizesAny(Vec<String>),
    /// Title or description contains the text, ignoring case.
    TextContains(String),
}

/// Borrowed view of the product fields a filter can inspect.
#[derive(Debug, Clone, Copy)]
pub struct ProductFields<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub category: &'a str,
    pub price: Decimal,
    pub sizes: &'a [String],
}

impl Clause {
    #[must_use]
    pub fn matches(&self, product: &ProductFields<'_>) -> bool {
        match self {
            Self::CategoryIn(categories) => categories.iter().any(|c| c == product.category),
            Self::PriceAtLeast(min) => product.price >= *min,
            Self::PriceAtMost(max) => product.price <= *max,
            Self::SizesAny(sizes) => product.sizes.iter().any(|s| sizes.contains(s)),
            Self::TextContains(needle) => {
                let needle = needle.to_lowercase();
                product.title.to_lowercase().contains(&needle)
                    || product.description.to_lowercase().contains(&needle)
            }
        }
    }
}

/// A conjunction of [`Clause`]s. The empty filter matches every product.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    clauses: Vec<Clause>,
}

impl ProductFilter {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            clauses: Vec::new(),
        }
    }

    /// Restrict to the given categories. An empty list adds nothing.
    #[must_use]
    pub fn category_in<I, S>(self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = categories.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return self;
        }
        self.with(Clause::CategoryIn(values))
    }

    #[must_use]
    pub fn price_at_least(self, min: Decimal) -> Self {
        self.with(Clause::PriceAtLeast(min))
    }

    #[must_use]
    pub fn price_at_most(self, max: Decimal) -> Self {
        self.with(Clause::PriceAtMost(max))
    }

    /// Restrict to products offering any of the sizes. An empty list adds nothing.
    #[must_use]
    pub fn sizes_any<I, S>(self, sizes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = sizes.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return self;
        }
        self.with(Clause::SizesAny(values))
    }

    /// Restrict to products whose title or description contains `text`.
    /// Blank text adds nothing.
    #[must_use]
    pub fn text_contains(self, text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            return self;
        }
        self.with(Clause::TextContains(text.to_owned()))
    }

    fn with(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    /// Build a filter from raw query parameters.
    ///
    /// Empty parameters are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidPrice`] when a price bound is not a
    /// number and [`FilterError::InvertedRange`] when both bounds are given
    /// and `minPrice > maxPrice`.
    pub fn from_query(query: &ProductQuery) -> Result<Self, FilterError> {
        let min = parse_price("minPrice", query.min_price.as_deref())?;
        let max = parse_price("maxPrice", query.max_price.as_deref())?;
        if let (Some(min), Some(max)) = (min, max)
            && min > max
        {
            return Err(FilterError::InvertedRange { min, max });
        }

        let mut filter = Self::new();
        if let Some(categories) = query.categories.as_deref() {
            filter = filter.category_in(split_list(categories));
        }
        if let Some(min) = min {
            filter = filter.price_at_least(min);
        }
        if let Some(max) = max {
            filter = filter.price_at_most(max);
        }
        if let Some(sizes) = query.sizes.as_deref() {
            filter = filter.sizes_any(split_list(sizes));
        }
        if let Some(search) = query.search.as_deref() {
            filter = filter.text_contains(search);
        }
        Ok(filter)
    }

    #[must_use]
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Evaluate every clause against a product.
    #[must_use]
    pub fn matches(&self, product: &ProductFields<'_>) -> bool {
        self.clauses.iter().all(|clause| clause.matches(product))
    }
}

fn split_list(raw: &str) -> Vec<&str> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_price(param: &'static str, raw: Option<&str>) -> Result<Option<Decimal>, FilterError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    Decimal::from_str(raw)
        .map(Some)
        .map_err(|_| FilterError::InvalidPrice {
            param,
            value: raw.to_owned(),
        })
}
