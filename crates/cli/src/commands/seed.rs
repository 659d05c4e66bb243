//! Catalog seeding.
//!
//! Reads a JSON array in the same shape `POST /api/products/add` accepts,
//! validates every entry, then inserts the batch in one statement.

use std::path::Path;

use bazaar_api::db::ProductStore;
use bazaar_api::models::NewProduct;

use super::{CommandError, store};

/// Seed products from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, any product fails
/// validation, or the insert fails. Nothing is written on a validation error.
pub async fn products(path: &Path, dry_run: bool) -> Result<(), CommandError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CommandError::Read {
            path: path.display().to_string(),
            source,
        })?;

    let products = parse_catalog(&content)?;
    tracing::info!(path = %path.display(), count = products.len(), "Catalog validated");

    if dry_run {
        tracing::info!("Dry run, nothing written");
        return Ok(());
    }

    let created = store().await?.insert_products(&products).await?;
    tracing::info!(count = created.len(), "Products inserted");
    Ok(())
}

/// Parse and normalize a catalog file, reporting every bad entry at once.
fn parse_catalog(content: &str) -> Result<Vec<NewProduct>, CommandError> {
    let items: Vec<serde_json::Value> = serde_json::from_str(content)
        .map_err(|e| CommandError::InvalidSeed(format!("expected an array of products: {e}")))?;

    let mut products = Vec::with_capacity(items.len());
    let mut errors = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<NewProduct>(item)
            .map_err(|e| e.to_string())
            .and_then(|p| p.normalize().map_err(|e| e.to_string()))
        {
            Ok(product) => products.push(product),
            Err(e) => errors.push(format!("product {index}: {e}")),
        }
    }

    if !errors.is_empty() {
        for err in &errors {
            tracing::error!("  - {err}");
        }
        return Err(CommandError::InvalidSeed(format!(
            "{} invalid products",
            errors.len()
        )));
    }
    Ok(products)
}
