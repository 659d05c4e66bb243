//! Catalog queries for [`PgStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Postgres, QueryBuilder};

use bazaar_core::{Clause, Price, ProductFilter, ProductId};

use super::{PgStore, ProductStore, RepositoryError, quantity_from_db, quantity_to_db};
use crate::models::{NewProduct, Product, ProductUpdate};

/// Columns selected for a product, in [`ProductRow`] order.
pub(super) const PRODUCT_COLUMNS: &str = "id, title, name, description, img, category, \
     price_org, price_mrp, price_off, sizes, stock, created_at, updated_at";

/// [`PRODUCT_COLUMNS`] qualified with the `p` alias, for joins.
pub(super) const PRODUCT_COLUMNS_P: &str = "p.id, p.title, p.name, p.description, p.img, \
     p.category, p.price_org, p.price_mrp, p.price_off, p.sizes, p.stock, p.created_at, \
     p.updated_at";

#[derive(Debug, sqlx::FromRow)]
pub(super) struct ProductRow {
    id: ProductId,
    title: String,
    name: String,
    description: String,
    img: String,
    category: String,
    price_org: Decimal,
    price_mrp: Decimal,
    price_off: Decimal,
    sizes: Vec<String>,
    stock: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            title: row.title,
            name: row.name,
            description: row.description,
            img: row.img,
            price: Price::new(row.price_org, row.price_mrp, row.price_off),
            sizes: row.sizes,
            category: row.category,
            stock: quantity_from_db(row.stock, "stock")?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub(super) fn into_products(rows: Vec<ProductRow>) -> Result<Vec<Product>, RepositoryError> {
    rows.into_iter().map(Product::try_from).collect()
}

/// Escape `LIKE` metacharacters so user text matches literally.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Append the filter as a `WHERE` clause.
fn push_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    let mut keyword = " WHERE ";
    for clause in filter.clauses() {
        query.push(keyword);
        keyword = " AND ";
        match clause {
            Clause::CategoryIn(categories) => {
                query.push("category = ANY(");
                query.push_bind(categories.clone());
                query.push(")");
            }
            Clause::PriceAtLeast(min) => {
                query.push("price_org >= ");
                query.push_bind(*min);
            }
            Clause::PriceAtMost(max) => {
                query.push("price_org <= ");
                query.push_bind(*max);
            }
            Clause::SizesAny(sizes) => {
                query.push("sizes && ");
                query.push_bind(sizes.clone());
            }
            Clause::TextContains(text) => {
                let pattern = format!("%{}%", escape_like(text));
                query.push("(title ILIKE ");
                query.push_bind(pattern.clone());
                query.push(" OR description ILIKE ");
                query.push_bind(pattern);
                query.push(")");
            }
        }
    }
}

#[async_trait]
impl ProductStore for PgStore {
    async fn insert_products(
        &self,
        products: &[NewProduct],
    ) -> Result<Vec<Product>, RepositoryError> {
        if products.is_empty() {
            return Ok(Vec::new());
        }
        let pool = self.pool();
        self.retry()
            .write("insert_products", move || async move {
                let now = Utc::now();
                let ids: Vec<ProductId> = products.iter().map(|_| ProductId::new_v4()).collect();

                let mut query = QueryBuilder::<Postgres>::new(
                    "INSERT INTO shop.product (id, title, name, description, img, category, \
                     price_org, price_mrp, price_off, sizes, stock, created_at, updated_at) ",
                );
                query.push_values(ids.iter().zip(products), |mut row, (id, p)| {
                    row.push_bind(*id)
                        .push_bind(p.title.clone())
                        .push_bind(p.name.clone())
                        .push_bind(p.description.clone())
                        .push_bind(p.img.clone())
                        .push_bind(p.category.clone())
                        .push_bind(p.price.org)
                        .push_bind(p.price.mrp)
                        .push_bind(p.price.off)
                        .push_bind(p.sizes.clone())
                        .push_bind(quantity_to_db(p.stock))
                        .push_bind(now)
                        .push_bind(now);
                });
                query.push(" RETURNING ");
                query.push(PRODUCT_COLUMNS);

                let mut rows: Vec<ProductRow> =
                    query.build_query_as().fetch_all(pool).await?;
                // RETURNING order is not guaranteed; restore input order.
                rows.sort_by_key(|row| ids.iter().position(|id| *id == row.id));
                into_products(rows)
            })
            .await
    }

    async fn find_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let pool = self.pool();
        self.retry()
            .read("find_products", move || async move {
                let mut query = QueryBuilder::<Postgres>::new("SELECT ");
                query.push(PRODUCT_COLUMNS);
                query.push(" FROM shop.product");
                push_filter(&mut query, filter);
                query.push(" ORDER BY created_at DESC, id");

                let rows: Vec<ProductRow> = query.build_query_as().fetch_all(pool).await?;
                into_products(rows)
            })
            .await
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let pool = self.pool();
        self.retry()
            .read("get_product", move || async move {
                let row: Option<ProductRow> = sqlx::query_as(&format!(
                    "SELECT {PRODUCT_COLUMNS} FROM shop.product WHERE id = $1"
                ))
                .bind(id)
                .fetch_optional(pool)
                .await?;
                row.map(Product::try_from).transpose()
            })
            .await
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Option<Product>, RepositoryError> {
        let pool = self.pool();
        self.retry()
            .write("update_product", move || async move {
                let mut tx = pool.begin().await?;

                let row: Option<ProductRow> = sqlx::query_as(&format!(
                    "SELECT {PRODUCT_COLUMNS} FROM shop.product WHERE id = $1 FOR UPDATE"
                ))
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
                let Some(row) = row else {
                    return Ok(None);
                };
                let current = Product::try_from(row)?;
                let next = update.clone().apply(&current, Utc::now())?;

                let row: ProductRow = sqlx::query_as(&format!(
                    r"
                    UPDATE shop.product
                    SET title = $2, name = $3, description = $4, img = $5, category = $6,
                        price_org = $7, price_mrp = $8, price_off = $9, sizes = $10,
                        stock = $11, updated_at = $12
                    WHERE id = $1
                    RETURNING {PRODUCT_COLUMNS}
                    "
                ))
                .bind(id)
                .bind(&next.title)
                .bind(&next.name)
                .bind(&next.description)
                .bind(&next.img)
                .bind(&next.category)
                .bind(next.price.org)
                .bind(next.price.mrp)
                .bind(next.price.off)
                .bind(&next.sizes)
                .bind(quantity_to_db(next.stock))
                .bind(next.updated_at)
                .fetch_one(&mut *tx)
                .await?;

                tx.commit().await?;
                Product::try_from(row).map(Some)
            })
            .await
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let pool = self.pool();
        self.retry()
            .write("delete_product", move || async move {
                // Cart lines and favorites go with it via ON DELETE CASCADE.
                let result = sqlx::query("DELETE FROM shop.product WHERE id = $1")
                    .bind(id)
                    .execute(pool)
                    .await?;
                Ok(result.rows_affected() > 0)
            })
            .await
    }
}
