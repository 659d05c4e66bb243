//! Order queries for [`PgStore`].

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, Postgres, QueryBuilder};

use bazaar_core::{OrderId, OrderStatus, ProductId, UserId, order_total};

use super::{OrderStore, PgStore, RepositoryError, quantity_from_db, quantity_to_db};
use crate::models::{Order, OrderLine};

const ORDER_COLUMNS: &str = "id, account_id, total_amount, address, status, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    account_id: UserId,
    total_amount: Decimal,
    address: String,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, products: Vec<OrderLine>) -> Order {
        Order {
            id: self.id,
            user_id: self.account_id,
            products,
            total_amount: self.total_amount,
            address: self.address,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LineRow {
    order_id: OrderId,
    product_id: ProductId,
    title: String,
    quantity: i32,
    unit_price: Decimal,
}

impl TryFrom<LineRow> for OrderLine {
    type Error = RepositoryError;

    fn try_from(row: LineRow) -> Result<Self, Self::Error> {
        Ok(Self {
            product_id: row.product_id,
            title: row.title,
            quantity: quantity_from_db(row.quantity, "order line quantity")?,
            unit_price: row.unit_price,
        })
    }
}

/// Cart contents priced at the current catalog price.
#[derive(Debug, sqlx::FromRow)]
struct CheckoutRow {
    product_id: ProductId,
    title: String,
    quantity: i32,
    unit_price: Decimal,
}

/// Load the lines of the given orders, keyed by order.
async fn load_lines(
    conn: &mut PgConnection,
    ids: &[OrderId],
) -> Result<HashMap<OrderId, Vec<OrderLine>>, RepositoryError> {
    let rows: Vec<LineRow> = sqlx::query_as(
        r"
        SELECT order_id, product_id, title, quantity, unit_price
        FROM shop.order_line
        WHERE order_id = ANY($1)
        ORDER BY order_id, position
        ",
    )
    .bind(ids)
    .fetch_all(conn)
    .await?;

    let mut lines: HashMap<OrderId, Vec<OrderLine>> = HashMap::new();
    for row in rows {
        let order_id = row.order_id;
        lines
            .entry(order_id)
            .or_default()
            .push(OrderLine::try_from(row)?);
    }
    Ok(lines)
}

async fn with_lines(
    conn: &mut PgConnection,
    rows: Vec<OrderRow>,
) -> Result<Vec<Order>, RepositoryError> {
    let ids: Vec<OrderId> = rows.iter().map(|row| row.id).collect();
    let mut lines = load_lines(conn, &ids).await?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let products = lines.remove(&row.id).unwrap_or_default();
            row.into_order(products)
        })
        .collect())
}

#[async_trait]
impl OrderStore for PgStore {
    async fn place_order(&self, user: UserId, address: &str) -> Result<Order, RepositoryError> {
        let pool = self.pool();
        self.retry()
            .write("place_order", move || async move {
                let mut tx = pool.begin().await?;

                // Serializes checkouts for this account against each other.
                let locked: Option<UserId> = sqlx::query_scalar(
                    "SELECT id FROM shop.account WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
                )
                .bind(user)
                .fetch_optional(&mut *tx)
                .await?;
                if locked.is_none() {
                    return Err(RepositoryError::NotFound);
                }

                let cart: Vec<CheckoutRow> = sqlx::query_as(
                    r"
                    SELECT c.product_id, p.title, c.quantity, p.price_org AS unit_price
                    FROM shop.cart_item c
                    JOIN shop.product p ON p.id = c.product_id
                    WHERE c.account_id = $1
                    ORDER BY c.added_at, p.id
                    ",
                )
                .bind(user)
                .fetch_all(&mut *tx)
                .await?;
                if cart.is_empty() {
                    return Err(RepositoryError::EmptyCart);
                }

                let lines = cart
                    .into_iter()
                    .map(|row| {
                        Ok(OrderLine {
                            product_id: row.product_id,
                            title: row.title,
                            quantity: quantity_from_db(row.quantity, "cart quantity")?,
                            unit_price: row.unit_price,
                        })
                    })
                    .collect::<Result<Vec<_>, RepositoryError>>()?;
                let priced: Vec<_> = lines.iter().map(OrderLine::priced).collect();
                let total = order_total(&priced);

                let row: OrderRow = sqlx::query_as(&format!(
                    r"
                    INSERT INTO shop.purchase_order (id, account_id, total_amount, address, status)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING {ORDER_COLUMNS}
                    "
                ))
                .bind(OrderId::new_v4())
                .bind(user)
                .bind(total)
                .bind(address)
                .bind(OrderStatus::default())
                .fetch_one(&mut *tx)
                .await?;

                let mut insert = QueryBuilder::<Postgres>::new(
                    "INSERT INTO shop.order_line (order_id, position, product_id, title, quantity, unit_price) ",
                );
                insert.push_values(lines.iter().enumerate(), |mut b, (position, line)| {
                    b.push_bind(row.id)
                        .push_bind(i32::try_from(position).unwrap_or(i32::MAX))
                        .push_bind(line.product_id)
                        .push_bind(line.title.clone())
                        .push_bind(quantity_to_db(line.quantity))
                        .push_bind(line.unit_price);
                });
                insert.build().execute(&mut *tx).await?;

                sqlx::query("DELETE FROM shop.cart_item WHERE account_id = $1")
                    .bind(user)
                    .execute(&mut *tx)
                    .await?;

                tx.commit().await?;
                Ok(row.into_order(lines))
            })
            .await
    }

    async fn orders_for_user(&self, user: UserId) -> Result<Vec<Order>, RepositoryError> {
        let pool = self.pool();
        self.retry()
            .read("orders_for_user", move || async move {
                let mut conn = pool.acquire().await?;
                let rows: Vec<OrderRow> = sqlx::query_as(&format!(
                    r"
                    SELECT {ORDER_COLUMNS}
                    FROM shop.purchase_order
                    WHERE account_id = $1
                    ORDER BY created_at DESC, id
                    "
                ))
                .bind(user)
                .fetch_all(&mut *conn)
                .await?;
                with_lines(&mut conn, rows).await
            })
            .await
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let pool = self.pool();
        self.retry()
            .read("get_order", move || async move {
                let mut conn = pool.acquire().await?;
                let row: Option<OrderRow> = sqlx::query_as(&format!(
                    "SELECT {ORDER_COLUMNS} FROM shop.purchase_order WHERE id = $1"
                ))
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;
                let Some(row) = row else {
                    return Ok(None);
                };
                Ok(with_lines(&mut conn, vec![row]).await?.pop())
            })
            .await
    }

    async fn set_order_status(
        &self,
        id: OrderId,
        owner: Option<UserId>,
        next: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let pool = self.pool();
        self.retry()
            .write("set_order_status", move || async move {
                let mut tx = pool.begin().await?;

                let current: Option<OrderStatus> = sqlx::query_scalar(
                    r"
                    SELECT status FROM shop.purchase_order
                    WHERE id = $1 AND ($2::uuid IS NULL OR account_id = $2)
                    FOR UPDATE
                    ",
                )
                .bind(id)
                .bind(owner)
                .fetch_optional(&mut *tx)
                .await?;
                let current = current.ok_or(RepositoryError::NotFound)?;
                let next = current.transition(next)?;

                let row: OrderRow = sqlx::query_as(&format!(
                    r"
                    UPDATE shop.purchase_order
                    SET status = $2, updated_at = now()
                    WHERE id = $1
                    RETURNING {ORDER_COLUMNS}
                    "
                ))
                .bind(id)
                .bind(next)
                .fetch_one(&mut *tx)
                .await?;

                let order = with_lines(&mut tx, vec![row])
                    .await?
                    .pop()
                    .ok_or(RepositoryError::NotFound)?;
                tx.commit().await?;
                Ok(order)
            })
            .await
    }
}
