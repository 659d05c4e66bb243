//! Account, cart and favorite queries for [`PgStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bazaar_core::{CartError, Email, MAX_LINE_QUANTITY, ProductId, UserId};

use super::products::{PRODUCT_COLUMNS_P, ProductRow, into_products};
use super::{PgStore, RepositoryError, UserStore, quantity_from_db, quantity_to_db};
use crate::models::{CartItem, Product, ProfileChanges, User};

const ACCOUNT_COLUMNS: &str = "id, name, email, img, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: UserId,
    name: String,
    email: String,
    img: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for User {
    type Error = RepositoryError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        Ok(Self {
            id: row.id,
            name: row.name,
            email,
            img: row.img,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CredentialsRow {
    #[sqlx(flatten)]
    account: AccountRow,
    password_hash: String,
}

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    #[sqlx(flatten)]
    product: ProductRow,
    quantity: i32,
}

/// Map a foreign-key violation on a cart or favorite insert to
/// [`RepositoryError::UnknownProduct`].
fn unknown_product(product: ProductId) -> impl FnOnce(sqlx::Error) -> RepositoryError {
    move |e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_foreign_key_violation()
        {
            return RepositoryError::UnknownProduct(product);
        }
        RepositoryError::from(e)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(
        &self,
        name: &str,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let pool = self.pool();
        self.retry()
            .write("create_user", move || async move {
                let row: AccountRow = sqlx::query_as(&format!(
                    r"
                    INSERT INTO shop.account (id, name, email, password_hash)
                    VALUES ($1, $2, $3, $4)
                    RETURNING {ACCOUNT_COLUMNS}
                    "
                ))
                .bind(UserId::new_v4())
                .bind(name)
                .bind(email.as_str())
                .bind(password_hash)
                .fetch_one(pool)
                .await
                .map_err(|e| {
                    if let sqlx::Error::Database(ref db_err) = e
                        && db_err.is_unique_violation()
                    {
                        return RepositoryError::Conflict("email already registered".to_owned());
                    }
                    RepositoryError::from(e)
                })?;
                User::try_from(row)
            })
            .await
    }

    async fn get_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let pool = self.pool();
        self.retry()
            .read("get_credentials", move || async move {
                let row: Option<CredentialsRow> = sqlx::query_as(&format!(
                    r"
                    SELECT {ACCOUNT_COLUMNS}, password_hash
                    FROM shop.account
                    WHERE email = $1 AND deleted_at IS NULL
                    "
                ))
                .bind(email.as_str())
                .fetch_optional(pool)
                .await?;
                row.map(|r| Ok((User::try_from(r.account)?, r.password_hash)))
                    .transpose()
            })
            .await
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let pool = self.pool();
        self.retry()
            .read("get_user", move || async move {
                let row: Option<AccountRow> = sqlx::query_as(&format!(
                    "SELECT {ACCOUNT_COLUMNS} FROM shop.account WHERE id = $1 AND deleted_at IS NULL"
                ))
                .bind(id)
                .fetch_optional(pool)
                .await?;
                row.map(User::try_from).transpose()
            })
            .await
    }

    async fn get_password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        let pool = self.pool();
        self.retry()
            .read("get_password_hash", move || async move {
                let hash: Option<String> = sqlx::query_scalar(
                    "SELECT password_hash FROM shop.account WHERE id = $1 AND deleted_at IS NULL",
                )
                .bind(id)
                .fetch_optional(pool)
                .await?;
                Ok(hash)
            })
            .await
    }

    async fn update_profile(
        &self,
        id: UserId,
        changes: &ProfileChanges,
    ) -> Result<Option<User>, RepositoryError> {
        let pool = self.pool();
        self.retry()
            .write("update_profile", move || async move {
                let row: Option<AccountRow> = sqlx::query_as(&format!(
                    r"
                    UPDATE shop.account
                    SET name = COALESCE($2, name),
                        img = COALESCE($3, img),
                        password_hash = COALESCE($4, password_hash),
                        updated_at = now()
                    WHERE id = $1 AND deleted_at IS NULL
                    RETURNING {ACCOUNT_COLUMNS}
                    "
                ))
                .bind(id)
                .bind(changes.name.as_deref())
                .bind(changes.img.as_deref())
                .bind(changes.password_hash.as_deref())
                .fetch_optional(pool)
                .await?;
                row.map(User::try_from).transpose()
            })
            .await
    }

    async fn deactivate_user(&self, id: UserId) -> Result<bool, RepositoryError> {
        let pool = self.pool();
        self.retry()
            .write("deactivate_user", move || async move {
                let mut tx = pool.begin().await?;

                let result = sqlx::query(
                    r"
                    UPDATE shop.account
                    SET deleted_at = now(), updated_at = now()
                    WHERE id = $1 AND deleted_at IS NULL
                    ",
                )
                .bind(id)
                .execute(&mut *tx)
                .await?;
                if result.rows_affected() == 0 {
                    return Ok(false);
                }

                sqlx::query("DELETE FROM shop.cart_item WHERE account_id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                sqlx::query("DELETE FROM shop.favorite WHERE account_id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;

                tx.commit().await?;
                Ok(true)
            })
            .await
    }

    async fn cart(&self, user: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        let pool = self.pool();
        self.retry()
            .read("cart", move || async move {
                let rows: Vec<CartRow> = sqlx::query_as(&format!(
                    r"
                    SELECT {PRODUCT_COLUMNS_P}, c.quantity
                    FROM shop.cart_item c
                    JOIN shop.product p ON p.id = c.product_id
                    WHERE c.account_id = $1
                    ORDER BY c.added_at, p.id
                    "
                ))
                .bind(user)
                .fetch_all(pool)
                .await?;
                rows.into_iter()
                    .map(|row| {
                        Ok(CartItem {
                            quantity: quantity_from_db(row.quantity, "cart quantity")?,
                            product: Product::try_from(row.product)?,
                        })
                    })
                    .collect()
            })
            .await
    }

    async fn add_to_cart(
        &self,
        user: UserId,
        product: ProductId,
        quantity: u32,
    ) -> Result<u32, RepositoryError> {
        let pool = self.pool();
        self.retry()
            .write("add_to_cart", move || async move {
                // Single statement: the increment and the limit check happen
                // under the row lock, so concurrent adds cannot lose updates.
                let merged: Option<i32> = sqlx::query_scalar(
                    r"
                    INSERT INTO shop.cart_item (account_id, product_id, quantity)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (account_id, product_id) DO UPDATE
                    SET quantity = shop.cart_item.quantity + EXCLUDED.quantity
                    WHERE shop.cart_item.quantity + EXCLUDED.quantity <= $4
                    RETURNING quantity
                    ",
                )
                .bind(user)
                .bind(product)
                .bind(quantity_to_db(quantity))
                .bind(quantity_to_db(MAX_LINE_QUANTITY))
                .fetch_optional(pool)
                .await
                .map_err(unknown_product(product))?;

                let merged = merged.ok_or(CartError::QuantityLimit {
                    max: MAX_LINE_QUANTITY,
                })?;
                quantity_from_db(merged, "cart quantity")
            })
            .await
    }

    async fn remove_from_cart(
        &self,
        user: UserId,
        product: ProductId,
        quantity: u32,
    ) -> Result<Option<u32>, RepositoryError> {
        let pool = self.pool();
        self.retry()
            .write("remove_from_cart", move || async move {
                // Exactly one of the two branches can match the row.
                let remaining: Option<i32> = sqlx::query_scalar(
                    r"
                    WITH decremented AS (
                        UPDATE shop.cart_item
                        SET quantity = quantity - $3
                        WHERE account_id = $1 AND product_id = $2 AND quantity > $3
                        RETURNING quantity
                    ), deleted AS (
                        DELETE FROM shop.cart_item
                        WHERE account_id = $1 AND product_id = $2 AND quantity <= $3
                    )
                    SELECT quantity FROM decremented
                    ",
                )
                .bind(user)
                .bind(product)
                .bind(quantity_to_db(quantity))
                .fetch_optional(pool)
                .await?;
                remaining
                    .map(|q| quantity_from_db(q, "cart quantity"))
                    .transpose()
            })
            .await
    }

    async fn favorites(&self, user: UserId) -> Result<Vec<Product>, RepositoryError> {
        let pool = self.pool();
        self.retry()
            .read("favorites", move || async move {
                let rows: Vec<ProductRow> = sqlx::query_as(&format!(
                    r"
                    SELECT {PRODUCT_COLUMNS_P}
                    FROM shop.favorite f
                    JOIN shop.product p ON p.id = f.product_id
                    WHERE f.account_id = $1
                    ORDER BY f.added_at, p.id
                    "
                ))
                .bind(user)
                .fetch_all(pool)
                .await?;
                into_products(rows)
            })
            .await
    }

    async fn add_favorite(
        &self,
        user: UserId,
        product: ProductId,
    ) -> Result<bool, RepositoryError> {
        let pool = self.pool();
        self.retry()
            .write("add_favorite", move || async move {
                let result = sqlx::query(
                    r"
                    INSERT INTO shop.favorite (account_id, product_id)
                    VALUES ($1, $2)
                    ON CONFLICT DO NOTHING
                    ",
                )
                .bind(user)
                .bind(product)
                .execute(pool)
                .await
                .map_err(unknown_product(product))?;
                Ok(result.rows_affected() > 0)
            })
            .await
    }

    async fn remove_favorite(
        &self,
        user: UserId,
        product: ProductId,
    ) -> Result<bool, RepositoryError> {
        let pool = self.pool();
        self.retry()
            .write("remove_favorite", move || async move {
                let result =
                    sqlx::query("DELETE FROM shop.favorite WHERE account_id = $1 AND product_id = $2")
                        .bind(user)
                        .bind(product)
                        .execute(pool)
                        .await?;
                Ok(result.rows_affected() > 0)
            })
            .await
    }
}
