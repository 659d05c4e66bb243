//! In-process store.
//!
//! Holds everything behind one `RwLock`, so every operation is atomic with
//! respect to every other. Used by the test suites and by
//! `BAZAAR_STORE=memory` for local development without `PostgreSQL`.

use std::cmp::Reverse;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use bazaar_core::{
    Cart, Email, Favorites, OrderId, OrderStatus, ProductFilter, ProductId, UserId, order_total,
};

use super::{OrderStore, ProductStore, RepositoryError, Store, UserStore};
use crate::models::{
    CartItem, NewProduct, Order, OrderLine, Product, ProductUpdate, ProfileChanges, User,
};

#[derive(Debug)]
struct Account {
    user: User,
    password_hash: String,
    deleted: bool,
    cart: Cart,
    favorites: Favorites,
}

#[derive(Debug, Default)]
struct Inner {
    products: HashMap<ProductId, Product>,
    accounts: HashMap<UserId, Account>,
    /// Insertion order; newest last.
    orders: Vec<Order>,
}

impl Inner {
    fn active(&self, id: UserId) -> Option<&Account> {
        self.accounts.get(&id).filter(|a| !a.deleted)
    }

    fn active_mut(&mut self, id: UserId) -> Result<&mut Account, RepositoryError> {
        self.accounts
            .get_mut(&id)
            .filter(|a| !a.deleted)
            .ok_or(RepositoryError::NotFound)
    }
}

/// [`Store`] kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn insert_products(
        &self,
        products: &[NewProduct],
    ) -> Result<Vec<Product>, RepositoryError> {
        let now = Utc::now();
        let created: Vec<Product> = products
            .iter()
            .cloned()
            .map(|p| p.into_product(now))
            .collect();
        let mut inner = self.inner.write().await;
        for product in &created {
            inner.products.insert(product.id, product.clone());
        }
        Ok(created)
    }

    async fn find_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let inner = self.inner.read().await;
        let mut found: Vec<Product> = inner
            .products
            .values()
            .filter(|p| filter.matches(&p.fields()))
            .cloned()
            .collect();
        found.sort_by_key(|p| (Reverse(p.created_at), p.id));
        Ok(found)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.inner.read().await.products.get(&id).cloned())
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut inner = self.inner.write().await;
        let Some(product) = inner.products.get_mut(&id) else {
            return Ok(None);
        };
        let next = update.clone().apply(product, Utc::now())?;
        *product = next.clone();
        Ok(Some(next))
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let mut inner = self.inner.write().await;
        if inner.products.remove(&id).is_none() {
            return Ok(false);
        }
        for account in inner.accounts.values_mut() {
            account.cart.purge(id);
            account.favorites.remove(id);
        }
        Ok(true)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(
        &self,
        name: &str,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut inner = self.inner.write().await;
        if inner
            .accounts
            .values()
            .any(|a| !a.deleted && a.user.email == *email)
        {
            return Err(RepositoryError::Conflict(
                "email already registered".to_owned(),
            ));
        }
        let now = Utc::now();
        let user = User {
            id: UserId::new_v4(),
            name: name.to_owned(),
            email: email.clone(),
            img: None,
            created_at: now,
            updated_at: now,
        };
        inner.accounts.insert(
            user.id,
            Account {
                user: user.clone(),
                password_hash: password_hash.to_owned(),
                deleted: false,
                cart: Cart::new(),
                favorites: Favorites::new(),
            },
        );
        Ok(user)
    }

    async fn get_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .accounts
            .values()
            .find(|a| !a.deleted && a.user.email == *email)
            .map(|a| (a.user.clone(), a.password_hash.clone())))
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.inner.read().await.active(id).map(|a| a.user.clone()))
    }

    async fn get_password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        Ok(self
            .inner
            .read()
            .await
            .active(id)
            .map(|a| a.password_hash.clone()))
    }

    async fn update_profile(
        &self,
        id: UserId,
        changes: &ProfileChanges,
    ) -> Result<Option<User>, RepositoryError> {
        let mut inner = self.inner.write().await;
        let Ok(account) = inner.active_mut(id) else {
            return Ok(None);
        };
        if let Some(name) = &changes.name {
            account.user.name.clone_from(name);
        }
        if let Some(img) = &changes.img {
            account.user.img = Some(img.clone());
        }
        if let Some(hash) = &changes.password_hash {
            account.password_hash.clone_from(hash);
        }
        account.user.updated_at = Utc::now();
        Ok(Some(account.user.clone()))
    }

    async fn deactivate_user(&self, id: UserId) -> Result<bool, RepositoryError> {
        let mut inner = self.inner.write().await;
        let Ok(account) = inner.active_mut(id) else {
            return Ok(false);
        };
        account.deleted = true;
        account.cart.take();
        account.favorites.clear();
        account.user.updated_at = Utc::now();
        Ok(true)
    }

    async fn cart(&self, user: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        let inner = self.inner.read().await;
        let account = inner.active(user).ok_or(RepositoryError::NotFound)?;
        Ok(account
            .cart
            .lines()
            .iter()
            .filter_map(|line| {
                inner.products.get(&line.product_id).map(|p| CartItem {
                    product: p.clone(),
                    quantity: line.quantity,
                })
            })
            .collect())
    }

    async fn add_to_cart(
        &self,
        user: UserId,
        product: ProductId,
        quantity: u32,
    ) -> Result<u32, RepositoryError> {
        let mut inner = self.inner.write().await;
        if !inner.products.contains_key(&product) {
            return Err(RepositoryError::UnknownProduct(product));
        }
        let account = inner.active_mut(user)?;
        Ok(account.cart.add(product, quantity)?)
    }

    async fn remove_from_cart(
        &self,
        user: UserId,
        product: ProductId,
        quantity: u32,
    ) -> Result<Option<u32>, RepositoryError> {
        let mut inner = self.inner.write().await;
        let account = inner.active_mut(user)?;
        Ok(account.cart.remove(product, quantity))
    }

    async fn favorites(&self, user: UserId) -> Result<Vec<Product>, RepositoryError> {
        let inner = self.inner.read().await;
        let account = inner.active(user).ok_or(RepositoryError::NotFound)?;
        Ok(account
            .favorites
            .items()
            .iter()
            .filter_map(|id| inner.products.get(id).cloned())
            .collect())
    }

    async fn add_favorite(
        &self,
        user: UserId,
        product: ProductId,
    ) -> Result<bool, RepositoryError> {
        let mut inner = self.inner.write().await;
        if !inner.products.contains_key(&product) {
            return Err(RepositoryError::UnknownProduct(product));
        }
        Ok(inner.active_mut(user)?.favorites.add(product))
    }

    async fn remove_favorite(
        &self,
        user: UserId,
        product: ProductId,
    ) -> Result<bool, RepositoryError> {
        let mut inner = self.inner.write().await;
        Ok(inner.active_mut(user)?.favorites.remove(product))
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn place_order(&self, user: UserId, address: &str) -> Result<Order, RepositoryError> {
        let mut inner = self.inner.write().await;
        let account = inner.active(user).ok_or(RepositoryError::NotFound)?;
        if account.cart.is_empty() {
            return Err(RepositoryError::EmptyCart);
        }

        let lines: Vec<OrderLine> = account
            .cart
            .lines()
            .iter()
            .filter_map(|line| {
                inner.products.get(&line.product_id).map(|p| OrderLine {
                    product_id: p.id,
                    title: p.title.clone(),
                    quantity: line.quantity,
                    unit_price: p.price.org,
                })
            })
            .collect();
        if lines.is_empty() {
            return Err(RepositoryError::EmptyCart);
        }
        let priced: Vec<_> = lines.iter().map(OrderLine::priced).collect();

        let now = Utc::now();
        let order = Order {
            id: OrderId::new_v4(),
            user_id: user,
            total_amount: order_total(&priced),
            products: lines,
            address: address.to_owned(),
            status: OrderStatus::default(),
            created_at: now,
            updated_at: now,
        };
        inner.active_mut(user)?.cart.take();
        inner.orders.push(order.clone());
        Ok(order)
    }

    async fn orders_for_user(&self, user: UserId) -> Result<Vec<Order>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .orders
            .iter()
            .rev()
            .filter(|o| o.user_id == user)
            .cloned()
            .collect())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn set_order_status(
        &self,
        id: OrderId,
        owner: Option<UserId>,
        next: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let mut inner = self.inner.write().await;
        let order = inner
            .orders
            .iter_mut()
            .find(|o| o.id == id && owner.is_none_or(|u| o.user_id == u))
            .ok_or(RepositoryError::NotFound)?;
        order.status = order.status.transition(next)?;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use bazaar_core::{CartError, Price, TransitionError};
    use rust_decimal::Decimal;

    use super::*;

    fn new_product(title: &str, price: i64, category: &str) -> NewProduct {
        NewProduct {
            title: title.to_owned(),
            name: String::new(),
            description: String::new(),
            img: String::new(),
            price: Price::flat(Decimal::new(price, 0)),
            sizes: vec!["M".to_owned()],
            category: category.to_owned(),
            stock: 5,
        }
    }

    async fn seeded() -> (MemoryStore, UserId, Vec<Product>) {
        let store = MemoryStore::new();
        let products = store
            .insert_products(&[new_product("A", 10, "Women"), new_product("B", 5, "Men")])
            .await
            .unwrap();
        let user = store
            .create_user("Asha", &Email::parse("asha@example.com").unwrap(), "hash")
            .await
            .unwrap();
        (store, user.id, products)
    }

    #[tokio::test]
    async fn test_place_order_totals_and_clears_cart() {
        let (store, user, products) = seeded().await;
        store.add_to_cart(user, products[0].id, 2).await.unwrap();
        store.add_to_cart(user, products[1].id, 1).await.unwrap();

        let order = store.place_order(user, "12 MG Road").await.unwrap();
        assert_eq!(order.total_amount, Decimal::new(25, 0));
        assert_eq!(order.status, OrderStatus::PaymentDone);
        assert_eq!(order.products.len(), 2);
        assert!(store.cart(user).await.unwrap().is_empty());
        assert_eq!(store.orders_for_user(user).await.unwrap(), vec![order]);
    }

    #[tokio::test]
    async fn test_empty_cart_order_changes_nothing() {
        let (store, user, _) = seeded().await;
        assert!(matches!(
            store.place_order(user, "").await,
            Err(RepositoryError::EmptyCart)
        ));
        assert!(store.orders_for_user(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cart_add_merges_and_remove_decrements() {
        let (store, user, products) = seeded().await;
        let a = products[0].id;
        assert_eq!(store.add_to_cart(user, a, 1).await.unwrap(), 1);
        assert_eq!(store.add_to_cart(user, a, 2).await.unwrap(), 3);
        assert_eq!(store.remove_from_cart(user, a, 1).await.unwrap(), Some(2));
        assert_eq!(store.remove_from_cart(user, a, 9).await.unwrap(), None);
        assert!(store.cart(user).await.unwrap().is_empty());
        assert_eq!(store.remove_from_cart(user, a, 1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_cart_rejects_unknown_product_and_overflow() {
        let (store, user, products) = seeded().await;
        assert!(matches!(
            store.add_to_cart(user, ProductId::new_v4(), 1).await,
            Err(RepositoryError::UnknownProduct(_))
        ));
        store.add_to_cart(user, products[0].id, 10_000).await.unwrap();
        assert!(matches!(
            store.add_to_cart(user, products[0].id, 1).await,
            Err(RepositoryError::Cart(CartError::QuantityLimit { .. }))
        ));
    }

    #[tokio::test]
    async fn test_favorites_are_a_set() {
        let (store, user, products) = seeded().await;
        let a = products[0].id;
        assert!(store.add_favorite(user, a).await.unwrap());
        assert!(!store.add_favorite(user, a).await.unwrap());
        assert_eq!(store.favorites(user).await.unwrap().len(), 1);
        assert!(store.remove_favorite(user, a).await.unwrap());
        assert!(!store.remove_favorite(user, a).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_product_purges_carts_and_favorites() {
        let (store, user, products) = seeded().await;
        let a = products[0].id;
        store.add_to_cart(user, a, 1).await.unwrap();
        store.add_favorite(user, a).await.unwrap();
        assert!(store.delete_product(a).await.unwrap());
        assert!(!store.delete_product(a).await.unwrap());
        assert!(store.cart(user).await.unwrap().is_empty());
        assert!(store.favorites(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts_until_deactivated() {
        let (store, user, _) = seeded().await;
        let email = Email::parse("ASHA@example.com").unwrap();
        assert!(matches!(
            store.create_user("Other", &email, "h").await,
            Err(RepositoryError::Conflict(_))
        ));
        assert!(store.deactivate_user(user).await.unwrap());
        assert!(store.get_user(user).await.unwrap().is_none());
        assert!(store.create_user("Other", &email, "h").await.is_ok());
    }

    #[tokio::test]
    async fn test_status_changes_respect_owner_and_state_machine() {
        let (store, user, products) = seeded().await;
        store.add_to_cart(user, products[0].id, 1).await.unwrap();
        let order = store.place_order(user, "").await.unwrap();

        assert!(matches!(
            store
                .set_order_status(order.id, Some(UserId::new_v4()), OrderStatus::Cancelled)
                .await,
            Err(RepositoryError::NotFound)
        ));
        let delivered = store
            .set_order_status(order.id, None, OrderStatus::Delivered)
            .await
            .unwrap();
        assert_eq!(delivered.status, OrderStatus::Delivered);
        assert!(matches!(
            store
                .set_order_status(order.id, None, OrderStatus::Processing)
                .await,
            Err(RepositoryError::Transition(TransitionError::Terminal(_)))
        ));
    }

    #[tokio::test]
    async fn test_find_products_applies_filter() {
        let (store, _, _) = seeded().await;
        let filter = ProductFilter::new().price_at_most(Decimal::new(7, 0));
        let found = store.find_products(&filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "B");
        assert_eq!(
            store.find_products(&ProductFilter::new()).await.unwrap().len(),
            2
        );
    }
}
