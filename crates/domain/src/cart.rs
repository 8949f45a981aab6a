use std::collections::HashMap;
use std::sync::Arc;

use common::{Money, ProductId, UserId};
use serde::Serialize;
use store::MarketStore;
use tokio::sync::RwLock;

use crate::error::{DomainError, Result};

/// One line of a cart. Price and name are captured at add time for display;
/// checkout re-snapshots both from the live product.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

/// A per-user cart accumulator.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Cart {
    pub lines: Vec<CartLine>,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of line totals at the prices captured in the cart.
    pub fn subtotal(&self) -> Money {
        self.lines
            .iter()
            .map(|l| l.unit_price.times(l.quantity))
            .sum()
    }

    /// Total unit count across all lines.
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

/// In-memory cart state keyed by user.
///
/// Carts are ephemeral: adding merges quantities per product, and every add
/// or quantity change is checked against live stock so the cart cannot hold
/// more than the shelf does. The authoritative stock check still happens at
/// checkout.
pub struct CartService<S> {
    store: Arc<S>,
    carts: Arc<RwLock<HashMap<UserId, Cart>>>,
}

impl<S> Clone for CartService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            carts: self.carts.clone(),
        }
    }
}

impl<S: MarketStore> CartService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            carts: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Adds `quantity` units of a product, merging with any existing line.
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        if quantity == 0 {
            return Err(DomainError::Validation(
                "quantity must be at least 1".to_string(),
            ));
        }
        let product = self
            .store
            .get_product(product_id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "product",
                id: product_id.to_string(),
            })?;

        let mut carts = self.carts.write().await;
        let cart = carts.entry(user_id).or_default();

        let existing = cart
            .lines
            .iter()
            .find(|l| l.product_id == product_id)
            .map(|l| l.quantity)
            .unwrap_or(0);
        let merged = existing + quantity;
        if merged > product.stock {
            return Err(DomainError::StockConflict {
                product_id,
                requested: merged,
                available: product.stock,
            });
        }

        match cart.lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => {
                line.quantity = merged;
                line.product_name = product.name;
                line.unit_price = product.price;
            }
            None => cart.lines.push(CartLine {
                product_id,
                product_name: product.name,
                unit_price: product.price,
                quantity,
            }),
        }
        Ok(cart.clone())
    }

    /// Sets the quantity of an existing line. Zero removes the line.
    pub async fn update_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        if quantity == 0 {
            return self.remove(user_id, product_id).await;
        }
        let product = self
            .store
            .get_product(product_id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "product",
                id: product_id.to_string(),
            })?;
        if quantity > product.stock {
            return Err(DomainError::StockConflict {
                product_id,
                requested: quantity,
                available: product.stock,
            });
        }

        let mut carts = self.carts.write().await;
        let cart = carts.entry(user_id).or_default();
        let line = cart
            .lines
            .iter_mut()
            .find(|l| l.product_id == product_id)
            .ok_or_else(|| DomainError::NotFound {
                entity: "cart item",
                id: product_id.to_string(),
            })?;
        line.quantity = quantity;
        Ok(cart.clone())
    }

    /// Removes a line if present.
    pub async fn remove(&self, user_id: UserId, product_id: ProductId) -> Result<Cart> {
        let mut carts = self.carts.write().await;
        let cart = carts.entry(user_id).or_default();
        cart.lines.retain(|l| l.product_id != product_id);
        Ok(cart.clone())
    }

    /// Returns a copy of the user's cart (empty if none).
    pub async fn get(&self, user_id: UserId) -> Cart {
        self.carts
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Drops the user's cart. Called after a successful checkout.
    pub async fn clear(&self, user_id: UserId) {
        self.carts.write().await.remove(&user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Role, SubscriptionTier};
    use store::{InMemoryMarketStore, NewProduct, NewUser, NewVendor, ProductRecord};

    async fn seed_product(store: &InMemoryMarketStore, stock: u32, price: Money) -> ProductRecord {
        let user = store
            .insert_user(NewUser {
                email: format!("vendor-{}@example.com", uuid::Uuid::new_v4()),
                name: "Vendor".to_string(),
                role: Role::Vendor,
            })
            .await
            .unwrap();
        let vendor = store
            .insert_vendor(NewVendor {
                user_id: user.id,
                business_name: "Green Acres".to_string(),
                tier: SubscriptionTier::Basic,
            })
            .await
            .unwrap();
        store
            .insert_product(NewProduct {
                vendor_id: vendor.id,
                category_id: None,
                name: "Carrot bundle".to_string(),
                description: String::new(),
                price,
                stock,
                image_url: None,
                featured: false,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn add_merges_quantities() {
        let store = Arc::new(InMemoryMarketStore::new());
        let product = seed_product(&store, 10, Money::from_cents(250)).await;
        let carts = CartService::new(store);
        let user_id = UserId::new();

        carts.add(user_id, product.id, 2).await.unwrap();
        let cart = carts.add(user_id, product.id, 3).await.unwrap();

        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity, 5);
        assert_eq!(cart.subtotal(), Money::from_cents(1250));
        assert_eq!(cart.item_count(), 5);
    }

    #[tokio::test]
    async fn add_cannot_exceed_stock() {
        let store = Arc::new(InMemoryMarketStore::new());
        let product = seed_product(&store, 3, Money::from_cents(250)).await;
        let carts = CartService::new(store);
        let user_id = UserId::new();

        carts.add(user_id, product.id, 2).await.unwrap();
        let err = carts.add(user_id, product.id, 2).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::StockConflict {
                requested: 4,
                available: 3,
                ..
            }
        ));
        // The cart keeps its previous state
        assert_eq!(carts.get(user_id).await.item_count(), 2);
    }

    #[tokio::test]
    async fn add_missing_product_is_not_found() {
        let store = Arc::new(InMemoryMarketStore::new());
        let carts = CartService::new(store);

        let err = carts
            .add(UserId::new(), ProductId::new(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "product", .. }));
    }

    #[tokio::test]
    async fn add_archived_product_is_not_found() {
        let store = Arc::new(InMemoryMarketStore::new());
        let product = seed_product(&store, 5, Money::from_cents(100)).await;
        store.archive_product(product.id).await.unwrap();
        let carts = CartService::new(store);

        let err = carts.add(UserId::new(), product.id, 1).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn zero_quantity_add_is_rejected() {
        let store = Arc::new(InMemoryMarketStore::new());
        let product = seed_product(&store, 5, Money::from_cents(100)).await;
        let carts = CartService::new(store);

        let err = carts.add(UserId::new(), product.id, 0).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn update_quantity_zero_removes_line() {
        let store = Arc::new(InMemoryMarketStore::new());
        let product = seed_product(&store, 5, Money::from_cents(100)).await;
        let carts = CartService::new(store);
        let user_id = UserId::new();

        carts.add(user_id, product.id, 2).await.unwrap();
        let cart = carts.update_quantity(user_id, product.id, 0).await.unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn update_quantity_checks_stock() {
        let store = Arc::new(InMemoryMarketStore::new());
        let product = seed_product(&store, 5, Money::from_cents(100)).await;
        let carts = CartService::new(store);
        let user_id = UserId::new();

        carts.add(user_id, product.id, 2).await.unwrap();
        let err = carts
            .update_quantity(user_id, product.id, 9)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::StockConflict { .. }));

        let cart = carts.update_quantity(user_id, product.id, 4).await.unwrap();
        assert_eq!(cart.lines[0].quantity, 4);
    }

    #[tokio::test]
    async fn clear_empties_the_cart() {
        let store = Arc::new(InMemoryMarketStore::new());
        let product = seed_product(&store, 5, Money::from_cents(100)).await;
        let carts = CartService::new(store);
        let user_id = UserId::new();

        carts.add(user_id, product.id, 2).await.unwrap();
        carts.clear(user_id).await;
        assert!(carts.get(user_id).await.is_empty());
    }
}
