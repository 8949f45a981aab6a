use std::sync::Arc;

use common::{Money, ProductId, Role, VendorId};
use store::{MarketStore, NewProduct, ProductQuery, ProductRecord, ProductUpdate};
use uuid::Uuid;

use crate::auth::Actor;
use crate::error::{DomainError, Result};

/// Product fields supplied at creation.
#[derive(Debug, Clone)]
pub struct NewProductInput {
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub stock: u32,
    pub image_url: Option<String>,
    pub featured: bool,
}

/// Catalog rules: vendor ownership and subscription tier limits.
pub struct CatalogService<S> {
    store: Arc<S>,
}

impl<S> Clone for CatalogService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: MarketStore> CatalogService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Creates a product under the actor's vendor account.
    ///
    /// Enforces the subscription tier's active product limit at creation
    /// time, so a basic vendor cannot list an eleventh product.
    #[tracing::instrument(skip(self, actor, input), fields(user_id = %actor.user_id))]
    pub async fn create_product(
        &self,
        actor: &Actor,
        input: NewProductInput,
    ) -> Result<ProductRecord> {
        if actor.role == Role::Customer {
            return Err(DomainError::PermissionDenied(
                "only vendors may list products".to_string(),
            ));
        }
        let vendor_id = actor.vendor_id.ok_or_else(|| {
            DomainError::Validation("a vendor account is required to list products".to_string())
        })?;
        if input.name.trim().is_empty() {
            return Err(DomainError::Validation(
                "product name must not be empty".to_string(),
            ));
        }
        if !input.price.is_positive() {
            return Err(DomainError::Validation(
                "product price must be positive".to_string(),
            ));
        }

        let vendor = self
            .store
            .get_vendor(vendor_id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "vendor",
                id: vendor_id.to_string(),
            })?;
        if let Some(limit) = vendor.tier.product_limit() {
            let active = self.store.count_active_products(vendor_id).await?;
            if active >= limit {
                return Err(DomainError::TierLimitReached { limit });
            }
        }

        let product = self
            .store
            .insert_product(NewProduct {
                vendor_id,
                category_id: input.category_id,
                name: input.name,
                description: input.description,
                price: input.price,
                stock: input.stock,
                image_url: input.image_url,
                featured: input.featured,
            })
            .await?;
        Ok(product)
    }

    /// Applies a partial update; the actor must own the product or be staff.
    pub async fn update_product(
        &self,
        actor: &Actor,
        product_id: ProductId,
        update: ProductUpdate,
    ) -> Result<ProductRecord> {
        self.authorize_owner(actor, product_id).await?;
        if let Some(price) = update.price
            && !price.is_positive()
        {
            return Err(DomainError::Validation(
                "product price must be positive".to_string(),
            ));
        }
        Ok(self.store.update_product(product_id, update).await?)
    }

    /// Soft-deletes a product; the actor must own it or be staff.
    pub async fn archive_product(&self, actor: &Actor, product_id: ProductId) -> Result<()> {
        self.authorize_owner(actor, product_id).await?;
        Ok(self.store.archive_product(product_id).await?)
    }

    pub async fn get_product(&self, product_id: ProductId) -> Result<ProductRecord> {
        self.store
            .get_product(product_id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "product",
                id: product_id.to_string(),
            })
    }

    pub async fn list_products(&self, query: ProductQuery) -> Result<Vec<ProductRecord>> {
        Ok(self.store.list_products(query).await?)
    }

    async fn authorize_owner(&self, actor: &Actor, product_id: ProductId) -> Result<VendorId> {
        let product = self
            .store
            .get_product(product_id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "product",
                id: product_id.to_string(),
            })?;
        if actor.is_staff() || actor.vendor_id == Some(product.vendor_id) {
            Ok(product.vendor_id)
        } else {
            Err(DomainError::PermissionDenied(
                "product belongs to another vendor".to_string(),
            ))
        }
    }
}
