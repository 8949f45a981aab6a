use std::sync::Arc;

use common::{OrderId, OrderStatus, ProductId};
use store::{MarketStore, NewReview, ReviewRecord};

use crate::auth::Actor;
use crate::error::{DomainError, Result};

/// Review rules: one review per (user, product, order), and only for
/// products the reviewer actually received.
pub struct ReviewService<S> {
    store: Arc<S>,
}

impl<S> Clone for ReviewService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: MarketStore> ReviewService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Submits a review for a product received on a delivered order.
    #[tracing::instrument(skip(self, actor, comment), fields(user_id = %actor.user_id))]
    pub async fn submit(
        &self,
        actor: &Actor,
        order_id: OrderId,
        product_id: ProductId,
        rating: i16,
        comment: String,
    ) -> Result<ReviewRecord> {
        if !(1..=5).contains(&rating) {
            return Err(DomainError::Validation(
                "rating must be between 1 and 5".to_string(),
            ));
        }

        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "order",
                id: order_id.to_string(),
            })?;
        if order.user_id != actor.user_id {
            return Err(DomainError::PermissionDenied(
                "order belongs to another customer".to_string(),
            ));
        }
        if order.status != OrderStatus::Delivered {
            return Err(DomainError::Validation(
                "only delivered orders can be reviewed".to_string(),
            ));
        }

        let items = self.store.get_order_items(order_id).await?;
        if !items.iter().any(|i| i.product_id == product_id) {
            return Err(DomainError::Validation(
                "product was not part of this order".to_string(),
            ));
        }

        // DuplicateReview maps to a validation error in From<StoreError>
        let review = self
            .store
            .insert_review(NewReview {
                user_id: actor.user_id,
                product_id,
                order_id,
                rating,
                comment,
            })
            .await?;
        Ok(review)
    }

    pub async fn reviews_for_product(&self, product_id: ProductId) -> Result<Vec<ReviewRecord>> {
        Ok(self.store.reviews_for_product(product_id).await?)
    }
}
