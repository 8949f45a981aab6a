use common::{OrderStatus, ProductId};
use store::StoreError;
use thiserror::Error;

/// Errors raised by the business services.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Input failed a business rule.
    #[error("validation error: {0}")]
    Validation(String),

    /// An entity was not found (or is soft-deleted).
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The actor may not perform this operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Requested quantity exceeds available stock.
    #[error(
        "insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    StockConflict {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// Checkout was attempted with no cart lines.
    #[error("cart is empty")]
    EmptyCart,

    /// The requested order status is not a legal successor.
    #[error("illegal order status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// The vendor's subscription tier caps its active product count.
    #[error("vendor has reached its product limit of {limit}")]
    TierLimitReached { limit: u64 },

    /// The store failed for a reason with no business meaning.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { entity, id } => DomainError::NotFound { entity, id },
            StoreError::StockConflict {
                product_id,
                requested,
                available,
            } => DomainError::StockConflict {
                product_id,
                requested,
                available,
            },
            StoreError::DuplicateReview { .. } => DomainError::Validation(
                "a review for this product on this order already exists".to_string(),
            ),
            other => DomainError::Store(other),
        }
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
