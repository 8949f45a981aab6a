use common::{OrderId, ProductId, UserId, status::StatusParseError};
use thiserror::Error;

/// Errors that can occur when interacting with the market store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An entity was not found (or is soft-deleted).
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Requested quantity exceeds the stock available at commit time.
    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    StockConflict {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// A review already exists for this (user, product, order) triple.
    #[error("duplicate review by user {user_id} for product {product_id} on order {order_id}")]
    DuplicateReview {
        user_id: UserId,
        product_id: ProductId,
        order_id: OrderId,
    },

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored value could not be decoded into its typed form.
    #[error("invalid stored value: {0}")]
    Decode(String),
}

impl From<StatusParseError> for StoreError {
    fn from(e: StatusParseError) -> Self {
        StoreError::Decode(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
