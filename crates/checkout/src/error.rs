use thiserror::Error;

/// Errors raised during checkout and payment processing.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// A business rule rejected the request.
    #[error(transparent)]
    Domain(#[from] domain::DomainError),

    /// The store failed outside the domain layer.
    #[error("store error: {0}")]
    Store(#[from] store::StoreError),

    /// The notification sink failed.
    #[error("notify error: {0}")]
    Notify(#[from] notify::NotifyError),
}

/// Result type for checkout operations.
pub type Result<T> = std::result::Result<T, CheckoutError>;
