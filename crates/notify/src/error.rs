use thiserror::Error;

/// Errors raised by the notification sink.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The underlying store rejected a notification write.
    #[error("store error: {0}")]
    Store(#[from] store::StoreError),
}

/// Result type for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;
