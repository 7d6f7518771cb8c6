use thiserror::Error;

/// Errors raised while publishing or consuming events.
#[derive(Debug, Error)]
pub enum MessagingError {
    /// The bus could not accept the event.
    #[error("Event bus unavailable: {0}")]
    Unavailable(String),

    /// An event could not be encoded or decoded.
    #[error("Event serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A consumer failed to act on the cache.
    #[error("Cache error: {0}")]
    Cache(#[from] cache::CacheError),
}

/// Result type for messaging operations.
pub type Result<T> = std::result::Result<T, MessagingError>;
