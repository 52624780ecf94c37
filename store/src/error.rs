use thiserror::Error;

/// Result type alias for store operations
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// Errors that can occur while talking to the backing database
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid stored value: {0}")]
    InvalidValue(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
