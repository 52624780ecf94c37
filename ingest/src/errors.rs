use http::StatusCode;
use thiserror::Error;

/// Result type alias for ingest operations
pub type Result<T, E = IngestError> = std::result::Result<T, E>;

/// Errors that can occur while ingesting and delivering a reply
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("invalid request body: {0}")]
    BadRequest(String),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("error entry not found: {0}")]
    ErrorEntryNotFound(i64),

    #[error("no retryable payload found; only errors with stored payloads can be retried")]
    NoRetryablePayload,

    #[error("unknown workflow: {0}")]
    UnknownWorkflow(String),

    #[error("record store request failed: {0}")]
    RecordStore(String),

    #[error("notify webhook failed: {0}")]
    Notify(String),

    #[error("failed to build response: {0}")]
    ResponseBuild(String),

    #[error("store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("http client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// HTTP status an endpoint should answer with when this error surfaces
    /// to the caller.
    pub fn status(&self) -> StatusCode {
        match self {
            IngestError::BadRequest(_)
            | IngestError::MissingField(_)
            | IngestError::NoRetryablePayload
            | IngestError::UnknownWorkflow(_) => StatusCode::BAD_REQUEST,
            IngestError::ErrorEntryNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
