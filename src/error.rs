use thiserror::Error;

/// Errors surfaced by the offline store and the tooltip testing service.
///
/// Reads never return `StorageUnavailable` or `MalformedStoredData`; both are
/// logged and treated as an empty store. They reach callers only from writes.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("stored data is malformed: {0}")]
    MalformedStoredData(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("sync failed: {0}")]
    Sync(String),
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    /// Wraps an infrastructure error, keeping its context chain in the message.
    pub fn storage(err: anyhow::Error) -> Self {
        ServiceError::StorageUnavailable(format!("{err:#}"))
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
