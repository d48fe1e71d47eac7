//! Error taxonomy for the store and service layers.
//! NotFound surfaces to the caller; store failures are retried at the
//! store boundary before they reach here.

/// Failure inside the record store after boundary retries are exhausted.
#[derive(Debug)]
pub enum StoreError {
    /// Transient I/O failure talking to the underlying storage engine.
    Unavailable(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Unavailable(msg) => write!(f, "store unavailable: {msg}"),
        }
    }
}

/// Errors surfaced by the service facade.
#[derive(Debug)]
pub enum ServiceError {
    /// No record with the given id.
    NotFound(i64),
    /// The record store failed.
    Store(StoreError),
    /// The caller cancelled an in-flight export.
    Cancelled,
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::NotFound(id) => write!(f, "translation {id} not found"),
            ServiceError::Store(e) => write!(f, "{e}"),
            ServiceError::Cancelled => write!(f, "export cancelled"),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        ServiceError::Store(e)
    }
}
