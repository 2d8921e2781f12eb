use thiserror::Error;

/// Errors from object store and backend operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No document exists for this identity (or storage key).
    #[error("no identifiable {identifier} in store")]
    NotFound { identifier: String },

    /// A document for this identity already exists.
    #[error("identifiable {identifier} already exists in store")]
    AlreadyExists { identifier: String },

    /// The store's directory does not exist.
    #[error("storage directory {path} does not exist")]
    DirectoryNotFound { path: String },

    /// The object's recorded source cannot be mapped to this backend's
    /// storage, or the object has no source at all.
    #[error("source {locator:?} is not resolvable")]
    UnresolvableSource { locator: String },

    /// The source's scheme has no registered backend.
    #[error("no backend registered for scheme {scheme:?}")]
    NoBackend { scheme: String },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage medium.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
