//! Persistence layer for the DTM digital twin metamodel.
//!
//! Top-level [`dtm_model::Identifiable`] objects are stored one document per
//! identity; every stored object carries a source locator recording which
//! backend and document currently back it. The pieces:
//!
//! - [`locator`] — SHA-256 storage keys and `scheme://` source locators
//! - [`Backend`] — per-medium update/commit strategy
//! - [`BackendRegistry`] — scheme-token dispatch to backends
//! - [`FileObjectStore`] / [`FileBackend`] — local-file reference driver
//!   with the weak identity cache
//! - [`DictObjectStore`] — in-memory store for tests and embedding
//!
//! Concurrency: stores are safe to share across threads within one process.
//! Nothing guards against other processes using the same directory; such
//! races surface as I/O or pre-existence errors.

pub mod error;
pub mod file;
pub mod locator;
pub mod memory;
pub mod registry;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::{register_file_backend, FileBackend, FileObjectStore, FileStoreIter};
pub use locator::{file_source, scheme_of, storage_key, FILE_PREFIX, FILE_SCHEME};
pub use memory::DictObjectStore;
pub use registry::BackendRegistry;
pub use traits::{shared, Backend, ObjectStore, SharedObject, StoredObject};
