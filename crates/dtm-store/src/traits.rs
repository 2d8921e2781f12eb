use std::sync::{Arc, RwLock};

use dtm_model::{Identifiable, Identifier};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreResult;

/// The process-wide live replica of a stored object.
///
/// Stores hand out `SharedObject` handles and guarantee at most one per
/// [`Identifier`]: as long as any holder keeps the `Arc` alive, repeated
/// fetches return the same allocation with freshly merged state.
pub type SharedObject<T> = Arc<RwLock<T>>;

/// Convenience constructor wrapping a plain object into a shared handle.
pub fn shared<T>(object: T) -> SharedObject<T> {
    Arc::new(RwLock::new(object))
}

/// Bound for objects an object store can persist: identifiable, serializable
/// and safe to share across threads. Blanket-implemented.
pub trait StoredObject:
    Identifiable + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> StoredObject for T where
    T: Identifiable + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

/// A storage-specific strategy for synchronizing one live object with its
/// durable document. Backends are stateless: everything they need is the
/// object's recorded source locator.
///
/// `relative_path` names the element inside the owning object the caller
/// actually changed or wants refreshed, for drivers capable of partial
/// synchronization; drivers that only handle whole documents (like the
/// local-file backend) ignore it.
pub trait Backend<T: StoredObject>: Send + Sync {
    /// Read the object's document from storage and merge the loaded state
    /// into the live object in place.
    fn update_object(
        &self,
        store_object: &SharedObject<T>,
        relative_path: &[String],
    ) -> StoreResult<()>;

    /// Serialize the live object's current state and overwrite its document
    /// in storage.
    fn commit_object(
        &self,
        store_object: &SharedObject<T>,
        relative_path: &[String],
    ) -> StoreResult<()>;
}

/// A persistent collection of top-level identifiable objects.
///
/// Implementations must preserve referential stability: two
/// `get_identifiable` calls for one identity return the same
/// [`SharedObject`] as long as anything still holds the first result.
pub trait ObjectStore<T: StoredObject>: Send + Sync {
    /// Fetch the object with this identity, merging fresh storage state into
    /// the live replica if one exists.
    fn get_identifiable(&self, identifier: &Identifier) -> StoreResult<SharedObject<T>>;

    /// Add a new object. Fails with
    /// [`StoreError::AlreadyExists`](crate::StoreError::AlreadyExists) if a
    /// document for its identity is present.
    fn add(&self, object: SharedObject<T>) -> StoreResult<()>;

    /// Delete the object's document, clearing its recorded source.
    fn discard(&self, object: &SharedObject<T>) -> StoreResult<()>;

    /// Whether a document for this identity exists. Pure storage check, no
    /// cache interaction.
    fn contains_id(&self, identifier: &Identifier) -> StoreResult<bool>;

    /// Number of documents in the medium.
    fn len(&self) -> StoreResult<usize>;

    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}
