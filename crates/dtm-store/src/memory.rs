//! In-memory object store for tests and ephemeral use.

use std::collections::HashMap;
use std::sync::RwLock;

use dtm_model::Identifier;

use crate::error::{StoreError, StoreResult};
use crate::traits::{ObjectStore, SharedObject, StoredObject};

/// An [`ObjectStore`] holding its objects in a `HashMap` behind a `RwLock`.
///
/// The map holds strong references, so identity preservation is trivial:
/// every fetch returns the one stored handle. Objects never get a source
/// locator — there is no durable document to record. Data is lost when the
/// store is dropped.
pub struct DictObjectStore<T: StoredObject> {
    objects: RwLock<HashMap<Identifier, SharedObject<T>>>,
}

impl<T: StoredObject> DictObjectStore<T> {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Drop all objects.
    pub fn clear(&self) {
        self.objects.write().expect("lock poisoned").clear();
    }

    /// Snapshot of all stored handles.
    pub fn values(&self) -> Vec<SharedObject<T>> {
        self.objects
            .read()
            .expect("lock poisoned")
            .values()
            .cloned()
            .collect()
    }
}

impl<T: StoredObject> Default for DictObjectStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: StoredObject> ObjectStore<T> for DictObjectStore<T> {
    fn get_identifiable(&self, identifier: &Identifier) -> StoreResult<SharedObject<T>> {
        self.objects
            .read()
            .expect("lock poisoned")
            .get(identifier)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                identifier: identifier.to_string(),
            })
    }

    fn add(&self, object: SharedObject<T>) -> StoreResult<()> {
        let identifier = object.read().expect("lock poisoned").identifier().clone();
        let mut objects = self.objects.write().expect("lock poisoned");
        if objects.contains_key(&identifier) {
            return Err(StoreError::AlreadyExists {
                identifier: identifier.to_string(),
            });
        }
        objects.insert(identifier, object);
        Ok(())
    }

    fn discard(&self, object: &SharedObject<T>) -> StoreResult<()> {
        let identifier = object.read().expect("lock poisoned").identifier().clone();
        let removed = self
            .objects
            .write()
            .expect("lock poisoned")
            .remove(&identifier);
        match removed {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound {
                identifier: identifier.to_string(),
            }),
        }
    }

    fn contains_id(&self, identifier: &Identifier) -> StoreResult<bool> {
        Ok(self
            .objects
            .read()
            .expect("lock poisoned")
            .contains_key(identifier))
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.objects.read().expect("lock poisoned").len())
    }
}
