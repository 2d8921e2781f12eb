//! Local-file reference storage driver.
//!
//! [`FileObjectStore`] keeps one JSON document per identifiable object in a
//! directory, named by the identity's storage key. [`FileBackend`] is the
//! matching stateless [`Backend`] synchronizing live objects with those
//! documents through their recorded source locators.
//!
//! There is no cross-process locking: two processes sharing one directory
//! can race on add/discard/commit. Such races surface as I/O or
//! pre-existence errors, never as silent cache corruption.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock, Weak};

use dtm_model::Identifier;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::locator::{file_source, storage_key, FILE_PREFIX, FILE_SCHEME};
use crate::registry::BackendRegistry;
use crate::traits::{Backend, ObjectStore, SharedObject, StoredObject};

/// Storage document envelope: a single wrapper object whose one field holds
/// the full serialized domain object.
#[derive(Deserialize)]
struct Document<T> {
    data: T,
}

#[derive(Serialize)]
struct DocumentRef<'a, T> {
    data: &'a T,
}

/// A persistent object collection backed by one JSON file per object.
///
/// The store keeps a cache of weak references from [`Identifier`] to the
/// live replica, guaranteeing that fetching an identity twice returns the
/// *same* object while anything else still holds it. The cache never extends
/// an object's lifetime: once the last external `Arc` is dropped, the entry
/// is dead and the next fetch installs a fresh replica.
///
/// Lock discipline: the cache mutex is only acquired while holding no object
/// lock; object locks may be acquired under the cache mutex. I/O happens
/// outside the mutex except where the read result must be checked against
/// the cache atomically.
pub struct FileObjectStore<T: StoredObject> {
    directory: PathBuf,
    cache: Mutex<HashMap<Identifier, Weak<RwLock<T>>>>,
}

impl<T: StoredObject> FileObjectStore<T> {
    /// Create a store over `directory`. The directory is not touched until
    /// the first operation; see [`check_directory`](Self::check_directory).
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Fail with [`StoreError::DirectoryNotFound`] unless the storage
    /// directory exists; with `create` set, create it instead.
    pub fn check_directory(&self, create: bool) -> StoreResult<()> {
        if self.directory.exists() {
            return Ok(());
        }
        if !create {
            return Err(StoreError::DirectoryNotFound {
                path: self.directory.display().to_string(),
            });
        }
        info!(directory = %self.directory.display(), "creating storage directory");
        fs::create_dir_all(&self.directory)?;
        Ok(())
    }

    /// Fetch an object by a raw storage key, as yielded by directory
    /// iteration.
    pub fn get_by_key(&self, key: &str) -> StoreResult<SharedObject<T>> {
        self.fetch(key, key)
    }

    fn document_path(&self, key: &str) -> PathBuf {
        self.directory.join(format!("{key}.json"))
    }

    /// Read and deserialize the document for `key`, reporting a miss as
    /// [`StoreError::NotFound`] naming `described_as`.
    fn read_document(&self, key: &str, described_as: &str) -> StoreResult<T> {
        let path = self.document_path(key);
        let body = match fs::read_to_string(&path) {
            Ok(body) => body,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    identifier: described_as.to_string(),
                })
            }
            Err(err) => return Err(err.into()),
        };
        let document: Document<T> = serde_json::from_str(&body)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(document.data)
    }

    fn write_document(&self, key: &str, object: &T) -> StoreResult<()> {
        let body = serde_json::to_string_pretty(&DocumentRef { data: object })
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        fs::write(self.document_path(key), body)?;
        Ok(())
    }

    /// The identity-preservation core: load fresh state, then reconcile it
    /// with any live cached replica under the cache mutex.
    ///
    /// A cached replica is merged into (and returned) only when its recorded
    /// source still matches the locator computed for this store; a replica
    /// whose source points elsewhere apparently belongs to another store now
    /// and is silently replaced by the fresh object. (If a store is ever
    /// reconfigured to a new path, this replacement drops identity
    /// continuity for objects fetched through the old path.)
    fn fetch(&self, key: &str, described_as: &str) -> StoreResult<SharedObject<T>> {
        let mut object = self.read_document(key, described_as)?;
        let source = file_source(&self.directory, key);
        object.set_source(source.clone());
        let identifier = object.identifier().clone();

        let mut cache = self.cache.lock().expect("lock poisoned");
        if let Some(live) = cache.get(&identifier).and_then(Weak::upgrade) {
            let mut replica = live.write().expect("lock poisoned");
            if replica.source() == source {
                replica.update_from(object);
                drop(replica);
                return Ok(live);
            }
        }
        let fresh = Arc::new(RwLock::new(object));
        cache.insert(identifier, Arc::downgrade(&fresh));
        Ok(fresh)
    }

    /// Drop cache entries whose replica is gone.
    fn prune_cache(cache: &mut HashMap<Identifier, Weak<RwLock<T>>>) {
        cache.retain(|_, weak| weak.strong_count() > 0);
    }

    /// Whether a document for this object's identity exists in storage.
    pub fn contains(&self, object: &SharedObject<T>) -> StoreResult<bool> {
        let identifier = object
            .read()
            .expect("lock poisoned")
            .identifier()
            .clone();
        self.contains_id(&identifier)
    }

    /// Lazily iterate all objects in the store.
    ///
    /// The set of storage keys is snapshotted up front; each object is then
    /// resolved through the identity cache on demand, so every key's content
    /// is read fresh at iteration time and a concurrently deleted key
    /// surfaces as that item's error.
    pub fn iter(&self) -> StoreResult<FileStoreIter<'_, T>> {
        debug!(directory = %self.directory.display(), "snapshotting storage keys");
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.directory)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    keys.push(stem.to_string());
                }
            }
        }
        Ok(FileStoreIter {
            store: self,
            keys: keys.into_iter(),
        })
    }
}

impl<T: StoredObject> ObjectStore<T> for FileObjectStore<T> {
    fn get_identifiable(&self, identifier: &Identifier) -> StoreResult<SharedObject<T>> {
        self.fetch(&storage_key(identifier), &identifier.to_string())
    }

    fn add(&self, object: SharedObject<T>) -> StoreResult<()> {
        let (key, identifier) = {
            let guard = object.read().expect("lock poisoned");
            (storage_key(guard.identifier()), guard.identifier().clone())
        };
        debug!(%identifier, "adding object to file store");
        if self.document_path(&key).exists() {
            return Err(StoreError::AlreadyExists {
                identifier: identifier.to_string(),
            });
        }
        {
            let guard = object.read().expect("lock poisoned");
            self.write_document(&key, &guard)?;
        }
        {
            let mut cache = self.cache.lock().expect("lock poisoned");
            Self::prune_cache(&mut cache);
            cache.insert(identifier, Arc::downgrade(&object));
        }
        let source = file_source(&self.directory, &key);
        object.write().expect("lock poisoned").set_source(source);
        Ok(())
    }

    fn discard(&self, object: &SharedObject<T>) -> StoreResult<()> {
        let (key, identifier) = {
            let guard = object.read().expect("lock poisoned");
            (storage_key(guard.identifier()), guard.identifier().clone())
        };
        debug!(%identifier, "deleting object from file store");
        match fs::remove_file(self.document_path(&key)) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    identifier: identifier.to_string(),
                })
            }
            Err(err) => return Err(err.into()),
        }
        {
            let mut cache = self.cache.lock().expect("lock poisoned");
            cache.remove(&identifier);
            Self::prune_cache(&mut cache);
        }
        object
            .write()
            .expect("lock poisoned")
            .set_source(String::new());
        Ok(())
    }

    fn contains_id(&self, identifier: &Identifier) -> StoreResult<bool> {
        Ok(self.document_path(&storage_key(identifier)).exists())
    }

    fn len(&self) -> StoreResult<usize> {
        let mut count = 0;
        for entry in fs::read_dir(&self.directory)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                count += 1;
            }
        }
        Ok(count)
    }
}

/// Lazy iterator over a [`FileObjectStore`]'s objects; see
/// [`FileObjectStore::iter`].
pub struct FileStoreIter<'a, T: StoredObject> {
    store: &'a FileObjectStore<T>,
    keys: std::vec::IntoIter<String>,
}

impl<T: StoredObject> Iterator for FileStoreIter<'_, T> {
    type Item = StoreResult<SharedObject<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        let key = self.keys.next()?;
        Some(self.store.get_by_key(&key))
    }
}

/// Stateless [`Backend`] for objects whose source records a local file.
pub struct FileBackend;

impl FileBackend {
    /// Map a `file://localhost/...` source locator to its local file path.
    fn path_of(source: &str) -> StoreResult<PathBuf> {
        match source.strip_prefix(FILE_PREFIX) {
            Some(rest) if !rest.is_empty() => Ok(PathBuf::from(rest)),
            _ => Err(StoreError::UnresolvableSource {
                locator: source.to_string(),
            }),
        }
    }
}

impl<T: StoredObject> Backend<T> for FileBackend {
    fn update_object(
        &self,
        store_object: &SharedObject<T>,
        _relative_path: &[String],
    ) -> StoreResult<()> {
        let source = store_object
            .read()
            .expect("lock poisoned")
            .source()
            .to_string();
        let path = Self::path_of(&source)?;
        let body = fs::read_to_string(path)?;
        let document: Document<T> = serde_json::from_str(&body)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut fresh = document.data;
        fresh.set_source(source);
        store_object
            .write()
            .expect("lock poisoned")
            .update_from(fresh);
        Ok(())
    }

    fn commit_object(
        &self,
        store_object: &SharedObject<T>,
        _relative_path: &[String],
    ) -> StoreResult<()> {
        let guard = store_object.read().expect("lock poisoned");
        let path = Self::path_of(guard.source())?;
        let body = serde_json::to_string_pretty(&DocumentRef { data: &*guard })
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        fs::write(path, body)?;
        Ok(())
    }
}

/// Register the local-file backend under its `file` scheme.
pub fn register_file_backend<T: StoredObject>(registry: &BackendRegistry<T>) {
    registry.register(FILE_SCHEME, Arc::new(FileBackend));
}
