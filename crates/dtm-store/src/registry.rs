//! Scheme-to-backend dispatch.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{StoreError, StoreResult};
use crate::locator::scheme_of;
use crate::traits::{Backend, SharedObject, StoredObject};

/// Process-wide mapping from a source-locator scheme to the [`Backend`]
/// implementation handling it.
///
/// Intended to be created and populated once at startup (applications
/// typically hold one per stored object type, e.g. in a `OnceLock`) and only
/// mutated through [`register`](Self::register). New storage drivers plug in
/// here without touching the object-store logic.
pub struct BackendRegistry<T: StoredObject> {
    backends: RwLock<HashMap<String, Arc<dyn Backend<T>>>>,
}

impl<T: StoredObject> BackendRegistry<T> {
    pub fn new() -> Self {
        Self {
            backends: RwLock::new(HashMap::new()),
        }
    }

    /// Register a backend for a scheme token, replacing any previous
    /// registration for the same scheme.
    pub fn register(&self, scheme: impl Into<String>, backend: Arc<dyn Backend<T>>) {
        self.backends
            .write()
            .expect("lock poisoned")
            .insert(scheme.into(), backend);
    }

    /// Resolve a source locator to its backend by the leading scheme token.
    pub fn resolve(&self, source: &str) -> StoreResult<Arc<dyn Backend<T>>> {
        let scheme = scheme_of(source)?;
        self.backends
            .read()
            .expect("lock poisoned")
            .get(scheme)
            .cloned()
            .ok_or_else(|| StoreError::NoBackend {
                scheme: scheme.to_string(),
            })
    }

    /// Refresh a live object from the storage recorded in its source,
    /// merging the loaded state in place.
    pub fn update_object(
        &self,
        object: &SharedObject<T>,
        relative_path: &[String],
    ) -> StoreResult<()> {
        let backend = self.resolve_for(object)?;
        backend.update_object(object, relative_path)
    }

    /// Write a live object's current state to the storage recorded in its
    /// source.
    pub fn commit_object(
        &self,
        object: &SharedObject<T>,
        relative_path: &[String],
    ) -> StoreResult<()> {
        let backend = self.resolve_for(object)?;
        backend.commit_object(object, relative_path)
    }

    fn resolve_for(&self, object: &SharedObject<T>) -> StoreResult<Arc<dyn Backend<T>>> {
        let source = object.read().expect("lock poisoned").source().to_string();
        if source.is_empty() {
            return Err(StoreError::UnresolvableSource { locator: source });
        }
        self.resolve(&source)
    }
}

impl<T: StoredObject> Default for BackendRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::shared;
    use dtm_model::{Identifiable, Identifier, Submodel};

    struct NullBackend;

    impl Backend<Submodel> for NullBackend {
        fn update_object(
            &self,
            _store_object: &SharedObject<Submodel>,
            _relative_path: &[String],
        ) -> StoreResult<()> {
            Ok(())
        }

        fn commit_object(
            &self,
            _store_object: &SharedObject<Submodel>,
            _relative_path: &[String],
        ) -> StoreResult<()> {
            Ok(())
        }
    }

    #[test]
    fn resolves_registered_scheme() {
        let registry: BackendRegistry<Submodel> = BackendRegistry::new();
        registry.register("null", Arc::new(NullBackend));
        assert!(registry.resolve("null://localhost/x/y.json").is_ok());
    }

    #[test]
    fn unregistered_scheme_is_an_error() {
        let registry: BackendRegistry<Submodel> = BackendRegistry::new();
        let err = registry.resolve("couchdb://host/db/doc").err().unwrap();
        assert!(matches!(err, StoreError::NoBackend { scheme } if scheme == "couchdb"));
    }

    #[test]
    fn object_without_source_cannot_be_routed() {
        let registry: BackendRegistry<Submodel> = BackendRegistry::new();
        registry.register("null", Arc::new(NullBackend));
        let obj = shared(Submodel::new(Identifier::iri("urn:x"), "m"));
        let err = registry.update_object(&obj, &[]).unwrap_err();
        assert!(matches!(err, StoreError::UnresolvableSource { .. }));
    }

    #[test]
    fn object_with_source_is_routed() {
        let registry: BackendRegistry<Submodel> = BackendRegistry::new();
        registry.register("null", Arc::new(NullBackend));
        let obj = shared(Submodel::new(Identifier::iri("urn:x"), "m"));
        obj.write()
            .unwrap()
            .set_source("null://localhost/x/y.json".into());
        registry.commit_object(&obj, &[]).unwrap();
    }
}
