//! Storage keys and source locators.
//!
//! A source locator is a string of the form
//! `"<scheme>://localhost/<store-path>/<storage-key>.<ext>"` recorded on
//! every stored object; the scheme token is what the backend registry
//! dispatches on. Storage keys are content-addressed: the lowercase hex
//! SHA-256 digest of `"{KIND}-{id}"`, so a given identity always maps to the
//! same document name.

use std::path::Path;

use dtm_model::Identifier;
use sha2::{Digest, Sha256};

use crate::error::{StoreError, StoreResult};

/// Scheme token of the local-file reference backend.
pub const FILE_SCHEME: &str = "file";

/// Locator prefix stripped to obtain a local file path.
pub const FILE_PREFIX: &str = "file://localhost/";

/// Derive the storage key for an identifier:
/// `hex(sha256("{KIND}-{id}"))`.
pub fn storage_key(identifier: &Identifier) -> String {
    let mut hasher = Sha256::new();
    hasher.update(identifier.kind().as_str().as_bytes());
    hasher.update(b"-");
    hasher.update(identifier.id().as_bytes());
    hex::encode(hasher.finalize())
}

/// The canonical source locator for a document of a file store rooted at
/// `directory`.
pub fn file_source(directory: &Path, key: &str) -> String {
    format!("{FILE_PREFIX}{}/{key}.json", directory.display())
}

/// Parse the leading scheme token of a source locator.
pub fn scheme_of(source: &str) -> StoreResult<&str> {
    match source.split_once("://") {
        Some((scheme, _)) if !scheme.is_empty() => Ok(scheme),
        _ => Err(StoreError::UnresolvableSource {
            locator: source.to_string(),
        }),
    }
}
