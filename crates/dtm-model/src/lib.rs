//! Core metamodel for the DTM digital twin library.
//!
//! This crate provides the identity primitives, the constrained-collection
//! framework every composite type holds its children in, and a compact
//! element catalogue built on top of it. Persistence lives in `dtm-store`.
//!
//! # Key types
//!
//! - [`Identifier`] — globally unique name of a top-level object
//! - [`NamespaceSet`] — owned member collection with per-key uniqueness and
//!   parent back-references
//! - [`OrderedNamespaceSet`] — adds stable ordering and a cross-member
//!   constraint hook
//! - [`ConstrainedList`] — validated plain sequence
//! - [`Submodel`] — the top-level [`Identifiable`] domain object

pub mod elements;
pub mod error;
pub mod identifier;
pub mod list;
pub mod namespace;
pub mod ordered;
pub mod traits;

pub use elements::{
    Element, ElementKind, ElementList, Property, Qualifier, Range, Reference, Submodel,
    ValueType,
};
pub use error::{ConstraintRule, ModelError, ModelResult};
pub use identifier::{Identifier, IdentifierKind};
pub use list::{ConstrainedList, ItemHook};
pub use namespace::{KeySpec, NamespaceId, NamespaceSet};
pub use ordered::{ConstraintHook, OrderedNamespaceSet};
pub use traits::{Identifiable, KeyedMember, NamespaceMember, Referable};
