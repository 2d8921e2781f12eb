use crate::identifier::Identifier;
use crate::namespace::{KeySpec, NamespaceId};

/// An object that can be held by a constrained collection.
///
/// The parent link is a plain copyable token naming the containing namespace.
/// It is a lookup relation only: true ownership always flows one way,
/// container to member, so reference cycles cannot form. Collections manage
/// the link themselves; application code should treat it as read-only.
pub trait NamespaceMember {
    /// The namespace currently containing this object, if attached.
    fn parent(&self) -> Option<NamespaceId>;

    /// Set or clear the containing namespace. Called by collections on
    /// attach/detach.
    fn set_parent(&mut self, parent: Option<NamespaceId>);
}

/// An object nameable within its immediate container by a local short id.
pub trait Referable: NamespaceMember {
    /// Identifying string of the object within its namespace.
    fn id_short(&self) -> &str;
}

/// A top-level, globally addressable domain object.
///
/// Exactly one live in-memory replica per [`Identifier`] should exist in a
/// process for objects retrieved through an object store; the store's
/// identity cache enforces this.
pub trait Identifiable: Referable {
    /// The globally unique identity. Immutable once assigned.
    fn identifier(&self) -> &Identifier;

    /// The source locator recording which backend currently backs this
    /// object. Empty when the object is not backed by storage.
    fn source(&self) -> &str;

    /// Update the recorded source locator. Called by object stores.
    fn set_source(&mut self, source: String);

    /// Merge freshly loaded state into `self` in place, preserving `self`'s
    /// parent link. This is how a store reconciles a re-read document with
    /// the live replica other code may still be holding.
    fn update_from(&mut self, other: Self)
    where
        Self: Sized;
}

/// A member type with a canonical key table.
///
/// Collections constructed explicitly take their key specs as an argument;
/// collections reconstructed from a serialized member sequence use the
/// canonical table instead.
pub trait KeyedMember: NamespaceMember + Sized + 'static {
    /// The attribute keys this type is indexed by, in priority order. The
    /// first unique entry is the primary lookup key.
    fn key_specs() -> &'static [KeySpec<Self>];
}
