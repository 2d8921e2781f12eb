//! Keyed, uniqueness-enforcing member collections.
//!
//! Every composite metamodel type holds its children in a [`NamespaceSet`]
//! (or its ordered sibling) instead of re-implementing ad hoc duplicate
//! checks. The collection owns its members, indexes them by one or more
//! attribute-derived keys, and maintains the member-side parent link.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::error::{ModelError, ModelResult};
use crate::traits::{KeyedMember, NamespaceMember};

static NEXT_NAMESPACE_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque process-unique token naming one containing namespace.
///
/// Minted by each collection at construction and stored on attached members
/// as their parent link. Never serialized; deserialization mints a fresh id
/// and re-parents the members it reconstructs.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespaceId(u64);

impl NamespaceId {
    fn fresh() -> Self {
        Self(NEXT_NAMESPACE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Debug for NamespaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NamespaceId({})", self.0)
    }
}

/// One attribute-derived key of a collection: the attribute's name, whether
/// two members may share a value, and how to read the value off a member.
///
/// A `None` extraction means the member has no value for this key and is
/// exempt from the uniqueness check.
pub struct KeySpec<T> {
    pub name: &'static str,
    pub unique: bool,
    pub extract: fn(&T) -> Option<String>,
}

impl<T> Clone for KeySpec<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for KeySpec<T> {}

impl<T> fmt::Debug for KeySpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySpec")
            .field("name", &self.name)
            .field("unique", &self.unique)
            .finish()
    }
}

/// An unordered collection of owned members, indexed by attribute-derived
/// keys, enforcing per-key uniqueness.
///
/// Invariants, upheld by every mutation:
/// - for every key marked unique, no two members share a non-null value;
/// - every member's parent link names this collection's [`NamespaceId`];
/// - a detached member (removed, discarded, cleared) has its parent cleared;
/// - failed mutations leave the collection unchanged.
///
/// Insertion order is preserved internally, but only
/// [`OrderedNamespaceSet`](crate::ordered::OrderedNamespaceSet) exposes it.
pub struct NamespaceSet<T> {
    ns: NamespaceId,
    specs: Vec<KeySpec<T>>,
    /// Parallel to `specs`: key value -> positions in `members`, ascending.
    /// Non-unique keys may map one value to several positions; an entry is
    /// dropped once its last position is unlinked.
    indices: Vec<HashMap<String, Vec<usize>>>,
    members: Vec<T>,
}

impl<T: NamespaceMember> NamespaceSet<T> {
    /// Create a collection with the given key table and initial members.
    ///
    /// Initial members pass through the same checks as [`add`](Self::add).
    pub fn new(
        specs: Vec<KeySpec<T>>,
        initial: impl IntoIterator<Item = T>,
    ) -> ModelResult<Self> {
        let indices = specs.iter().map(|_| HashMap::new()).collect();
        let mut set = Self {
            ns: NamespaceId::fresh(),
            specs,
            indices,
            members: Vec::new(),
        };
        for item in initial {
            set.add(item)?;
        }
        Ok(set)
    }

    /// Create an empty collection with the given key table.
    pub fn empty(specs: Vec<KeySpec<T>>) -> Self {
        let indices = specs.iter().map(|_| HashMap::new()).collect();
        Self {
            ns: NamespaceId::fresh(),
            specs,
            indices,
            members: Vec::new(),
        }
    }

    /// Add a member, enforcing uniqueness on every unique key.
    ///
    /// On success the member's parent is set to this namespace. Fails with
    /// [`ModelError::DuplicateKey`] on a key collision and
    /// [`ModelError::AlreadyOwned`] if the candidate is still attached to a
    /// namespace; in both cases nothing changes.
    pub fn add(&mut self, item: T) -> ModelResult<()> {
        self.check_new(&item)?;
        self.link_at(self.members.len(), item);
        Ok(())
    }

    /// Remove and return the member whose primary key equals `value`,
    /// clearing its parent link.
    pub fn remove(&mut self, value: &str) -> ModelResult<T> {
        let primary = match self.primary_key() {
            Some(primary) => primary,
            None => return Err(ModelError::UnknownKey { key: "" }),
        };
        match self.indices[primary].get(value).and_then(|slots| slots.first()) {
            Some(&pos) => Ok(self.unlink_at(pos)),
            None => Err(ModelError::NotFound {
                key: self.specs[primary].name,
                value: value.to_string(),
            }),
        }
    }

    /// Remove the member whose primary key equals `value`, if present.
    /// Returns whether a member was removed.
    pub fn discard(&mut self, value: &str) -> bool {
        self.remove(value).is_ok()
    }

    /// Detach and drop all members. Each member's parent is cleared before
    /// the member is dropped, so members extracted beforehand via
    /// [`remove`](Self::remove) are unaffected.
    pub fn clear(&mut self) {
        for member in &mut self.members {
            member.set_parent(None);
        }
        self.members.clear();
        for index in &mut self.indices {
            index.clear();
        }
    }

    /// Validate a candidate without mutating: ownership first, then key
    /// uniqueness.
    pub(crate) fn check_new(&self, item: &T) -> ModelResult<()> {
        if item.parent().is_some() {
            let id = self.specs.first().and_then(|s| (s.extract)(item));
            return Err(ModelError::AlreadyOwned {
                id_short: id.unwrap_or_default(),
            });
        }
        for (spec, index) in self.specs.iter().zip(&self.indices) {
            if !spec.unique {
                continue;
            }
            if let Some(value) = (spec.extract)(item) {
                if index.contains_key(&value) {
                    return Err(ModelError::DuplicateKey {
                        key: spec.name,
                        value,
                    });
                }
            }
        }
        Ok(())
    }

    /// Link a pre-validated member in at `pos`, recording it under every key
    /// and stamping its parent.
    pub(crate) fn link_at(&mut self, pos: usize, mut item: T) {
        item.set_parent(Some(self.ns));
        for index in &mut self.indices {
            for slots in index.values_mut() {
                for slot in slots.iter_mut() {
                    if *slot >= pos {
                        *slot += 1;
                    }
                }
            }
        }
        for (spec, index) in self.specs.iter().zip(&mut self.indices) {
            if let Some(value) = (spec.extract)(&item) {
                let slots = index.entry(value).or_default();
                let at = slots.partition_point(|&p| p < pos);
                slots.insert(at, pos);
            }
        }
        self.members.insert(pos, item);
    }

    /// Unlink the member at `pos`: drop its key entries, clear its parent,
    /// return it.
    pub(crate) fn unlink_at(&mut self, pos: usize) -> T {
        let mut item = self.members.remove(pos);
        for (spec, index) in self.specs.iter().zip(&mut self.indices) {
            if let Some(value) = (spec.extract)(&item) {
                if let Some(slots) = index.get_mut(&value) {
                    slots.retain(|&p| p != pos);
                    if slots.is_empty() {
                        index.remove(&value);
                    }
                }
            }
        }
        for index in &mut self.indices {
            for slots in index.values_mut() {
                for slot in slots.iter_mut() {
                    if *slot > pos {
                        *slot -= 1;
                    }
                }
            }
        }
        item.set_parent(None);
        item
    }
}

impl<T> NamespaceSet<T> {
    /// The namespace token members of this collection carry as their parent.
    pub fn namespace_id(&self) -> NamespaceId {
        self.ns
    }

    /// The key table this collection indexes by.
    pub fn key_specs(&self) -> &[KeySpec<T>] {
        &self.specs
    }

    /// Look up a member by key name and value. For a non-unique key matching
    /// several members, the one earliest in insertion order is returned.
    pub fn get(&self, key: &'static str, value: &str) -> ModelResult<&T> {
        let idx = self
            .specs
            .iter()
            .position(|s| s.name == key)
            .ok_or(ModelError::UnknownKey { key })?;
        self.indices[idx]
            .get(value)
            .and_then(|slots| slots.first())
            .map(|&pos| &self.members[pos])
            .ok_or_else(|| ModelError::NotFound {
                key,
                value: value.to_string(),
            })
    }

    /// Look up a member by the primary (first unique) key.
    pub fn get_by_key(&self, value: &str) -> Option<&T> {
        let primary = self.primary_key()?;
        self.indices[primary]
            .get(value)
            .and_then(|slots| slots.first())
            .map(|&pos| &self.members[pos])
    }

    /// Whether a member with this primary key value exists.
    pub fn contains_key(&self, value: &str) -> bool {
        match self.primary_key() {
            Some(primary) => self.indices[primary].contains_key(value),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.members.iter()
    }

    /// The members in insertion order.
    pub fn as_slice(&self) -> &[T] {
        &self.members
    }

    /// Index of the first unique key, falling back to the first key. `None`
    /// for a collection constructed without any keys, which supports no
    /// keyed lookups.
    fn primary_key(&self) -> Option<usize> {
        if self.specs.is_empty() {
            return None;
        }
        Some(self.specs.iter().position(|s| s.unique).unwrap_or(0))
    }
}

impl<T: KeyedMember> NamespaceSet<T> {
    /// Create a collection using the member type's canonical key table.
    pub fn with_default_keys(initial: impl IntoIterator<Item = T>) -> ModelResult<Self> {
        Self::new(T::key_specs().to_vec(), initial)
    }
}

impl<'a, T> IntoIterator for &'a NamespaceSet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for NamespaceSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.members).finish()
    }
}

/// Equality compares member sequences; namespace ids are process-local and
/// ignored.
impl<T: PartialEq> PartialEq for NamespaceSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.members == other.members
    }
}

impl<T: NamespaceMember + Clone> Clone for NamespaceSet<T> {
    fn clone(&self) -> Self {
        let mut clone = Self::empty(self.specs.clone());
        for member in &self.members {
            let mut member = member.clone();
            member.set_parent(None);
            // Members already satisfied the invariants in `self`.
            let pos = clone.members.len();
            clone.link_at(pos, member);
        }
        clone
    }
}

/// Serialized as the plain member sequence; key tables and namespace ids are
/// process-local configuration.
impl<T: Serialize> Serialize for NamespaceSet<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.members.len()))?;
        for member in &self.members {
            seq.serialize_element(member)?;
        }
        seq.end()
    }
}

/// Deserialization rebuilds the collection with the member type's canonical
/// key table, re-parenting members to a freshly minted namespace. A document
/// violating key uniqueness is rejected.
impl<'de, T: KeyedMember + Deserialize<'de>> Deserialize<'de> for NamespaceSet<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let members = Vec::<T>::deserialize(deserializer)?;
        Self::with_default_keys(members).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;

    #[derive(Clone, Debug, PartialEq)]
    struct Widget {
        name: String,
        tag: Option<String>,
        parent: Option<NamespaceId>,
    }

    impl Widget {
        fn new(name: &str, tag: Option<&str>) -> Self {
            Self {
                name: name.into(),
                tag: tag.map(Into::into),
                parent: None,
            }
        }
    }

    impl NamespaceMember for Widget {
        fn parent(&self) -> Option<NamespaceId> {
            self.parent
        }

        fn set_parent(&mut self, parent: Option<NamespaceId>) {
            self.parent = parent;
        }
    }

    fn widget_specs() -> Vec<KeySpec<Widget>> {
        vec![
            KeySpec {
                name: "name",
                unique: true,
                extract: |w: &Widget| Some(w.name.clone()),
            },
            KeySpec {
                name: "tag",
                unique: true,
                extract: |w: &Widget| w.tag.clone(),
            },
        ]
    }

    #[test]
    fn add_sets_parent_and_indexes() {
        let mut set = NamespaceSet::new(widget_specs(), []).unwrap();
        set.add(Widget::new("a", Some("t1"))).unwrap();
        let ns = set.namespace_id();
        assert_eq!(set.get_by_key("a").unwrap().parent, Some(ns));
        assert_eq!(set.get("tag", "t1").unwrap().name, "a");
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn duplicate_primary_key_is_rejected() {
        let mut set = NamespaceSet::new(widget_specs(), []).unwrap();
        set.add(Widget::new("a", None)).unwrap();
        let err = set.add(Widget::new("a", None)).unwrap_err();
        assert_eq!(
            err,
            ModelError::DuplicateKey {
                key: "name",
                value: "a".into()
            }
        );
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn duplicate_secondary_key_is_rejected() {
        let mut set = NamespaceSet::new(widget_specs(), []).unwrap();
        set.add(Widget::new("a", Some("t"))).unwrap();
        let err = set.add(Widget::new("b", Some("t"))).unwrap_err();
        assert!(matches!(err, ModelError::DuplicateKey { key: "tag", .. }));
        assert!(!set.contains_key("b"));
    }

    #[test]
    fn null_key_values_are_exempt_from_uniqueness() {
        let mut set = NamespaceSet::new(widget_specs(), []).unwrap();
        set.add(Widget::new("a", None)).unwrap();
        set.add(Widget::new("b", None)).unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn remove_clears_parent_and_indices() {
        let mut set = NamespaceSet::new(widget_specs(), []).unwrap();
        set.add(Widget::new("a", Some("t"))).unwrap();
        let removed = set.remove("a").unwrap();
        assert_eq!(removed.parent, None);
        assert!(set.is_empty());
        assert!(set.get("tag", "t").is_err());
        // The freed key value is usable again.
        set.add(Widget::new("a", Some("t"))).unwrap();
    }

    #[test]
    fn remove_missing_is_not_found() {
        let mut set = NamespaceSet::new(widget_specs(), []).unwrap();
        assert!(matches!(
            set.remove("ghost"),
            Err(ModelError::NotFound { key: "name", .. })
        ));
        assert!(!set.discard("ghost"));
    }

    #[test]
    fn adding_owned_member_fails_and_leaves_both_sets_unchanged() {
        let mut first = NamespaceSet::new(widget_specs(), []).unwrap();
        first.add(Widget::new("a", None)).unwrap();
        let owned = first.get_by_key("a").unwrap().clone();

        let mut second = NamespaceSet::new(widget_specs(), []).unwrap();
        let err = second.add(owned).unwrap_err();
        assert_eq!(err, ModelError::AlreadyOwned { id_short: "a".into() });
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
        // Detach first, then the move is allowed.
        let freed = first.remove("a").unwrap();
        second.add(freed).unwrap();
        assert_eq!(second.get_by_key("a").unwrap().parent, Some(second.namespace_id()));
    }

    fn shared_tag_specs() -> Vec<KeySpec<Widget>> {
        vec![
            KeySpec {
                name: "name",
                unique: true,
                extract: |w: &Widget| Some(w.name.clone()),
            },
            KeySpec {
                name: "tag",
                unique: false,
                extract: |w: &Widget| w.tag.clone(),
            },
        ]
    }

    #[test]
    fn non_unique_key_tracks_every_holder() {
        let mut set = NamespaceSet::new(shared_tag_specs(), []).unwrap();
        set.add(Widget::new("a", Some("x"))).unwrap();
        set.add(Widget::new("b", Some("x"))).unwrap();
        // The earliest member in order wins the lookup.
        assert_eq!(set.get("tag", "x").unwrap().name, "a");

        // Removing one holder must not make the other unreachable.
        set.remove("b").unwrap();
        assert_eq!(set.get("tag", "x").unwrap().name, "a");
        set.remove("a").unwrap();
        assert!(matches!(
            set.get("tag", "x"),
            Err(ModelError::NotFound { key: "tag", .. })
        ));
    }

    #[test]
    fn non_unique_key_survives_removal_of_the_first_holder() {
        let mut set = NamespaceSet::new(shared_tag_specs(), []).unwrap();
        set.add(Widget::new("a", Some("x"))).unwrap();
        set.add(Widget::new("b", Some("x"))).unwrap();
        set.remove("a").unwrap();
        assert_eq!(set.get("tag", "x").unwrap().name, "b");
    }

    #[test]
    fn keyless_collection_supports_no_keyed_lookups() {
        let mut set = NamespaceSet::new(Vec::new(), [Widget::new("a", None)]).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.get_by_key("a").is_none());
        assert!(!set.contains_key("a"));
        assert!(matches!(
            set.remove("a"),
            Err(ModelError::UnknownKey { .. })
        ));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn unknown_key_name_is_rejected() {
        let set = NamespaceSet::new(widget_specs(), []).unwrap();
        assert_eq!(
            set.get("color", "x").unwrap_err(),
            ModelError::UnknownKey { key: "color" }
        );
    }

    #[test]
    fn clear_detaches_all_members() {
        let mut set = NamespaceSet::new(
            widget_specs(),
            [Widget::new("a", None), Widget::new("b", None)],
        )
        .unwrap();
        set.clear();
        assert!(set.is_empty());
        assert!(!set.contains_key("a"));
    }

    #[test]
    fn clone_gets_fresh_namespace() {
        let mut set = NamespaceSet::new(widget_specs(), []).unwrap();
        set.add(Widget::new("a", None)).unwrap();
        let clone = set.clone();
        assert_ne!(set.namespace_id(), clone.namespace_id());
        assert_eq!(
            clone.get_by_key("a").unwrap().parent,
            Some(clone.namespace_id())
        );
    }

    mod random_sequences {
        use super::*;
        use proptest::prelude::*;

        #[derive(Clone, Debug)]
        enum Op {
            Add { name: u8, tag: Option<u8> },
            Remove { name: u8 },
        }

        fn op_strategy() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0u8..8, proptest::option::of(0u8..4))
                    .prop_map(|(name, tag)| Op::Add { name, tag }),
                (0u8..8).prop_map(|name| Op::Remove { name }),
            ]
        }

        proptest! {
            /// No add/remove sequence can make two members share a value
            /// for a unique key.
            #[test]
            fn unique_keys_stay_unique(ops in proptest::collection::vec(op_strategy(), 1..64)) {
                let mut set = NamespaceSet::new(widget_specs(), []).unwrap();
                for op in ops {
                    match op {
                        Op::Add { name, tag } => {
                            let tag = tag.map(|t| format!("t{t}"));
                            let _ = set.add(Widget::new(&format!("w{name}"), tag.as_deref()));
                        }
                        Op::Remove { name } => {
                            let _ = set.discard(&format!("w{name}"));
                        }
                    }
                    let members = set.as_slice();
                    for spec in set.key_specs().iter().filter(|s| s.unique) {
                        let mut seen = std::collections::HashSet::new();
                        for value in members.iter().filter_map(|m| (spec.extract)(m)) {
                            prop_assert!(seen.insert(value), "duplicate under {}", spec.name);
                        }
                    }
                    for member in members {
                        prop_assert_eq!(member.parent, Some(set.namespace_id()));
                    }
                }
            }
        }
    }
}
