//! Order-preserving keyed collection with a secondary constraint hook.

use std::fmt;
use std::ops::Index;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};

use crate::error::{ModelError, ModelResult};
use crate::namespace::{KeySpec, NamespaceId, NamespaceSet};
use crate::traits::{KeyedMember, NamespaceMember};

/// Secondary insertion validator: receives the candidate and the current
/// member sequence, and may reject the insertion with
/// [`ModelError::Constraint`]. Runs after the uniqueness check and before the
/// member is linked in.
pub type ConstraintHook<T> = Box<dyn Fn(&T, &[T]) -> ModelResult<()> + Send + Sync>;

/// A [`NamespaceSet`] whose member order is stable and externally
/// observable, with an optional cross-member constraint hook.
///
/// Positional operations (`insert`, `remove_at`, `truncate`) and the bulk
/// operations (`extend`, `set_members`) all decompose into the same
/// per-item check-then-link path, so the uniqueness and hook invariants can
/// never be bypassed. A failed validation leaves the collection unchanged.
pub struct OrderedNamespaceSet<T> {
    inner: NamespaceSet<T>,
    hook: Option<ConstraintHook<T>>,
}

impl<T: NamespaceMember> OrderedNamespaceSet<T> {
    /// Create an ordered collection with the given key table, initial
    /// members, and optional constraint hook. Initial members pass through
    /// the full insertion path.
    pub fn new(
        specs: Vec<KeySpec<T>>,
        initial: impl IntoIterator<Item = T>,
        hook: Option<ConstraintHook<T>>,
    ) -> ModelResult<Self> {
        let mut set = Self {
            inner: NamespaceSet::empty(specs),
            hook,
        };
        for item in initial {
            set.push(item)?;
        }
        Ok(set)
    }

    pub fn namespace_id(&self) -> NamespaceId {
        self.inner.namespace_id()
    }

    /// Append a member, running the uniqueness check and then the hook.
    pub fn push(&mut self, item: T) -> ModelResult<()> {
        self.insert(self.inner.len(), item)
    }

    /// Insert a member at `index`, running the uniqueness check and then the
    /// hook. Nothing changes on failure.
    pub fn insert(&mut self, index: usize, item: T) -> ModelResult<()> {
        if index > self.inner.len() {
            return Err(ModelError::IndexOutOfBounds {
                index,
                len: self.inner.len(),
            });
        }
        self.inner.check_new(&item)?;
        if let Some(hook) = &self.hook {
            hook(&item, self.inner.as_slice())?;
        }
        self.inner.link_at(index, item);
        Ok(())
    }

    /// Append each item in turn through the full insertion path. If any item
    /// fails, the ones inserted before it are unlinked again, leaving the
    /// collection exactly as it was; the batch is consumed either way.
    pub fn extend(&mut self, items: impl IntoIterator<Item = T>) -> ModelResult<()> {
        let start = self.inner.len();
        for item in items {
            if let Err(err) = self.push(item) {
                while self.inner.len() > start {
                    let pos = self.inner.len() - 1;
                    self.inner.unlink_at(pos);
                }
                return Err(err);
            }
        }
        Ok(())
    }

    /// Replace the whole membership through the full insertion path. On
    /// failure the previous members are re-linked, leaving the collection
    /// unchanged.
    pub fn set_members(&mut self, items: impl IntoIterator<Item = T>) -> ModelResult<()> {
        let mut old = Vec::with_capacity(self.inner.len());
        while !self.inner.is_empty() {
            let pos = self.inner.len() - 1;
            old.push(self.inner.unlink_at(pos));
        }
        old.reverse();
        match self.extend(items) {
            Ok(()) => Ok(()),
            Err(err) => {
                // extend rolled itself back to empty; the old members still
                // satisfy the invariants, so re-link them directly.
                for item in old {
                    let pos = self.inner.len();
                    self.inner.link_at(pos, item);
                }
                Err(err)
            }
        }
    }

    /// Remove and return the member at `index`, clearing its parent.
    pub fn remove_at(&mut self, index: usize) -> ModelResult<T> {
        if index >= self.inner.len() {
            return Err(ModelError::IndexOutOfBounds {
                index,
                len: self.inner.len(),
            });
        }
        Ok(self.inner.unlink_at(index))
    }

    /// Detach and drop all members past `len`.
    pub fn truncate(&mut self, len: usize) {
        while self.inner.len() > len {
            let pos = self.inner.len() - 1;
            self.inner.unlink_at(pos);
        }
    }

    pub fn get_at(&self, index: usize) -> Option<&T> {
        self.inner.as_slice().get(index)
    }

    /// Remove and return the member with this primary key value.
    pub fn remove(&mut self, value: &str) -> ModelResult<T> {
        self.inner.remove(value)
    }

    pub fn discard(&mut self, value: &str) -> bool {
        self.inner.discard(value)
    }

    pub fn get(&self, key: &'static str, value: &str) -> ModelResult<&T> {
        self.inner.get(key, value)
    }

    pub fn get_by_key(&self, value: &str) -> Option<&T> {
        self.inner.get_by_key(value)
    }

    pub fn contains_key(&self, value: &str) -> bool {
        self.inner.contains_key(value)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.inner.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        self.inner.as_slice()
    }

    pub fn clear(&mut self) {
        self.inner.clear()
    }
}

impl<T: KeyedMember> OrderedNamespaceSet<T> {
    /// Create an ordered collection using the member type's canonical key
    /// table.
    pub fn with_default_keys(
        initial: impl IntoIterator<Item = T>,
        hook: Option<ConstraintHook<T>>,
    ) -> ModelResult<Self> {
        Self::new(T::key_specs().to_vec(), initial, hook)
    }
}

impl<T> Index<usize> for OrderedNamespaceSet<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.inner.as_slice()[index]
    }
}

impl<'a, T> IntoIterator for &'a OrderedNamespaceSet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for OrderedNamespaceSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.inner.iter()).finish()
    }
}

/// Equality compares member sequences; hooks are configuration, not state.
impl<T: PartialEq> PartialEq for OrderedNamespaceSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T: Serialize> Serialize for OrderedNamespaceSet<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.inner.serialize(serializer)
    }
}

/// Deserialization rebuilds with the canonical key table and no hook; types
/// that need a hook reattach it in their own deserialization (see
/// `ElementList`).
impl<'de, T: KeyedMember + Deserialize<'de>> Deserialize<'de> for OrderedNamespaceSet<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let members = Vec::<T>::deserialize(deserializer)?;
        Self::with_default_keys(members, None).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConstraintRule;

    #[derive(Clone, Debug, PartialEq)]
    struct Item {
        name: String,
        flavor: &'static str,
        parent: Option<NamespaceId>,
    }

    impl Item {
        fn new(name: &str, flavor: &'static str) -> Self {
            Self {
                name: name.into(),
                flavor,
                parent: None,
            }
        }
    }

    impl NamespaceMember for Item {
        fn parent(&self) -> Option<NamespaceId> {
            self.parent
        }

        fn set_parent(&mut self, parent: Option<NamespaceId>) {
            self.parent = parent;
        }
    }

    fn specs() -> Vec<KeySpec<Item>> {
        vec![KeySpec {
            name: "name",
            unique: true,
            extract: |i: &Item| Some(i.name.clone()),
        }]
    }

    /// All members must share one flavor.
    fn flavor_hook() -> ConstraintHook<Item> {
        Box::new(|new, existing| {
            if let Some(first) = existing.first() {
                if first.flavor != new.flavor {
                    return Err(ModelError::Constraint {
                        rule: ConstraintRule::TypeAgreement,
                        message: format!(
                            "expected flavor {:?}, got {:?}",
                            first.flavor, new.flavor
                        ),
                    });
                }
            }
            Ok(())
        })
    }

    #[test]
    fn order_is_stable_under_insert() {
        let mut set = OrderedNamespaceSet::new(specs(), [], None).unwrap();
        set.push(Item::new("a", "x")).unwrap();
        set.push(Item::new("c", "x")).unwrap();
        set.insert(1, Item::new("b", "x")).unwrap();
        let names: Vec<&str> = set.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(set[2].name, "c");
        // Key lookup still agrees with positions after the shift.
        assert_eq!(set.get_by_key("c").unwrap().name, "c");
    }

    #[test]
    fn hook_runs_after_uniqueness_check() {
        let mut set = OrderedNamespaceSet::new(specs(), [], Some(flavor_hook())).unwrap();
        set.push(Item::new("a", "x")).unwrap();
        // Duplicate name reported as a key collision, not a constraint.
        let err = set.push(Item::new("a", "y")).unwrap_err();
        assert!(matches!(err, ModelError::DuplicateKey { .. }));
        // Fresh name but wrong flavor trips the hook.
        let err = set.push(Item::new("b", "y")).unwrap_err();
        assert!(matches!(
            err,
            ModelError::Constraint {
                rule: ConstraintRule::TypeAgreement,
                ..
            }
        ));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn failed_extend_rolls_back() {
        let mut set = OrderedNamespaceSet::new(specs(), [], Some(flavor_hook())).unwrap();
        set.push(Item::new("a", "x")).unwrap();
        let err = set
            .extend([
                Item::new("b", "x"),
                Item::new("c", "y"), // wrong flavor
                Item::new("d", "x"),
            ])
            .unwrap_err();
        assert!(matches!(err, ModelError::Constraint { .. }));
        assert_eq!(set.len(), 1);
        assert!(!set.contains_key("b"));
    }

    #[test]
    fn remove_at_preserves_remaining_order() {
        let mut set = OrderedNamespaceSet::new(
            specs(),
            [Item::new("a", "x"), Item::new("b", "x"), Item::new("c", "x")],
            None,
        )
        .unwrap();
        let removed = set.remove_at(1).unwrap();
        assert_eq!(removed.name, "b");
        assert_eq!(removed.parent, None);
        let names: Vec<&str> = set.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["a", "c"]);
        assert_eq!(set.get_by_key("c").unwrap().name, "c");
    }

    #[test]
    fn out_of_bounds_positions_are_rejected() {
        let mut set = OrderedNamespaceSet::new(specs(), [], None).unwrap();
        assert!(matches!(
            set.insert(1, Item::new("a", "x")),
            Err(ModelError::IndexOutOfBounds { index: 1, len: 0 })
        ));
        assert!(set.remove_at(0).is_err());
    }

    #[test]
    fn set_members_replaces_whole_membership() {
        let mut set = OrderedNamespaceSet::new(
            specs(),
            [Item::new("a", "x"), Item::new("b", "x")],
            None,
        )
        .unwrap();
        set.set_members([Item::new("z", "x")]).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.contains_key("z"));
        assert!(!set.contains_key("a"));
    }

    #[test]
    fn failed_set_members_restores_previous_membership() {
        let mut set = OrderedNamespaceSet::new(
            specs(),
            [Item::new("a", "x"), Item::new("b", "x")],
            None,
        )
        .unwrap();
        // The replacement batch collides with itself.
        let err = set
            .set_members([Item::new("z", "x"), Item::new("z", "x")])
            .unwrap_err();
        assert!(matches!(err, ModelError::DuplicateKey { .. }));
        let names: Vec<&str> = set.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(
            set.get_by_key("a").unwrap().parent,
            Some(set.namespace_id())
        );
        assert!(!set.contains_key("z"));
    }

    #[test]
    fn truncate_detaches_tail() {
        let mut set = OrderedNamespaceSet::new(
            specs(),
            [Item::new("a", "x"), Item::new("b", "x"), Item::new("c", "x")],
            None,
        )
        .unwrap();
        set.truncate(1);
        assert_eq!(set.len(), 1);
        assert!(set.contains_key("a"));
        assert!(!set.contains_key("c"));
    }
}
