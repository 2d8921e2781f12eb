//! Validated sequence for simple repeated-reference lists.

use std::fmt;
use std::ops::Index;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};

use crate::error::{ModelError, ModelResult};

/// Per-item validation callback for a [`ConstrainedList`].
pub type ItemHook<T> = Box<dyn Fn(&T) -> ModelResult<()> + Send + Sync>;

/// A sequence that runs a per-item validator before every structural
/// mutation. If the validator rejects an item, the mutation is fully
/// rejected and the list is unchanged; `extend` validates the whole batch
/// before appending any of it.
///
/// Used for repeated-reference lists that need no name-based lookup, e.g.
/// supplemental semantic ids.
pub struct ConstrainedList<T> {
    items: Vec<T>,
    hook: Option<ItemHook<T>>,
}

impl<T> ConstrainedList<T> {
    /// Create a list without a validator.
    pub fn new(initial: impl IntoIterator<Item = T>) -> Self {
        Self {
            items: initial.into_iter().collect(),
            hook: None,
        }
    }

    /// Create a list with a per-item validator; initial items are validated.
    pub fn with_hook(
        initial: impl IntoIterator<Item = T>,
        hook: ItemHook<T>,
    ) -> ModelResult<Self> {
        let items: Vec<T> = initial.into_iter().collect();
        for item in &items {
            hook(item)?;
        }
        Ok(Self {
            items,
            hook: Some(hook),
        })
    }

    fn check(&self, item: &T) -> ModelResult<()> {
        match &self.hook {
            Some(hook) => hook(item),
            None => Ok(()),
        }
    }

    /// Append a validated item.
    pub fn push(&mut self, item: T) -> ModelResult<()> {
        self.check(&item)?;
        self.items.push(item);
        Ok(())
    }

    /// Insert a validated item at `index`.
    pub fn insert(&mut self, index: usize, item: T) -> ModelResult<()> {
        if index > self.items.len() {
            return Err(ModelError::IndexOutOfBounds {
                index,
                len: self.items.len(),
            });
        }
        self.check(&item)?;
        self.items.insert(index, item);
        Ok(())
    }

    /// Validate every item of the batch, then append all of them. A failing
    /// item means nothing is appended.
    pub fn extend(&mut self, items: impl IntoIterator<Item = T>) -> ModelResult<()> {
        let items: Vec<T> = items.into_iter().collect();
        for item in &items {
            self.check(item)?;
        }
        self.items.extend(items);
        Ok(())
    }

    /// Remove and return the item at `index`.
    pub fn remove(&mut self, index: usize) -> ModelResult<T> {
        if index >= self.items.len() {
            return Err(ModelError::IndexOutOfBounds {
                index,
                len: self.items.len(),
            });
        }
        Ok(self.items.remove(index))
    }

    /// Keep only the items the predicate accepts.
    pub fn retain(&mut self, f: impl FnMut(&T) -> bool) {
        self.items.retain(f);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T> Default for ConstrainedList<T> {
    fn default() -> Self {
        Self::new([])
    }
}

impl<T> Index<usize> for ConstrainedList<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}

impl<'a, T> IntoIterator for &'a ConstrainedList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for ConstrainedList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.items).finish()
    }
}

/// Equality compares items; hooks are configuration, not state.
impl<T: PartialEq> PartialEq for ConstrainedList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Clone> Clone for ConstrainedList<T> {
    fn clone(&self) -> Self {
        Self::new(self.items.clone())
    }
}

impl<T: Serialize> Serialize for ConstrainedList<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

/// Deserialized as a plain sequence with no validator; owners that need one
/// must reattach it.
impl<'de, T: Deserialize<'de>> Deserialize<'de> for ConstrainedList<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::new(Vec::<T>::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConstraintRule;

    fn non_empty_hook() -> ItemHook<String> {
        Box::new(|s: &String| {
            if s.is_empty() {
                return Err(ModelError::Constraint {
                    rule: ConstraintRule::TypeAgreement,
                    message: "empty reference".into(),
                });
            }
            Ok(())
        })
    }

    #[test]
    fn push_and_insert_validate() {
        let mut list = ConstrainedList::with_hook([], non_empty_hook()).unwrap();
        list.push("a".to_string()).unwrap();
        list.insert(0, "b".to_string()).unwrap();
        assert!(list.push(String::new()).is_err());
        assert_eq!(list.as_slice(), ["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn failed_extend_appends_nothing() {
        let mut list = ConstrainedList::with_hook([], non_empty_hook()).unwrap();
        list.push("a".to_string()).unwrap();
        let err = list.extend(["b".to_string(), String::new(), "c".to_string()]);
        assert!(err.is_err());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn constructor_validates_initial_items() {
        let result = ConstrainedList::with_hook([String::new()], non_empty_hook());
        assert!(result.is_err());
    }

    #[test]
    fn remove_out_of_bounds() {
        let mut list: ConstrainedList<String> = ConstrainedList::new([]);
        assert!(matches!(
            list.remove(0),
            Err(ModelError::IndexOutOfBounds { index: 0, len: 0 })
        ));
    }

    #[test]
    fn serde_roundtrip_drops_hook() {
        let list = ConstrainedList::new(["a".to_string(), "b".to_string()]);
        let json = serde_json::to_string(&list).unwrap();
        let parsed: ConstrainedList<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(list, parsed);
    }
}
