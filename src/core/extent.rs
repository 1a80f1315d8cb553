use std::fmt;

use indexmap::IndexMap;

use crate::core::types::ComponentId;

/// Composite `(owner, attribute)` key for extent entries and listeners.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingKey {
    pub owner: ComponentId,
    pub attr: String,
}

impl BindingKey {
    #[must_use]
    pub fn new(owner: ComponentId, attr: impl Into<String>) -> Self {
        Self {
            owner,
            attr: attr.into(),
        }
    }
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.owner, self.attr)
    }
}

/// Registry of extents contributed to one scale.
///
/// Entries are kept in registration order so aggregate computations are
/// deterministic across runs.
#[derive(Debug, Clone)]
pub struct ExtentRegistry<E> {
    entries: IndexMap<BindingKey, E>,
}

impl<E> Default for ExtentRegistry<E> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<E: PartialEq> ExtentRegistry<E> {
    /// Stores `extent` under `key`; returns `false` when the stored value was
    /// already identical.
    pub fn insert(&mut self, key: BindingKey, extent: E) -> bool {
        match self.entries.get(&key) {
            Some(existing) if *existing == extent => false,
            _ => {
                self.entries.insert(key, extent);
                true
            }
        }
    }
}

impl<E> ExtentRegistry<E> {
    /// Removes the entry; `shift_remove` keeps the remaining order intact.
    pub fn remove(&mut self, key: &BindingKey) -> Option<E> {
        self.entries.shift_remove(key)
    }

    /// Drops every entry belonging to `owner`, returning how many were removed.
    pub fn remove_owner(&mut self, owner: ComponentId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| key.owner != owner);
        before - self.entries.len()
    }

    #[must_use]
    pub fn get(&self, key: &BindingKey) -> Option<&E> {
        self.entries.get(key)
    }

    pub fn values(&self) -> impl Iterator<Item = &E> {
        self.entries.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &BindingKey> {
        self.entries.keys()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{BindingKey, ExtentRegistry};
    use crate::core::types::ComponentId;

    #[test]
    fn identical_insert_reports_no_change() {
        let mut registry = ExtentRegistry::default();
        let key = BindingKey::new(ComponentId::new(1), "y");
        assert!(registry.insert(key.clone(), (0.0, 10.0)));
        assert!(!registry.insert(key.clone(), (0.0, 10.0)));
        assert!(registry.insert(key, (0.0, 11.0)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_owner_only_drops_that_owner() {
        let mut registry = ExtentRegistry::default();
        registry.insert(BindingKey::new(ComponentId::new(1), "x"), (0.0, 1.0));
        registry.insert(BindingKey::new(ComponentId::new(1), "y"), (0.0, 2.0));
        registry.insert(BindingKey::new(ComponentId::new(2), "y"), (0.0, 3.0));

        assert_eq!(registry.remove_owner(ComponentId::new(1)), 2);
        assert_eq!(registry.values().copied().collect::<Vec<_>>(), vec![(0.0, 3.0)]);
        assert!(registry.remove(&BindingKey::new(ComponentId::new(9), "y")).is_none());
    }
}
