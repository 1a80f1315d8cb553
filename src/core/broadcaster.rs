use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::trace;

use crate::core::extent::BindingKey;
use crate::core::types::ComponentId;

type Listener<E> = Rc<RefCell<dyn FnMut(&E)>>;

/// Owner-keyed listener registry.
///
/// Registration replaces any listener already stored under the same key, so a
/// component re-binding the same attribute never ends up subscribed twice.
/// Broadcasting iterates a snapshot of the registry; listeners may subscribe
/// or unsubscribe from inside a callback. A listener that is still running
/// when the same broadcaster fires again is skipped for the nested event.
pub struct Broadcaster<E> {
    listeners: RefCell<IndexMap<BindingKey, Listener<E>>>,
}

impl<E> Default for Broadcaster<E> {
    fn default() -> Self {
        Self {
            listeners: RefCell::new(IndexMap::new()),
        }
    }
}

impl<E> fmt::Debug for Broadcaster<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.borrow();
        f.debug_struct("Broadcaster")
            .field("keys", &listeners.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<E> Broadcaster<E> {
    /// Returns `true` when an existing listener was replaced.
    pub fn subscribe<F>(&self, key: BindingKey, listener: F) -> bool
    where
        F: FnMut(&E) + 'static,
    {
        let listener: Listener<E> = Rc::new(RefCell::new(listener));
        self.listeners.borrow_mut().insert(key, listener).is_some()
    }

    pub fn unsubscribe(&self, key: &BindingKey) -> bool {
        self.listeners.borrow_mut().shift_remove(key).is_some()
    }

    pub fn unsubscribe_owner(&self, owner: ComponentId) -> usize {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|key, _| key.owner != owner);
        before - listeners.len()
    }

    #[must_use]
    pub fn contains(&self, key: &BindingKey) -> bool {
        self.listeners.borrow().contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.borrow().is_empty()
    }

    /// Notifies every listener once, returning the number actually invoked.
    pub fn broadcast(&self, event: &E) -> usize {
        let snapshot: Vec<(BindingKey, Listener<E>)> = self
            .listeners
            .borrow()
            .iter()
            .map(|(key, listener)| (key.clone(), Rc::clone(listener)))
            .collect();

        let mut invoked = 0;
        for (key, listener) in snapshot {
            // Dropped mid-broadcast by an earlier listener.
            if !self.contains(&key) {
                continue;
            }
            match listener.try_borrow_mut() {
                Ok(mut callback) => {
                    callback(event);
                    invoked += 1;
                }
                Err(_) => trace!(listener = %key, "skipping re-entrant listener"),
            }
        }
        invoked
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::Broadcaster;
    use crate::core::extent::BindingKey;
    use crate::core::types::ComponentId;

    #[test]
    fn same_key_replaces_listener() {
        let hits = Rc::new(Cell::new(0));
        let broadcaster = Broadcaster::<u32>::default();
        let key = BindingKey::new(ComponentId::new(1), "x");

        let first = Rc::clone(&hits);
        broadcaster.subscribe(key.clone(), move |_| first.set(first.get() + 1));
        let second = Rc::clone(&hits);
        assert!(broadcaster.subscribe(key, move |_| second.set(second.get() + 10)));

        assert_eq!(broadcaster.broadcast(&0), 1);
        assert_eq!(hits.get(), 10);
    }

    #[test]
    fn listener_can_unsubscribe_a_later_listener() {
        let broadcaster = Rc::new(Broadcaster::<u32>::default());
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = BindingKey::new(ComponentId::new(1), "a");
        let b = BindingKey::new(ComponentId::new(2), "b");

        let inner = Rc::clone(&broadcaster);
        let log_a = Rc::clone(&log);
        let b_key = b.clone();
        broadcaster.subscribe(a, move |_| {
            log_a.borrow_mut().push("a");
            inner.unsubscribe(&b_key);
        });
        let log_b = Rc::clone(&log);
        broadcaster.subscribe(b, move |_| log_b.borrow_mut().push("b"));

        assert_eq!(broadcaster.broadcast(&1), 1);
        assert_eq!(*log.borrow(), vec!["a"]);
    }

    #[test]
    fn unsubscribe_owner_removes_all_keys() {
        let broadcaster = Broadcaster::<()>::default();
        let owner = ComponentId::new(7);
        broadcaster.subscribe(BindingKey::new(owner, "x"), |_| {});
        broadcaster.subscribe(BindingKey::new(owner, "y"), |_| {});
        broadcaster.subscribe(BindingKey::new(ComponentId::new(8), "x"), |_| {});
        assert_eq!(broadcaster.unsubscribe_owner(owner), 2);
        assert_eq!(broadcaster.len(), 1);
    }
}
