use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexSet;
use tracing::trace;

use crate::core::types::ComponentId;

/// What a dirty component needs before its next paint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Invalidation {
    /// Repaint with the current layout.
    Render,
    /// Recompute layout, then repaint.
    Layout,
}

#[derive(Debug, Default)]
struct QueueState {
    dirty: IndexSet<ComponentId>,
    needs_layout: bool,
}

/// Coalescing set of components waiting for a repaint.
///
/// Cloning shares the same queue; components receive a clone on anchor.
#[derive(Debug, Clone, Default)]
pub struct RenderQueue {
    state: Rc<RefCell<QueueState>>,
}

impl RenderQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `component` dirty; repeated requests before a flush coalesce.
    pub fn request(&self, component: ComponentId, invalidation: Invalidation) {
        let mut state = self.state.borrow_mut();
        let inserted = state.dirty.insert(component);
        state.needs_layout |= invalidation == Invalidation::Layout;
        if inserted {
            trace!(%component, ?invalidation, "component queued for repaint");
        }
    }

    #[must_use]
    pub fn is_dirty(&self, component: ComponentId) -> bool {
        self.state.borrow().dirty.contains(&component)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.borrow().dirty.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.borrow().dirty.len()
    }

    /// Takes the pending set, returning the ids and whether any of them asked
    /// for a re-layout.
    pub fn drain(&self) -> (Vec<ComponentId>, bool) {
        let mut state = self.state.borrow_mut();
        let needs_layout = std::mem::take(&mut state.needs_layout);
        let dirty = std::mem::take(&mut state.dirty);
        (dirty.into_iter().collect(), needs_layout)
    }

    /// Drops a pending request, used when a component is detached.
    pub fn cancel(&self, component: ComponentId) -> bool {
        self.state.borrow_mut().dirty.shift_remove(&component)
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

#[cfg(test)]
mod tests {
    use super::{Invalidation, RenderQueue};
    use crate::core::types::ComponentId;

    #[test]
    fn repeated_requests_coalesce() {
        let queue = RenderQueue::new();
        let id = ComponentId::new(3);
        queue.request(id, Invalidation::Render);
        queue.clone().request(id, Invalidation::Layout);
        assert_eq!(queue.len(), 1);

        let (dirty, needs_layout) = queue.drain();
        assert_eq!(dirty, vec![id]);
        assert!(needs_layout);
        assert!(queue.is_empty());
    }

    #[test]
    fn cancel_removes_pending_component() {
        let queue = RenderQueue::new();
        let id = ComponentId::new(4);
        queue.request(id, Invalidation::Render);
        assert!(queue.cancel(id));
        assert!(!queue.is_dirty(id));
    }
}
