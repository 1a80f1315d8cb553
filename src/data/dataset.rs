use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use tracing::debug;

use crate::core::broadcaster::Broadcaster;
use crate::core::extent::BindingKey;
use crate::core::types::ComponentId;

/// Ordered records plus a free-form metadata object handed to accessors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub data: Vec<Value>,
    pub metadata: Value,
}

impl Dataset {
    #[must_use]
    pub fn new(data: Vec<Value>) -> Self {
        Self {
            data,
            metadata: Value::Null,
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Notification sent after a dataset's records or metadata changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetChanged {
    pub revision: u64,
}

struct DatasetCell {
    dataset: RefCell<Dataset>,
    listeners: Broadcaster<DatasetChanged>,
    revision: Cell<u64>,
}

/// Shared dataset; every mutation notifies subscribed plots.
#[derive(Clone)]
pub struct DatasetHandle {
    inner: Rc<DatasetCell>,
}

impl fmt::Debug for DatasetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetHandle")
            .field("len", &self.len())
            .field("revision", &self.inner.revision.get())
            .field("listeners", &self.inner.listeners.len())
            .finish()
    }
}

impl DatasetHandle {
    #[must_use]
    pub fn new(dataset: Dataset) -> Self {
        Self {
            inner: Rc::new(DatasetCell {
                dataset: RefCell::new(dataset),
                listeners: Broadcaster::default(),
                revision: Cell::new(0),
            }),
        }
    }

    #[must_use]
    pub fn from_values(data: Vec<Value>) -> Self {
        Self::new(Dataset::new(data))
    }

    #[must_use]
    pub fn data(&self) -> Ref<'_, [Value]> {
        Ref::map(self.inner.dataset.borrow(), |dataset| dataset.data.as_slice())
    }

    #[must_use]
    pub fn metadata(&self) -> Ref<'_, Value> {
        Ref::map(self.inner.dataset.borrow(), |dataset| &dataset.metadata)
    }

    #[must_use]
    pub fn snapshot(&self) -> Dataset {
        self.inner.dataset.borrow().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.dataset.borrow().data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.inner.revision.get()
    }

    pub fn set_data(&self, data: Vec<Value>) {
        let len = data.len();
        self.inner.dataset.borrow_mut().data = data;
        debug!(len, "dataset replaced");
        self.notify();
    }

    pub fn push(&self, datum: Value) {
        self.inner.dataset.borrow_mut().data.push(datum);
        self.notify();
    }

    pub fn set_metadata(&self, metadata: Value) {
        self.inner.dataset.borrow_mut().metadata = metadata;
        self.notify();
    }

    pub fn subscribe<F>(&self, key: BindingKey, listener: F)
    where
        F: FnMut(&DatasetChanged) + 'static,
    {
        self.inner.listeners.subscribe(key, listener);
    }

    pub fn unsubscribe(&self, key: &BindingKey) -> bool {
        self.inner.listeners.unsubscribe(key)
    }

    pub fn unsubscribe_owner(&self, owner: ComponentId) -> usize {
        self.inner.listeners.unsubscribe_owner(owner)
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn notify(&self) {
        let revision = self.inner.revision.get() + 1;
        self.inner.revision.set(revision);
        self.inner.listeners.broadcast(&DatasetChanged { revision });
    }
}

/// Data accepted by plot APIs: raw records are wrapped into a fresh dataset
/// once, at the call site.
#[derive(Debug, Clone)]
pub enum DataInput {
    Raw(Vec<Value>),
    Bound(DatasetHandle),
}

impl DataInput {
    #[must_use]
    pub fn into_handle(self) -> DatasetHandle {
        match self {
            Self::Raw(data) => DatasetHandle::from_values(data),
            Self::Bound(handle) => handle,
        }
    }
}

impl From<Vec<Value>> for DataInput {
    fn from(data: Vec<Value>) -> Self {
        Self::Raw(data)
    }
}

impl From<DatasetHandle> for DataInput {
    fn from(handle: DatasetHandle) -> Self {
        Self::Bound(handle)
    }
}

impl From<&DatasetHandle> for DataInput {
    fn from(handle: &DatasetHandle) -> Self {
        Self::Bound(handle.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use serde_json::json;

    use super::{DataInput, DatasetHandle};
    use crate::core::extent::BindingKey;
    use crate::core::types::ComponentId;

    #[test]
    fn mutations_notify_listeners_with_released_borrow() {
        let dataset = DatasetHandle::from_values(vec![json!({"y": 1})]);
        let seen_len = Rc::new(Cell::new(0));
        let reader = dataset.clone();
        let seen = Rc::clone(&seen_len);
        dataset.subscribe(BindingKey::new(ComponentId::new(1), "data"), move |_| {
            seen.set(reader.len());
        });

        dataset.push(json!({"y": 2}));
        assert_eq!(seen_len.get(), 2);
        assert_eq!(dataset.revision(), 1);
    }

    #[test]
    fn bound_input_keeps_identity() {
        let dataset = DatasetHandle::from_values(Vec::new());
        let resolved = DataInput::from(&dataset).into_handle();
        assert!(resolved.ptr_eq(&dataset));

        let raw = DataInput::from(vec![json!(1), json!(2)]).into_handle();
        assert_eq!(raw.len(), 2);
    }
}
