//! Records and references to records
//!
//! `Record` is a shared handle to a loaded entity. Its identity can change
//! exactly once in the interesting direction (new or temporary to persistent),
//! and every change is announced to subscribed `IdentityChangeListener`s in two
//! phases so that identity-keyed containers can re-key their entries.
//!
//! `Identifiable` is what callers hand to collections: either a bare id or a
//! loaded record.

use crate::traits::IdentityChangeListener;
use crate::types::RecordId;
use parking_lot::{Mutex, RwLock};
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::{Arc, Weak};

/// Shared handle to a loaded record
///
/// Cloning is cheap and yields a handle to the same record.
#[derive(Clone)]
pub struct Record {
    inner: Arc<RecordInner>,
}

struct RecordInner {
    id: RwLock<RecordId>,
    content: RwLock<JsonValue>,
    listeners: Mutex<Vec<Weak<dyn IdentityChangeListener>>>,
}

impl Record {
    /// Create an unsaved record with a fresh `New` id
    pub fn new(content: JsonValue) -> Self {
        Self::with_identity(RecordId::new_transient(), content)
    }

    /// Create a record with a known identity (used by stores when materializing)
    pub fn with_identity(id: RecordId, content: JsonValue) -> Self {
        Self {
            inner: Arc::new(RecordInner {
                id: RwLock::new(id),
                content: RwLock::new(content),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Current identity
    #[inline]
    pub fn identity(&self) -> RecordId {
        *self.inner.id.read()
    }

    /// Snapshot of the record payload
    pub fn content(&self) -> JsonValue {
        self.inner.content.read().clone()
    }

    /// Replace the record payload
    pub fn set_content(&self, content: JsonValue) {
        *self.inner.content.write() = content;
    }

    /// True if both handles point at the same record
    pub fn ptr_eq(&self, other: &Record) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Subscribe to identity changes
    ///
    /// Subscribing the same listener twice is a no-op.
    pub fn add_identity_listener(&self, listener: Weak<dyn IdentityChangeListener>) {
        let mut listeners = self.inner.listeners.lock();
        if !listeners.iter().any(|l| same_listener(l, &listener)) {
            listeners.push(listener);
        }
    }

    /// Unsubscribe from identity changes
    pub fn remove_identity_listener(&self, listener: &Weak<dyn IdentityChangeListener>) {
        self.inner
            .listeners
            .lock()
            .retain(|l| !same_listener(l, listener));
    }

    /// Number of live identity listeners
    pub fn identity_listener_count(&self) -> usize {
        let mut listeners = self.inner.listeners.lock();
        listeners.retain(|l| l.strong_count() > 0);
        listeners.len()
    }

    /// Change this record's identity
    ///
    /// Listeners see `on_before_identity_change` while the old id is still
    /// visible, then `on_after_identity_change` with the new one. The listener
    /// list is not locked while callbacks run.
    pub fn set_identity(&self, id: RecordId) {
        if self.identity() == id {
            return;
        }

        let listeners: Vec<Arc<dyn IdentityChangeListener>> = {
            let mut guard = self.inner.listeners.lock();
            guard.retain(|l| l.strong_count() > 0);
            guard.iter().filter_map(Weak::upgrade).collect()
        };

        for listener in &listeners {
            listener.on_before_identity_change(self);
        }
        *self.inner.id.write() = id;
        for listener in &listeners {
            listener.on_after_identity_change(self);
        }
    }
}

fn same_listener(
    a: &Weak<dyn IdentityChangeListener>,
    b: &Weak<dyn IdentityChangeListener>,
) -> bool {
    // Compare data addresses only; vtable pointers may differ across codegen units.
    a.as_ptr() as *const () == b.as_ptr() as *const ()
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.identity() == other.identity()
    }
}

impl Eq for Record {}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("id", &self.identity())
            .field("content", &*self.inner.content.read())
            .finish()
    }
}

/// A reference to a record: a bare id or a loaded record
///
/// Equality is by identity, independent of representation.
#[derive(Debug, Clone)]
pub enum Identifiable {
    /// Link only; the record is not loaded
    Id(RecordId),
    /// Loaded record
    Record(Record),
}

impl Identifiable {
    /// Identity of the referenced record
    pub fn identity(&self) -> RecordId {
        match self {
            Identifiable::Id(id) => *id,
            Identifiable::Record(record) => record.identity(),
        }
    }

    /// The loaded record, if any
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Identifiable::Id(_) => None,
            Identifiable::Record(record) => Some(record),
        }
    }

    /// True if this reference carries a loaded record
    pub fn is_record(&self) -> bool {
        matches!(self, Identifiable::Record(_))
    }
}

impl PartialEq for Identifiable {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for Identifiable {}

impl From<RecordId> for Identifiable {
    fn from(id: RecordId) -> Self {
        Identifiable::Id(id)
    }
}

impl From<Record> for Identifiable {
    fn from(record: Record) -> Self {
        Identifiable::Record(record)
    }
}

impl From<&Record> for Identifiable {
    fn from(record: &Record) -> Self {
        Identifiable::Record(record.clone())
    }
}
