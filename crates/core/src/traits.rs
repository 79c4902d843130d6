//! Core traits for the record layer
//!
//! This module defines the collaborator seams of reference collections:
//! - RecordStore: loads records by id
//! - Session: explicit handle to the store active for the calling context
//! - RecordOwner: the record holding a collection as a field
//! - IdentityChangeListener: two-phase identity change callbacks

use crate::error::StrataResult;
use crate::event::ChangeEvent;
use crate::record::{Identifiable, Record};
use crate::types::RecordId;

/// Read access to stored records
///
/// Thread safety: implementations must be safe to call from multiple threads.
pub trait RecordStore: Send + Sync {
    /// Load the record identified by `id`
    ///
    /// Returns `Ok(None)` if the store knows the record is gone without
    /// treating it as an error. Repeated calls for the same id must be safe.
    ///
    /// # Errors
    ///
    /// Returns `StrataError::NotFound` if `id` no longer resolves to a live
    /// record, or any other error for store-level failures.
    fn load(&self, id: &RecordId) -> StrataResult<Option<Record>>;
}

/// Explicit resolution context
///
/// An unbound session means "no store is active for this context": lazy
/// resolution is skipped and raw ids are surfaced instead.
#[derive(Clone, Copy, Default)]
pub struct Session<'a> {
    store: Option<&'a dyn RecordStore>,
}

impl<'a> Session<'a> {
    /// Session resolving against `store`
    pub fn bound(store: &'a dyn RecordStore) -> Self {
        Self { store: Some(store) }
    }

    /// Session with no active store
    pub fn unbound() -> Self {
        Self { store: None }
    }

    /// The active store, if any
    pub fn store(&self) -> Option<&'a dyn RecordStore> {
        self.store
    }

    /// True if resolution can be attempted
    pub fn is_active(&self) -> bool {
        self.store.is_some()
    }
}

impl std::fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Lifecycle status of an owner record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OwnerStatus {
    /// Normal state
    #[default]
    Loaded,
    /// Being serialized; collections must not trigger loads
    Marshalling,
    /// Being deserialized
    Unmarshalling,
}

/// The record that holds a reference collection as a field
///
/// A collection notifies its owner of every mutation so the owner can mark
/// itself dirty and forward change events.
pub trait RecordOwner: Send + Sync {
    /// The owner's content changed
    fn mark_dirty(&self);

    /// Start observing a referenced record's own mutations
    ///
    /// `item` is a loaded record, or a bare id that is not yet persistent.
    fn track(&self, item: &Identifiable);

    /// Stop observing a referenced record
    fn untrack(&self, item: &Identifiable);

    /// A collection owned by this record changed
    fn on_change(&self, event: ChangeEvent);

    /// Current lifecycle status
    fn status(&self) -> OwnerStatus {
        OwnerStatus::Loaded
    }
}

/// Callbacks invoked by a record whose identity is about to change
///
/// Subscriptions are weak: a listener is notified only while it is alive and
/// must unsubscribe when it stops holding the record.
pub trait IdentityChangeListener: Send + Sync {
    /// Called while the record still reports its old identity
    fn on_before_identity_change(&self, record: &Record);

    /// Called once the record reports its new identity
    fn on_after_identity_change(&self, record: &Record);
}
