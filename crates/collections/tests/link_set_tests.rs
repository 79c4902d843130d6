//! Integration tests for strata-collections
//!
//! These tests run LinkSet against the in-memory record store and a recording
//! owner, covering:
//!
//! 1. **Lazy Resolution** - links resolve on first touch and are cached
//! 2. **Graceful Degradation** - deleted records come back as links
//! 3. **Identity Changes** - saving a member re-keys it without events
//! 4. **Owner Contract** - dirty marks and change events per mutation
//! 5. **Bulk Maintenance** - conversion, sweep and detach
//!
//! ## Running These Tests
//!
//! ```bash
//! cargo test -p strata-collections --test link_set_tests
//! ```

use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;

use strata_collections::{Element, LinkSet};
use strata_core::{
    ChangeEvent, ChangeKind, Identifiable, OwnerStatus, Record, RecordId, RecordOwner,
    RecordStore, Session, StrataError, StrataResult,
};
use strata_storage::MemoryRecordStore;

// ============================================================================
// Test Helpers
// ============================================================================

/// Owner that records every notification it receives
#[derive(Default)]
struct RecordingOwner {
    dirty: Mutex<usize>,
    events: Mutex<Vec<ChangeEvent>>,
    tracked: Mutex<Vec<Identifiable>>,
    status: Mutex<OwnerStatus>,
}

impl RecordingOwner {
    fn dirty_count(&self) -> usize {
        *self.dirty.lock()
    }

    fn events(&self) -> Vec<ChangeEvent> {
        self.events.lock().clone()
    }

    fn is_tracking(&self, record: &Record) -> bool {
        self.tracked
            .lock()
            .iter()
            .any(|t| t.as_record().is_some_and(|r| r.ptr_eq(record)))
    }

    fn is_tracking_id(&self, id: &RecordId) -> bool {
        self.tracked
            .lock()
            .iter()
            .any(|t| !t.is_record() && t.identity() == *id)
    }
}

/// Same tracked reference: record handles by pointer, bare ids by value
fn same_reference(a: &Identifiable, b: &Identifiable) -> bool {
    match (a, b) {
        (Identifiable::Record(a), Identifiable::Record(b)) => a.ptr_eq(b),
        (Identifiable::Id(a), Identifiable::Id(b)) => a == b,
        _ => false,
    }
}

impl RecordOwner for RecordingOwner {
    fn mark_dirty(&self) {
        *self.dirty.lock() += 1;
    }

    fn track(&self, item: &Identifiable) {
        self.tracked.lock().push(item.clone());
    }

    fn untrack(&self, item: &Identifiable) {
        self.tracked.lock().retain(|t| !same_reference(t, item));
    }

    fn on_change(&self, event: ChangeEvent) {
        self.events.lock().push(event);
    }

    fn status(&self) -> OwnerStatus {
        *self.status.lock()
    }
}

/// Store that fails every load with a storage error
struct BrokenStore;

impl RecordStore for BrokenStore {
    fn load(&self, _id: &RecordId) -> StrataResult<Option<Record>> {
        Err(StrataError::storage("connection reset"))
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}

/// Save `count` records and return their ids
fn seed(store: &MemoryRecordStore, count: usize) -> Vec<RecordId> {
    (0..count)
        .map(|i| store.save(&Record::new(json!({ "n": i }))).unwrap())
        .collect()
}

fn collect(set: &LinkSet, session: Session<'_>) -> Vec<Element> {
    set.iter(session).collect::<StrataResult<_>>().unwrap()
}

// ============================================================================
// SECTION 1: Lazy Resolution
// ============================================================================

mod lazy_resolution {
    use super::*;

    /// A, B, C are persistent; B is deleted before iteration. Both passes
    /// return loaded A, link B, loaded C, and only B is retried.
    #[test]
    fn test_partial_failure_scenario() {
        init_tracing();
        let store = MemoryRecordStore::new();
        let ids = seed(&store, 3);
        let owner = Arc::new(RecordingOwner::default());
        let set = LinkSet::new(&owner);
        for id in &ids {
            set.insert(*id);
        }
        assert!(ids.iter().all(|id| set.entry(id).unwrap().is_link()));

        store.delete(&ids[1]);

        let first = collect(&set, Session::bound(&store));
        assert!(first[0].is_loaded());
        assert_eq!(first[1], Element::Link(ids[1]));
        assert!(first[2].is_loaded());
        assert_eq!(store.load_count(), 3);

        let second = collect(&set, Session::bound(&store));
        assert_eq!(second, first);
        // A and C were cached; only B went back to the store
        assert_eq!(store.load_count(), 4);
    }

    #[test]
    fn test_upgrade_registers_with_owner() {
        let store = MemoryRecordStore::new();
        let ids = seed(&store, 1);
        let owner = Arc::new(RecordingOwner::default());
        let set = LinkSet::new(&owner);
        set.insert(ids[0]);

        let elements = collect(&set, Session::bound(&store));
        let record = elements[0].as_record().unwrap();
        assert!(owner.is_tracking(record));
        // caching is not a membership change
        assert_eq!(owner.dirty_count(), 1);
        assert_eq!(owner.events().len(), 1);
    }

    #[test]
    fn test_marshalling_owner_disables_resolution() {
        let store = MemoryRecordStore::new();
        let ids = seed(&store, 2);
        let owner = Arc::new(RecordingOwner::default());
        let set = LinkSet::new(&owner);
        set.insert(ids[0]);
        set.insert(ids[1]);

        *owner.status.lock() = OwnerStatus::Marshalling;
        let iter = set.iter(Session::bound(&store));
        assert!(!iter.is_lazy());
        let elements: Vec<Element> = iter.collect::<StrataResult<_>>().unwrap();
        assert!(elements.iter().all(Element::is_link));
        assert_eq!(store.load_count(), 0);

        *owner.status.lock() = OwnerStatus::Loaded;
        assert!(set.iter(Session::bound(&store)).is_lazy());
    }

    #[test]
    fn test_fatal_store_error_is_yielded_not_masked() {
        let set = LinkSet::detached();
        set.insert(RecordId::persistent(0, 0));
        set.insert(RecordId::persistent(0, 1));

        let results: Vec<StrataResult<Element>> = set.iter(Session::bound(&BrokenStore)).collect();
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|r| matches!(r, Err(StrataError::Storage { .. }))));
        assert!(set.entry(&RecordId::persistent(0, 0)).unwrap().is_link());
    }

    #[test]
    fn test_new_records_are_returned_without_store() {
        let set = LinkSet::detached();
        let fresh = Record::new(json!("draft"));
        set.insert(&fresh);

        let elements = collect(&set, Session::bound(&BrokenStore));
        assert!(elements[0].as_record().unwrap().ptr_eq(&fresh));
    }

    #[test]
    fn test_iterator_remove_notifies_owner() {
        let store = MemoryRecordStore::new();
        let ids = seed(&store, 3);
        let owner = Arc::new(RecordingOwner::default());
        let set = LinkSet::new(&owner);
        for id in &ids {
            set.insert(*id);
        }

        let mut iter = set.iter(Session::bound(&store));
        iter.next().unwrap().unwrap();
        let loaded = iter.next().unwrap().unwrap();
        iter.remove().unwrap();
        assert!(iter.next().unwrap().unwrap().is_loaded());
        assert!(iter.next().is_none());

        assert_eq!(set.ids(), vec![Some(ids[0]), Some(ids[2])]);
        assert!(!owner.is_tracking(loaded.as_record().unwrap()));
        assert_eq!(owner.dirty_count(), 4);

        let last = owner.events().pop().unwrap();
        assert_eq!(last.kind, ChangeKind::Remove);
        assert_eq!(last.old_value, Some(Identifiable::Id(ids[1])));
    }
}

// ============================================================================
// SECTION 2: Identity Changes
// ============================================================================

mod identity_changes {
    use super::*;

    #[test]
    fn test_save_rekeys_member_without_events() {
        init_tracing();
        let store = MemoryRecordStore::new();
        let owner = Arc::new(RecordingOwner::default());
        let set = LinkSet::new(&owner);
        let fresh = Record::new(json!({"title": "draft"}));
        let old = fresh.identity();

        set.insert(&fresh);
        let events_before = owner.events().len();
        let dirty_before = owner.dirty_count();

        let new = store.save(&fresh).unwrap();

        assert!(!set.contains_id(&old));
        assert!(set.contains_id(&new));
        assert_eq!(set.len(), 1);
        assert!(set.entry(&new).unwrap().as_record().unwrap().ptr_eq(&fresh));
        assert_eq!(owner.events().len(), events_before);
        assert_eq!(owner.dirty_count(), dirty_before);
    }

    #[test]
    fn test_temporary_then_persistent() {
        let store = MemoryRecordStore::new();
        let set = LinkSet::detached();
        let fresh = Record::new(json!(null));
        set.insert(&fresh);

        let tmp = store.assign_temporary(&fresh).unwrap();
        assert!(set.contains_id(&tmp));

        let id = store.save(&fresh).unwrap();
        assert_eq!(set.ids(), vec![Some(id)]);
    }

    /// A bare temporary id is held as-is: the store is never asked for it
    /// and committing its record does not make the member disappear.
    #[test]
    fn test_bare_temporary_id_survives_commit() {
        let store = MemoryRecordStore::new();
        let record = Record::new(json!(null));
        let tmp = store.assign_temporary(&record).unwrap();

        let owner = Arc::new(RecordingOwner::default());
        let set = LinkSet::new(&owner);
        set.insert(tmp);
        assert_eq!(set.entry(&tmp), Some(Element::Pending(tmp)));
        assert!(owner.is_tracking_id(&tmp));

        let elements = collect(&set, Session::bound(&store));
        assert_eq!(elements, vec![Element::Pending(tmp)]);
        assert_eq!(record.identity_listener_count(), 0);

        let id = store.save(&record).unwrap();
        assert!(store.contains(&id));

        let dirty = owner.dirty_count();
        assert!(!set.clear_deleted_records(Session::bound(&store)).unwrap());
        assert_eq!(set.convert_links_to_records(Session::bound(&store)).unwrap(), 0);
        assert_eq!(set.ids(), vec![Some(tmp)]);
        assert_eq!(owner.dirty_count(), dirty);
        assert_eq!(store.load_count(), 0);
    }

    #[test]
    fn test_bare_transient_id_is_not_swept() {
        let store = MemoryRecordStore::new();
        let ids = seed(&store, 1);
        let fresh = RecordId::new_transient();
        let owner = Arc::new(RecordingOwner::default());
        let set = LinkSet::new(&owner);
        set.add(Some(Identifiable::Id(fresh)));
        set.insert(ids[0]);
        store.delete(&ids[0]);

        assert!(set.remove(None, Session::bound(&store)).unwrap());
        assert_eq!(set.ids(), vec![Some(fresh)]);
        assert!(set.entry(&fresh).unwrap().is_pending());
        assert!(!set.detach());

        assert!(set.remove_ref(&Identifiable::Id(fresh)));
        assert!(!owner.is_tracking_id(&fresh));
    }

    #[test]
    fn test_saved_record_added_beside_stale_pending_id() {
        let store = MemoryRecordStore::new();
        let record = Record::new(json!(null));
        let tmp = store.assign_temporary(&record).unwrap();
        let set = LinkSet::detached();
        set.insert(tmp);

        let id = store.save(&record).unwrap();
        assert!(set.insert(&record));
        assert_eq!(set.ids(), vec![Some(tmp), Some(id)]);
        assert_eq!(set.entry(&id), Some(Element::Link(id)));
    }

    #[test]
    fn test_rekeyed_member_can_be_detached() {
        let store = MemoryRecordStore::new();
        let set = LinkSet::detached();
        let fresh = Record::new(json!(null));
        set.insert(&fresh);

        assert!(!set.detach());
        let id = store.save(&fresh).unwrap();
        assert!(set.detach());
        assert_eq!(set.entry(&id), Some(Element::Link(id)));
        assert_eq!(fresh.identity_listener_count(), 0);
    }

    #[test]
    fn test_removed_member_is_not_reinserted_on_save() {
        let store = MemoryRecordStore::new();
        let set = LinkSet::detached();
        let fresh = Record::new(json!(null));
        set.insert(&fresh);
        set.remove_ref(&Identifiable::from(&fresh));
        assert_eq!(fresh.identity_listener_count(), 0);

        store.save(&fresh).unwrap();
        assert!(set.is_empty());
    }
}

// ============================================================================
// SECTION 3: Owner Contract and Maintenance
// ============================================================================

mod owner_contract {
    use super::*;

    #[test]
    fn test_sweep_through_remove_none() {
        let store = MemoryRecordStore::new();
        let ids = seed(&store, 3);
        let owner = Arc::new(RecordingOwner::default());
        let set = LinkSet::new(&owner);
        for id in &ids {
            set.insert(*id);
        }
        store.delete(&ids[0]);
        store.delete(&ids[2]);

        assert!(set.remove(None, Session::bound(&store)).unwrap());
        assert_eq!(set.ids(), vec![Some(ids[1])]);

        // three adds plus one sweep
        assert_eq!(owner.dirty_count(), 4);
        let removes: Vec<ChangeEvent> = owner
            .events()
            .into_iter()
            .filter(|e| e.kind == ChangeKind::Remove)
            .collect();
        assert_eq!(removes.len(), 2);
        assert_eq!(removes[0].old_value, Some(Identifiable::Id(ids[0])));
        assert_eq!(removes[1].old_value, Some(Identifiable::Id(ids[2])));

        assert!(!set.remove(None, Session::bound(&store)).unwrap());
        assert_eq!(owner.dirty_count(), 4);
    }

    #[test]
    fn test_remove_specific_reference() {
        let store = MemoryRecordStore::new();
        let ids = seed(&store, 1);
        let set = LinkSet::detached();
        set.insert(ids[0]);

        let removed = set
            .remove(Some(&Identifiable::Id(ids[0])), Session::bound(&store))
            .unwrap();
        assert!(removed);
        assert!(set.is_empty());
    }

    #[test]
    fn test_convert_links_then_detach() {
        let store = MemoryRecordStore::new();
        let ids = seed(&store, 3);
        let owner = Arc::new(RecordingOwner::default());
        let set = LinkSet::new(&owner);
        for id in &ids {
            set.insert(*id);
        }
        store.delete(&ids[1]);

        let converted = set.convert_links_to_records(Session::bound(&store)).unwrap();
        assert_eq!(converted, 2);
        assert_eq!(set.len(), 3);
        assert_eq!(owner.tracked.lock().len(), 2);

        assert!(set.detach());
        assert!(owner.tracked.lock().is_empty());
        assert!(set.raw_iter().all(|e| e.unwrap().is_link()));
    }

    #[test]
    fn test_owner_may_reenter_set_from_callback() {
        struct Reentrant {
            set: Mutex<Option<Arc<LinkSet>>>,
            seen_len: Mutex<Vec<usize>>,
        }

        impl RecordOwner for Reentrant {
            fn mark_dirty(&self) {
                if let Some(set) = self.set.lock().as_ref() {
                    self.seen_len.lock().push(set.len());
                }
            }
            fn track(&self, _item: &Identifiable) {}
            fn untrack(&self, _item: &Identifiable) {}
            fn on_change(&self, _event: ChangeEvent) {}
        }

        let owner = Arc::new(Reentrant {
            set: Mutex::new(None),
            seen_len: Mutex::new(Vec::new()),
        });
        let set = Arc::new(LinkSet::new(&owner));
        *owner.set.lock() = Some(set.clone());

        set.insert(RecordId::persistent(0, 0));
        set.remove_ref(&Identifiable::Id(RecordId::persistent(0, 0)));

        assert_eq!(*owner.seen_len.lock(), vec![1, 0]);
        owner.set.lock().take();
    }
}
