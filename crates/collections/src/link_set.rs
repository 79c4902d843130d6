//! LinkSet: insertion-ordered, identity-unique set of record references
//!
//! Each entry is keyed by the referenced record's current identity and holds
//! either a bare link or the loaded record:
//!
//! ```text
//! IndexMap<EntryKey, Element>
//!   None            -> Element::Null          (at most one null element)
//!   Some(#12:3)     -> Element::Link(#12:3)   (not loaded by this set)
//!   Some(#-1:-7)    -> Element::Loaded(rec)   (rec.identity() == #-1:-7)
//!   Some(#4:-2)     -> Element::Pending(#4:-2) (bare id, not yet persistent)
//! ```
//!
//! ## Invariants
//!
//! - Keys are unique; adding a present identity is a no-op returning `false`
//! - `Element::Loaded(rec)` is always stored under `Some(rec.identity())`
//! - `Element::Link(id)` always holds a persistent id; only links are loaded
//!   or swept
//! - Every record subscribed for identity changes has exactly one entry
//! - Every add/remove marks the owner dirty and emits change events
//!
//! The set lock is never held while the owner or a record is called back, so
//! owner callbacks may re-enter the set.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use indexmap::{IndexMap, IndexSet};
use parking_lot::Mutex;

use strata_core::{
    ChangeEvent, Identifiable, IdentityChangeListener, OwnerStatus, Record, RecordId,
    RecordOwner, Session, StrataResult,
};

use crate::config::LinkSetConfig;

/// Map key of an entry; `None` is the null element
pub(crate) type EntryKey = Option<RecordId>;

/// Stored representation of one set member
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// The null element
    Null,
    /// Link only; the record is not loaded by this set
    Link(RecordId),
    /// Loaded record
    Loaded(Record),
    /// Bare reference whose identity is not yet persistent
    ///
    /// Held as-is: it cannot be resolved through a store and is never swept.
    Pending(RecordId),
}

impl Element {
    /// Identity of the member, `None` for the null element
    pub fn identity(&self) -> Option<RecordId> {
        match self {
            Element::Null => None,
            Element::Link(id) | Element::Pending(id) => Some(*id),
            Element::Loaded(record) => Some(record.identity()),
        }
    }

    /// True for link-only members
    pub fn is_link(&self) -> bool {
        matches!(self, Element::Link(_))
    }

    /// True for loaded members
    pub fn is_loaded(&self) -> bool {
        matches!(self, Element::Loaded(_))
    }

    /// True for bare references that are not yet persistent
    pub fn is_pending(&self) -> bool {
        matches!(self, Element::Pending(_))
    }

    /// The loaded record, if any
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Element::Loaded(record) => Some(record),
            _ => None,
        }
    }

    /// Convert to a caller-facing reference
    pub fn into_identifiable(self) -> Option<Identifiable> {
        match self {
            Element::Null => None,
            Element::Link(id) | Element::Pending(id) => Some(Identifiable::Id(id)),
            Element::Loaded(record) => Some(Identifiable::Record(record)),
        }
    }
}

/// Set of record references owned by a record
///
/// Cloning is not supported: a set belongs to exactly one owner. The set does
/// not implement `Hash`; equality is content based and membership may change
/// lazily, so it must not be used as a map key.
pub struct LinkSet {
    pub(crate) shared: Arc<Shared>,
}

/// State shared between the set handle and its identity subscriptions
pub(crate) struct Shared {
    pub(crate) state: Mutex<State>,
    owner: Option<Weak<dyn RecordOwner>>,
    auto_convert: AtomicBool,
    track_changes: bool,
}

#[derive(Default)]
pub(crate) struct State {
    pub(crate) entries: IndexMap<EntryKey, Element>,
    /// Records between the two identity-change phases, with their old position
    pub(crate) rekeying: Vec<(Record, usize)>,
}

impl LinkSet {
    /// Create an empty set owned by `owner`
    pub fn new<O: RecordOwner + 'static>(owner: &Arc<O>) -> Self {
        let owner: Weak<dyn RecordOwner> = Arc::downgrade(owner) as Weak<dyn RecordOwner>;
        Self::with_owner(Some(owner), LinkSetConfig::default())
    }

    /// Create an empty set with no owner; mutations notify nobody
    pub fn detached() -> Self {
        Self::with_owner(None, LinkSetConfig::default())
    }

    /// Create an empty set with explicit owner and configuration
    pub fn with_owner(owner: Option<Weak<dyn RecordOwner>>, config: LinkSetConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::default()),
                owner,
                auto_convert: AtomicBool::new(config.auto_convert_to_record),
                track_changes: config.track_changes,
            }),
        }
    }

    /// Create a set seeded from existing references
    ///
    /// Seeding goes through `add`, so the owner sees one ADD event per
    /// distinct reference.
    pub fn with_links<O, I>(owner: &Arc<O>, links: I) -> Self
    where
        O: RecordOwner + 'static,
        I: IntoIterator<Item = Identifiable>,
    {
        let set = Self::new(owner);
        for link in links {
            set.add(Some(link));
        }
        set
    }

    /// Add a reference; `None` adds the null element
    ///
    /// Returns `false` without side effects if the identity is already present.
    ///
    /// - unsaved (new or temporary) records are stored loaded, subscribed for
    ///   identity changes and tracked by the owner
    /// - bare ids that are not yet persistent are stored pending and tracked
    /// - persistent references are stored as links
    pub fn add(&self, item: Option<Identifiable>) -> bool {
        let key: EntryKey = item.as_ref().map(Identifiable::identity);
        let mut tracked = None;

        {
            let mut state = self.shared.state.lock();
            if state.entries.contains_key(&key) {
                return false;
            }

            let element = match &item {
                None => Element::Null,
                Some(item) if item.identity().is_persistent() => Element::Link(item.identity()),
                Some(Identifiable::Record(record)) => {
                    record.add_identity_listener(self.shared.listener());
                    tracked = Some(Identifiable::Record(record.clone()));
                    Element::Loaded(record.clone())
                }
                Some(Identifiable::Id(id)) => {
                    tracked = Some(Identifiable::Id(*id));
                    Element::Pending(*id)
                }
            };
            state.entries.insert(key, element);
        }

        if let Some(owner) = self.shared.owner() {
            if let Some(item) = &tracked {
                owner.track(item);
            }
        }
        self.shared.mark_dirty();
        self.shared.fire(ChangeEvent::added(item));
        true
    }

    /// Add a non-null reference
    pub fn insert(&self, item: impl Into<Identifiable>) -> bool {
        self.add(Some(item.into()))
    }

    /// Remove a reference
    ///
    /// `None` does not remove the null element: it sweeps entries whose record
    /// no longer exists (see `clear_deleted_records`).
    ///
    /// # Errors
    ///
    /// Only the sweep can fail, with store errors other than `NotFound`.
    pub fn remove(&self, item: Option<&Identifiable>, session: Session<'_>) -> StrataResult<bool> {
        match item {
            None => self.clear_deleted_records(session),
            Some(item) => Ok(self.remove_ref(item)),
        }
    }

    /// Remove the entry for `item`'s identity; returns `false` if absent
    pub fn remove_ref(&self, item: &Identifiable) -> bool {
        let removed = self
            .shared
            .state
            .lock()
            .entries
            .shift_remove(&Some(item.identity()));

        match removed {
            Some(element) => {
                self.shared.removed(vec![element]);
                true
            }
            None => false,
        }
    }

    /// Remove every entry
    pub fn clear(&self) {
        let entries = std::mem::take(&mut self.shared.state.lock().entries);
        self.shared.removed(entries.into_values().collect());
    }

    /// True if `item`'s identity is a member
    pub fn contains(&self, item: &Identifiable) -> bool {
        self.contains_id(&item.identity())
    }

    /// True if `id` is a member
    pub fn contains_id(&self, id: &RecordId) -> bool {
        self.shared.state.lock().entries.contains_key(&Some(*id))
    }

    /// True if the null element is a member
    pub fn contains_null(&self) -> bool {
        self.shared.state.lock().entries.contains_key(&None)
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.shared.state.lock().entries.len()
    }

    /// True if the set has no members
    pub fn is_empty(&self) -> bool {
        self.shared.state.lock().entries.is_empty()
    }

    /// Member identities in insertion order; `None` is the null element
    pub fn ids(&self) -> Vec<Option<RecordId>> {
        self.shared.state.lock().entries.keys().copied().collect()
    }

    /// Stored representation of `id`, without resolving it
    pub fn entry(&self, id: &RecordId) -> Option<Element> {
        self.shared.state.lock().entries.get(&Some(*id)).cloned()
    }

    /// Whether lazy iteration resolves links
    pub fn is_auto_convert_to_record(&self) -> bool {
        self.shared.auto_convert.load(Ordering::Relaxed)
    }

    /// Enable or disable link resolution during iteration
    pub fn set_auto_convert_to_record(&self, convert: bool) {
        self.shared.auto_convert.store(convert, Ordering::Relaxed);
    }

    /// True if the owner is being serialized and loads must not be triggered
    pub(crate) fn owner_is_marshalling(&self) -> bool {
        self.shared
            .owner()
            .map(|owner| owner.status() == OwnerStatus::Marshalling)
            .unwrap_or(false)
    }

    /// Content equality against an arbitrary collection of identities
    ///
    /// `other` is taken as a set: duplicates are collapsed. Equal iff both
    /// have the same distinct members, regardless of link or loaded
    /// representation.
    pub fn equals_ids<I>(&self, other: I) -> bool
    where
        I: IntoIterator<Item = Option<RecordId>>,
    {
        let other: IndexSet<EntryKey> = other.into_iter().collect();
        let state = self.shared.state.lock();
        if state.entries.len() != other.len() {
            return false;
        }
        other.iter().all(|key| state.entries.contains_key(key))
    }
}

impl PartialEq for LinkSet {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.shared, &other.shared) {
            return true;
        }
        self.equals_ids(other.ids())
    }
}

impl Eq for LinkSet {}

impl std::fmt::Debug for LinkSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_set().entries(state.entries.values()).finish()
    }
}

impl Shared {
    pub(crate) fn owner(&self) -> Option<Arc<dyn RecordOwner>> {
        self.owner.as_ref().and_then(Weak::upgrade)
    }

    /// Weak handle under which this set subscribes to records
    pub(crate) fn listener(self: &Arc<Self>) -> Weak<dyn IdentityChangeListener> {
        Arc::downgrade(self) as Weak<dyn IdentityChangeListener>
    }

    pub(crate) fn mark_dirty(&self) {
        if let Some(owner) = self.owner() {
            owner.mark_dirty();
        }
    }

    pub(crate) fn fire(&self, event: ChangeEvent) {
        if !self.track_changes {
            return;
        }
        if let Some(owner) = self.owner() {
            owner.on_change(event);
        }
    }

    /// Stop holding `record`: drop its subscription and owner tracking
    pub(crate) fn release(self: &Arc<Self>, record: &Record) {
        record.remove_identity_listener(&self.listener());
        self.untrack(Identifiable::Record(record.clone()));
    }

    fn untrack(&self, item: Identifiable) {
        if let Some(owner) = self.owner() {
            owner.untrack(&item);
        }
    }

    /// Finish a removal of `elements` already taken out of the map
    ///
    /// Marks the owner dirty once and emits one REMOVE event per element.
    pub(crate) fn removed(self: &Arc<Self>, elements: Vec<Element>) {
        if elements.is_empty() {
            return;
        }
        for element in &elements {
            match element {
                Element::Loaded(record) => self.release(record),
                Element::Pending(id) => self.untrack(Identifiable::Id(*id)),
                Element::Null | Element::Link(_) => {}
            }
        }
        self.mark_dirty();
        for element in elements {
            self.fire(ChangeEvent::removed(element.into_identifiable()));
        }
    }

    /// Replace a link entry with its loaded record
    ///
    /// Returns `false` if the entry is gone or no longer a link. The key set is
    /// unchanged, so positions held by iterators stay valid. A record loaded
    /// under a temporary id is subscribed like any other unsaved member.
    pub(crate) fn upgrade(self: &Arc<Self>, key: EntryKey, record: &Record) -> bool {
        let upgraded = {
            let mut state = self.state.lock();
            match state.entries.get_mut(&key) {
                Some(element @ Element::Link(_)) => {
                    if !record.identity().is_persistent() {
                        record.add_identity_listener(self.listener());
                    }
                    *element = Element::Loaded(record.clone());
                    true
                }
                _ => false,
            }
        };
        if upgraded {
            if let Some(owner) = self.owner() {
                owner.track(&Identifiable::Record(record.clone()));
            }
        }
        upgraded
    }
}
