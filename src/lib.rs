//! Strata LinkSet - record reference sets for the Strata document database
//!
//! A `LinkSet` holds references from one record (its owner) to other records.
//! Each member is either a bare link or a loaded record; links are resolved
//! lazily while iterating and cached, unsaved members follow their record
//! through the new-to-persistent identity change, and bulk operations warm,
//! sweep or detach the set at lifecycle boundaries.
//!
//! # Quick Start
//!
//! ```
//! use strata_linkset::{LinkSet, MemoryRecordStore, Record, Session};
//! use serde_json::json;
//!
//! let store = MemoryRecordStore::new();
//! let friend = store.save(&Record::new(json!({"name": "Ada"})))?;
//!
//! let set = LinkSet::detached();
//! set.insert(friend);
//! assert!(set.entry(&friend).unwrap().is_link());
//!
//! // Iterating with a bound session loads and caches the record
//! for element in set.iter(Session::bound(&store)) {
//!     assert!(element?.is_loaded());
//! }
//! assert!(set.entry(&friend).unwrap().is_loaded());
//! # Ok::<(), strata_linkset::StrataError>(())
//! ```

pub use strata_collections::{Element, LazyRecordIter, LinkSet, LinkSetConfig};
pub use strata_core::{
    ChangeEvent, ChangeKind, Identifiable, IdentityChangeListener, OwnerStatus, Record, RecordId,
    RecordOwner, RecordStore, Session, StrataError, StrataResult,
};
pub use strata_storage::MemoryRecordStore;
