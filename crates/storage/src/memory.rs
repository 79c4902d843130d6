//! MemoryRecordStore: in-memory record store
//!
//! This module implements the RecordStore trait using:
//! - `FxHashMap<RecordId, Record>` for O(1) lookups by identity
//! - `parking_lot::RwLock` for thread-safe access
//! - A per-cluster position counter for persistent id allocation
//!
//! # Identity assignment
//!
//! Saving a new or temporary record allocates the next persistent position in
//! its cluster and calls `Record::set_identity`, which runs the two-phase
//! identity-change protocol for every collection subscribed to the record.
//! No store lock is held while listeners run.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use tracing::debug;

use strata_core::{Record, RecordId, RecordStore, StrataError, StrataResult};

/// Cluster used for records that do not carry one
pub const DEFAULT_CLUSTER: u32 = 0;

/// In-memory record store
///
/// Thread-safe through `parking_lot` locks and atomics. Loads return shared
/// handles, so every caller observes the same record instance.
#[derive(Debug)]
pub struct MemoryRecordStore {
    /// Records by current identity
    data: RwLock<FxHashMap<RecordId, Record>>,
    /// Next free position per cluster
    positions: Mutex<FxHashMap<u32, u64>>,
    /// Sequence for temporary ids
    temp_seq: AtomicU64,
    /// Number of `load` calls served (hits and misses)
    loads: AtomicU64,
    default_cluster: u32,
}

impl MemoryRecordStore {
    /// Create an empty store using `DEFAULT_CLUSTER`
    pub fn new() -> Self {
        Self::with_default_cluster(DEFAULT_CLUSTER)
    }

    /// Create an empty store placing cluster-less records in `cluster`
    pub fn with_default_cluster(cluster: u32) -> Self {
        Self {
            data: RwLock::new(FxHashMap::default()),
            positions: Mutex::new(FxHashMap::default()),
            temp_seq: AtomicU64::new(1),
            loads: AtomicU64::new(0),
            default_cluster: cluster,
        }
    }

    /// Persist a record, assigning a persistent id if it does not have one
    ///
    /// Returns the record's persistent id.
    pub fn save(&self, record: &Record) -> StrataResult<RecordId> {
        let current = record.identity();
        if current.is_persistent() {
            self.data.write().insert(current, record.clone());
            return Ok(current);
        }

        let cluster = current.cluster().unwrap_or(self.default_cluster);
        let id = RecordId::persistent(cluster, self.next_position(cluster));
        if current.is_temporary() {
            self.data.write().remove(&current);
        }

        record.set_identity(id);
        debug!(target: "strata::storage", from = %current, to = %id, "Record persisted");

        self.data.write().insert(id, record.clone());
        Ok(id)
    }

    /// Give a new record a temporary id resolvable through this store
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if the record already left the `New` state.
    pub fn assign_temporary(&self, record: &Record) -> StrataResult<RecordId> {
        let current = record.identity();
        if !current.is_new() {
            return Err(StrataError::invalid_operation(format!(
                "record {} already has a store-assigned id",
                current
            )));
        }

        let id = RecordId::temporary(
            self.default_cluster,
            self.temp_seq.fetch_add(1, Ordering::Relaxed),
        );
        record.set_identity(id);
        self.data.write().insert(id, record.clone());
        Ok(id)
    }

    /// Delete a record; returns true if it existed
    pub fn delete(&self, id: &RecordId) -> bool {
        let removed = self.data.write().remove(id).is_some();
        if removed {
            debug!(target: "strata::storage", id = %id, "Record deleted");
        }
        removed
    }

    /// True if `id` resolves to a stored record
    pub fn contains(&self, id: &RecordId) -> bool {
        self.data.read().contains_key(id)
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// True if the store holds no records
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Number of `load` calls served so far
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }

    fn next_position(&self, cluster: u32) -> u64 {
        let mut positions = self.positions.lock();
        let next = positions.entry(cluster).or_insert(0);
        let position = *next;
        *next += 1;
        position
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for MemoryRecordStore {
    fn load(&self, id: &RecordId) -> StrataResult<Option<Record>> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        match self.data.read().get(id) {
            Some(record) => Ok(Some(record.clone())),
            None => Err(StrataError::not_found(*id)),
        }
    }
}
