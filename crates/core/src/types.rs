//! Core types for Strata records
//!
//! This module defines the foundational identity type:
//! - RecordId: identity of a stored record (new, temporary or persistent)
//!
//! A record starts life with a `New` id, may receive a `Temporary` id while a
//! session holds it uncommitted, and receives a `Persistent` id once saved.
//! Equality and hashing follow whichever flavor is currently active, so a
//! container keyed by `RecordId` must re-key an entry when its record's
//! identity changes.

use crate::error::StrataError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cluster number used in the display form of new records
pub const NEW_CLUSTER: i64 = -1;

static NEXT_NEW_SEQ: AtomicU64 = AtomicU64::new(1);

/// Identity of a stored record
///
/// ## Invariants
///
/// - `New` ids are unique per process, so two unsaved records never compare equal
/// - `Persistent` ids never change once assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordId {
    /// Never saved, never seen by a store
    New(u64),
    /// Assigned by a session before commit; resolvable only inside that session
    Temporary {
        /// Target cluster
        cluster: u32,
        /// Session-local sequence
        seq: u64,
    },
    /// Stable identity of a saved record
    Persistent {
        /// Cluster the record lives in
        cluster: u32,
        /// Position inside the cluster
        position: u64,
    },
}

impl RecordId {
    /// Allocate a fresh `New` id
    pub fn new_transient() -> Self {
        RecordId::New(NEXT_NEW_SEQ.fetch_add(1, Ordering::Relaxed))
    }

    /// Create a persistent id
    pub fn persistent(cluster: u32, position: u64) -> Self {
        RecordId::Persistent { cluster, position }
    }

    /// Create a temporary id
    pub fn temporary(cluster: u32, seq: u64) -> Self {
        RecordId::Temporary { cluster, seq }
    }

    /// True for records that were never handed to a store
    #[inline]
    pub fn is_new(&self) -> bool {
        matches!(self, RecordId::New(_))
    }

    /// True for session-assigned ids that are not yet committed
    #[inline]
    pub fn is_temporary(&self) -> bool {
        matches!(self, RecordId::Temporary { .. })
    }

    /// True once the id is stable forever
    #[inline]
    pub fn is_persistent(&self) -> bool {
        matches!(self, RecordId::Persistent { .. })
    }

    /// Cluster of a temporary or persistent id
    pub fn cluster(&self) -> Option<u32> {
        match self {
            RecordId::New(_) => None,
            RecordId::Temporary { cluster, .. } | RecordId::Persistent { cluster, .. } => {
                Some(*cluster)
            }
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::New(seq) => write!(f, "#{}:-{}", NEW_CLUSTER, seq),
            RecordId::Temporary { cluster, seq } => write!(f, "#{}:-{}", cluster, seq),
            RecordId::Persistent { cluster, position } => write!(f, "#{}:{}", cluster, position),
        }
    }
}

impl FromStr for RecordId {
    type Err = StrataError;

    /// Parse `#cluster:position` (persistent) or `#cluster:-seq` (temporary)
    ///
    /// The leading `#` is optional. New ids are process-local and cannot be parsed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s.strip_prefix('#').unwrap_or(s);
        let (cluster, position) = body.split_once(':').ok_or_else(|| {
            StrataError::invalid_input(format!("Invalid record id '{}': missing ':'", s))
        })?;

        let cluster: u32 = cluster.parse().map_err(|_| {
            StrataError::invalid_input(format!("Invalid record id '{}': bad cluster", s))
        })?;

        match position.strip_prefix('-') {
            Some(seq) => {
                let seq: u64 = seq.parse().map_err(|_| {
                    StrataError::invalid_input(format!("Invalid record id '{}': bad position", s))
                })?;
                Ok(RecordId::Temporary { cluster, seq })
            }
            None => {
                let position: u64 = position.parse().map_err(|_| {
                    StrataError::invalid_input(format!("Invalid record id '{}': bad position", s))
                })?;
                Ok(RecordId::Persistent { cluster, position })
            }
        }
    }
}
