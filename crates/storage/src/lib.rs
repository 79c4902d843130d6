//! Storage layer for Strata records
//!
//! This crate implements the record-store collaborator used by reference
//! collections:
//! - MemoryRecordStore: FxHashMap-based record storage with RwLock
//! - Persistent id allocation per cluster
//! - Temporary (session-scoped) id assignment
//!
//! Saving a record drives the identity-change protocol of every collection
//! that holds it.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;

pub use memory::{MemoryRecordStore, DEFAULT_CLUSTER};
