//! Reference collections for Strata records
//!
//! This crate implements the set-like container records use to hold
//! references to other records:
//! - LinkSet: insertion-ordered, identity-unique set of links and loaded records
//! - LazyRecordIter: iteration that resolves links on first touch and caches them
//! - Identity-change handling: entries follow their record from new to persistent id
//! - Bulk maintenance: links -> records, deleted-record sweep, records -> links
//! - LinkSetConfig: `[linkset]` settings from `strata.toml`
//!
//! A set is owned by exactly one `RecordOwner`, which it marks dirty and
//! notifies of every membership change. The set is not internally ordered
//! against concurrent writers; callers serialize access per set.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
mod identity;
pub mod iter;
pub mod link_set;
mod maintenance;

pub use config::LinkSetConfig;
pub use iter::LazyRecordIter;
pub use link_set::{Element, LinkSet};
