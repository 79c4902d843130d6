//! Core types and traits for Strata records
//!
//! This crate defines the foundational types used by reference collections:
//! - RecordId: Identity of a stored record (new, temporary, persistent)
//! - Record: Shared handle to a loaded record with identity-change notification
//! - Identifiable: A reference to a record, either a bare id or a loaded record
//! - ChangeEvent: Mutation events delivered to a collection's owner
//! - Error: Error type hierarchy
//! - Traits: Collaborator seams (RecordStore, RecordOwner, IdentityChangeListener)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod event;
pub mod record;
pub mod traits;
pub mod types;

pub use error::{StrataError, StrataResult};
pub use event::{ChangeEvent, ChangeKind};
pub use record::{Identifiable, Record};
pub use traits::{IdentityChangeListener, OwnerStatus, RecordOwner, RecordStore, Session};
pub use types::RecordId;
