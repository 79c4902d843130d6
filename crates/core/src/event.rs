//! Change events emitted by reference collections
//!
//! An event describes one mutation of a collection to its owner:
//! - ADD: `key` and `value` carry the added reference, `old_value` is empty
//! - REMOVE: `key` and `old_value` carry the removed reference, `value` is empty
//!
//! `None` in a reference position means the null element.

use crate::record::Identifiable;

/// Kind of collection mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// An element was added
    Add,
    /// An element was removed
    Remove,
}

/// A single collection mutation
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    /// Mutation kind
    pub kind: ChangeKind,
    /// Element the mutation applies to
    pub key: Option<Identifiable>,
    /// Value after the mutation
    pub value: Option<Identifiable>,
    /// Value before the mutation
    pub old_value: Option<Identifiable>,
}

impl ChangeEvent {
    /// Event for an added element
    pub fn added(element: Option<Identifiable>) -> Self {
        Self {
            kind: ChangeKind::Add,
            key: element.clone(),
            value: element,
            old_value: None,
        }
    }

    /// Event for a removed element
    pub fn removed(element: Option<Identifiable>) -> Self {
        Self {
            kind: ChangeKind::Remove,
            key: element.clone(),
            value: None,
            old_value: element,
        }
    }
}
