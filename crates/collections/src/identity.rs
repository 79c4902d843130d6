//! Identity-change handling for LinkSet
//!
//! A set subscribes to every unsaved record it stores loaded. When such a
//! record is persisted its identity changes, and the identity is the map key:
//!
//! 1. before: the entry under the old identity is taken out and its position
//!    remembered
//! 2. after: the record is put back, loaded, under its new identity at the
//!    same position
//!
//! The re-key is not a membership change, so the owner is neither marked
//! dirty nor sent an event.
//!
//! If the new identity is already a member (a link to the same record added
//! separately), the two entries collapse into one loaded entry at the
//! existing position and the set shrinks by one. The collision is logged at
//! `warn`; no event is emitted.

use strata_core::{IdentityChangeListener, Record};
use tracing::{debug, warn};

use crate::link_set::{Element, Shared};

impl IdentityChangeListener for Shared {
    fn on_before_identity_change(&self, record: &Record) {
        let mut state = self.state.lock();
        let old = record.identity();
        if let Some((index, _, _)) = state.entries.shift_remove_full(&Some(old)) {
            state.rekeying.push((record.clone(), index));
        }
    }

    fn on_after_identity_change(&self, record: &Record) {
        let mut state = self.state.lock();
        let Some(pending) = state.rekeying.iter().position(|(r, _)| r.ptr_eq(record)) else {
            return;
        };
        let (_, index) = state.rekeying.swap_remove(pending);

        let new = Some(record.identity());
        let element = Element::Loaded(record.clone());
        if let Some(existing) = state.entries.get_mut(&new) {
            let displaced = std::mem::replace(existing, element);
            warn!(
                target: "strata::linkset",
                id = %record.identity(),
                displaced = ?displaced,
                "Re-keyed entry collided with an existing member, merged"
            );
            return;
        }
        let index = index.min(state.entries.len());
        state.entries.shift_insert(index, new, element);
        debug!(target: "strata::linkset", id = %record.identity(), index, "Re-keyed entry after identity change");
    }
}
