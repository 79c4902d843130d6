//! Bulk maintenance of a LinkSet
//!
//! - `convert_links_to_records`: best-effort warm-up; unresolvable links stay
//! - `clear_deleted_records`: authoritative sweep of links whose record is gone
//! - `convert_records_to_links` / `detach`: drop loaded records, keep ids
//!
//! Store access happens without holding the set lock; results are applied
//! afterwards and only to entries that are still links. Pending entries are
//! never sent to the store.

use strata_core::{RecordId, Session, StrataResult};
use tracing::debug;

use crate::link_set::{Element, LinkSet};

impl LinkSet {
    /// Identities of all link-only entries, in insertion order
    fn link_ids(&self) -> Vec<RecordId> {
        self.shared
            .state
            .lock()
            .entries
            .values()
            .filter_map(|element| match element {
                Element::Link(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Load every link-only entry and store it loaded
    ///
    /// Links whose record is missing are left untouched; this never shrinks
    /// the set. Returns the number of entries upgraded. With an unbound
    /// session nothing is loaded.
    ///
    /// # Errors
    ///
    /// Store errors other than `NotFound` are returned; upgrades applied
    /// before the failure are kept.
    pub fn convert_links_to_records(&self, session: Session<'_>) -> StrataResult<usize> {
        let Some(store) = session.store() else {
            return Ok(0);
        };

        let mut converted = 0;
        for id in self.link_ids() {
            let record = match store.load(&id) {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            };
            if self.shared.upgrade(Some(id), &record) {
                converted += 1;
            }
        }

        debug!(target: "strata::linkset", converted, "Converted links to records");
        Ok(converted)
    }

    /// Remove link-only entries whose record no longer exists
    ///
    /// A record is gone when the store answers `NotFound` or resolves it to
    /// nothing. Loaded entries and resolvable links are untouched. Returns
    /// true if anything was removed. With an unbound session nothing is
    /// removed.
    ///
    /// # Errors
    ///
    /// Store errors other than `NotFound` are returned and nothing is removed.
    pub fn clear_deleted_records(&self, session: Session<'_>) -> StrataResult<bool> {
        let Some(store) = session.store() else {
            return Ok(false);
        };

        let mut deleted = Vec::new();
        for id in self.link_ids() {
            match store.load(&id) {
                Ok(Some(_)) => {}
                Ok(None) => deleted.push(id),
                Err(e) if e.is_not_found() => deleted.push(id),
                Err(e) => return Err(e),
            }
        }
        if deleted.is_empty() {
            return Ok(false);
        }

        let removed: Vec<Element> = {
            let mut state = self.shared.state.lock();
            deleted
                .iter()
                .filter_map(|id| {
                    let key = Some(*id);
                    if matches!(state.entries.get(&key), Some(Element::Link(_))) {
                        state.entries.shift_remove(&key)
                    } else {
                        None
                    }
                })
                .collect()
        };

        let any = !removed.is_empty();
        debug!(target: "strata::linkset", removed = removed.len(), "Cleared deleted records");
        self.shared.removed(removed);
        Ok(any)
    }

    /// Downgrade loaded entries to links
    ///
    /// Records without a persistent identity cannot be represented as links
    /// and stay loaded, as do pending ids; the return value is false if any
    /// such entry remains.
    /// Downgraded records are unsubscribed and untracked. Idempotent.
    pub fn convert_records_to_links(&self) -> bool {
        let mut released = Vec::new();
        let mut all_links = true;

        {
            let mut state = self.shared.state.lock();
            for element in state.entries.values_mut() {
                let record = match element {
                    Element::Loaded(record) => record,
                    Element::Pending(_) => {
                        all_links = false;
                        continue;
                    }
                    Element::Null | Element::Link(_) => continue,
                };
                let id = record.identity();
                if id.is_persistent() {
                    released.push(record.clone());
                    *element = Element::Link(id);
                } else {
                    all_links = false;
                }
            }
        }

        for record in &released {
            self.shared.release(record);
        }
        if !released.is_empty() {
            debug!(target: "strata::linkset", released = released.len(), "Converted records to links");
        }
        all_links
    }

    /// Prepare the set for crossing an ownership boundary
    ///
    /// Equivalent to `convert_records_to_links`.
    pub fn detach(&self) -> bool {
        self.convert_records_to_links()
    }
}
