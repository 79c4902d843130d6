//! Lazy resolving iteration over a LinkSet
//!
//! Two modes, fixed at construction:
//! - lazy: link-only entries are loaded through the session's store, the
//!   loaded record is cached back into the set, and the record is returned
//! - raw: entries are returned as stored, no store access
//!
//! Only `Element::Link` entries are ever loaded; pending ids and loaded
//! records come back as stored in both modes.
//!
//! A link that fails to resolve with `NotFound` (or a null load) is logged
//! and returned as the bare link; iteration continues. Other store errors are
//! yielded as `Err` so infrastructure failures are never masked.
//!
//! The iterator holds a position, not a lock, between steps. Caching an
//! upgrade replaces a value under an existing key and leaves positions intact;
//! `remove` adjusts the position for the removed entry. Any other mutation of
//! the set during iteration is the caller's responsibility.

use strata_core::{Session, StrataError, StrataResult};
use tracing::warn;

use crate::link_set::{Element, EntryKey, LinkSet};

/// Iterator over the elements of a `LinkSet`
///
/// Yields `Ok(Element)` per member in insertion order. In lazy mode a
/// resolved link comes back as `Element::Loaded`.
pub struct LazyRecordIter<'a> {
    set: &'a LinkSet,
    session: Session<'a>,
    lazy: bool,
    position: usize,
    /// Key of the last element returned by `next`, consumed by `remove`
    last: Option<EntryKey>,
}

impl<'a> LazyRecordIter<'a> {
    pub(crate) fn new(set: &'a LinkSet, session: Session<'a>, lazy: bool) -> Self {
        Self {
            set,
            session,
            lazy,
            position: 0,
            last: None,
        }
    }

    /// True if this iterator resolves links
    pub fn is_lazy(&self) -> bool {
        self.lazy
    }

    /// Remove the element last returned by `next` from the set
    ///
    /// The removal is a regular set mutation: the record's identity
    /// subscription is dropped, the owner is marked dirty and a REMOVE event
    /// is emitted.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperation` if `next` has not returned an element since
    /// the last call to `remove`.
    pub fn remove(&mut self) -> StrataResult<()> {
        let key = self.last.take().ok_or_else(|| {
            StrataError::invalid_operation("remove() called without a preceding next()")
        })?;

        let removed = self.set.shared.state.lock().entries.shift_remove_full(&key);
        if let Some((index, _, element)) = removed {
            if index < self.position {
                self.position -= 1;
            }
            self.set.shared.removed(vec![element]);
        }
        Ok(())
    }

    fn resolve(&self, key: EntryKey, element: Element) -> StrataResult<Element> {
        let id = match element {
            Element::Link(id) if self.lazy => id,
            other => return Ok(other),
        };
        let Some(store) = self.session.store() else {
            return Ok(Element::Link(id));
        };

        match store.load(&id) {
            Ok(Some(record)) => {
                self.set.shared.upgrade(key, &record);
                Ok(Element::Loaded(record))
            }
            Ok(None) => {
                warn!(target: "strata::linkset", id = %id, "Linked record resolved to nothing, returning link");
                Ok(Element::Link(id))
            }
            Err(e) if e.is_not_found() => {
                warn!(target: "strata::linkset", id = %id, error = %e, "Error on iterating record collection, returning link");
                Ok(Element::Link(id))
            }
            Err(e) => Err(e),
        }
    }
}

impl Iterator for LazyRecordIter<'_> {
    type Item = StrataResult<Element>;

    fn next(&mut self) -> Option<Self::Item> {
        let (key, element) = {
            let state = self.set.shared.state.lock();
            let (key, element) = state.entries.get_index(self.position)?;
            (*key, element.clone())
        };
        self.position += 1;
        self.last = Some(key);
        Some(self.resolve(key, element))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.set.len().saturating_sub(self.position);
        (remaining, Some(remaining))
    }
}

impl LinkSet {
    /// Iterate, resolving links through `session` when lazy resolution applies
    ///
    /// Lazy mode is on when `is_auto_convert_to_record()` is set and the owner
    /// is not being marshalled. With an unbound session links come back raw.
    pub fn iter<'a>(&'a self, session: Session<'a>) -> LazyRecordIter<'a> {
        let lazy = self.is_auto_convert_to_record() && !self.owner_is_marshalling();
        LazyRecordIter::new(self, session, lazy)
    }

    /// Iterate over stored elements without ever touching a store
    pub fn raw_iter(&self) -> LazyRecordIter<'_> {
        LazyRecordIter::new(self, Session::unbound(), false)
    }
}
