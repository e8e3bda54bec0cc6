//! Revision-keyed caches for derived values.
//!
//! Extensions compute derived values from collection contents. A cached value
//! is reused only while the revision it was computed at is still current, so a
//! cache hit is always equal to a fresh computation.

use std::cell::RefCell;
use std::collections::BTreeMap;

/// Single-slot cache.
#[derive(Debug)]
pub struct Memo<T> {
    slot: RefCell<Option<(u64, T)>>,
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self {
            slot: RefCell::new(None),
        }
    }
}

impl<T: Clone> Memo<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value for `revision`, computing it on a miss.
    pub fn get_or_compute(&self, revision: u64, compute: impl FnOnce() -> T) -> T {
        if let Some((cached_at, value)) = self.slot.borrow().as_ref() {
            if *cached_at == revision {
                return value.clone();
            }
        }
        // No borrow is held while computing; `compute` may read other memos.
        let value = compute();
        *self.slot.borrow_mut() = Some((revision, value.clone()));
        value
    }

    pub fn invalidate(&self) {
        self.slot.borrow_mut().take();
    }
}

/// Cache keyed by argument, for parameterized derived queries.
#[derive(Debug)]
pub struct MemoMap<K, T> {
    slots: RefCell<BTreeMap<K, (u64, T)>>,
}

impl<K, T> Default for MemoMap<K, T> {
    fn default() -> Self {
        Self {
            slots: RefCell::new(BTreeMap::new()),
        }
    }
}

impl<K: Ord + Clone, T: Clone> MemoMap<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute(&self, key: &K, revision: u64, compute: impl FnOnce() -> T) -> T {
        if let Some((cached_at, value)) = self.slots.borrow().get(key) {
            if *cached_at == revision {
                return value.clone();
            }
        }
        let value = compute();
        let mut slots = self.slots.borrow_mut();
        // Entries from older revisions can never hit again.
        slots.retain(|_, (cached_at, _)| *cached_at == revision);
        slots.insert(key.clone(), (revision, value.clone()));
        value
    }

    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{Memo, MemoMap};
    use std::cell::Cell;

    #[test]
    fn memo_reuses_value_until_revision_changes() {
        let memo = Memo::new();
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            calls.get() * 10
        };

        assert_eq!(memo.get_or_compute(1, compute), 10);
        assert_eq!(memo.get_or_compute(1, compute), 10);
        assert_eq!(calls.get(), 1);

        assert_eq!(memo.get_or_compute(2, compute), 20);
        memo.invalidate();
        assert_eq!(memo.get_or_compute(2, compute), 30);
    }

    #[test]
    fn memo_map_drops_stale_entries() {
        let memo = MemoMap::new();
        memo.get_or_compute(&"a", 1, || 1);
        memo.get_or_compute(&"b", 1, || 2);
        assert_eq!(memo.len(), 2);

        assert_eq!(memo.get_or_compute(&"a", 2, || 3), 3);
        assert_eq!(memo.len(), 1);
        assert_eq!(memo.get_or_compute(&"a", 2, || 99), 3);
    }
}
