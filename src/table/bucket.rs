use std::sync::Arc;

/// A single key/value slot in a bucket.
///
/// Values are stored behind `Arc` so that lookups and split redistribution
/// hand out cheap clones of a shared handle instead of copying `V`.
pub(crate) struct Entry<V> {
    pub(crate) key: String,
    pub(crate) value: Arc<V>,
}

/// A bounded, ordered list of entries with a local depth.
///
/// The bucket itself never grows past `size` entries; signalling overflow to
/// the owning table (via `insert` returning `false`) is its only failure
/// mode.  The table reacts by splitting.
pub(crate) struct Bucket<V> {
    /// Capacity in entries, fixed at construction.
    size: usize,
    /// Number of low hash bits that identify this bucket in the directory.
    depth: usize,
    entries: Vec<Entry<V>>,
}

impl<V> Bucket<V> {
    pub(crate) fn new(size: usize, depth: usize) -> Self {
        Bucket {
            size,
            depth,
            entries: Vec::with_capacity(size),
        }
    }

    /// Linear scan for `key`.  Returns a handle to the value if present.
    pub(crate) fn find(&self, key: &str) -> Option<Arc<V>> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| Arc::clone(&e.value))
    }

    /// Inserts or overwrites `key`.
    ///
    /// Returns `false` only when the key is new and the bucket is already at
    /// capacity — the caller must split and retry.  A duplicate key is
    /// updated in place regardless of fullness.
    pub(crate) fn insert(&mut self, key: &str, value: Arc<V>) -> bool {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.key == key) {
            entry.value = value;
            return true;
        }
        if self.is_full() {
            return false;
        }
        self.entries.push(Entry {
            key: key.to_owned(),
            value,
        });
        true
    }

    /// Removes the entry for `key`, preserving the order of the rest.
    pub(crate) fn remove(&mut self, key: &str) -> bool {
        match self.entries.iter().position(|e| e.key == key) {
            Some(i) => {
                self.entries.remove(i);
                true
            }
            None => false,
        }
    }

    pub(crate) fn is_full(&self) -> bool {
        self.entries.len() == self.size
    }

    pub(crate) fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn increment_depth(&mut self) {
        self.depth += 1;
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub(crate) fn entries(&self) -> &[Entry<V>] {
        &self.entries
    }

    /// Empties the bucket, handing its entries to the caller.
    ///
    /// Used during a split: the drained entries are re-routed through the
    /// directory and the emptied bucket is reused as one of the two halves.
    pub(crate) fn take_entries(&mut self) -> Vec<Entry<V>> {
        std::mem::take(&mut self.entries)
    }
}
