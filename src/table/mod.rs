//! Extendible hash directory — the cache's key/value substrate.
//!
//! Keys are routed by the low `global_depth` bits of a 32-bit FNV-1a hash.
//! When a bucket overflows, its population is split across two buckets with
//! one more identifying bit; when the overflowing bucket already uses every
//! directory bit, the directory itself doubles first.  Growth is therefore
//! local: only the overflowing bucket is redistributed, never the table.
//!
//! ## Directory representation
//!
//! Buckets live in an arena (`Vec<Bucket>`), and the directory is a vector
//! of arena indices.  Several directory slots may point at the same bucket
//! (exactly `2^(global_depth - local_depth)` of them).  A split reuses the
//! overflowing bucket's arena slot for the "promoted bit = 0" half and
//! allocates one fresh bucket for the "promoted bit = 1" half, so pointer
//! redistribution is just an overwrite of directory indices.

mod bucket;

use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use bucket::Bucket;

// ---------------------------------------------------------------------------
// Routing hash
// ---------------------------------------------------------------------------

const FNV_OFFSET_BASIS_32: u32 = 0x811c_9dc5;
const FNV_PRIME_32: u32 = 16_777_619;

/// 32-bit FNV-1a over `bytes`.
///
/// Directory routing must be stable across runs and processes, so the table
/// uses this fixed hash rather than the randomly-seeded hasher the rest of
/// the crate uses for its internal maps.
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS_32;
    for &b in bytes {
        hash ^= u32::from(b);
        hash = hash.wrapping_mul(FNV_PRIME_32);
    }
    hash
}

// ---------------------------------------------------------------------------
// Directory (the lock-protected interior)
// ---------------------------------------------------------------------------

struct Directory<V> {
    global_depth: usize,
    /// Count of distinct buckets referenced by `dir`.
    num_buckets: usize,
    /// Total entries across all buckets.
    num_entries: usize,
    /// Bucket arena.  Slots are reused across splits, never freed.
    buckets: Vec<Bucket<V>>,
    /// `2^global_depth` arena indices.
    dir: Vec<usize>,
}

impl<V> Directory<V> {
    /// Directory slot for `key` under the current global depth.
    ///
    /// With `global_depth == 0` the mask is zero and every key routes to
    /// slot 0.
    fn index_of(&self, key: &str) -> usize {
        let mask = (1usize << self.global_depth) - 1;
        fnv1a_32(key.as_bytes()) as usize & mask
    }

    fn bucket_at(&self, dir_index: usize) -> &Bucket<V> {
        &self.buckets[self.dir[dir_index]]
    }

    /// Places `(key, value)` where `key` is known to be absent, splitting as
    /// many times as it takes for the routed bucket to accept it.
    fn insert_new(&mut self, key: &str, value: Arc<V>, bucket_size: usize) {
        loop {
            let idx = self.index_of(key);
            let target = self.dir[idx];
            if self.buckets[target].insert(key, Arc::clone(&value)) {
                self.num_entries += 1;
                return;
            }
            self.split(target, bucket_size);
        }
    }

    /// Splits the overflowing bucket at arena index `target`.
    ///
    /// Doubles the directory first if `target` already uses every global
    /// bit.  The emptied `target` is reused as the half whose promoted bit
    /// is 0; a fresh bucket takes the half whose promoted bit is 1.
    fn split(&mut self, target: usize, bucket_size: usize) {
        if self.buckets[target].depth() == self.global_depth {
            let len = self.dir.len();
            for i in 0..len {
                self.dir.push(self.dir[i]);
            }
            self.global_depth += 1;
            debug!(
                "directory doubled: global_depth={} slots={}",
                self.global_depth,
                self.dir.len()
            );
        }

        self.buckets[target].increment_depth();
        let new_depth = self.buckets[target].depth();
        let entries = self.buckets[target].take_entries();

        let sibling = self.buckets.len();
        self.buckets.push(Bucket::new(bucket_size, new_depth));
        self.num_buckets += 1;

        // The bit just promoted into the bucket's identity decides which
        // half each directory slot now references.
        let mask = 1usize << (new_depth - 1);
        for (i, slot) in self.dir.iter_mut().enumerate() {
            if *slot == target && i & mask != 0 {
                *slot = sibling;
            }
        }

        // Re-route the old population.  Each entry lands in one of the two
        // halves; neither can overflow here because both start empty, but
        // the caller's retry loop covers the degenerate all-one-side case
        // by splitting again.
        for e in entries {
            let idx = self.index_of(&e.key);
            self.buckets[self.dir[idx]].insert(&e.key, e.value);
        }

        debug!(
            "bucket split: local_depth={} num_buckets={}",
            new_depth, self.num_buckets
        );
    }

    /// Audits the directory's structural invariants.  Test-only.
    #[cfg(test)]
    fn check_invariants(&self) {
        assert_eq!(self.dir.len(), 1 << self.global_depth, "directory length");

        let mut seen = std::collections::HashSet::new();
        for (i, &b) in self.dir.iter().enumerate() {
            let local = self.buckets[b].depth();
            assert!(local <= self.global_depth, "local depth exceeds global");
            // All slots referencing this bucket agree on the low local-depth
            // bits, so the first slot found is the canonical pattern.
            let mask = (1usize << local) - 1;
            let canonical = self
                .dir
                .iter()
                .position(|&s| s == b)
                .expect("bucket referenced by dir");
            assert_eq!(
                i & mask,
                canonical & mask,
                "slots of one bucket disagree on identifying bits"
            );
            seen.insert(b);
        }
        assert_eq!(seen.len(), self.num_buckets, "num_buckets drifted");

        let mut total = 0;
        let mut keys = std::collections::HashSet::new();
        for &b in &seen {
            for e in self.buckets[b].entries() {
                assert!(keys.insert(e.key.clone()), "key stored twice");
                // Every entry must route back to a slot referencing its
                // own bucket.
                assert_eq!(self.dir[self.index_of(&e.key)], b, "entry misrouted");
            }
            total += self.buckets[b].len();
        }
        assert_eq!(total, self.num_entries, "entry count drifted");
    }
}

// ---------------------------------------------------------------------------
// ExtendibleHashTable
// ---------------------------------------------------------------------------

/// A string-keyed hash table that grows by bucket splitting and directory
/// doubling.
///
/// All methods take `&self`; the directory is guarded by a single
/// reader/writer lock.  `find` and the accessors take the read side, so
/// lookups proceed concurrently; `insert` and `remove` serialize on the
/// write side, and a split never releases the lock mid-flight.
///
/// # Example
/// ```
/// use cortado::ExtendibleHashTable;
///
/// let table: ExtendibleHashTable<String> = ExtendibleHashTable::new(4);
/// table.insert("caffeine", "1,3,7-trimethylxanthine".to_string());
/// assert_eq!(
///     table.find("caffeine").as_deref(),
///     Some(&"1,3,7-trimethylxanthine".to_string())
/// );
/// assert!(table.remove("caffeine"));
/// assert!(table.find("caffeine").is_none());
/// ```
pub struct ExtendibleHashTable<V> {
    bucket_size: usize,
    inner: RwLock<Directory<V>>,
}

impl<V> ExtendibleHashTable<V> {
    /// Creates a table with a single empty bucket of capacity `bucket_size`.
    ///
    /// # Panics
    /// Panics if `bucket_size` is 0 — a zero-capacity bucket can never
    /// accept an entry, so insertion would split forever.
    pub fn new(bucket_size: usize) -> Self {
        assert!(bucket_size > 0, "bucket_size must be greater than 0");
        ExtendibleHashTable {
            bucket_size,
            inner: RwLock::new(Directory {
                global_depth: 0,
                num_buckets: 1,
                num_entries: 0,
                buckets: vec![Bucket::new(bucket_size, 0)],
                dir: vec![0],
            }),
        }
    }

    /// Returns the value for `key`, if present.
    pub fn find(&self, key: &str) -> Option<Arc<V>> {
        let dir = self.inner.read();
        let idx = dir.index_of(key);
        dir.bucket_at(idx).find(key)
    }

    /// Inserts `value` for `key`, overwriting any previous value.
    ///
    /// A duplicate key never triggers a split: the routed bucket updates it
    /// in place.  A new key that overflows its bucket drives the split loop
    /// until the directory has enough resolution to accept it.
    pub fn insert(&self, key: &str, value: V) {
        let value = Arc::new(value);
        let mut dir = self.inner.write();
        let idx = dir.index_of(key);
        let target = dir.dir[idx];
        if dir.buckets[target].find(key).is_some() {
            dir.buckets[target].insert(key, value);
            return;
        }
        dir.insert_new(key, value, self.bucket_size);
    }

    /// Removes the entry for `key`.  Returns whether a removal occurred.
    pub fn remove(&self, key: &str) -> bool {
        let mut dir = self.inner.write();
        let idx = dir.index_of(key);
        let target = dir.dir[idx];
        let removed = dir.buckets[target].remove(key);
        if removed {
            dir.num_entries -= 1;
        }
        removed
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    /// Number of low hash bits currently used to index the directory.
    pub fn global_depth(&self) -> usize {
        self.inner.read().global_depth
    }

    /// Local depth of the bucket referenced by directory slot `dir_index`.
    ///
    /// Slot indices are stable only until the next mutating call.
    ///
    /// # Panics
    /// Panics if `dir_index >= 2^global_depth`.
    pub fn local_depth(&self, dir_index: usize) -> usize {
        self.inner.read().bucket_at(dir_index).depth()
    }

    /// Count of distinct buckets referenced by the directory.
    pub fn num_buckets(&self) -> usize {
        self.inner.read().num_buckets
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.inner.read().num_entries
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
