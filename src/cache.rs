use std::sync::Arc;

use ahash::AHashMap;
use log::trace;
use parking_lot::{Mutex, RwLock};

use crate::builder::CacheBuilder;
use crate::metrics::stats::{Metrics, StatsCounter};
use crate::policy::lru_k::LruKReplacer;
use crate::policy::{FrameId, Replacer};
use crate::table::ExtendibleHashTable;

// ---------------------------------------------------------------------------
// FrameTable
// ---------------------------------------------------------------------------

/// Bidirectional binding between keys and replacer frames.
///
/// The replacer speaks frame ids; the table speaks keys.  Each resident key
/// is bound to one frame from `0..num_frames`, allocated from a free list
/// and recycled when the key is evicted or removed.
struct FrameTable {
    frame_of: AHashMap<String, FrameId>,
    /// Frame → bound key.  `None` while the frame is on the free list.
    key_of: Vec<Option<String>>,
    free: Vec<FrameId>,
}

impl FrameTable {
    fn new(num_frames: usize) -> Self {
        FrameTable {
            frame_of: AHashMap::new(),
            key_of: vec![None; num_frames],
            // Pop order makes frame 0 the first handed out.
            free: (0..num_frames).rev().collect(),
        }
    }

    fn frame_of(&self, key: &str) -> Option<FrameId> {
        self.frame_of.get(key).copied()
    }

    /// Binds `key` to a frame, reusing an existing binding if present.
    /// `None` means every frame is bound — the caller must evict first.
    fn bind(&mut self, key: &str) -> Option<FrameId> {
        if let Some(&frame) = self.frame_of.get(key) {
            return Some(frame);
        }
        let frame = self.free.pop()?;
        self.frame_of.insert(key.to_owned(), frame);
        self.key_of[frame] = Some(key.to_owned());
        Some(frame)
    }

    /// Releases the binding for `frame`, returning the key it held.
    fn release_frame(&mut self, frame: FrameId) -> Option<String> {
        let key = self.key_of[frame].take()?;
        self.frame_of.remove(&key);
        self.free.push(frame);
        Some(key)
    }

    /// Releases the binding for `key`, returning the frame it held.
    fn release_key(&mut self, key: &str) -> Option<FrameId> {
        let frame = self.frame_of.remove(key)?;
        self.key_of[frame] = None;
        self.free.push(frame);
        Some(frame)
    }
}

// ---------------------------------------------------------------------------
// KeyLocks
// ---------------------------------------------------------------------------

/// Lazily-populated registry of per-key reader/writer locks.
///
/// The registry map is itself guarded: lookups take the read side and fall
/// back to a write-side `entry` call for the first sighting of a key, so
/// two threads racing on a fresh key agree on a single lock.
struct KeyLocks {
    registry: RwLock<AHashMap<String, Arc<RwLock<()>>>>,
}

impl KeyLocks {
    fn new() -> Self {
        KeyLocks {
            registry: RwLock::new(AHashMap::new()),
        }
    }

    fn lock_for(&self, key: &str) -> Arc<RwLock<()>> {
        if let Some(lock) = self.registry.read().get(key) {
            return Arc::clone(lock);
        }
        let mut registry = self.registry.write();
        Arc::clone(
            registry
                .entry(key.to_owned())
                .or_insert_with(|| Arc::new(RwLock::new(()))),
        )
    }
}

// ---------------------------------------------------------------------------
// Cache interior
// ---------------------------------------------------------------------------

struct Inner<V> {
    table: ExtendibleHashTable<V>,
    replacer: LruKReplacer,
    frames: Mutex<FrameTable>,
    key_locks: KeyLocks,
    metrics: StatsCounter,
}

// ---------------------------------------------------------------------------
// Cache handle
// ---------------------------------------------------------------------------

/// A concurrent keyed cache: an extendible hash directory for placement and
/// an LRU-K replacer for victim selection.
///
/// `set` inserts into the directory and records an evictable access for the
/// key's frame; `get` looks up and records an access.  When every frame is
/// bound, `set` evicts the frame with the largest backward k-distance and
/// drops its key before admitting the new one.
///
/// Per-key reader/writer locks make the table-then-replacer pair of calls
/// appear atomic to other cache callers of the same key.
///
/// # Example
/// ```
/// use cortado::CacheBuilder;
/// use std::sync::Arc;
///
/// let cache: cortado::Cache<String> = CacheBuilder::new(64).build();
/// cache.set("hello", "world".to_string());
/// assert_eq!(cache.get("hello"), Some(Arc::new("world".to_string())));
/// assert_eq!(cache.get("absent"), None);
/// ```
pub struct Cache<V> {
    inner: Arc<Inner<V>>,
}

impl<V> Clone for Cache<V> {
    fn clone(&self) -> Self {
        Cache {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> Cache<V> {
    pub(crate) fn new(num_frames: usize, k: usize, bucket_size: usize) -> Self {
        Cache {
            inner: Arc::new(Inner {
                table: ExtendibleHashTable::new(bucket_size),
                replacer: LruKReplacer::new(num_frames, k),
                frames: Mutex::new(FrameTable::new(num_frames)),
                key_locks: KeyLocks::new(),
                metrics: StatsCounter::new(),
            }),
        }
    }

    /// Returns a [`CacheBuilder`] for constructing a new cache.
    pub fn builder(num_frames: usize) -> CacheBuilder<V> {
        CacheBuilder::new(num_frames)
    }

    // -----------------------------------------------------------------------
    // Hot-path: set
    // -----------------------------------------------------------------------

    /// Inserts `value` for `key`, replacing any previous value, and marks
    /// the key's frame as an eviction candidate.
    ///
    /// If no frame is free, the replacer's victim (and its key) are dropped
    /// first.  Should the replacer have no evictable frame either, the
    /// entry is still stored but stays untracked until a later `set`.
    pub fn set(&self, key: &str, value: V) {
        let lock = self.inner.key_locks.lock_for(key);
        let _guard = lock.write();

        let frame = self.reserve_frame(key);
        self.inner.table.insert(key, value);
        self.inner.metrics.record_insertion();

        if let Some(frame) = frame {
            self.inner.replacer.record_access(frame);
            self.inner.replacer.set_evictable(frame, true);
        }
    }

    /// Binds `key` to a frame, evicting the replacer's victim if the frame
    /// table is full.
    fn reserve_frame(&self, key: &str) -> Option<FrameId> {
        if let Some(frame) = self.inner.frames.lock().bind(key) {
            return Some(frame);
        }
        let victim = self.inner.replacer.evict()?;
        let victim_key = self.inner.frames.lock().release_frame(victim);
        if let Some(victim_key) = victim_key {
            self.inner.table.remove(&victim_key);
            self.inner.metrics.record_eviction();
            trace!("evicted key {victim_key:?} from frame {victim}");
        }
        self.inner.frames.lock().bind(key)
    }

    // -----------------------------------------------------------------------
    // Hot-path: get
    // -----------------------------------------------------------------------

    /// Returns the value for `key` and records an access on its frame.
    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        let lock = self.inner.key_locks.lock_for(key);
        let _guard = lock.read();

        let Some(value) = self.inner.table.find(key) else {
            self.inner.metrics.record_miss();
            return None;
        };
        self.inner.metrics.record_hit();

        if let Some(frame) = self.inner.frames.lock().frame_of(key) {
            self.inner.replacer.record_access(frame);
        }
        Some(value)
    }

    // -----------------------------------------------------------------------
    // Removal
    // -----------------------------------------------------------------------

    /// Removes the entry for `key`, releasing its frame and dropping its
    /// access history.  Returns whether an entry was removed.
    pub fn remove(&self, key: &str) -> bool {
        let lock = self.inner.key_locks.lock_for(key);
        let _guard = lock.write();

        let removed = self.inner.table.remove(key);
        // Clear the replacer before the frame can be rebound: holding the
        // frame-table lock keeps a concurrent `set` from recycling this
        // frame until its old access history is gone.
        let mut frames = self.inner.frames.lock();
        if let Some(frame) = frames.frame_of(key) {
            self.inner.replacer.remove(frame);
            frames.release_key(key);
        }
        removed
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    pub fn stats(&self) -> Metrics {
        self.inner.metrics.snapshot()
    }

    /// Number of entries currently resident.
    pub fn entry_count(&self) -> usize {
        self.inner.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.table.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.table.find(key).is_some()
    }
}
