//! LRU-K replacement — evicts the frame whose backward k-distance is
//! largest.
//!
//! A frame with fewer than `k` recorded accesses has backward k-distance
//! +∞, so any evictable such frame beats every frame with `k` or more
//! accesses.  Frames therefore live on one of two lists:
//!
//! - the **history** list (`access_count < k`), ordered newest-access
//!   first — the back is the +∞ frame whose accesses are oldest, the LRU
//!   tiebreak;
//! - the **cache** list (`access_count >= k`), ordered newest-access
//!   first — the back has the oldest k-th-from-last access.
//!
//! Eviction scans history back-to-front, then cache back-to-front, and
//! takes the first evictable frame.
//!
//! Both lists are index-linked nodes in one slab (`Vec` plus a free list),
//! the same trick an arena-backed LRU list uses to get O(1) unlink without
//! raw pointers: the handle map stores slab indices, not frames.

use ahash::AHashMap;
use log::trace;
use parking_lot::RwLock;

use super::{FrameId, Replacer};

/// Sentinel indices in the node slab.  Front = newest, back = oldest.
const HISTORY_HEAD: usize = 0;
const HISTORY_TAIL: usize = 1;
const CACHE_HEAD: usize = 2;
const CACHE_TAIL: usize = 3;
const NULL: usize = usize::MAX;

struct Node {
    /// `None` only for the four sentinels.
    frame: Option<FrameId>,
    prev: usize,
    next: usize,
}

struct FrameState {
    access_count: usize,
    evictable: bool,
}

struct ReplacerCore {
    /// Indices 0–3 are the list sentinels; 4+ are real nodes.
    nodes: Vec<Node>,
    /// Reusable slab slots.
    free_list: Vec<usize>,
    /// Frame → its node's slab index (in whichever list holds it).
    handles: AHashMap<FrameId, usize>,
    /// Per-frame bookkeeping; a frame exists iff it has an entry here.
    states: AHashMap<FrameId, FrameState>,
    /// Number of tracked frames with `evictable == true`.
    curr_size: usize,
}

impl ReplacerCore {
    fn new() -> Self {
        let sentinel = |prev, next| Node {
            frame: None,
            prev,
            next,
        };
        ReplacerCore {
            nodes: vec![
                sentinel(NULL, HISTORY_TAIL), // HISTORY_HEAD
                sentinel(HISTORY_HEAD, NULL), // HISTORY_TAIL
                sentinel(NULL, CACHE_TAIL),   // CACHE_HEAD
                sentinel(CACHE_HEAD, NULL),   // CACHE_TAIL
            ],
            free_list: Vec::new(),
            handles: AHashMap::new(),
            states: AHashMap::new(),
            curr_size: 0,
        }
    }

    fn unlink(&mut self, idx: usize) {
        let prev = self.nodes[idx].prev;
        let next = self.nodes[idx].next;
        self.nodes[prev].next = next;
        self.nodes[next].prev = prev;
        self.nodes[idx].prev = NULL;
        self.nodes[idx].next = NULL;
    }

    fn link_after(&mut self, head: usize, idx: usize) {
        let old_first = self.nodes[head].next;
        self.nodes[idx].prev = head;
        self.nodes[idx].next = old_first;
        self.nodes[head].next = idx;
        self.nodes[old_first].prev = idx;
    }

    fn alloc_node(&mut self, frame: FrameId) -> usize {
        if let Some(idx) = self.free_list.pop() {
            self.nodes[idx].frame = Some(frame);
            idx
        } else {
            self.nodes.push(Node {
                frame: Some(frame),
                prev: NULL,
                next: NULL,
            });
            self.nodes.len() - 1
        }
    }

    /// Detaches `frame`'s node (if any) and pushes it to the front of the
    /// list headed by `head`.
    fn move_to_front(&mut self, head: usize, frame: FrameId) {
        let idx = match self.handles.get(&frame) {
            Some(&idx) => {
                self.unlink(idx);
                idx
            }
            None => {
                let idx = self.alloc_node(frame);
                self.handles.insert(frame, idx);
                idx
            }
        };
        self.link_after(head, idx);
    }

    /// Drops every trace of `frame`, whose node index is `idx`.
    fn release(&mut self, frame: FrameId, idx: usize) {
        self.unlink(idx);
        self.nodes[idx].frame = None;
        self.free_list.push(idx);
        self.handles.remove(&frame);
        self.states.remove(&frame);
        self.curr_size -= 1;
    }

    /// Back-to-front scan of the list ending at `tail`; returns the first
    /// evictable frame without modifying anything.
    fn scan_victim(&self, tail: usize) -> Option<(FrameId, usize)> {
        let mut idx = self.nodes[tail].prev;
        while self.nodes[idx].frame.is_some() {
            let frame = self.nodes[idx].frame.expect("non-sentinel node has a frame");
            if self.states[&frame].evictable {
                return Some((frame, idx));
            }
            idx = self.nodes[idx].prev;
        }
        None
    }
}

/// Thread-safe LRU-K replacer over frames `0..=num_frames`.
///
/// # Example
/// ```
/// use cortado::{LruKReplacer, Replacer};
///
/// let replacer = LruKReplacer::new(7, 2);
/// replacer.record_access(3);
/// replacer.record_access(5);
/// replacer.set_evictable(3, true);
/// replacer.set_evictable(5, true);
/// // Frame 3's single access is older, so it is the victim.
/// assert_eq!(replacer.evict(), Some(3));
/// assert_eq!(replacer.size(), 1);
/// ```
pub struct LruKReplacer {
    /// Largest accepted frame id.  Ids beyond this are a caller bug.
    max_frame: usize,
    k: usize,
    inner: RwLock<ReplacerCore>,
}

impl LruKReplacer {
    /// Creates a replacer accepting frame ids in `0..=num_frames` that
    /// tracks the last `k` accesses per frame.
    ///
    /// # Panics
    /// Panics if `k` is 0.
    pub fn new(num_frames: usize, k: usize) -> Self {
        assert!(k >= 1, "k must be at least 1");
        LruKReplacer {
            max_frame: num_frames,
            k,
            inner: RwLock::new(ReplacerCore::new()),
        }
    }

    fn check_frame(&self, op: &str, id: FrameId) {
        if id > self.max_frame {
            panic!(
                "{op}: frame id {id} exceeds replacer capacity {}",
                self.max_frame
            );
        }
    }
}

impl Replacer for LruKReplacer {
    fn record_access(&self, id: FrameId) {
        self.check_frame("record_access", id);
        let mut core = self.inner.write();

        let count = {
            let state = core.states.entry(id).or_insert(FrameState {
                access_count: 0,
                evictable: false,
            });
            state.access_count += 1;
            state.access_count
        };

        if count >= self.k {
            // Graduation (== k) moves the node out of history; afterwards
            // every access just refreshes its cache-list position.
            core.move_to_front(CACHE_HEAD, id);
        } else {
            core.move_to_front(HISTORY_HEAD, id);
        }
    }

    fn set_evictable(&self, id: FrameId, evictable: bool) {
        self.check_frame("set_evictable", id);
        let mut core = self.inner.write();
        let core = &mut *core;
        let Some(state) = core.states.get_mut(&id) else {
            // Stale reference to a frame already evicted or removed.
            return;
        };
        if state.evictable != evictable {
            state.evictable = evictable;
            if evictable {
                core.curr_size += 1;
            } else {
                core.curr_size -= 1;
            }
        }
    }

    fn evict(&self) -> Option<FrameId> {
        let mut core = self.inner.write();
        if core.curr_size == 0 {
            return None;
        }
        // Every history frame has backward k-distance +∞ and dominates the
        // whole cache list; within a list the back is the victim.
        let victim = core
            .scan_victim(HISTORY_TAIL)
            .or_else(|| core.scan_victim(CACHE_TAIL));
        let (frame, idx) = victim?;
        core.release(frame, idx);
        trace!("evicted frame {frame}");
        Some(frame)
    }

    fn remove(&self, id: FrameId) {
        self.check_frame("remove", id);
        let mut core = self.inner.write();
        let Some(state) = core.states.get(&id) else {
            return;
        };
        if !state.evictable {
            panic!("remove: frame id {id} is not evictable");
        }
        let idx = core.handles[&id];
        core.release(id, idx);
    }

    fn size(&self) -> usize {
        self.inner.read().curr_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Scenarios A, B, and C share one replacer (capacity 7, k = 2); each
    // stage's asserts depend on the state the previous stage left behind.
    #[test]
    fn eviction_order_across_access_patterns() {
        let r = LruKReplacer::new(7, 2);

        // A: six frames touched once, five evictable.  Frame 1 then earns
        // a second access and graduates, so the history back (2, 3, 4) go
        // first.
        for id in 1..=6 {
            r.record_access(id);
        }
        for id in 1..=5 {
            r.set_evictable(id, true);
        }
        r.set_evictable(6, false);
        assert_eq!(r.size(), 5);

        r.record_access(1);
        assert_eq!(r.evict(), Some(2));
        assert_eq!(r.evict(), Some(3));
        assert_eq!(r.evict(), Some(4));
        assert_eq!(r.size(), 2);

        // B: 4 and 5 graduate; 3 re-enters history and, as a +inf frame,
        // wins over every cache-resident frame.
        r.record_access(3);
        r.record_access(4);
        r.record_access(5);
        r.record_access(4);
        r.set_evictable(3, true);
        r.set_evictable(4, true);
        assert_eq!(r.size(), 4);
        assert_eq!(r.evict(), Some(3));
        assert_eq!(r.size(), 3);

        r.set_evictable(6, true);
        assert_eq!(r.evict(), Some(6));

        // C: toggling evictability mid-stream.  Pinning 1 leaves 5 as the
        // cache-list victim; unpinning 1 after two more accesses makes it
        // the newest and therefore last to go.
        r.set_evictable(1, false);
        assert_eq!(r.evict(), Some(5));
        r.record_access(1);
        r.record_access(1);
        r.set_evictable(1, true);
        assert_eq!(r.evict(), Some(4));
        assert_eq!(r.evict(), Some(1));
        assert_eq!(r.evict(), None);
        r.remove(1); // absent: silent no-op
        assert_eq!(r.size(), 0);
    }

    #[test]
    fn evict_on_empty_replacer_returns_none() {
        let r = LruKReplacer::new(4, 2);
        assert_eq!(r.evict(), None);
    }

    #[test]
    fn frames_start_pinned() {
        let r = LruKReplacer::new(4, 2);
        r.record_access(0);
        assert_eq!(r.size(), 0);
        assert_eq!(r.evict(), None);
        r.set_evictable(0, true);
        assert_eq!(r.size(), 1);
        assert_eq!(r.evict(), Some(0));
    }

    #[test]
    fn set_evictable_is_idempotent_on_size() {
        let r = LruKReplacer::new(4, 2);
        r.record_access(1);
        r.set_evictable(1, true);
        r.set_evictable(1, true);
        assert_eq!(r.size(), 1);
        r.set_evictable(1, false);
        r.set_evictable(1, false);
        assert_eq!(r.size(), 0);
    }

    #[test]
    fn set_evictable_on_unknown_frame_is_ignored() {
        let r = LruKReplacer::new(4, 2);
        r.set_evictable(3, true);
        assert_eq!(r.size(), 0);
    }

    #[test]
    fn remove_drops_access_history() {
        let r = LruKReplacer::new(4, 3);
        r.record_access(1);
        r.record_access(1);
        r.set_evictable(1, true);
        r.remove(1);
        assert_eq!(r.size(), 0);
        // A fresh access starts the count over: still history-resident
        // (count 1 < k), so it is evicted before a graduated frame.
        r.record_access(2);
        r.record_access(2);
        r.record_access(2);
        r.record_access(1);
        r.set_evictable(1, true);
        r.set_evictable(2, true);
        assert_eq!(r.evict(), Some(1));
    }

    #[test]
    fn boundary_frame_id_is_accepted() {
        // Ids up to and including the configured frame count are valid.
        let r = LruKReplacer::new(4, 2);
        r.record_access(4);
        r.set_evictable(4, true);
        assert_eq!(r.evict(), Some(4));
    }

    #[test]
    #[should_panic(expected = "record_access")]
    fn record_access_out_of_range_panics() {
        let r = LruKReplacer::new(4, 2);
        r.record_access(5);
    }

    #[test]
    #[should_panic(expected = "set_evictable")]
    fn set_evictable_out_of_range_panics() {
        let r = LruKReplacer::new(4, 2);
        r.set_evictable(5, true);
    }

    #[test]
    #[should_panic(expected = "not evictable")]
    fn remove_of_pinned_frame_panics() {
        let r = LruKReplacer::new(4, 2);
        r.record_access(1);
        r.remove(1);
    }

    #[test]
    fn k_equal_one_degenerates_to_lru() {
        let r = LruKReplacer::new(4, 1);
        // With k = 1 every access graduates immediately; the cache list is
        // plain LRU.
        for id in [1, 2, 3] {
            r.record_access(id);
            r.set_evictable(id, true);
        }
        r.record_access(1); // refresh 1
        assert_eq!(r.evict(), Some(2));
        assert_eq!(r.evict(), Some(3));
        assert_eq!(r.evict(), Some(1));
    }

    #[test]
    fn slab_slots_are_reused_after_eviction() {
        let r = LruKReplacer::new(16, 2);
        for round in 0..4 {
            for id in 0..8 {
                r.record_access(id);
                r.set_evictable(id, true);
            }
            for _ in 0..8 {
                assert!(r.evict().is_some(), "round {round}");
            }
            assert_eq!(r.size(), 0);
        }
        // 4 sentinels + at most 8 live nodes, regardless of rounds.
        assert!(r.inner.read().nodes.len() <= 12);
    }
}
