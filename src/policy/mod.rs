pub mod lru_k;

/// Identifier of a frame — the opaque unit of cache residency a replacer
/// tracks.  Frames are small non-negative integers handed out by the cache
/// manager's frame table.
pub type FrameId = usize;

/// Victim-selection strategy over a fixed population of frames.
///
/// Implementations are internally synchronized: every method takes `&self`
/// and callers from any thread may interleave freely.  The cache manager
/// drives this trait, but nothing stops direct use — the contract below is
/// the whole story.
pub trait Replacer: Send + Sync {
    /// Records an access to `id` now, creating tracking state on first
    /// sight.  Never changes evictability — a newly observed frame starts
    /// pinned until [`set_evictable`](Replacer::set_evictable) says
    /// otherwise.
    ///
    /// # Panics
    /// Panics if `id` is outside the replacer's frame range.
    fn record_access(&self, id: FrameId);

    /// Marks `id` as eligible (or ineligible) for eviction.  Unknown frames
    /// are ignored.
    ///
    /// # Panics
    /// Panics if `id` is outside the replacer's frame range.
    fn set_evictable(&self, id: FrameId, evictable: bool);

    /// Selects, removes, and returns the frame with the largest backward
    /// k-distance among evictable frames, or `None` when nothing is
    /// evictable.
    fn evict(&self) -> Option<FrameId>;

    /// Drops all tracking state for `id`, regardless of its k-distance.
    /// Unknown frames are ignored.
    ///
    /// # Panics
    /// Panics if `id` is outside the replacer's frame range, or if `id` is
    /// tracked but not evictable.
    fn remove(&self, id: FrameId);

    /// Number of evictable frames.
    fn size(&self) -> usize;
}
