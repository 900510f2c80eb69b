use std::marker::PhantomData;

use crate::cache::Cache;

/// Builder for configuring and constructing a [`Cache`].
///
/// # Example
/// ```
/// use cortado::CacheBuilder;
///
/// let cache: cortado::Cache<Vec<u8>> = CacheBuilder::new(1_024)
///     .k(3)
///     .bucket_size(16)
///     .build();
/// cache.set("blob", vec![1, 2, 3]);
/// ```
pub struct CacheBuilder<V> {
    num_frames: usize,
    k: usize,
    bucket_size: usize,
    _marker: PhantomData<fn() -> V>,
}

impl<V> CacheBuilder<V> {
    /// Starts a builder for a cache holding at most `num_frames` tracked
    /// entries.
    pub fn new(num_frames: usize) -> Self {
        assert!(num_frames > 0, "num_frames must be greater than 0");
        CacheBuilder {
            num_frames,
            k: 2,
            bucket_size: 8,
            _marker: PhantomData,
        }
    }

    /// Number of accesses the replacer remembers per frame (default: 2).
    pub fn k(mut self, k: usize) -> Self {
        assert!(k >= 1, "k must be at least 1");
        self.k = k;
        self
    }

    /// Capacity of each hash-directory bucket (default: 8).
    pub fn bucket_size(mut self, n: usize) -> Self {
        assert!(n > 0, "bucket_size must be greater than 0");
        self.bucket_size = n;
        self
    }

    pub fn build(self) -> Cache<V> {
        Cache::new(self.num_frames, self.k, self.bucket_size)
    }
}
