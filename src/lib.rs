mod builder;
mod cache;
mod metrics;
pub mod policy;
pub mod table;

pub use builder::CacheBuilder;
pub use cache::Cache;
pub use metrics::stats::Metrics;
pub use policy::lru_k::LruKReplacer;
pub use policy::{FrameId, Replacer};
pub use table::ExtendibleHashTable;
