//! Cache Module
//!
//! Provides loader-backed in-memory caching with TTL expiration, scored
//! eviction, source staleness checks, and dependency-driven invalidation.

mod deps;
mod entry;
mod hash;
mod policy;
mod staleness;
mod stats;
mod store;
mod value;


// Re-export public types
pub use entry::CacheEntry;
pub use hash::{compute_hash, hash_bytes, hash_json};
pub use policy::{eviction_score, HIT_WEIGHT_MS};
pub use staleness::{is_stale, FsProbe, SourceFingerprint, SourceProbe};
pub use stats::CacheStats;
pub use store::{ContentCache, ReadOutcome};
pub use value::CacheValue;
