//! Recall - A bounded in-memory content cache
//!
//! Provides loader-backed caching with TTL expiration, hit-weighted
//! eviction, source staleness detection, and dependency-driven
//! invalidation. Four preset variants (file content, LLM responses,
//! embeddings, search results) share the same engine and differ only in
//! configuration.

pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod manager;
pub mod tasks;

pub use cache::{CacheStats, CacheValue, ContentCache, ReadOutcome, SourceFingerprint};
pub use config::CacheOptions;
pub use error::{CacheError, Result};
pub use events::{CacheEvent, CacheObserver, EventKind, EvictReason, InvalidateReason};
pub use manager::{CacheManager, ManagerOptions, ManagerStats, SearchMatch};
pub use tasks::spawn_sweep_task;
