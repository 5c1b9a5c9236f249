//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL and access
//! metadata.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::cache::staleness::SourceFingerprint;

// == Cache Entry ==
/// A single cached value plus the bookkeeping the store needs around it.
///
/// The key is not duplicated here; entries live in a map keyed by it.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The cached payload
    pub value: V,
    /// Hash of the content at insert time
    pub content_hash: u64,
    /// Source metadata for staleness checks; None for computed values
    pub fingerprint: Option<SourceFingerprint>,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
    /// Last read that served this entry (Unix milliseconds)
    pub last_access: u64,
    /// Times this entry was served from cache
    pub hit_count: u64,
    /// Payload size measured at insert; never recomputed
    pub size_bytes: usize,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry expiring `ttl` from now.
    pub fn new(
        value: V,
        content_hash: u64,
        size_bytes: usize,
        fingerprint: Option<SourceFingerprint>,
        ttl: Duration,
    ) -> Self {
        let now = current_timestamp_ms();
        Self {
            value,
            content_hash,
            fingerprint,
            created_at: now,
            expires_at: now.saturating_add(ttl.as_millis() as u64),
            last_access: now,
            hit_count: 0,
            size_bytes,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is expired when the current time is
    /// greater than or equal to the expiration time, so an entry becomes
    /// unreadable the instant its TTL has fully elapsed.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Same check against a caller-supplied clock reading, so one sweep can
    /// judge every entry against the same instant.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }

    // == Record Hit ==
    /// Bumps the hit count and refreshes the access time.
    pub fn record_hit(&mut self) {
        self.hit_count += 1;
        self.last_access = current_timestamp_ms();
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}
