//! Content Store Module
//!
//! The cache engine: loader-backed reads, staleness validation, scored
//! eviction, and invalidation routing over one guarded map.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use regex::Regex;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::deps::DependencyGraph;
use crate::cache::entry::{current_timestamp_ms, CacheEntry};
use crate::cache::policy::select_victim;
use crate::cache::staleness::{is_stale, SourceFingerprint, SourceProbe};
use crate::cache::stats::CacheStats;
use crate::cache::value::CacheValue;
use crate::config::CacheOptions;
use crate::error::{CacheError, Result};
use crate::events::{CacheEvent, CacheObserver, EventKind, EvictReason, InvalidateReason, Notifier};

/// Expired entries removed per write-lock acquisition during a sweep.
const SWEEP_CHUNK: usize = 256;

// == Read Outcome ==
/// What a read produced and where it came from.
#[derive(Debug, Clone)]
pub struct ReadOutcome<V> {
    /// The value, cached or freshly loaded
    pub value: V,
    /// True when the value was served from cache
    pub cached: bool,
    /// Source fingerprint stored with the entry, when one was captured
    pub fingerprint: Option<SourceFingerprint>,
}

// == Store Internals ==
/// Everything the lock guards: map, dependency edges, counters, byte total.
struct StoreInner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    deps: DependencyGraph,
    stats: CacheStats,
    total_bytes: usize,
}

impl<V> StoreInner<V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            deps: DependencyGraph::new(),
            stats: CacheStats::new(),
            total_bytes: 0,
        }
    }

    /// Removes an entry and releases its bytes from the running total.
    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let removed = self.entries.remove(key);
        if let Some(entry) = &removed {
            self.total_bytes = self.total_bytes.saturating_sub(entry.size_bytes);
        }
        removed
    }

    /// Inserts an entry, accounting for a replaced one.
    fn insert_entry(&mut self, key: String, entry: CacheEntry<V>) {
        let added = entry.size_bytes;
        if let Some(old) = self.entries.insert(key, entry) {
            self.total_bytes = self.total_bytes.saturating_sub(old.size_bytes);
        }
        self.total_bytes += added;
    }

    /// Removes every entry already past its TTL. Counted as evictions.
    fn sweep_expired_into(&mut self, now_ms: u64, events: &mut Vec<CacheEvent>) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now_ms))
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired.len();
        for key in expired {
            self.remove_entry(&key);
            self.stats.record_eviction();
            events.push(CacheEvent::new(key, EventKind::Evicted(EvictReason::Expired)));
        }
        count
    }

    /// Makes room for an incoming entry of `incoming` bytes.
    ///
    /// The entry-count bound is exact; the byte budget is soft and gives up
    /// once nothing is left to evict.
    fn evict_to_fit(
        &mut self,
        incoming: usize,
        options: &CacheOptions,
        events: &mut Vec<CacheEvent>,
    ) {
        while self.entries.len() >= options.max_entries {
            let victim = match select_victim(self.entries.iter()) {
                Some(key) => key.to_string(),
                None => break,
            };
            self.remove_entry(&victim);
            self.stats.record_eviction();
            events.push(CacheEvent::new(
                victim,
                EventKind::Evicted(EvictReason::Capacity),
            ));
        }

        while self.total_bytes.saturating_add(incoming) > options.max_total_bytes
            && !self.entries.is_empty()
        {
            let victim = match select_victim(self.entries.iter()) {
                Some(key) => key.to_string(),
                None => break,
            };
            self.remove_entry(&victim);
            self.stats.record_eviction();
            events.push(CacheEvent::new(
                victim,
                EventKind::Evicted(EvictReason::SizePressure),
            ));
        }

        if self.total_bytes.saturating_add(incoming) > options.max_total_bytes {
            warn!(
                "Byte budget exceeded with nothing left to evict: {} incoming, {} budget",
                incoming, options.max_total_bytes
            );
        }
    }

    /// Counters plus the current usage snapshot.
    fn snapshot(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.entries = self.entries.len();
        stats.total_bytes = self.total_bytes;
        stats
    }
}

// == Content Cache ==
/// Generic loader-backed cache with TTL expiration, scored eviction, and
/// source staleness validation.
///
/// Cloning is cheap; clones share the same storage, observers, and sweeper.
#[derive(Clone)]
pub struct ContentCache<V> {
    inner: Arc<RwLock<StoreInner<V>>>,
    options: Arc<CacheOptions>,
    probe: Option<Arc<dyn SourceProbe>>,
    notifier: Notifier,
    sweeper: Arc<Mutex<Option<JoinHandle<()>>>>,
    disposed: Arc<AtomicBool>,
}

impl<V: CacheValue> ContentCache<V> {
    // == Constructors ==
    /// Creates a cache with no source probe; staleness is bounded by TTL
    /// alone.
    pub fn new(options: CacheOptions) -> Self {
        Self::build(options, None)
    }

    /// Creates a cache whose entries are validated against a source of
    /// truth through `probe`.
    pub fn with_probe(options: CacheOptions, probe: Arc<dyn SourceProbe>) -> Self {
        Self::build(options, Some(probe))
    }

    fn build(options: CacheOptions, probe: Option<Arc<dyn SourceProbe>>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreInner::new())),
            options: Arc::new(options),
            probe,
            notifier: Notifier::new(),
            sweeper: Arc::new(Mutex::new(None)),
            disposed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The options this cache was built with.
    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    // == Read ==
    /// Reads `key`, invoking `loader` on a miss and caching the result.
    ///
    /// On a hit the entry's fingerprint is validated against the source
    /// first (when `validate_on_read` is set and the cache has a probe); a
    /// mismatch or probe failure invalidates the entry and falls through to
    /// a reload.
    ///
    /// The lock is not held while `loader` runs, so two concurrent misses
    /// for the same key both load and the later insert wins. Values over
    /// the per-item budget are returned uncached.
    ///
    /// # Errors
    /// Loader failures come back as [`CacheError::Loader`] with the original
    /// error as source; nothing is stored and the miss is still counted.
    pub async fn read<F, Fut>(&self, key: &str, loader: F) -> Result<ReadOutcome<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<V>>,
    {
        self.read_inner(key, loader, true).await
    }

    /// Same contract as [`read`](Self::read) minus the source fingerprint
    /// handling: nothing is probed at insert and nothing is validated on
    /// hits. For caches of computed values with no source of truth.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, compute: F) -> Result<ReadOutcome<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<V>>,
    {
        self.read_inner(key, compute, false).await
    }

    async fn read_inner<F, Fut>(&self, key: &str, loader: F, use_probe: bool) -> Result<ReadOutcome<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<V>>,
    {
        if !self.options.enabled {
            // Storage is bypassed entirely, but the miss still counts so
            // hits + misses equals the number of read calls
            {
                let mut inner = self.inner.write().await;
                inner.stats.record_miss();
            }
            self.notifier.notify(&[CacheEvent::new(key, EventKind::Miss)]);
            let value = run_loader(key, loader).await?;
            return Ok(ReadOutcome {
                value,
                cached: false,
                fingerprint: None,
            });
        }

        let mut events = Vec::new();

        // First pass: settle expiry and snapshot the stored fingerprint.
        let stored: Option<Option<SourceFingerprint>> = {
            let mut inner = self.inner.write().await;
            let expired = matches!(inner.entries.get(key), Some(entry) if entry.is_expired());
            if expired {
                inner.remove_entry(key);
                inner.stats.record_eviction();
                events.push(CacheEvent::new(key, EventKind::Evicted(EvictReason::Expired)));
                None
            } else {
                inner.entries.get(key).map(|entry| entry.fingerprint)
            }
        };

        // The fingerprint compare runs without the lock; a probe error
        // means stale.
        let stale = match &stored {
            Some(Some(cached_fp)) if use_probe && self.options.validate_on_read => {
                match &self.probe {
                    Some(probe) => {
                        let current = probe.fingerprint(key).ok();
                        is_stale(Some(cached_fp), current.as_ref())
                    }
                    None => false,
                }
            }
            _ => false,
        };

        // Second pass: serve the hit or settle the miss. The entry may have
        // been removed between the passes; that degrades to a miss.
        let served: Option<(V, Option<SourceFingerprint>)> = {
            let mut inner = self.inner.write().await;
            if stale {
                if inner.remove_entry(key).is_some() {
                    inner.stats.record_invalidation();
                    events.push(CacheEvent::new(
                        key,
                        EventKind::Invalidated(InvalidateReason::Stale),
                    ));
                    debug!("Stale entry invalidated: {}", key);
                }
                inner.stats.record_miss();
                None
            } else if stored.is_some() {
                let mut hit = None;
                if let Some(entry) = inner.entries.get_mut(key) {
                    if !entry.is_expired() {
                        entry.record_hit();
                        hit = Some((entry.value.clone(), entry.fingerprint, entry.size_bytes));
                    }
                }
                match hit {
                    Some((value, fingerprint, size_bytes)) => {
                        inner.stats.record_hit(size_bytes);
                        Some((value, fingerprint))
                    }
                    None => {
                        inner.stats.record_miss();
                        None
                    }
                }
            } else {
                inner.stats.record_miss();
                None
            }
        };

        if let Some((value, fingerprint)) = served {
            events.push(CacheEvent::new(key, EventKind::Hit));
            self.notifier.notify(&events);
            return Ok(ReadOutcome {
                value,
                cached: true,
                fingerprint,
            });
        }

        // The miss (and any expiry or staleness removal) is on the books
        // before the loader runs, so a loader failure cannot skew the
        // counters.
        events.push(CacheEvent::new(key, EventKind::Miss));
        self.notifier.notify(&events);

        let value = run_loader(key, loader).await?;
        let size_bytes = value.size_bytes();

        if size_bytes > self.options.max_item_bytes {
            {
                let mut inner = self.inner.write().await;
                inner.stats.record_load(size_bytes);
            }
            self.notifier
                .notify(&[CacheEvent::new(key, EventKind::Skipped { size_bytes })]);
            debug!(
                "Value over the item budget, serving uncached: {} ({} bytes)",
                key, size_bytes
            );
            return Ok(ReadOutcome {
                value,
                cached: false,
                fingerprint: None,
            });
        }

        let fingerprint = if use_probe {
            self.probe.as_ref().and_then(|probe| match probe.fingerprint(key) {
                Ok(fingerprint) => Some(fingerprint),
                Err(err) => {
                    debug!("Fingerprint capture failed for {}: {}", key, err);
                    None
                }
            })
        } else {
            None
        };

        let content_hash = value.content_hash();
        let mut events = Vec::new();
        {
            let mut inner = self.inner.write().await;
            inner.stats.record_load(size_bytes);
            inner.remove_entry(key);
            inner.sweep_expired_into(current_timestamp_ms(), &mut events);
            inner.evict_to_fit(size_bytes, &self.options, &mut events);
            let entry = CacheEntry::new(
                value.clone(),
                content_hash,
                size_bytes,
                fingerprint,
                self.options.ttl,
            );
            inner.insert_entry(key.to_string(), entry);
        }
        self.notifier.notify(&events);

        Ok(ReadOutcome {
            value,
            cached: false,
            fingerprint,
        })
    }

    // == Has ==
    /// Whether `key` is present and unexpired.
    ///
    /// Never mutates, unlike `read`: an expired entry is reported absent
    /// but left in place for the sweep.
    pub async fn has(&self, key: &str) -> bool {
        let inner = self.inner.read().await;
        matches!(inner.entries.get(key), Some(entry) if !entry.is_expired())
    }

    /// Content hash stored for `key`, if present and unexpired.
    pub async fn content_hash(&self, key: &str) -> Option<u64> {
        let inner = self.inner.read().await;
        inner
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.content_hash)
    }

    // == Invalidation ==
    /// Removes `key`. Returns whether an entry was present.
    pub async fn invalidate(&self, key: &str) -> bool {
        let removed = {
            let mut inner = self.inner.write().await;
            let removed = inner.remove_entry(key).is_some();
            if removed {
                inner.stats.record_invalidation();
            }
            removed
        };
        if removed {
            self.notifier.notify(&[CacheEvent::new(
                key,
                EventKind::Invalidated(InvalidateReason::Explicit),
            )]);
            debug!("Invalidated: {}", key);
        }
        removed
    }

    /// Removes every key matching `pattern`. A full scan, acceptable for
    /// the entry counts this cache is bounded to. Returns the removed count.
    pub async fn invalidate_pattern(&self, pattern: &Regex) -> usize {
        let mut events = Vec::new();
        let removed = {
            let mut inner = self.inner.write().await;
            let matches: Vec<String> = inner
                .entries
                .keys()
                .filter(|key| pattern.is_match(key))
                .cloned()
                .collect();
            for key in &matches {
                inner.remove_entry(key);
                inner.stats.record_invalidation();
                events.push(CacheEvent::new(
                    key.clone(),
                    EventKind::Invalidated(InvalidateReason::Pattern),
                ));
            }
            matches.len()
        };
        self.notifier.notify(&events);
        if removed > 0 {
            debug!("Pattern invalidation removed {} entries: {}", removed, pattern);
        }
        removed
    }

    /// Removes every key under `prefix`, path-aware: "/foo" matches "/foo"
    /// and "/foo/bar" but never "/foobar". Returns the removed count.
    pub async fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut events = Vec::new();
        let removed = {
            let mut inner = self.inner.write().await;
            let matches: Vec<String> = inner
                .entries
                .keys()
                .filter(|key| key_under_prefix(key, prefix))
                .cloned()
                .collect();
            for key in &matches {
                inner.remove_entry(key);
                inner.stats.record_invalidation();
                events.push(CacheEvent::new(
                    key.clone(),
                    EventKind::Invalidated(InvalidateReason::Prefix),
                ));
            }
            matches.len()
        };
        self.notifier.notify(&events);
        if removed > 0 {
            debug!("Prefix invalidation removed {} entries: {}", removed, prefix);
        }
        removed
    }

    // == Dependencies ==
    /// Records that `dependent`'s cached value was derived from `resources`,
    /// replacing any previous registration for that key. Edges survive
    /// eviction and expiry of the entry; only `clear` drops them.
    pub async fn register_dependency(&self, dependent: &str, resources: Vec<String>) {
        let mut inner = self.inner.write().await;
        inner.deps.register(dependent, resources);
    }

    /// Invalidates the entry cached under `resource` itself plus every key
    /// registered as derived from it. Exactly one level of fan-out;
    /// dependents of dependents are left alone. Returns the removed count.
    pub async fn invalidate_for_resource(&self, resource: &str) -> usize {
        let mut events = Vec::new();
        let removed = {
            let mut inner = self.inner.write().await;
            let mut removed = 0;

            if inner.remove_entry(resource).is_some() {
                inner.stats.record_invalidation();
                events.push(CacheEvent::new(
                    resource,
                    EventKind::Invalidated(InvalidateReason::Explicit),
                ));
                removed += 1;
            }

            for key in inner.deps.dependents_of(resource) {
                if inner.remove_entry(&key).is_some() {
                    inner.stats.record_invalidation();
                    events.push(CacheEvent::new(
                        key,
                        EventKind::Invalidated(InvalidateReason::Dependency),
                    ));
                    removed += 1;
                }
            }
            removed
        };
        self.notifier.notify(&events);
        if removed > 0 {
            debug!("Resource invalidation removed {} entries: {}", removed, resource);
        }
        removed
    }

    // == Sweep ==
    /// Removes expired entries in bounded batches, releasing the write lock
    /// between chunks so reads are never stalled for a whole pass. Returns
    /// the number removed.
    pub async fn cleanup_expired(&self) -> usize {
        let now = current_timestamp_ms();
        let expired: Vec<String> = {
            let inner = self.inner.read().await;
            inner
                .entries
                .iter()
                .filter(|(_, entry)| entry.is_expired_at(now))
                .map(|(key, _)| key.clone())
                .collect()
        };
        if expired.is_empty() {
            return 0;
        }

        let mut removed = 0;
        let mut events = Vec::new();
        for chunk in expired.chunks(SWEEP_CHUNK) {
            {
                let mut inner = self.inner.write().await;
                for key in chunk {
                    // The key may have been replaced since the scan
                    let still_expired =
                        matches!(inner.entries.get(key), Some(entry) if entry.is_expired());
                    if still_expired {
                        inner.remove_entry(key);
                        inner.stats.record_eviction();
                        removed += 1;
                        events.push(CacheEvent::new(
                            key.clone(),
                            EventKind::Evicted(EvictReason::Expired),
                        ));
                    }
                }
            }
            tokio::task::yield_now().await;
        }
        self.notifier.notify(&events);
        removed
    }

    /// Starts the periodic TTL sweep for this cache. A second call replaces
    /// the running task; `dispose` aborts it.
    pub fn spawn_sweeper(&self, interval: Duration) {
        let handle = crate::tasks::spawn_sweep_task(self.clone(), interval);
        if let Ok(mut slot) = self.sweeper.lock() {
            if let Some(old) = slot.replace(handle) {
                old.abort();
            }
        }
    }

    // == Lifecycle ==
    /// Drops every entry and dependency edge and zeroes the counters.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.entries.clear();
        inner.deps.clear();
        inner.total_bytes = 0;
        inner.stats.reset();
        debug!("Cache cleared");
    }

    /// Clears the cache, stops the sweeper, and detaches observers.
    /// Safe to call more than once.
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Ok(mut slot) = self.sweeper.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
        self.clear().await;
        self.notifier.clear();
        debug!("Cache disposed");
    }

    // == Observation ==
    /// Registers an observer for cache events. Delivery is synchronous,
    /// after the store lock is released.
    pub fn subscribe(&self, observer: Arc<dyn CacheObserver>) {
        self.notifier.subscribe(observer);
    }

    /// Counters plus the current usage snapshot.
    pub async fn stats(&self) -> CacheStats {
        self.inner.read().await.snapshot()
    }

    /// The fixed human-readable summary block.
    pub async fn format_stats(&self) -> String {
        self.stats().await.format()
    }

    // == Introspection ==
    /// Current number of entries, expired ones included until swept.
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    /// True when the cache holds nothing.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }

    /// Summed size of the live entries.
    pub async fn total_bytes(&self) -> usize {
        self.inner.read().await.total_bytes
    }
}

async fn run_loader<V, F, Fut>(key: &str, loader: F) -> Result<V>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = anyhow::Result<V>>,
{
    loader().await.map_err(|source| CacheError::Loader {
        key: key.to_string(),
        source,
    })
}

/// Path-aware prefix match: trailing separators on the prefix are ignored,
/// and a match is either the exact key or a path below it.
fn key_under_prefix(key: &str, prefix: &str) -> bool {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        // "/" means everything under the root; an empty prefix matches
        // nothing
        return !prefix.is_empty() && key.starts_with('/');
    }
    match key.strip_prefix(trimmed) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
