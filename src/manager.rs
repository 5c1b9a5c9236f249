//! Cache Manager Module
//!
//! Composes the four cache variants behind one handle and provides the
//! process-wide accessor used by callers without their own wiring.

use std::mem;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cache::{compute_hash, CacheStats, CacheValue, ContentCache, FsProbe};
use crate::config::CacheOptions;
use crate::error::Result;

// == Search Match ==
/// One line-level result cached by the search cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchMatch {
    /// Path of the file the match was found in
    pub path: String,
    /// 1-based line number
    pub line: u32,
    /// The matching line text
    pub text: String,
}

impl CacheValue for Vec<SearchMatch> {
    fn size_bytes(&self) -> usize {
        self.iter()
            .map(|m| m.path.len() + m.text.len() + mem::size_of::<u32>())
            .sum()
    }

    fn content_hash(&self) -> u64 {
        compute_hash(self)
    }
}

// == Manager Options ==
/// Per-variant options. The default wires each cache to its preset.
#[derive(Debug, Clone)]
pub struct ManagerOptions {
    pub files: CacheOptions,
    pub responses: CacheOptions,
    pub embeddings: CacheOptions,
    pub searches: CacheOptions,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            files: CacheOptions::file_content(),
            responses: CacheOptions::llm_response(),
            embeddings: CacheOptions::embedding(),
            searches: CacheOptions::search_results(),
        }
    }
}

// == Manager Stats ==
/// Per-cache snapshots plus the combined hit rate.
#[derive(Debug, Clone, Serialize)]
pub struct ManagerStats {
    pub files: CacheStats,
    pub responses: CacheStats,
    pub embeddings: CacheStats,
    pub searches: CacheStats,
}

impl ManagerStats {
    fn sections(&self) -> [(&'static str, &CacheStats); 4] {
        [
            ("files", &self.files),
            ("responses", &self.responses),
            ("embeddings", &self.embeddings),
            ("searches", &self.searches),
        ]
    }

    /// Hit rate over the summed counters of all four caches.
    pub fn overall_hit_rate(&self) -> f64 {
        let (mut hits, mut misses) = (0u64, 0u64);
        for (_, stats) in self.sections() {
            hits += stats.hits;
            misses += stats.misses;
        }
        hits as f64 / (hits + misses).max(1) as f64
    }

    /// Per-cache summary blocks followed by the overall hit rate.
    pub fn format(&self) -> String {
        let mut out = String::new();
        for (name, stats) in self.sections() {
            out.push_str(&format!("== {name} ==\n"));
            out.push_str(&stats.format());
            out.push_str("\n\n");
        }
        out.push_str(&format!(
            "overall hit rate: {:.1}%",
            self.overall_hit_rate() * 100.0
        ));
        out
    }
}

// == Cache Manager ==
/// Owns the file, response, embedding, and search caches.
///
/// Construction never spawns tasks; call [`start_sweepers`](Self::start_sweepers)
/// to begin background TTL sweeps.
pub struct CacheManager {
    files: ContentCache<String>,
    responses: ContentCache<String>,
    embeddings: ContentCache<Vec<f32>>,
    searches: ContentCache<Vec<SearchMatch>>,
}

impl CacheManager {
    // == Constructor ==
    /// Validates each variant's options and builds the caches. The file
    /// cache gets a filesystem probe; the computed variants get none.
    ///
    /// # Errors
    /// Returns [`CacheError::Config`](crate::error::CacheError::Config) when
    /// any variant's options fail validation.
    pub fn new(options: ManagerOptions) -> Result<Self> {
        options.files.validate()?;
        options.responses.validate()?;
        options.embeddings.validate()?;
        options.searches.validate()?;
        Ok(Self::build(options))
    }

    fn build(options: ManagerOptions) -> Self {
        Self {
            files: ContentCache::with_probe(options.files, Arc::new(FsProbe)),
            responses: ContentCache::new(options.responses),
            embeddings: ContentCache::new(options.embeddings),
            searches: ContentCache::new(options.searches),
        }
    }

    // == Accessors ==
    /// File content cache, keyed by path, staleness-checked against disk.
    pub fn files(&self) -> &ContentCache<String> {
        &self.files
    }

    /// LLM response cache, keyed by prompt fingerprint.
    pub fn responses(&self) -> &ContentCache<String> {
        &self.responses
    }

    /// Embedding vector cache, keyed by content hash.
    pub fn embeddings(&self) -> &ContentCache<Vec<f32>> {
        &self.embeddings
    }

    /// Search result cache, keyed by query plus scope.
    pub fn searches(&self) -> &ContentCache<Vec<SearchMatch>> {
        &self.searches
    }

    // == Invalidation ==
    /// Reacts to a file change: drops the cached content for `path` and
    /// fans out to every search result registered as derived from it.
    /// Returns the number of entries removed.
    pub async fn on_file_changed(&self, path: &str) -> usize {
        let mut removed = 0;
        if self.files.invalidate(path).await {
            removed += 1;
        }
        removed += self.searches.invalidate_for_resource(path).await;
        if removed > 0 {
            info!("File change invalidated {} entries: {}", removed, path);
        }
        removed
    }

    // == Maintenance ==
    /// Sweeps expired entries out of all four caches. Returns the total
    /// removed.
    pub async fn cleanup(&self) -> usize {
        self.files.cleanup_expired().await
            + self.responses.cleanup_expired().await
            + self.embeddings.cleanup_expired().await
            + self.searches.cleanup_expired().await
    }

    /// Starts each cache's periodic sweep at its configured interval.
    pub fn start_sweepers(&self) {
        self.files.spawn_sweeper(self.files.options().sweep_interval);
        self.responses
            .spawn_sweeper(self.responses.options().sweep_interval);
        self.embeddings
            .spawn_sweeper(self.embeddings.options().sweep_interval);
        self.searches
            .spawn_sweeper(self.searches.options().sweep_interval);
        debug!("Cache sweepers started");
    }

    /// Empties all four caches and zeroes their counters.
    pub async fn clear_all(&self) {
        self.files.clear().await;
        self.responses.clear().await;
        self.embeddings.clear().await;
        self.searches.clear().await;
    }

    /// Disposes all four caches: contents dropped, sweepers stopped,
    /// observers detached. Safe to call more than once.
    pub async fn dispose(&self) {
        self.files.dispose().await;
        self.responses.dispose().await;
        self.embeddings.dispose().await;
        self.searches.dispose().await;
        debug!("Cache manager disposed");
    }

    // == Statistics ==
    /// Snapshot of every cache's counters.
    pub async fn stats(&self) -> ManagerStats {
        ManagerStats {
            files: self.files.stats().await,
            responses: self.responses.stats().await,
            embeddings: self.embeddings.stats().await,
            searches: self.searches.stats().await,
        }
    }

    /// The concatenated human-readable summary.
    pub async fn format_stats(&self) -> String {
        self.stats().await.format()
    }
}

impl Default for CacheManager {
    fn default() -> Self {
        Self::build(ManagerOptions::default())
    }
}

// == Process-wide Accessor ==
static GLOBAL: Mutex<Option<Arc<CacheManager>>> = Mutex::new(None);

/// The process-wide manager, built from the preset options on first use.
///
/// Prefer passing a [`CacheManager`] explicitly; this accessor exists for
/// callers without access to the wiring.
pub fn global() -> Arc<CacheManager> {
    let mut slot = GLOBAL
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    slot.get_or_insert_with(|| Arc::new(CacheManager::default()))
        .clone()
}

/// Disposes the process-wide manager and forgets it, so the next
/// [`global`] call builds a fresh one. Intended for test isolation.
pub async fn reset_global() {
    let taken = {
        let mut slot = GLOBAL
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        slot.take()
    };
    if let Some(manager) = taken {
        manager.dispose().await;
    }
}
