//! Configuration Module
//!
//! Cache tuning options with per-variant presets and environment overrides.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

/// Tuning options for one cache instance.
///
/// All values carry sensible defaults and can be overridden via environment
/// variables or replaced wholesale by one of the per-variant presets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheOptions {
    /// When false, reads bypass storage entirely and always invoke the loader
    pub enabled: bool,
    /// Time to live applied to every entry at insert
    pub ttl: Duration,
    /// Maximum number of entries; enforced exactly at insert
    pub max_entries: usize,
    /// Values larger than this are served uncached (skip, not an error)
    pub max_item_bytes: usize,
    /// Soft budget for the summed size of all entries
    pub max_total_bytes: usize,
    /// Compare source fingerprints (mtime + size) before serving a hit
    pub validate_on_read: bool,
    /// Interval for the background TTL sweep
    pub sweep_interval: Duration,
}

impl CacheOptions {
    /// Creates options by loading overrides from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_ENABLED` - Enable caching (default: true)
    /// - `CACHE_TTL_SECS` - Entry TTL in seconds (default: 300)
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `CACHE_MAX_ITEM_BYTES` - Per-value size cutoff (default: 1 MiB)
    /// - `CACHE_MAX_TOTAL_BYTES` - Total size budget (default: 100 MiB)
    /// - `CACHE_VALIDATE_ON_READ` - Fingerprint check on hits (default: true)
    /// - `CACHE_SWEEP_INTERVAL_SECS` - Sweep frequency in seconds (default: 60)
    pub fn from_env() -> Self {
        Self {
            enabled: env::var("CACHE_ENABLED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            ttl: env::var("CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(300)),
            max_entries: env::var("CACHE_MAX_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
            max_item_bytes: env::var("CACHE_MAX_ITEM_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1024 * 1024),
            max_total_bytes: env::var("CACHE_MAX_TOTAL_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100 * 1024 * 1024),
            validate_on_read: env::var("CACHE_VALIDATE_ON_READ")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            sweep_interval: env::var("CACHE_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(60)),
        }
    }

    // == Presets ==
    /// Preset for caching file contents: the defaults, with fingerprint
    /// validation on.
    pub fn file_content() -> Self {
        Self::default()
    }

    /// Preset for caching LLM responses: longer TTL, fewer but larger-ish
    /// entries, no source to validate against.
    pub fn llm_response() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(1800),
            max_entries: 500,
            max_item_bytes: 256 * 1024,
            max_total_bytes: 50 * 1024 * 1024,
            validate_on_read: false,
            sweep_interval: Duration::from_secs(60),
        }
    }

    /// Preset for caching embeddings: long TTL and many small vectors.
    pub fn embedding() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(7200),
            max_entries: 5000,
            max_item_bytes: 64 * 1024,
            max_total_bytes: 200 * 1024 * 1024,
            validate_on_read: false,
            sweep_interval: Duration::from_secs(120),
        }
    }

    /// Preset for caching search results: short TTL, small footprint.
    pub fn search_results() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(120),
            max_entries: 200,
            max_item_bytes: 512 * 1024,
            max_total_bytes: 20 * 1024 * 1024,
            validate_on_read: false,
            sweep_interval: Duration::from_secs(60),
        }
    }

    // == Validation ==
    /// Rejects option combinations that would make the cache useless.
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(CacheError::Config(
                "max_entries must be greater than zero".to_string(),
            ));
        }
        if self.max_item_bytes == 0 {
            return Err(CacheError::Config(
                "max_item_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_total_bytes == 0 {
            return Err(CacheError::Config(
                "max_total_bytes must be greater than zero".to_string(),
            ));
        }
        if self.ttl.is_zero() {
            return Err(CacheError::Config("ttl must be greater than zero".to_string()));
        }
        Ok(())
    }
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(300),
            max_entries: 1000,
            max_item_bytes: 1024 * 1024,
            max_total_bytes: 100 * 1024 * 1024,
            validate_on_read: true,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_default() {
        let options = CacheOptions::default();
        assert!(options.enabled);
        assert_eq!(options.ttl, Duration::from_secs(300));
        assert_eq!(options.max_entries, 1000);
        assert_eq!(options.max_item_bytes, 1024 * 1024);
        assert_eq!(options.max_total_bytes, 100 * 1024 * 1024);
        assert!(options.validate_on_read);
        assert_eq!(options.sweep_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_options_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("CACHE_ENABLED");
        env::remove_var("CACHE_TTL_SECS");
        env::remove_var("CACHE_MAX_ENTRIES");
        env::remove_var("CACHE_MAX_ITEM_BYTES");
        env::remove_var("CACHE_MAX_TOTAL_BYTES");
        env::remove_var("CACHE_VALIDATE_ON_READ");
        env::remove_var("CACHE_SWEEP_INTERVAL_SECS");

        let options = CacheOptions::from_env();
        assert!(options.enabled);
        assert_eq!(options.ttl, Duration::from_secs(300));
        assert_eq!(options.max_entries, 1000);
        assert_eq!(options.sweep_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_presets_disable_validation_for_computed_caches() {
        assert!(CacheOptions::file_content().validate_on_read);
        assert!(!CacheOptions::llm_response().validate_on_read);
        assert!(!CacheOptions::embedding().validate_on_read);
        assert!(!CacheOptions::search_results().validate_on_read);
    }

    #[test]
    fn test_presets_pass_validation() {
        assert!(CacheOptions::file_content().validate().is_ok());
        assert!(CacheOptions::llm_response().validate().is_ok());
        assert!(CacheOptions::embedding().validate().is_ok());
        assert!(CacheOptions::search_results().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_bounds() {
        let options = CacheOptions {
            max_entries: 0,
            ..CacheOptions::default()
        };
        assert!(matches!(options.validate(), Err(CacheError::Config(_))));

        let options = CacheOptions {
            max_total_bytes: 0,
            ..CacheOptions::default()
        };
        assert!(matches!(options.validate(), Err(CacheError::Config(_))));

        let options = CacheOptions {
            ttl: Duration::ZERO,
            ..CacheOptions::default()
        };
        assert!(matches!(options.validate(), Err(CacheError::Config(_))));
    }
}
