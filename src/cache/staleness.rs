//! Staleness Validation Module
//!
//! Cheap freshness checks for entries backed by a source of truth. A
//! fingerprint is metadata only (mtime + size); content is never read here.

use std::fs;
use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};

// == Source Fingerprint ==
/// Metadata snapshot of a backing resource, captured when its content was
/// loaded. Compared field-for-field; any difference means stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFingerprint {
    /// Modification time in Unix milliseconds
    pub mtime_ms: u64,
    /// Size in bytes
    pub size: u64,
}

/// Decides whether a cached entry is stale against the current probe result.
///
/// - No fingerprint was recorded at insert: nothing to compare, TTL is the
///   only freshness bound, so not stale.
/// - The probe failed now (`current` is None): assume the source changed.
/// - Both present: stale on any mismatch.
pub fn is_stale(cached: Option<&SourceFingerprint>, current: Option<&SourceFingerprint>) -> bool {
    match (cached, current) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(cached), Some(current)) => cached != current,
    }
}

// == Source Probe ==
/// Fetches the current fingerprint for a cache key's backing resource.
///
/// Probes run outside the store lock and must not read content; they exist
/// so a hit costs one metadata call, not a file read.
pub trait SourceProbe: Send + Sync {
    fn fingerprint(&self, key: &str) -> io::Result<SourceFingerprint>;
}

/// Probe that treats cache keys as filesystem paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsProbe;

impl SourceProbe for FsProbe {
    fn fingerprint(&self, key: &str) -> io::Result<SourceFingerprint> {
        fingerprint_path(Path::new(key))
    }
}

/// Reads mtime + size for a path.
pub fn fingerprint_path(path: &Path) -> io::Result<SourceFingerprint> {
    let metadata = fs::metadata(path)?;
    let mtime_ms = metadata
        .modified()?
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    Ok(SourceFingerprint {
        mtime_ms,
        size: metadata.len(),
    })
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn fp(mtime_ms: u64, size: u64) -> SourceFingerprint {
        SourceFingerprint { mtime_ms, size }
    }

    #[test]
    fn test_matching_fingerprints_are_fresh() {
        assert!(!is_stale(Some(&fp(100, 10)), Some(&fp(100, 10))));
    }

    #[test]
    fn test_any_field_mismatch_is_stale() {
        assert!(is_stale(Some(&fp(100, 10)), Some(&fp(200, 10))));
        assert!(is_stale(Some(&fp(100, 10)), Some(&fp(100, 11))));
    }

    #[test]
    fn test_probe_failure_is_stale() {
        assert!(is_stale(Some(&fp(100, 10)), None));
    }

    #[test]
    fn test_missing_recorded_fingerprint_skips_the_check() {
        assert!(!is_stale(None, Some(&fp(100, 10))));
        assert!(!is_stale(None, None));
    }

    #[test]
    fn test_fingerprint_path_reads_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.txt");
        std::fs::write(&path, "twelve bytes").unwrap();

        let fingerprint = fingerprint_path(&path).unwrap();
        assert_eq!(fingerprint.size, 12);
        assert!(fingerprint.mtime_ms > 0);
    }

    #[test]
    fn test_fingerprint_path_changes_with_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.txt");
        std::fs::write(&path, "short").unwrap();
        let before = fingerprint_path(&path).unwrap();

        std::fs::write(&path, "substantially longer content").unwrap();
        let after = fingerprint_path(&path).unwrap();

        assert!(is_stale(Some(&before), Some(&after)));
    }

    #[test]
    fn test_fingerprint_path_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.txt");
        assert!(fingerprint_path(&path).is_err());
    }

    #[test]
    fn test_fs_probe_uses_the_key_as_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keyed.txt");
        std::fs::write(&path, "abc").unwrap();

        let probe = FsProbe;
        let fingerprint = probe.fingerprint(&path.to_string_lossy()).unwrap();
        assert_eq!(fingerprint.size, 3);
    }
}
