//! Cache Value Module
//!
//! The measurement trait every cached payload implements: an approximate
//! byte size for budget accounting and a content hash for change detection.

use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;

use crate::cache::hash::{hash_bytes, hash_json};

// == Cache Value Trait ==
/// A payload the cache can store.
///
/// `size_bytes` is measured once, at insert, and drives the per-item and
/// total byte budgets. `content_hash` is stored alongside the entry so
/// callers can ask whether a reload actually changed anything.
pub trait CacheValue: Clone + Send + Sync + 'static {
    /// Approximate in-memory size in bytes.
    fn size_bytes(&self) -> usize;

    /// Hash of the content.
    fn content_hash(&self) -> u64;
}

impl CacheValue for String {
    fn size_bytes(&self) -> usize {
        self.len()
    }

    fn content_hash(&self) -> u64 {
        hash_bytes(self.as_bytes())
    }
}

impl CacheValue for Vec<u8> {
    fn size_bytes(&self) -> usize {
        self.len()
    }

    fn content_hash(&self) -> u64 {
        hash_bytes(self)
    }
}

impl CacheValue for Vec<f32> {
    fn size_bytes(&self) -> usize {
        self.len() * std::mem::size_of::<f32>()
    }

    fn content_hash(&self) -> u64 {
        // Hash the bit patterns; embeddings are compared exactly, not by
        // numeric tolerance
        let mut hasher = DefaultHasher::new();
        for component in self {
            hasher.write_u32(component.to_bits());
        }
        hasher.finish()
    }
}

impl CacheValue for serde_json::Value {
    fn size_bytes(&self) -> usize {
        // Serialized length as the estimate; measured once at insert
        self.to_string().len()
    }

    fn content_hash(&self) -> u64 {
        hash_json(self)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_size_is_utf8_length() {
        let value = "héllo".to_string();
        assert_eq!(value.size_bytes(), value.len());
        assert_eq!(value.size_bytes(), 6);
    }

    #[test]
    fn test_string_hash_tracks_content() {
        let a = "same".to_string();
        let b = "same".to_string();
        let c = "different".to_string();
        assert_eq!(a.content_hash(), b.content_hash());
        assert_ne!(a.content_hash(), c.content_hash());
    }

    #[test]
    fn test_embedding_size_counts_components() {
        let vector: Vec<f32> = vec![0.0; 384];
        assert_eq!(vector.size_bytes(), 384 * 4);
    }

    #[test]
    fn test_embedding_hash_is_exact() {
        let a: Vec<f32> = vec![0.25, -1.5];
        let b: Vec<f32> = vec![0.25, -1.5];
        let c: Vec<f32> = vec![0.25, -1.5000001];
        assert_eq!(a.content_hash(), b.content_hash());
        assert_ne!(a.content_hash(), c.content_hash());
    }

    #[test]
    fn test_json_size_uses_serialized_length() {
        let value = json!({"k": "v"});
        assert_eq!(value.size_bytes(), value.to_string().len());
    }
}
