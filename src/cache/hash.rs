//! Content Hashing Module
//!
//! Small helpers for hashing cached payloads so callers can tell whether
//! content actually changed across a reload.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde_json::Value;

// == Generic Hashing ==
/// Hashes any hashable value with the standard hasher.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Hashes a byte slice directly, without a length prefix.
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    hasher.write(bytes);
    hasher.finish()
}

// == JSON Hashing ==
/// Hashes a JSON value independent of object key order.
///
/// Object keys are visited sorted, and every node is tagged with its type so
/// that e.g. the string "1" and the number 1 hash differently.
pub fn hash_json(value: &Value) -> u64 {
    let mut hasher = DefaultHasher::new();
    hash_json_into(value, &mut hasher);
    hasher.finish()
}

fn hash_json_into(value: &Value, hasher: &mut DefaultHasher) {
    match value {
        Value::Null => 0u8.hash(hasher),
        Value::Bool(b) => {
            1u8.hash(hasher);
            b.hash(hasher);
        }
        Value::Number(n) => {
            2u8.hash(hasher);
            n.to_string().hash(hasher);
        }
        Value::String(s) => {
            3u8.hash(hasher);
            s.hash(hasher);
        }
        Value::Array(items) => {
            4u8.hash(hasher);
            items.len().hash(hasher);
            for item in items {
                hash_json_into(item, hasher);
            }
        }
        Value::Object(map) => {
            5u8.hash(hasher);
            map.len().hash(hasher);
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                key.hash(hasher);
                hash_json_into(&map[key], hasher);
            }
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compute_hash_is_deterministic() {
        assert_eq!(compute_hash(&"hello"), compute_hash(&"hello"));
        assert_ne!(compute_hash(&"hello"), compute_hash(&"world"));
    }

    #[test]
    fn test_hash_bytes_detects_changes() {
        assert_eq!(hash_bytes(b"content"), hash_bytes(b"content"));
        assert_ne!(hash_bytes(b"content"), hash_bytes(b"content "));
    }

    #[test]
    fn test_hash_json_ignores_key_order() {
        let a = json!({"x": 1, "y": [true, null], "z": "s"});
        let b = json!({"z": "s", "y": [true, null], "x": 1});
        assert_eq!(hash_json(&a), hash_json(&b));
    }

    #[test]
    fn test_hash_json_distinguishes_types() {
        assert_ne!(hash_json(&json!("1")), hash_json(&json!(1)));
        assert_ne!(hash_json(&json!(null)), hash_json(&json!(false)));
    }

    #[test]
    fn test_hash_json_distinguishes_values() {
        let a = json!({"x": 1});
        let b = json!({"x": 2});
        assert_ne!(hash_json(&a), hash_json(&b));
    }
}
