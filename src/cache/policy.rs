//! Eviction Policy Module
//!
//! Scores entries for eviction: recency plus a hit-count bonus, so a key
//! that is read often survives a key that was merely touched last.

use crate::cache::entry::CacheEntry;

// == Scoring ==
/// Weight of one hit relative to recency, in milliseconds.
///
/// Each hit protects an entry as much as having been accessed ten seconds
/// more recently.
pub const HIT_WEIGHT_MS: u64 = 10_000;

/// Eviction score for an entry. Lower scores are evicted first.
pub fn eviction_score<V>(entry: &CacheEntry<V>) -> u64 {
    entry
        .last_access
        .saturating_add(entry.hit_count.saturating_mul(HIT_WEIGHT_MS))
}

// == Victim Selection ==
/// Picks the next key to evict: minimum score, ties broken by fewer hits.
///
/// Returns None when there is nothing to evict.
pub fn select_victim<'a, V, I>(entries: I) -> Option<&'a str>
where
    I: Iterator<Item = (&'a String, &'a CacheEntry<V>)>,
    V: 'a,
{
    entries
        .min_by_key(|(_, entry)| (eviction_score(entry), entry.hit_count))
        .map(|(key, _)| key.as_str())
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn entry(last_access: u64, hit_count: u64) -> CacheEntry<String> {
        CacheEntry {
            value: "v".to_string(),
            content_hash: 0,
            fingerprint: None,
            created_at: last_access,
            expires_at: u64::MAX,
            last_access,
            hit_count,
            size_bytes: 1,
        }
    }

    fn pick(entries: &HashMap<String, CacheEntry<String>>) -> Option<&str> {
        select_victim(entries.iter())
    }

    #[test]
    fn test_score_combines_recency_and_hits() {
        let cold = entry(1_000, 0);
        let warm = entry(1_000, 3);
        assert_eq!(eviction_score(&cold), 1_000);
        assert_eq!(eviction_score(&warm), 1_000 + 3 * HIT_WEIGHT_MS);
    }

    #[test]
    fn test_least_recent_is_evicted_first() {
        let mut entries = HashMap::new();
        entries.insert("old".to_string(), entry(1_000, 0));
        entries.insert("new".to_string(), entry(50_000, 0));

        assert_eq!(pick(&entries), Some("old"));
    }

    #[test]
    fn test_hits_protect_an_older_entry() {
        let mut entries = HashMap::new();
        // Two hits outweigh being 15 seconds older
        entries.insert("old_but_hot".to_string(), entry(1_000, 2));
        entries.insert("newer_cold".to_string(), entry(16_000, 0));

        assert_eq!(pick(&entries), Some("newer_cold"));
    }

    #[test]
    fn test_equal_scores_evict_fewer_hits_first() {
        let mut entries = HashMap::new();
        // Same score: 21_000 == 1_000 + 2 * 10_000
        entries.insert("touched_late".to_string(), entry(21_000, 0));
        entries.insert("hit_twice".to_string(), entry(1_000, 2));

        assert_eq!(pick(&entries), Some("touched_late"));
    }

    #[test]
    fn test_empty_map_has_no_victim() {
        let entries: HashMap<String, CacheEntry<String>> = HashMap::new();
        assert_eq!(pick(&entries), None);
    }
}
