//! Bounded dedupe cache for relayed event ids.

use std::collections::HashMap;

use tracing::debug;

/// Default bound on the number of event ids retained.
pub const MAX_STORED_EVENTS: usize = 1000;

/// A count-bounded map of event id to first-seen timestamp.
///
/// Relays redeliver the same logical event from multiple endpoints; the cache
/// guarantees at-most-once command execution per event id. When the bound is
/// exceeded the entry with the smallest timestamp is evicted. The cache is
/// purely in-memory and lost on restart.
#[derive(Debug)]
pub struct ReplayCache {
    bound: usize,
    seen: HashMap<String, u64>,
}

impl ReplayCache {
    pub fn new(bound: usize) -> Self {
        Self {
            bound,
            seen: HashMap::new(),
        }
    }

    /// Whether the event id has been seen before.
    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains_key(id)
    }

    /// Record an event id with its creation timestamp (unix seconds).
    ///
    /// Returns `false` if the id was already recorded. Eviction runs after
    /// every insert that pushes the cache over its bound.
    pub fn record(&mut self, id: &str, timestamp: u64) -> bool {
        if self.seen.contains_key(id) {
            return false;
        }
        self.seen.insert(id.to_string(), timestamp);
        if self.seen.len() > self.bound {
            self.evict_oldest();
        }
        true
    }

    /// Remove the entry with the smallest timestamp. Linear scan; the bound
    /// is small enough that a heap would not pay for itself.
    fn evict_oldest(&mut self) {
        let oldest = self
            .seen
            .iter()
            .min_by_key(|(_, ts)| **ts)
            .map(|(id, _)| id.clone());
        if let Some(id) = oldest {
            self.seen.remove(&id);
            debug!(size = self.seen.len(), "evicted oldest replay record");
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }
}

impl Default for ReplayCache {
    fn default() -> Self {
        Self::new(MAX_STORED_EVENTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_first_sight() {
        let mut cache = ReplayCache::new(10);
        assert!(cache.record("ev1", 100));
        assert!(cache.contains("ev1"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_record_duplicate_rejected() {
        let mut cache = ReplayCache::new(10);
        assert!(cache.record("ev1", 100));
        assert!(!cache.record("ev1", 200));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_eviction_removes_oldest() {
        let mut cache = ReplayCache::new(3);
        cache.record("a", 10);
        cache.record("b", 20);
        cache.record("c", 30);
        cache.record("d", 40);

        assert_eq!(cache.len(), 3);
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
        assert!(cache.contains("c"));
        assert!(cache.contains("d"));
    }

    #[test]
    fn test_bound_holds_over_long_sequences() {
        let mut cache = ReplayCache::new(5);
        for i in 0..100u64 {
            cache.record(&format!("ev{i}"), i);
        }
        assert_eq!(cache.len(), 5);
        // Only the five newest-by-timestamp ids survive.
        for i in 95..100u64 {
            assert!(cache.contains(&format!("ev{i}")));
        }
        for i in 0..95u64 {
            assert!(!cache.contains(&format!("ev{i}")));
        }
    }

    #[test]
    fn test_clear() {
        let mut cache = ReplayCache::default();
        cache.record("ev1", 1);
        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.contains("ev1"));
    }
}
