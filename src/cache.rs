//! Bounded LRU cache keyed by rendered prompt.
//!
//! Identical prompts reliably recur in batch workloads (re-running a
//! labeling job, retrying a pipeline), so a small per-prompter cache saves
//! real backend calls. Values are cloned out; keep them cheap to clone.

use std::collections::{HashMap, VecDeque};

/// Default capacity used by the prompter when caching is enabled.
pub const DEFAULT_CACHE_SIZE: usize = 200;

/// A least-recently-used cache with a fixed capacity.
///
/// `get` refreshes recency; inserting at capacity evicts the least recently
/// used entry. Capacity 0 stores nothing.
#[derive(Debug, Clone)]
pub struct PromptCache<T: Clone> {
    capacity: usize,
    entries: HashMap<String, T>,
    /// Keys ordered least-recent first.
    recency: VecDeque<String>,
}

impl<T: Clone> PromptCache<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            recency: VecDeque::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a key, marking it most recently used on a hit.
    pub fn get(&mut self, key: &str) -> Option<T> {
        if !self.entries.contains_key(key) {
            return None;
        }
        self.touch(key);
        self.entries.get(key).cloned()
    }

    /// Insert a value, evicting the least recently used entry if full.
    /// Re-inserting an existing key updates its value and recency.
    pub fn insert(&mut self, key: impl Into<String>, value: T) {
        if self.capacity == 0 {
            return;
        }
        let key = key.into();
        if self.entries.contains_key(&key) {
            self.entries.insert(key.clone(), value);
            self.touch(&key);
            return;
        }
        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.recency.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        self.recency.push_back(key.clone());
        self.entries.insert(key, value);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }

    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.recency.iter().position(|k| k == key) {
            if let Some(k) = self.recency.remove(pos) {
                self.recency.push_back(k);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_miss_and_hit() {
        let mut cache = PromptCache::new(2);
        assert_eq!(cache.get("a"), None);
        cache.insert("a", 1);
        assert_eq!(cache.get("a"), Some(1));
    }

    #[test]
    fn test_eviction_is_least_recent_first() {
        let mut cache = PromptCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("c", 3);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));
        assert_eq!(cache.get("c"), Some(3));
    }

    #[test]
    fn test_get_refreshes_recency() {
        let mut cache = PromptCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.get("a");
        cache.insert("c", 3);
        // "b" was least recent after the refresh of "a".
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a"), Some(1));
    }

    #[test]
    fn test_reinsert_updates_value_and_recency() {
        let mut cache = PromptCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("a", 10);
        cache.insert("c", 3);
        assert_eq!(cache.get("a"), Some(10));
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let mut cache = PromptCache::new(0);
        cache.insert("a", 1);
        assert!(cache.is_empty());
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn test_clear() {
        let mut cache = PromptCache::new(4);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get("a"), None);
    }
}
