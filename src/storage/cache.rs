//! Decoded-value cache
//!
//! One cache per adapter instance. Entries are filled on successful reads
//! and on writes, dropped on `remove`, and wiped on `clear`. Unbounded by
//! default; with a capacity, the oldest inserted key is evicted first.

use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// A decoded value and the plaintext it was decoded from
#[derive(Debug, Clone, PartialEq)]
pub struct CachedValue {
    /// JSON reading of `text`, or `text` itself as a JSON string
    pub value: Value,
    /// Plaintext exactly as written to the store
    pub text: String,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<String, CachedValue>,
    order: VecDeque<String>,
}

/// Map from storage key to last decoded value
#[derive(Debug, Default)]
pub struct DecryptedValueCache {
    inner: Mutex<CacheInner>,
    capacity: Option<usize>,
}

impl DecryptedValueCache {
    /// Create an unbounded cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache holding at most `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::default(),
            capacity: Some(capacity),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Cached value for `key`
    pub fn get(&self, key: &str) -> Option<CachedValue> {
        self.lock().entries.get(key).cloned()
    }

    /// Store the decoded value for `key`
    pub fn insert(&self, key: &str, value: CachedValue) {
        if self.capacity == Some(0) {
            return;
        }

        let mut inner = self.lock();
        if inner.entries.insert(key.to_string(), value).is_none() {
            inner.order.push_back(key.to_string());
        }

        if let Some(capacity) = self.capacity {
            while inner.entries.len() > capacity {
                match inner.order.pop_front() {
                    Some(oldest) => {
                        inner.entries.remove(&oldest);
                    }
                    None => break,
                }
            }
        }
    }

    /// Drop the entry for `key`
    pub fn remove(&self, key: &str) {
        let mut inner = self.lock();
        if inner.entries.remove(key).is_some() {
            inner.order.retain(|k| k != key);
        }
    }

    /// Drop every entry
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
