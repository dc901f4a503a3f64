//! Device-local persistent store primitive
//!
//! The [`LocalStore`] trait mirrors an origin-scoped string key/value
//! store. [`MemoryLocalStore`] keeps everything in process and can simulate
//! a full or disabled store.

use crate::error::{StorageError, StorageResult};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Origin-scoped string key/value store
pub trait LocalStore: Send + Sync + fmt::Debug {
    /// Read one item
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write one item
    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Delete one item; deleting a missing item succeeds
    fn remove_item(&self, key: &str) -> StorageResult<()>;

    /// Delete every item in the store, not just ours
    fn clear(&self) -> StorageResult<()>;

    /// Every key currently stored
    fn keys(&self) -> StorageResult<Vec<String>>;

    /// Number of stored items
    fn len(&self) -> StorageResult<usize> {
        Ok(self.keys()?.len())
    }
}

/// In-memory local store
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    items: RwLock<HashMap<String, String>>,
    quota_bytes: Option<usize>,
    disabled: AtomicBool,
}

impl MemoryLocalStore {
    /// Create an empty, unbounded store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that rejects writes past `quota_bytes` (keys + values)
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::default()
        }
    }

    /// Make every operation fail as if storage were turned off
    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::SeqCst);
    }

    fn check_enabled(&self) -> StorageResult<()> {
        if self.disabled.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable {
                backend: "memory".to_string(),
                reason: "storage is disabled".to_string(),
            });
        }
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, String>> {
        self.items.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        self.items.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LocalStore for MemoryLocalStore {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        self.check_enabled()?;
        Ok(self.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.check_enabled()?;
        let mut items = self.write();

        if let Some(quota) = self.quota_bytes {
            let current: usize = items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if current + key.len() + value.len() > quota {
                return Err(StorageError::QuotaExceeded);
            }
        }

        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.check_enabled()?;
        self.write().remove(key);
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        self.check_enabled()?;
        self.write().clear();
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        self.check_enabled()?;
        let mut keys: Vec<String> = self.read().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
