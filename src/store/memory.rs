//! In-Memory Backing Store
//!
//! A `BTreeMap` behind a `std::sync::RwLock`. Keys enumerate in
//! lexicographic order, which keeps `key(index)` deterministic for tests.
//!
//! An optional quota caps the total size of keys plus values in bytes,
//! mirroring the per-origin limit browsers place on web storage.

use crate::error::{StoreError, StoreResult};
use crate::store::BackingStore;
use std::collections::BTreeMap;
use std::sync::RwLock;

#[derive(Debug, Default)]
struct Inner {
    data: BTreeMap<String, String>,
    /// Sum of key and value lengths in bytes
    used: usize,
}

impl Inner {
    fn remove_if_matches(&mut self, key: &str, expected: &str) -> bool {
        if self.data.get(key).map(String::as_str) != Some(expected) {
            return false;
        }
        self.data.remove(key);
        self.used -= key.len() + expected.len();
        true
    }
}

/// An in-memory store. Contents are lost on drop.
///
/// # Example
///
/// ```
/// use flashstore::store::{BackingStore, MemoryStore};
///
/// let store = MemoryStore::new();
/// store.set_item("greeting", "hello").unwrap();
/// assert_eq!(store.get_item("greeting").unwrap(), Some("hello".to_string()));
/// assert_eq!(store.length().unwrap(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    quota: Option<usize>,
}

impl MemoryStore {
    /// Creates an empty store with no size limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store that rejects writes growing it past `quota` bytes.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            quota: Some(quota),
        }
    }

    /// Returns the bytes currently used by keys and values.
    pub fn used_bytes(&self) -> StoreResult<usize> {
        Ok(self.inner.read()?.used)
    }
}

impl BackingStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.inner.read()?.data.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut inner = self.inner.write()?;

        let previous = inner
            .data
            .get(key)
            .map(|old| key.len() + old.len())
            .unwrap_or(0);
        let needed = inner.used - previous + key.len() + value.len();

        if let Some(quota) = self.quota {
            if needed > quota {
                return Err(StoreError::QuotaExceeded { needed, quota });
            }
        }

        inner.data.insert(key.to_string(), value.to_string());
        inner.used = needed;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StoreResult<()> {
        let mut inner = self.inner.write()?;
        if let Some(old) = inner.data.remove(key) {
            inner.used -= key.len() + old.len();
        }
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        let mut inner = self.inner.write()?;
        inner.data.clear();
        inner.used = 0;
        Ok(())
    }

    fn key(&self, index: usize) -> StoreResult<Option<String>> {
        Ok(self.inner.read()?.data.keys().nth(index).cloned())
    }

    fn length(&self) -> StoreResult<usize> {
        Ok(self.inner.read()?.data.len())
    }

    fn entries(&self) -> StoreResult<Vec<(String, String)>> {
        let inner = self.inner.read()?;
        Ok(inner
            .data
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn remove_if(&self, key: &str, expected: &str) -> StoreResult<bool> {
        let mut inner = self.inner.write()?;
        Ok(inner.remove_if_matches(key, expected))
    }

    fn remove_matching(&self, pairs: &[(String, String)]) -> StoreResult<u64> {
        let mut inner = self.inner.write()?;
        let mut removed = 0u64;
        for (key, expected) in pairs {
            if inner.remove_if_matches(key, expected) {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
