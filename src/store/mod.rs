//! Backing Stores
//!
//! A backing store is a flat string-to-string map with the small surface a
//! browser's `localStorage` offers: get, set, remove, clear, key-by-index and
//! length. The facade layers namespacing, the record envelope and expiry on
//! top; stores know nothing about any of that.
//!
//! ## Implementations
//!
//! - [`MemoryStore`]: lives and dies with the process. Used for the session
//!   scope and for tests. Optionally enforces a byte quota.
//! - [`FileStore`]: persists to a JSON file, written through on every change.
//!   Used for the local scope.
//!
//! Failures (quota, I/O, poisoned locks) are returned as
//! [`StoreError`](crate::error::StoreError) and
//! the facade passes them to its caller untouched.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::StoreResult;

/// A string key-value store with index-addressable keys.
///
/// Implementations must be safe to share across threads.
pub trait BackingStore: Send + Sync {
    /// Short name used in log output.
    fn name(&self) -> &str;

    /// Returns the text stored under `key`, if any.
    fn get_item(&self, key: &str) -> StoreResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous text.
    fn set_item(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Removes `key`. Removing an absent key is not an error.
    fn remove_item(&self, key: &str) -> StoreResult<()>;

    /// Removes every key.
    fn clear(&self) -> StoreResult<()>;

    /// Returns the key at `index`, or `None` past the end.
    ///
    /// Indices are only stable while the store is not modified.
    fn key(&self, index: usize) -> StoreResult<Option<String>>;

    /// Returns the number of stored keys.
    fn length(&self) -> StoreResult<usize>;

    /// Returns every stored key.
    fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.entries()?.into_iter().map(|(k, _)| k).collect())
    }

    /// Returns every stored text.
    fn values(&self) -> StoreResult<Vec<String>> {
        Ok(self.entries()?.into_iter().map(|(_, v)| v).collect())
    }

    /// Returns every `(key, text)` pair.
    fn entries(&self) -> StoreResult<Vec<(String, String)>> {
        let len = self.length()?;
        let mut entries = Vec::with_capacity(len);
        for index in 0..len {
            if let Some(key) = self.key(index)? {
                if let Some(value) = self.get_item(&key)? {
                    entries.push((key, value));
                }
            }
        }
        Ok(entries)
    }

    /// Removes `key` only if it still holds `expected`.
    ///
    /// Returns `true` if the entry was removed. The provided version checks
    /// and removes in two calls; stores shared between threads override it
    /// to do both under one lock, so a write landing after the caller read
    /// `expected` is never deleted.
    fn remove_if(&self, key: &str, expected: &str) -> StoreResult<bool> {
        if self.get_item(key)?.as_deref() == Some(expected) {
            self.remove_item(key)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Applies [`remove_if`](Self::remove_if) to every `(key, expected)` pair.
    ///
    /// Returns the number of entries removed.
    fn remove_matching(&self, pairs: &[(String, String)]) -> StoreResult<u64> {
        let mut removed = 0u64;
        for (key, expected) in pairs {
            if self.remove_if(key, expected)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
