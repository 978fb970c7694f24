//! Scoped Storage Facade
//!
//! [`ScopedStorage`] turns a flat [`BackingStore`] into a namespaced,
//! expiring JSON store. [`Storage`] groups the two scopes (`local` and
//! `session`) and sweeps expired records out of both when it is built.
//!
//! ## Read Path
//!
//! ```text
//! get(key)
//!   │
//!   ├─ build_key(name, namespace)
//!   ├─ store.get_item(..)          raw text or nothing
//!   ├─ decode(..).resolve(now)     value or nothing
//!   │
//!   └─ raw text present but nothing resolved?
//!        └─ store.remove_if(.., raw)  lazy expiry, skipped if the text changed
//! ```
//!
//! ## Consistency
//!
//! Nothing here takes a lock across calls. `update` reads, merges and
//! writes as three separate store operations, so two concurrent updates of
//! the same key can lose one side's changes. Writers sharing a store see
//! last-writer-wins. Expiry cleanup only deletes a record whose text is still
//! the one that was judged expired, so it never removes a concurrent write.

use crate::codec::{decode, encode, now_millis, Expiry, LogicalKey, StoredRecord};
use crate::error::StoreResult;
use crate::storage::merge::deep_merge;
use crate::store::{BackingStore, FileStore, MemoryStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// One of the two independent key spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Persists across sessions
    Local,
    /// Lives for the current session only
    Session,
}

impl Scope {
    pub const ALL: [Scope; 2] = [Scope::Local, Scope::Session];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Local => "local",
            Scope::Session => "session",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation counters for one scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageStats {
    pub get_ops: u64,
    pub set_ops: u64,
    pub del_ops: u64,
    /// Records removed because they were expired or unreadable
    pub expired: u64,
}

#[derive(Debug, Default)]
struct Counters {
    get_count: AtomicU64,
    set_count: AtomicU64,
    del_count: AtomicU64,
    expired_count: AtomicU64,
}

/// The storage facade for a single scope.
///
/// # Example
///
/// ```
/// use flashstore::{Expiry, LogicalKey, Storage};
/// use serde_json::json;
/// use std::time::Duration;
///
/// let storage = Storage::in_memory();
/// let local = storage.local();
///
/// local.set("theme", &"dark", None).unwrap();
/// assert_eq!(local.get("theme").unwrap(), Some(json!("dark")));
///
/// let key = LogicalKey::new("token").in_namespace("auth");
/// local.set(&key, &"abc", Some(Expiry::after(Duration::from_secs(60)))).unwrap();
/// assert!(local.has(&key).unwrap());
/// ```
pub struct ScopedStorage {
    scope: Scope,
    store: Arc<dyn BackingStore>,
    counters: Counters,
}

impl fmt::Debug for ScopedStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedStorage")
            .field("scope", &self.scope)
            .field("store", &self.store.name())
            .field("get_count", &self.counters.get_count.load(Ordering::Relaxed))
            .field("set_count", &self.counters.set_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl ScopedStorage {
    /// Wraps a backing store. Does not sweep; see [`Storage::new`].
    pub fn new(scope: Scope, store: Arc<dyn BackingStore>) -> Self {
        Self {
            scope,
            store,
            counters: Counters::default(),
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Returns the backing store this facade writes to.
    pub fn store(&self) -> &Arc<dyn BackingStore> {
        &self.store
    }

    /// Gets the value stored under `key`.
    ///
    /// Returns `None` if the key was never set, was removed, or has expired.
    /// A raw record that exists but does not resolve to a value (expired, or
    /// JSON that is not a usable value) is deleted from the store.
    pub fn get(&self, key: impl Into<LogicalKey>) -> StoreResult<Option<Value>> {
        let key: LogicalKey = key.into();
        let key = key.storage_key();
        self.read(&key)
    }

    /// Gets the value stored under `key` and deserializes it into `T`.
    ///
    /// A stored value that does not fit `T` is a
    /// [`StoreError::Serialization`](crate::error::StoreError::Serialization).
    pub fn get_as<T: DeserializeOwned>(&self, key: impl Into<LogicalKey>) -> StoreResult<Option<T>> {
        Ok(self.get(key)?.map(serde_json::from_value).transpose()?)
    }

    /// Stores `value` under `key`, replacing whatever was there.
    pub fn set<T: Serialize + ?Sized>(
        &self,
        key: impl Into<LogicalKey>,
        value: &T,
        expires: Option<Expiry>,
    ) -> StoreResult<()> {
        let key: LogicalKey = key.into();
        let key = key.storage_key();
        let value = serde_json::to_value(value)?;
        self.write(&key, StoredRecord::new(value, expires))
    }

    /// Merges `value` into the object stored under `key`.
    ///
    /// When both the stored value and `value` are JSON objects they are
    /// deep-merged (see [`deep_merge`]). Otherwise `value` replaces the stored
    /// value outright. The record is written with `expires` only: an expiry
    /// on the previous record is not carried over.
    pub fn update<T: Serialize + ?Sized>(
        &self,
        key: impl Into<LogicalKey>,
        value: &T,
        expires: Option<Expiry>,
    ) -> StoreResult<()> {
        let key: LogicalKey = key.into();
        let key = key.storage_key();
        let incoming = serde_json::to_value(value)?;

        let merged = match (self.read(&key)?, incoming) {
            (Some(Value::Object(mut existing)), Value::Object(patch)) => {
                deep_merge(&mut existing, patch);
                Value::Object(existing)
            }
            (_, incoming) => incoming,
        };

        self.write(&key, StoredRecord::new(merged, expires))
    }

    /// Deletes `key`. Deleting an absent key is a no-op.
    pub fn remove(&self, key: impl Into<LogicalKey>) -> StoreResult<()> {
        let key: LogicalKey = key.into();
        self.counters.del_count.fetch_add(1, Ordering::Relaxed);
        self.store.remove_item(&key.storage_key())
    }

    /// Deletes every record in this scope, in every namespace.
    pub fn clear(&self) -> StoreResult<()> {
        self.store.clear()?;
        debug!(scope = %self.scope, "Scope cleared");
        Ok(())
    }

    /// Checks if `key` holds a live value.
    ///
    /// Same lazy cleanup as [`get`](Self::get).
    pub fn has(&self, key: impl Into<LogicalKey>) -> StoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Returns every raw key in the store, including namespace prefixes.
    pub fn keys(&self) -> StoreResult<Vec<String>> {
        self.store.keys()
    }

    /// Returns every raw stored text, still encoded.
    pub fn values(&self) -> StoreResult<Vec<String>> {
        self.store.values()
    }

    /// Returns every raw `(key, text)` pair.
    pub fn entries(&self) -> StoreResult<Vec<(String, String)>> {
        self.store.entries()
    }

    /// Returns the number of raw entries, expired ones included.
    pub fn length(&self) -> StoreResult<usize> {
        self.store.length()
    }

    /// Removes every raw entry that does not resolve to a value.
    ///
    /// Judges one snapshot of the entries, then removes the stale ones in a
    /// single batch. An entry rewritten after the snapshot is kept.
    ///
    /// # Returns
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&self) -> StoreResult<u64> {
        let now = now_millis();

        let stale: Vec<(String, String)> = self
            .store
            .entries()?
            .into_iter()
            .filter(|(_, raw)| decode(Some(raw.as_str())).resolve(now).is_none())
            .collect();

        if stale.is_empty() {
            return Ok(0);
        }

        let removed = self.store.remove_matching(&stale)?;
        self.counters
            .expired_count
            .fetch_add(removed, Ordering::Relaxed);

        trace!(
            scope = %self.scope,
            candidates = stale.len(),
            removed = removed,
            "Swept records"
        );

        Ok(removed)
    }

    /// Returns operation counters for this scope.
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            get_ops: self.counters.get_count.load(Ordering::Relaxed),
            set_ops: self.counters.set_count.load(Ordering::Relaxed),
            del_ops: self.counters.del_count.load(Ordering::Relaxed),
            expired: self.counters.expired_count.load(Ordering::Relaxed),
        }
    }

    fn read(&self, key: &str) -> StoreResult<Option<Value>> {
        self.counters.get_count.fetch_add(1, Ordering::Relaxed);

        let Some(raw) = self.store.get_item(key)? else {
            return Ok(None);
        };

        let value = decode(Some(raw.as_str())).resolve(now_millis());
        if value.is_none() && self.store.remove_if(key, &raw)? {
            self.counters.expired_count.fetch_add(1, Ordering::Relaxed);
            debug!(scope = %self.scope, key = %key, "Removed expired record on read");
        }

        Ok(value)
    }

    fn write(&self, key: &str, record: StoredRecord) -> StoreResult<()> {
        self.counters.set_count.fetch_add(1, Ordering::Relaxed);
        let text = encode(&record)?;
        self.store.set_item(key, &text)
    }
}

/// Local and session storage behind one handle.
///
/// Construct it once and share it by reference or `Arc`; nothing in the
/// crate keeps a global instance.
#[derive(Debug)]
pub struct Storage {
    local: ScopedStorage,
    session: ScopedStorage,
}

impl Storage {
    /// Wraps the two stores and removes every expired or unreadable record
    /// from both before returning.
    ///
    /// Any store error during the sweep is returned.
    pub fn new(local: Arc<dyn BackingStore>, session: Arc<dyn BackingStore>) -> StoreResult<Self> {
        let storage = Self {
            local: ScopedStorage::new(Scope::Local, local),
            session: ScopedStorage::new(Scope::Session, session),
        };

        let local_removed = storage.local.cleanup_expired()?;
        let session_removed = storage.session.cleanup_expired()?;

        info!(
            local_removed = local_removed,
            session_removed = session_removed,
            local_store = storage.local.store.name(),
            session_store = storage.session.store.name(),
            "Storage initialized"
        );

        Ok(storage)
    }

    /// Both scopes in memory. Starts empty, so there is nothing to sweep.
    pub fn in_memory() -> Self {
        Self {
            local: ScopedStorage::new(Scope::Local, Arc::new(MemoryStore::new())),
            session: ScopedStorage::new(Scope::Session, Arc::new(MemoryStore::new())),
        }
    }

    /// Local scope persisted to the JSON file at `path`, session scope in
    /// memory.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let local = Arc::new(FileStore::open(path)?);
        Self::new(local, Arc::new(MemoryStore::new()))
    }

    pub fn local(&self) -> &ScopedStorage {
        &self.local
    }

    pub fn session(&self) -> &ScopedStorage {
        &self.session
    }

    pub fn scope(&self, scope: Scope) -> &ScopedStorage {
        match scope {
            Scope::Local => &self.local,
            Scope::Session => &self.session,
        }
    }

    /// Sweeps both scopes. Returns the total number of records removed.
    pub fn cleanup_expired(&self) -> StoreResult<u64> {
        Scope::ALL
            .iter()
            .map(|scope| self.scope(*scope).cleanup_expired())
            .sum()
    }

    /// Returns the number of raw entries across both scopes.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.local.length()? + self.session.length()?)
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use serde::Deserialize;
    use serde_json::json;

    /// Lands `fresh` under `key` right after every read of the store, the
    /// way a writer on another thread could between a read and a delete.
    struct InterleavedStore {
        inner: MemoryStore,
        key: String,
        fresh: String,
    }

    impl InterleavedStore {
        fn new(key: &str, fresh: &str) -> Self {
            Self {
                inner: MemoryStore::new(),
                key: key.to_string(),
                fresh: fresh.to_string(),
            }
        }
    }

    impl BackingStore for InterleavedStore {
        fn name(&self) -> &str {
            "interleaved"
        }

        fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
            let raw = self.inner.get_item(key)?;
            if key == self.key {
                self.inner.set_item(&self.key, &self.fresh)?;
            }
            Ok(raw)
        }

        fn set_item(&self, key: &str, value: &str) -> StoreResult<()> {
            self.inner.set_item(key, value)
        }

        fn remove_item(&self, key: &str) -> StoreResult<()> {
            self.inner.remove_item(key)
        }

        fn clear(&self) -> StoreResult<()> {
            self.inner.clear()
        }

        fn key(&self, index: usize) -> StoreResult<Option<String>> {
            self.inner.key(index)
        }

        fn length(&self) -> StoreResult<usize> {
            self.inner.length()
        }

        fn entries(&self) -> StoreResult<Vec<(String, String)>> {
            let snapshot = self.inner.entries()?;
            self.inner.set_item(&self.key, &self.fresh)?;
            Ok(snapshot)
        }

        fn remove_if(&self, key: &str, expected: &str) -> StoreResult<bool> {
            self.inner.remove_if(key, expected)
        }

        fn remove_matching(&self, pairs: &[(String, String)]) -> StoreResult<u64> {
            self.inner.remove_matching(pairs)
        }
    }

    const EXPIRED: &str = r#"{"value":"old","expiresAt":1}"#;
    const FRESH: &str = r#"{"value":"fresh"}"#;

    fn memory_storage() -> (Arc<MemoryStore>, Arc<MemoryStore>, Storage) {
        let local = Arc::new(MemoryStore::new());
        let session = Arc::new(MemoryStore::new());
        let storage = Storage::new(local.clone(), session.clone()).unwrap();
        (local, session, storage)
    }

    #[test]
    fn test_round_trip() {
        let storage = Storage::in_memory();
        let local = storage.local();

        local.set("s", "hello", None).unwrap();
        local.set("b", &true, None).unwrap();
        local.set("o", &json!({"foo": "bar", "n": [1, 2]}), None).unwrap();

        assert_eq!(local.get("s").unwrap(), Some(json!("hello")));
        assert_eq!(local.get("b").unwrap(), Some(json!(true)));
        assert_eq!(local.get("o").unwrap(), Some(json!({"foo": "bar", "n": [1, 2]})));
    }

    #[test]
    fn test_get_missing() {
        let storage = Storage::in_memory();
        assert_eq!(storage.local().get("nope").unwrap(), None);
        assert!(!storage.local().has("nope").unwrap());
    }

    #[test]
    fn test_record_format() {
        let (local, _, storage) = memory_storage();

        storage.local().set("plain", "v", None).unwrap();
        storage
            .local()
            .set("timed", "v", Some(Expiry::AtMillis(i64::MAX)))
            .unwrap();

        assert_eq!(
            local.get_item("plain").unwrap(),
            Some(r#"{"value":"v"}"#.to_string())
        );
        assert_eq!(
            local.get_item("timed").unwrap(),
            Some(format!(r#"{{"value":"v","expiresAt":{}}}"#, i64::MAX))
        );
    }

    #[test]
    fn test_expiry_boundary() {
        let storage = Storage::in_memory();
        let local = storage.local();
        let now = now_millis();

        local.set("past", "v", Some(Expiry::AtMillis(now - 1))).unwrap();
        local
            .set("future", "v", Some(Expiry::AtMillis(now + 10_000)))
            .unwrap();

        assert_eq!(local.get("past").unwrap(), None);
        assert_eq!(local.get("future").unwrap(), Some(json!("v")));
    }

    #[test]
    fn test_lazy_cleanup_removes_raw_entry() {
        let (local_store, _, storage) = memory_storage();

        storage
            .local()
            .set("k", "v", Some(Expiry::AtMillis(now_millis() - 5)))
            .unwrap();
        assert!(local_store.get_item("k").unwrap().is_some());

        assert_eq!(storage.local().get("k").unwrap(), None);
        assert_eq!(local_store.get_item("k").unwrap(), None);
        assert_eq!(storage.local().stats().expired, 1);
    }

    #[test]
    fn test_has_cleans_up_expired() {
        let (local_store, _, storage) = memory_storage();

        storage
            .local()
            .set("k", "v", Some(Expiry::AtMillis(now_millis() - 5)))
            .unwrap();

        assert!(!storage.local().has("k").unwrap());
        assert_eq!(local_store.length().unwrap(), 0);
    }

    #[test]
    fn test_namespace_isolation() {
        let storage = Storage::in_memory();
        let local = storage.local();
        let namespaced = LogicalKey::new("k").in_namespace("ns");

        local.set("k", "a", None).unwrap();
        local.set(&namespaced, "b", None).unwrap();

        assert_eq!(local.get("k").unwrap(), Some(json!("a")));
        assert_eq!(local.get(&namespaced).unwrap(), Some(json!("b")));
        assert_eq!(local.keys().unwrap(), vec!["k", "ns-k"]);

        local.remove(&namespaced).unwrap();
        assert_eq!(local.get("k").unwrap(), Some(json!("a")));
        assert_eq!(local.get(&namespaced).unwrap(), None);
    }

    #[test]
    fn test_update_deep_merges_objects() {
        let storage = Storage::in_memory();
        let local = storage.local();

        local.set("k", &json!({"a": 1, "b": {"c": 2}}), None).unwrap();
        local.update("k", &json!({"b": {"d": 3}}), None).unwrap();

        assert_eq!(
            local.get("k").unwrap(),
            Some(json!({"a": 1, "b": {"c": 2, "d": 3}}))
        );
    }

    #[test]
    fn test_update_non_object_replaces() {
        let storage = Storage::in_memory();
        let local = storage.local();

        local.set("k", &json!({"a": 1}), None).unwrap();
        local.update("k", "replacement", None).unwrap();
        assert_eq!(local.get("k").unwrap(), Some(json!("replacement")));

        // And an object over a string replaces too
        local.update("k", &json!({"fresh": true}), None).unwrap();
        assert_eq!(local.get("k").unwrap(), Some(json!({"fresh": true})));
    }

    #[test]
    fn test_update_missing_key_sets() {
        let storage = Storage::in_memory();
        storage.local().update("k", &json!({"a": 1}), None).unwrap();
        assert_eq!(storage.local().get("k").unwrap(), Some(json!({"a": 1})));
    }

    #[test]
    fn test_update_array_replaces() {
        let storage = Storage::in_memory();
        let local = storage.local();

        local.set("k", &json!([1, 2]), None).unwrap();
        local.update("k", &json!({"a": 1}), None).unwrap();
        assert_eq!(local.get("k").unwrap(), Some(json!({"a": 1})));
    }

    #[test]
    fn test_update_drops_previous_expiry() {
        let (local_store, _, storage) = memory_storage();
        let local = storage.local();

        local
            .set("k", &json!({"a": 1}), Some(Expiry::AtMillis(now_millis() + 60_000)))
            .unwrap();
        local.update("k", &json!({"b": 2}), None).unwrap();

        assert_eq!(
            local_store.get_item("k").unwrap(),
            Some(r#"{"value":{"a":1,"b":2}}"#.to_string())
        );
    }

    #[test]
    fn test_update_over_expired_record_does_not_merge() {
        let storage = Storage::in_memory();
        let local = storage.local();

        local
            .set("k", &json!({"old": true}), Some(Expiry::AtMillis(now_millis() - 1)))
            .unwrap();
        local.update("k", &json!({"new": true}), None).unwrap();

        assert_eq!(local.get("k").unwrap(), Some(json!({"new": true})));
    }

    #[test]
    fn test_clear_scope_isolation() {
        let storage = Storage::in_memory();

        storage.local().set("a", "local", None).unwrap();
        storage.session().set("a", "session", None).unwrap();
        storage.local().set(&LogicalKey::new("b").in_namespace("ns"), "x", None).unwrap();

        storage.local().clear().unwrap();
        assert_eq!(storage.local().length().unwrap(), 0);
        assert_eq!(storage.session().get("a").unwrap(), Some(json!("session")));

        storage.local().set("a", "local", None).unwrap();
        storage.session().clear().unwrap();
        assert_eq!(storage.local().get("a").unwrap(), Some(json!("local")));
    }

    #[test]
    fn test_construction_sweep() {
        let local = Arc::new(MemoryStore::new());
        let session = Arc::new(MemoryStore::new());

        local
            .set_item("expired", r#"{"value":"v","expiresAt":1}"#)
            .unwrap();
        local.set_item("live", r#"{"value":"v"}"#).unwrap();
        local.set_item("legacy", "not json").unwrap();
        local.set_item("number", "42").unwrap();
        session
            .set_item("ns-expired", r#"{"value":{"a":1},"expiresAt":1}"#)
            .unwrap();

        let storage = Storage::new(local.clone(), session.clone()).unwrap();

        // Swept before any get was issued
        assert_eq!(local.keys().unwrap(), vec!["legacy", "live"]);
        assert_eq!(session.length().unwrap(), 0);
        assert_eq!(storage.local().stats().expired, 2);
        assert_eq!(storage.local().stats().get_ops, 0);
    }

    #[test]
    fn test_legacy_values_pass_through() {
        let (local_store, _, storage) = memory_storage();

        local_store.set_item("raw", "plain text").unwrap();
        local_store.set_item("bare", r#"{"foo":"bar"}"#).unwrap();
        local_store.set_item("flag", "true").unwrap();

        assert_eq!(storage.local().get("raw").unwrap(), Some(json!("plain text")));
        assert_eq!(storage.local().get("bare").unwrap(), Some(json!({"foo": "bar"})));
        assert_eq!(storage.local().get("flag").unwrap(), Some(json!(true)));
    }

    #[test]
    fn test_invalid_record_removed_on_read() {
        let (local_store, _, storage) = memory_storage();

        local_store.set_item("n", "42").unwrap();
        assert_eq!(storage.local().get("n").unwrap(), None);
        assert_eq!(local_store.get_item("n").unwrap(), None);
    }

    #[test]
    fn test_raw_enumeration() {
        let storage = Storage::in_memory();
        let local = storage.local();

        local.set("key1", "one", None).unwrap();
        local.set("key2", "two", Some(Expiry::AtMillis(now_millis() - 1))).unwrap();

        // Raw views are not expiry-filtered
        assert_eq!(local.length().unwrap(), 2);
        assert_eq!(local.keys().unwrap(), vec!["key1", "key2"]);
        assert!(local.values().unwrap()[0].contains("one"));

        let entries = local.entries().unwrap();
        assert_eq!(entries[0].0, "key1");
        assert_eq!(entries[0].1, r#"{"value":"one"}"#);
    }

    #[test]
    fn test_get_as_typed() {
        #[derive(Debug, Serialize, Deserialize, PartialEq)]
        struct Prefs {
            theme: String,
            font_size: u32,
        }

        let storage = Storage::in_memory();
        let prefs = Prefs {
            theme: "dark".to_string(),
            font_size: 14,
        };

        storage.session().set("prefs", &prefs, None).unwrap();
        assert_eq!(storage.session().get_as::<Prefs>("prefs").unwrap(), Some(prefs));
        assert_eq!(storage.session().get_as::<Prefs>("missing").unwrap(), None);

        storage.session().set("bad", "not prefs", None).unwrap();
        assert!(matches!(
            storage.session().get_as::<Prefs>("bad"),
            Err(StoreError::Serialization(_))
        ));
    }

    #[test]
    fn test_store_errors_propagate() {
        let local = Arc::new(MemoryStore::with_quota(16));
        let storage = Storage::new(local, Arc::new(MemoryStore::new())).unwrap();

        let err = storage
            .local()
            .set("k", &"x".repeat(64), None)
            .unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded { .. }));
        assert_eq!(storage.local().get("k").unwrap(), None);
    }

    #[test]
    fn test_end_to_end() {
        let storage = Storage::in_memory();
        let local = storage.local();

        local.set("t", &json!({"foo": "bar"}), None).unwrap();
        assert_eq!(local.get("t").unwrap(), Some(json!({"foo": "bar"})));

        local.remove("t").unwrap();
        assert_eq!(local.get("t").unwrap(), None);
        assert!(!local.has("t").unwrap());
    }

    #[test]
    fn test_scope_accessor_and_stats() {
        let storage = Storage::in_memory();

        storage.scope(Scope::Session).set("k", "v", None).unwrap();
        storage.scope(Scope::Session).get("k").unwrap();
        storage.scope(Scope::Session).remove("k").unwrap();

        let stats = storage.session().stats();
        assert_eq!(stats.set_ops, 1);
        assert_eq!(stats.get_ops, 1);
        assert_eq!(stats.del_ops, 1);
        assert_eq!(storage.local().stats(), StorageStats::default());
        assert_eq!(storage.scope(Scope::Local).scope(), Scope::Local);
        assert_eq!(Scope::Session.to_string(), "session");
    }

    #[test]
    fn test_open_file_backed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local.json");

        {
            let storage = Storage::open(&path).unwrap();
            storage.local().set("persisted", "yes", None).unwrap();
            storage
                .local()
                .set("short", "lived", Some(Expiry::AtMillis(now_millis() - 1)))
                .unwrap();
            storage.session().set("gone", "after restart", None).unwrap();
        }

        let storage = Storage::open(&path).unwrap();
        assert_eq!(storage.local().get("persisted").unwrap(), Some(json!("yes")));
        assert_eq!(storage.local().keys().unwrap(), vec!["persisted"]);
        assert_eq!(storage.session().get("gone").unwrap(), None);
    }

    #[test]
    fn test_read_keeps_write_that_lands_after_expiry_check() {
        let store = Arc::new(InterleavedStore::new("k", FRESH));
        store.inner.set_item("k", EXPIRED).unwrap();
        let local = ScopedStorage::new(Scope::Local, store.clone());

        // The read saw the expired text; the fresh write must survive it
        assert_eq!(local.get("k").unwrap(), None);
        assert_eq!(store.inner.get_item("k").unwrap(), Some(FRESH.to_string()));
        assert_eq!(local.get("k").unwrap(), Some(json!("fresh")));
        assert_eq!(local.stats().expired, 0);
    }

    #[test]
    fn test_sweep_keeps_write_that_lands_after_snapshot() {
        let store = Arc::new(InterleavedStore::new("k", FRESH));
        store.inner.set_item("k", EXPIRED).unwrap();
        store.inner.set_item("other", EXPIRED).unwrap();
        let local = ScopedStorage::new(Scope::Local, store.clone());

        assert_eq!(local.cleanup_expired().unwrap(), 1);
        assert_eq!(store.inner.keys().unwrap(), vec!["k"]);
        assert_eq!(store.inner.get_item("k").unwrap(), Some(FRESH.to_string()));
    }

    #[test]
    fn test_sweep_over_file_store_removes_in_one_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local.json");

        let store = Arc::new(FileStore::open(&path).unwrap());
        for i in 0..50 {
            store.set_item(&format!("old-{}", i), EXPIRED).unwrap();
        }
        store.set_item("live", FRESH).unwrap();

        let local = ScopedStorage::new(Scope::Local, store);
        assert_eq!(local.cleanup_expired().unwrap(), 50);
        assert_eq!(local.cleanup_expired().unwrap(), 0);

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.keys().unwrap(), vec!["live"]);
    }

    #[test]
    fn test_cleanup_expired_counts_both_scopes() {
        let storage = Storage::in_memory();
        let past = Some(Expiry::AtMillis(now_millis() - 1));

        storage.local().set("a", "v", past).unwrap();
        storage.session().set("b", "v", past).unwrap();
        storage.session().set("c", "v", None).unwrap();

        assert_eq!(storage.len().unwrap(), 3);
        assert_eq!(storage.cleanup_expired().unwrap(), 2);
        assert_eq!(storage.len().unwrap(), 1);
        assert!(!storage.is_empty().unwrap());
    }
}
