//! Persistent File-Backed Store
//!
//! Holds the whole map in memory and writes it through to disk after every
//! mutation, so a process that restarts sees exactly what the previous one
//! left behind.
//!
//! ## On-Disk Format
//!
//! A single JSON object mapping raw keys to raw texts:
//!
//! ```text
//! {"user-theme":"{\"value\":\"dark\"}","token":"{\"value\":\"abc\",\"expiresAt\":1700000000000}"}
//! ```
//!
//! Writes go to a sibling temp file first and are renamed into place, so a
//! crash mid-write never leaves a truncated file.

use crate::error::StoreResult;
use crate::store::BackingStore;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::debug;

/// A store persisted to a JSON file.
///
/// # Example
///
/// ```no_run
/// use flashstore::store::{BackingStore, FileStore};
///
/// let store = FileStore::open("local-storage.json").unwrap();
/// store.set_item("theme", "dark").unwrap();
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    data: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Opens the store at `path`. A missing file opens as an empty store;
    /// the file is created on the first write.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        let data = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), keys = data.len(), "Opened file store");

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Returns the path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling path the next write is staged in: the file name with `.tmp`
    /// appended, so it never equals the target or another store's temp file.
    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Removes the given pairs whose text still matches, then persists once.
    /// Rolls the map back if the write fails.
    fn remove_matching_locked(
        &self,
        data: &mut BTreeMap<String, String>,
        pairs: &[(String, String)],
    ) -> StoreResult<u64> {
        let mut removed = Vec::new();
        for (key, expected) in pairs {
            if data.get(key) == Some(expected) {
                if let Some(old) = data.remove(key) {
                    removed.push((key.clone(), old));
                }
            }
        }

        if removed.is_empty() {
            return Ok(0);
        }

        if let Err(e) = self.persist(data) {
            data.extend(removed);
            return Err(e);
        }
        Ok(removed.len() as u64)
    }

    /// Writes the map to disk. Called with the write lock held so writers
    /// never interleave their files.
    fn persist(&self, data: &BTreeMap<String, String>) -> StoreResult<()> {
        let text = serde_json::to_string(data)?;
        let tmp = self.tmp_path();
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl BackingStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.data.read()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut data = self.data.write()?;
        let previous = data.insert(key.to_string(), value.to_string());

        if let Err(e) = self.persist(&data) {
            // Keep memory consistent with what is on disk.
            match previous {
                Some(old) => data.insert(key.to_string(), old),
                None => data.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StoreResult<()> {
        let mut data = self.data.write()?;
        if let Some(old) = data.remove(key) {
            if let Err(e) = self.persist(&data) {
                data.insert(key.to_string(), old);
                return Err(e);
            }
        }
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        let mut data = self.data.write()?;
        let previous = std::mem::take(&mut *data);

        if let Err(e) = self.persist(&data) {
            *data = previous;
            return Err(e);
        }
        Ok(())
    }

    fn key(&self, index: usize) -> StoreResult<Option<String>> {
        Ok(self.data.read()?.keys().nth(index).cloned())
    }

    fn length(&self) -> StoreResult<usize> {
        Ok(self.data.read()?.len())
    }

    fn entries(&self) -> StoreResult<Vec<(String, String)>> {
        let data = self.data.read()?;
        Ok(data.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    fn remove_if(&self, key: &str, expected: &str) -> StoreResult<bool> {
        let mut data = self.data.write()?;
        let pair = [(key.to_string(), expected.to_string())];
        Ok(self.remove_matching_locked(&mut data, &pair)? == 1)
    }

    fn remove_matching(&self, pairs: &[(String, String)]) -> StoreResult<u64> {
        let mut data = self.data.write()?;
        self.remove_matching_locked(&mut data, pairs)
    }
}
