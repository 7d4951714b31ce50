use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::data_dir;

const ENTRY_EXTENSION: &str = "json";
const TEMP_SUFFIX: &str = ".tmp";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("missing HOME environment variable")]
    MissingHomeDirectory,
    #[error("storage key is empty")]
    MissingKey,
    #[error("storage key contains a path separator: {0}")]
    InvalidKey(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// String-keyed durable storage, the local analogue of `localStorage`.
///
/// Every `set` replaces the whole value for its key atomically.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    fn remove(&self, key: &str) -> StorageResult<()>;
}

/// One file per key under a directory; writes go through a temp file and a rename.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    root: PathBuf,
}

impl FileKeyValueStore {
    pub const fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn with_default_root() -> StorageResult<Self> {
        let root = data_dir().ok_or(StorageError::MissingHomeDirectory)?;
        Ok(Self::with_root(root.join("state")))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn validate_key(key: &str) -> StorageResult<()> {
        if key.is_empty() {
            return Err(StorageError::MissingKey);
        }
        if key.contains(['/', '\\']) || key == "." || key == ".." {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(())
    }

    pub fn path_for_key(&self, key: &str) -> StorageResult<PathBuf> {
        Self::validate_key(key)?;
        let mut path = self.root.clone();
        path.push(format!("{key}.{ENTRY_EXTENSION}"));
        Ok(path)
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.path_for_key(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.path_for_key(key)?;
        write_atomic(&path, value.as_bytes())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.path_for_key(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::Io(err)),
        }
    }
}

/// Volatile store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RefCell<BTreeMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        if key.is_empty() {
            return Err(StorageError::MissingKey);
        }
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }
}

/// Replace `destination` with `contents` so readers never observe a partial write.
pub(crate) fn write_atomic(destination: &Path, contents: &[u8]) -> StorageResult<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut temp = destination.as_os_str().to_owned();
    temp.push(TEMP_SUFFIX);
    let temp = PathBuf::from(temp);

    fs::write(&temp, contents)?;
    if let Err(err) = fs::rename(&temp, destination) {
        let _ = fs::remove_file(&temp);
        return Err(StorageError::Io(err));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_root() -> PathBuf {
        let mut path = std::env::temp_dir();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos());
        let pid = std::process::id();
        path.push(format!("scenestealer-storage-{pid}-{nanos}"));
        path
    }

    fn with_temp_root<F: FnOnce(&Path)>(f: F) {
        let root = fixture_root();
        fs::create_dir_all(&root).unwrap();
        f(&root);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn path_for_key_uses_json_extension() {
        let store = FileKeyValueStore::with_root(PathBuf::from("/tmp/state"));
        let path = store.path_for_key("scenestealer-tokens").unwrap();
        assert_eq!(path, PathBuf::from("/tmp/state/scenestealer-tokens.json"));
    }

    #[test]
    fn path_for_key_rejects_empty_and_nested_keys() {
        let store = FileKeyValueStore::with_root(PathBuf::from("/tmp/state"));
        assert!(matches!(
            store.path_for_key(""),
            Err(StorageError::MissingKey)
        ));
        assert!(matches!(
            store.path_for_key("../escape"),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[test]
    fn file_store_set_get_remove_lifecycle() {
        with_temp_root(|root| {
            let store = FileKeyValueStore::with_root(root.join("state"));
            assert_eq!(store.get("k").unwrap(), None);

            store.set("k", "{\"a\":1}").unwrap();
            assert_eq!(store.get("k").unwrap().as_deref(), Some("{\"a\":1}"));

            store.set("k", "{}").unwrap();
            assert_eq!(store.get("k").unwrap().as_deref(), Some("{}"));
            assert!(!root.join("state/k.json.tmp").exists());

            store.remove("k").unwrap();
            assert_eq!(store.get("k").unwrap(), None);
            store.remove("k").unwrap();
        });
    }

    #[test]
    fn memory_store_tracks_entries() {
        let store = MemoryKeyValueStore::new();
        assert!(store.is_empty());
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        assert_eq!(store.len(), 2);
        store.remove("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.get("b").unwrap().as_deref(), Some("2"));
    }
}
