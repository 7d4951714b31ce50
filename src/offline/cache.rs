use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::Response;
use crate::storage::{write_atomic, StorageError};

const BODY_EXTENSION: &str = "body";
const META_EXTENSION: &str = "meta";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("invalid cache name: {0:?}")]
    InvalidName(String),
    #[error("cache does not exist: {0}")]
    MissingCache(String),
    #[error("cache io error at {path}")]
    Io { path: PathBuf, source: io::Error },
    #[error("corrupt cache entry at {path}")]
    CorruptEntry {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Named caches of request key to stored response, shared between
/// controller generations.
pub trait CacheStorage {
    /// Create the cache if it does not exist yet.
    fn open(&mut self, name: &str) -> CacheResult<()>;
    fn keys(&self) -> CacheResult<Vec<String>>;
    fn delete(&mut self, name: &str) -> CacheResult<bool>;
    fn put(&mut self, cache: &str, key: &str, response: &Response) -> CacheResult<()>;
    fn lookup(&self, cache: &str, key: &str) -> CacheResult<Option<Response>>;
    fn entries(&self, cache: &str) -> CacheResult<Vec<String>>;

    fn has(&self, name: &str) -> CacheResult<bool> {
        Ok(self.keys()?.iter().any(|key| key == name))
    }

    /// Store every entry or, on the first failure, none of them.
    fn put_all(&mut self, cache: &str, entries: &[(String, Response)]) -> CacheResult<()> {
        let mut written = Vec::with_capacity(entries.len());
        for (key, response) in entries {
            if let Err(err) = self.put(cache, key, response) {
                for key in written {
                    let _ = self.remove_entry(cache, key);
                }
                return Err(err);
            }
            written.push(key.as_str());
        }
        Ok(())
    }

    fn remove_entry(&mut self, cache: &str, key: &str) -> CacheResult<()>;

    /// Search every cache, in [`CacheStorage::keys`] order.
    fn match_any(&self, key: &str) -> CacheResult<Option<Response>> {
        for cache in self.keys()? {
            if let Some(response) = self.lookup(&cache, key)? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }
}

fn validate_cache_name(name: &str) -> CacheResult<()> {
    if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\']) {
        return Err(CacheError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Caches kept in memory, in creation order.
#[derive(Debug, Default, Clone)]
pub struct MemoryCacheStorage {
    caches: Vec<(String, BTreeMap<String, Response>)>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn cache(&self, name: &str) -> Option<&BTreeMap<String, Response>> {
        self.caches
            .iter()
            .find(|(cache, _)| cache == name)
            .map(|(_, entries)| entries)
    }

    fn cache_mut(&mut self, name: &str) -> CacheResult<&mut BTreeMap<String, Response>> {
        self.caches
            .iter_mut()
            .find(|(cache, _)| cache == name)
            .map(|(_, entries)| entries)
            .ok_or_else(|| CacheError::MissingCache(name.to_string()))
    }
}

impl CacheStorage for MemoryCacheStorage {
    fn open(&mut self, name: &str) -> CacheResult<()> {
        validate_cache_name(name)?;
        if self.cache(name).is_none() {
            self.caches.push((name.to_string(), BTreeMap::new()));
        }
        Ok(())
    }

    fn keys(&self) -> CacheResult<Vec<String>> {
        Ok(self.caches.iter().map(|(name, _)| name.clone()).collect())
    }

    fn delete(&mut self, name: &str) -> CacheResult<bool> {
        let before = self.caches.len();
        self.caches.retain(|(cache, _)| cache != name);
        Ok(self.caches.len() != before)
    }

    fn put(&mut self, cache: &str, key: &str, response: &Response) -> CacheResult<()> {
        self.cache_mut(cache)?
            .insert(key.to_string(), response.clone());
        Ok(())
    }

    fn lookup(&self, cache: &str, key: &str) -> CacheResult<Option<Response>> {
        Ok(self.cache(cache).and_then(|entries| entries.get(key).cloned()))
    }

    fn entries(&self, cache: &str) -> CacheResult<Vec<String>> {
        self.cache(cache)
            .map(|entries| entries.keys().cloned().collect())
            .ok_or_else(|| CacheError::MissingCache(cache.to_string()))
    }

    fn remove_entry(&mut self, cache: &str, key: &str) -> CacheResult<()> {
        self.cache_mut(cache)?.remove(key);
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    key: String,
    status: u16,
    #[serde(default)]
    content_type: Option<String>,
}

/// One directory per cache; each entry is a raw body file plus a JSON sidecar.
#[derive(Debug, Clone)]
pub struct DirCacheStorage {
    root: PathBuf,
}

impl DirCacheStorage {
    pub const fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn cache_dir(&self, name: &str) -> CacheResult<PathBuf> {
        validate_cache_name(name)?;
        Ok(self.root.join(name))
    }

    fn existing_cache_dir(&self, name: &str) -> CacheResult<PathBuf> {
        let dir = self.cache_dir(name)?;
        if !dir.is_dir() {
            return Err(CacheError::MissingCache(name.to_string()));
        }
        Ok(dir)
    }

    /// Fixed-length file stem; the key itself lives in the `.meta` sidecar.
    fn entry_stem(key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn io_error(path: &Path) -> impl FnOnce(io::Error) -> CacheError + '_ {
        move |source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl CacheStorage for DirCacheStorage {
    fn open(&mut self, name: &str) -> CacheResult<()> {
        let dir = self.cache_dir(name)?;
        fs::create_dir_all(&dir).map_err(Self::io_error(&dir))
    }

    fn keys(&self) -> CacheResult<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(Self::io_error(&self.root)(err)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(Self::io_error(&self.root))?;
            if !entry.path().is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn delete(&mut self, name: &str) -> CacheResult<bool> {
        let dir = self.cache_dir(name)?;
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(Self::io_error(&dir)(err)),
        }
    }

    fn put(&mut self, cache: &str, key: &str, response: &Response) -> CacheResult<()> {
        let dir = self.existing_cache_dir(cache)?;
        let stem = Self::entry_stem(key);
        let meta = EntryMeta {
            key: key.to_string(),
            status: response.status,
            content_type: response.content_type.clone(),
        };
        let meta = serde_json::to_vec(&meta).map_err(|source| CacheError::CorruptEntry {
            path: dir.join(&stem),
            source,
        })?;

        write_atomic(&dir.join(format!("{stem}.{BODY_EXTENSION}")), &response.body)?;
        write_atomic(&dir.join(format!("{stem}.{META_EXTENSION}")), &meta)?;
        Ok(())
    }

    fn lookup(&self, cache: &str, key: &str) -> CacheResult<Option<Response>> {
        let dir = self.cache_dir(cache)?;
        let stem = Self::entry_stem(key);
        let meta_path = dir.join(format!("{stem}.{META_EXTENSION}"));
        let meta = match fs::read(&meta_path) {
            Ok(meta) => meta,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(Self::io_error(&meta_path)(err)),
        };
        let meta: EntryMeta =
            serde_json::from_slice(&meta).map_err(|source| CacheError::CorruptEntry {
                path: meta_path.clone(),
                source,
            })?;

        let body_path = dir.join(format!("{stem}.{BODY_EXTENSION}"));
        let body = fs::read(&body_path).map_err(Self::io_error(&body_path))?;
        Ok(Some(Response {
            status: meta.status,
            content_type: meta.content_type,
            body,
        }))
    }

    fn entries(&self, cache: &str) -> CacheResult<Vec<String>> {
        let dir = self.existing_cache_dir(cache)?;
        let mut keys = Vec::new();
        for entry in fs::read_dir(&dir).map_err(Self::io_error(&dir))? {
            let path = entry.map_err(Self::io_error(&dir))?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(META_EXTENSION) {
                continue;
            }
            match fs::read(&path)
                .ok()
                .and_then(|meta| serde_json::from_slice::<EntryMeta>(&meta).ok())
            {
                Some(meta) => keys.push(meta.key),
                None => tracing::warn!(path = %path.display(), "skipping unreadable cache entry"),
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn remove_entry(&mut self, cache: &str, key: &str) -> CacheResult<()> {
        let dir = self.existing_cache_dir(cache)?;
        let stem = Self::entry_stem(key);
        for extension in [META_EXTENSION, BODY_EXTENSION] {
            let path = dir.join(format!("{stem}.{extension}"));
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(Self::io_error(&path)(err)),
            }
        }
        Ok(())
    }
}
