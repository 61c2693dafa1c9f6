//! Pluggable blob storage for serialized graph images.
//!
//! The engine itself never touches disk; persistence goes through this
//! backend interface. Two implementations ship with the crate: a plain
//! in-memory map and a directory of blob files with atomic writes.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::errors::{Error, Result};

use tempfile::NamedTempFile;

/// Capacity and usage metadata for a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageInfo {
    pub kind: String,
    pub capacity: Option<u64>,
    pub used: Option<u64>,
    pub count: usize,
}

/// A keyed blob store. Every operation is total: probing for a missing key
/// is `Ok(None)` or `Ok(false)`, never an error.
pub trait StorageBackend {
    fn store(&mut self, key: &str, blob: &[u8]) -> Result<()>;
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn exists(&self, key: &str) -> Result<bool>;
    fn delete(&mut self, key: &str) -> Result<bool>;
    fn list(&self) -> Result<Vec<String>>;
    fn clear(&mut self) -> Result<()>;
    fn info(&self) -> Result<StorageInfo>;
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || !key.chars().all(|c| c == '-' || c == '_' || c == '.' || c.is_alphanumeric()) {
        Err(Error::MalformedExternalInput(format!("invalid storage key '{}'", key)))
    } else {
        Ok(())
    }
}

/// A backend over an in-memory map. Contents die with the value.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    blobs: BTreeMap<String, Vec<u8>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryStorage {
    fn store(&mut self, key: &str, blob: &[u8]) -> Result<()> {
        validate_key(key)?;
        self.blobs.insert(key.to_string(), blob.to_vec());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.get(key).cloned())
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.blobs.contains_key(key))
    }

    fn delete(&mut self, key: &str) -> Result<bool> {
        Ok(self.blobs.remove(key).is_some())
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(self.blobs.keys().cloned().collect())
    }

    fn clear(&mut self) -> Result<()> {
        self.blobs.clear();
        Ok(())
    }

    fn info(&self) -> Result<StorageInfo> {
        Ok(StorageInfo {
            kind: "memory".to_string(),
            capacity: None,
            used: Some(self.blobs.values().map(|b| b.len() as u64).sum()),
            count: self.blobs.len(),
        })
    }
}

const BLOB_EXTENSION: &str = "blob";

/// A backend over a directory of `<key>.blob` files. Writes go through a
/// named temp file and an atomic rename, so a crashed write never leaves a
/// truncated blob behind.
#[derive(Debug)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Opens (and creates if needed) the backing directory.
    pub fn new<P: Into<PathBuf>>(root: P) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.{}", key, BLOB_EXTENSION))
    }
}

impl StorageBackend for FileStorage {
    fn store(&mut self, key: &str, blob: &[u8]) -> Result<()> {
        validate_key(key)?;
        let mut temp = NamedTempFile::new_in(&self.root)?;
        temp.write_all(blob)?;
        temp.persist(self.blob_path(key))
            .map_err(|err| Error::Io(err.error))?;
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.blob_path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.blob_path(key).is_file())
    }

    fn delete(&mut self, key: &str) -> Result<bool> {
        match fs::remove_file(self.blob_path(key)) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(BLOB_EXTENSION) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    keys.push(stem.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn clear(&mut self) -> Result<()> {
        for key in self.list()? {
            self.delete(&key)?;
        }
        Ok(())
    }

    fn info(&self) -> Result<StorageInfo> {
        let mut used = 0u64;
        let mut count = 0usize;
        for key in self.list()? {
            used += fs::metadata(self.blob_path(&key))?.len();
            count += 1;
        }
        Ok(StorageInfo {
            kind: "file".to_string(),
            capacity: None,
            used: Some(used),
            count,
        })
    }
}
