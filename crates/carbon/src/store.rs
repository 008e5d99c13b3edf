//! Durable key to byte-blob storage on local disk.
//!
//! Keys are `:`-separated segments (`api:region:3:forecast`). Every segment but
//! the last becomes a directory and the last becomes a `.json` file, so
//! `api:region:3` and `api:region:3:forecast` never collide on disk.
//!
//! Writes go to a temporary sibling file which is synced and then renamed over
//! the target, so a crash mid-write leaves either the old blob or the new one.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace};

use crate::error::StorageError;

pub type Result<T> = std::result::Result<T, StorageError>;

const KEY_SEPARATOR: char = ':';
const BLOB_EXTENSION: &str = "json";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StorageError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve the file a key is stored in.
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        let segments: Vec<&str> = key.split(KEY_SEPARATOR).collect();
        if !segments.iter().all(|s| is_valid_segment(s)) {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        let (last, dirs) = segments
            .split_last()
            .ok_or_else(|| StorageError::InvalidKey(key.to_string()))?;

        let mut path = self.root.clone();
        for dir in dirs {
            path.push(dir);
        }
        path.push(format!("{}.{}", last, BLOB_EXTENSION));
        Ok(path)
    }

    pub fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        write_atomic(&path, bytes).map_err(|source| StorageError::WriteFailed {
            key: key.to_string(),
            source,
        })?;
        trace!(key, bytes = bytes.len(), "Stored blob");
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    /// Remove every stored blob, leaving an empty root behind.
    pub fn clear_all(&self) -> Result<()> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.root.clone(),
                    source,
                })
            }
        }
        fs::create_dir_all(&self.root).map_err(|source| StorageError::Io {
            path: self.root.clone(),
            source,
        })?;
        debug!(root = ?self.root, "Cleared cache directory");
        Ok(())
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| std::io::Error::new(ErrorKind::InvalidInput, "path has no parent"))?;
    fs::create_dir_all(parent)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = parent.join(format!(
        ".{}.{}.{}.tmp",
        file_name,
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    let result = (|| {
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&temp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, DiskStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::open(dir.path().join("cache")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_put_then_get() {
        let (_dir, store) = store();
        store.put("watts", b"{\"a\":1}").unwrap();
        assert_eq!(store.get("watts").unwrap(), b"{\"a\":1}");
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let (_dir, store) = store();
        let err = store.get("api:national").unwrap_err();
        assert!(matches!(err, StorageError::NotFound(ref k) if k == "api:national"));
    }

    #[test]
    fn test_nested_keys_do_not_collide() {
        let (_dir, store) = store();
        store.put("api:region:3", b"current").unwrap();
        store.put("api:region:3:forecast", b"forecast").unwrap();

        assert_eq!(store.get("api:region:3").unwrap(), b"current");
        assert_eq!(store.get("api:region:3:forecast").unwrap(), b"forecast");
        assert!(store.root().join("api/region/3/forecast.json").exists());
    }

    #[test]
    fn test_put_overwrites_and_leaves_no_temp_files() {
        let (_dir, store) = store();
        store.put("api:national", b"old").unwrap();
        store.put("api:national", b"new").unwrap();
        assert_eq!(store.get("api:national").unwrap(), b"new");

        let leftovers: Vec<_> = fs::read_dir(store.root().join("api"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_invalid_keys_rejected() {
        let (_dir, store) = store();
        for key in ["", "api::national", "..", "api:../etc", "a/b", "api:"] {
            assert!(
                matches!(store.put(key, b"x"), Err(StorageError::InvalidKey(_))),
                "key {key:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_clear_all_removes_everything() {
        let (_dir, store) = store();
        store.put("watts", b"1").unwrap();
        store.put("api:region:1", b"2").unwrap();

        store.clear_all().unwrap();

        assert!(store.root().exists());
        assert!(matches!(store.get("watts"), Err(StorageError::NotFound(_))));
        assert!(matches!(
            store.get("api:region:1"),
            Err(StorageError::NotFound(_))
        ));
    }
}
