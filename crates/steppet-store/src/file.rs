//! File-backed durable store.
//!
//! Each key maps to one file `<dir>/<key>.json`. Writes go to a sibling
//! temporary file first and are then renamed over the target, so a crash
//! mid-write leaves the previous value intact.
//!
//! # Key rules
//!
//! Keys must be non-empty and contain only ASCII letters, digits, `_`, `-`
//! and `.`, and must not start with `.`. This keeps every key inside the
//! store directory.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::store::PersistentStore;

/// File extension appended to every key.
const EXTENSION: &str = "json";

/// A [`PersistentStore`] that keeps one file per key in a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`. The directory is created lazily on
    /// the first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Return the store directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolve the file path for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidKey`] if the key breaks the key rules.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.{EXTENSION}")))
    }
}

impl PersistentStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;
        let tmp = path.with_extension(format!("{EXTENSION}.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        tracing::trace!(path = %path.display(), bytes = value.len(), "store write");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

fn validate_key(key: &str) -> Result<(), StoreError> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.');
    if key.is_empty() || key.starts_with('.') || !key.chars().all(allowed) {
        return Err(StoreError::InvalidKey(key.to_owned()));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// A fresh directory under the system temp dir, removed on drop.
    struct TempDir(PathBuf);

    impl TempDir {
        fn new() -> Self {
            let dir = std::env::temp_dir().join(format!("steppet-store-{}", uuid::Uuid::now_v7()));
            Self(dir)
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    #[test]
    fn missing_key_reads_as_none() {
        let tmp = TempDir::new();
        let store = FileStore::new(&tmp.0);
        assert!(store.read("steppet_state_v1").unwrap().is_none());
    }

    #[test]
    fn write_creates_directory_and_round_trips() {
        let tmp = TempDir::new();
        let mut store = FileStore::new(tmp.0.join("nested"));
        store.write("steppet_state_v1", r#"{"name":"Pip"}"#).unwrap();
        assert_eq!(
            store.read("steppet_state_v1").unwrap().as_deref(),
            Some(r#"{"name":"Pip"}"#)
        );
        assert!(tmp.0.join("nested").join("steppet_state_v1.json").exists());
    }

    #[test]
    fn write_overwrites_previous_value() {
        let tmp = TempDir::new();
        let mut store = FileStore::new(&tmp.0);
        store.write("k", "one").unwrap();
        store.write("k", "two").unwrap();
        assert_eq!(store.read("k").unwrap().as_deref(), Some("two"));
        assert!(!tmp.0.join("k.json.tmp").exists());
    }

    #[test]
    fn remove_deletes_and_tolerates_missing() {
        let tmp = TempDir::new();
        let mut store = FileStore::new(&tmp.0);
        store.write("k", "v").unwrap();
        store.remove("k").unwrap();
        assert!(store.read("k").unwrap().is_none());
        assert!(store.remove("k").is_ok());
    }

    #[test]
    fn keys_cannot_escape_the_directory() {
        let store = FileStore::new("/tmp/unused");
        for bad in ["", "../etc/passwd", ".hidden", "a/b", "a b"] {
            assert!(
                matches!(store.path_for(bad), Err(StoreError::InvalidKey(_))),
                "key {bad:?} should be rejected"
            );
        }
        assert!(store.path_for("steppet_state_v1").is_ok());
    }
}
