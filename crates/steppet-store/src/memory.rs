//! In-memory key-value store.
//!
//! Used by tests and by hosts that do not need durability (for example a
//! one-shot dry run). Writes can be switched off to exercise the engine's
//! best-effort persistence path.

use std::collections::BTreeMap;

use crate::error::StoreError;
use crate::store::PersistentStore;

/// A [`PersistentStore`] backed by a `BTreeMap`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
    read_only: bool,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with one entry.
    pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(key.into(), value.into());
        Self {
            entries,
            read_only: false,
        }
    }

    /// Make every subsequent write or remove fail with [`StoreError::ReadOnly`].
    pub const fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Peek at the raw stored value without going through the trait.
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl PersistentStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.read_only {
            return Err(StoreError::ReadOnly {
                key: key.to_owned(),
            });
        }
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if self.read_only {
            return Err(StoreError::ReadOnly {
                key: key.to_owned(),
            });
        }
        self.entries.remove(key);
        Ok(())
    }
}
