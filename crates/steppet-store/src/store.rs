//! The [`PersistentStore`] trait.
//!
//! The state engine persists one JSON blob under one versioned key. The
//! trait abstracts the mechanism: a file on disk, browser local storage
//! behind an FFI bridge, or an in-memory map in tests.

use crate::error::StoreError;

/// A durable string-keyed, string-valued store.
///
/// Implementations overwrite the full value on every write. No partial
/// updates, no transactions.
pub trait PersistentStore {
    /// Read the value stored at `key`, or `None` if nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing store cannot be read.
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` at `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write cannot complete.
    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete the value at `key`. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the delete cannot complete.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

impl<S: PersistentStore + ?Sized> PersistentStore for Box<S> {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).read(key)
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).write(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

impl<S: PersistentStore + ?Sized> PersistentStore for &mut S {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).read(key)
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).write(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}
