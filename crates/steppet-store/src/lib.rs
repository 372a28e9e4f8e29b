//! Durable key-value storage for the `StepPet` state engine.
//!
//! The state engine writes one JSON blob under one versioned key. This crate
//! provides the [`PersistentStore`] seam and two implementations.
//!
//! # Modules
//!
//! - [`store`] -- The [`PersistentStore`] trait
//! - [`file`] -- [`FileStore`], one JSON file per key in a directory
//! - [`memory`] -- [`MemoryStore`], an in-memory map for tests and dry runs
//! - [`error`] -- Shared error types

pub mod error;
pub mod file;
pub mod memory;
pub mod store;

// Re-export primary types for convenience.
pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use store::PersistentStore;
