//! Local cache abstraction and implementations for Skillpath.
//!
//! This crate provides a trait-based key/blob interface for the on-device
//! progress mirror, with a JSON file backend and an in-memory backend.

#![warn(missing_docs)]

pub mod trait_;
pub mod json_storage;
pub mod memory;

pub use trait_::{keys, LocalStore, StorageError, Result};
pub use json_storage::JsonStorage;
pub use memory::MemoryStorage;
