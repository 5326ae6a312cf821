//! Blob storage boundary for the darkroom service.
//!
//! Storage is "store blob, return locator": originals and processed outputs
//! are written once under deterministic keys and read back by key. The
//! [`Storage`] trait keeps callers independent of the backend; the local
//! filesystem implementation is the default.

pub mod keys;
pub mod local;
pub mod traits;

pub use keys::{extension_for_content_type, original_key, processed_key};
pub use local::LocalStorage;
pub use traits::{Storage, StorageError, StorageResult};

/// Storage backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Local,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::Local => write!(f, "local"),
        }
    }
}
