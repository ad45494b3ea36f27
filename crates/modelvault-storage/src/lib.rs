//! modelvault storage library
//!
//! Storage abstraction for model artifacts plus the encrypted artifact store
//! built on top of it.
//!
//! # Storage key format
//!
//! Keys are content-addressed and never derived from the uploaded file name:
//!
//! - **Anonymous uploads**: `models/{uuid}.{ext}`
//! - **Owned uploads**: `models/{owner_id}/{uuid}.{ext}`
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized in the
//! `keys` module so all backends stay consistent.

pub mod encrypted;
pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-memory")]
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use encrypted::EncryptedStore;
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-memory")]
pub use memory::MemoryStorage;
pub use modelvault_core::StorageBackend;
pub use traits::{ByteStream, Storage, StorageError, StorageResult};
