//! Tubely Storage Library
//!
//! This crate provides the storage abstraction used to persist processed videos, with
//! implementations for S3 (through `object_store`) and the local filesystem.
//!
//! # Storage key format
//!
//! Every backend stores videos under `{category}/{identifier}.{extension}`, where the
//! category is the orientation bucket of the video (`landscape`, `portrait`, `other`).
//! Keys must not contain `..` or a leading `/`. Key generation is centralized in the
//! `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::{validate_key, video_key};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
pub use tubely_core::StorageBackend;
