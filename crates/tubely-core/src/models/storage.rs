//! Storage location model: backend-agnostic reference to where a file ended up.

use serde::{Deserialize, Serialize};

use crate::storage_types::StorageBackend;

/// Durable location of an uploaded video.
///
/// `bucket` and `region` are only set for the S3 backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageLocation {
    pub backend: StorageBackend,
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub key: String,
    pub url: String,
}

impl StorageLocation {
    /// File extension of the key, if any.
    pub fn extension(&self) -> Option<&str> {
        let file_name = self.key.rsplit('/').next()?;
        let (_, ext) = file_name.rsplit_once('.')?;
        Some(ext)
    }
}
