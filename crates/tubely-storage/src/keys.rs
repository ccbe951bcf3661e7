//! Shared key generation for storage backends.
//!
//! Key format: `{category}/{identifier}.{extension}`.

use crate::{StorageError, StorageResult};
use tubely_core::models::OrientationCategory;

/// Reject keys that could escape a backend's root or that object stores mangle.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if key.contains("..") || key.starts_with('/') || key.contains('\\') {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    if key.split('/').any(|segment| segment.is_empty()) {
        return Err(StorageError::InvalidKey(
            "Storage key contains an empty path segment".to_string(),
        ));
    }
    Ok(())
}

/// Generate the storage key for a processed video.
///
/// `identifier` must be URL-safe (no `/`), and `extension` is given without a dot.
pub fn video_key(
    category: OrientationCategory,
    identifier: &str,
    extension: &str,
) -> StorageResult<String> {
    if identifier.is_empty() || identifier.contains('/') {
        return Err(StorageError::InvalidKey(format!(
            "Invalid object identifier: {:?}",
            identifier
        )));
    }
    let extension = extension.trim_start_matches('.');
    if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(StorageError::InvalidKey(format!(
            "Invalid file extension: {:?}",
            extension
        )));
    }

    let key = format!("{}/{}.{}", category.as_str(), identifier, extension);
    validate_key(&key)?;
    Ok(key)
}
