use tubely_core::constants::VIDEO_CONTENT_TYPE;
use tubely_core::models::MediaAsset;

/// Common validation errors for uploaded media
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Invalid content type: {content_type} (allowed: {allowed:?})")]
    InvalidContentType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("Empty file")]
    EmptyFile,
}

/// Lowercased media type with any parameters (`; codecs=...`) removed.
pub fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

/// File extension used for stored objects of the given (normalized) content type.
pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    match content_type {
        "video/mp4" => Some("mp4"),
        _ => None,
    }
}

/// Media file validator
///
/// Checks what a client declared about an upload before any of it is written to disk.
#[derive(Debug, Clone)]
pub struct MediaValidator {
    max_file_size: usize,
    allowed_content_types: Vec<String>,
}

impl MediaValidator {
    pub fn new(max_file_size: usize, allowed_content_types: Vec<String>) -> Self {
        Self {
            max_file_size,
            allowed_content_types,
        }
    }

    /// Validator accepting only MP4 uploads up to `max_file_size` bytes.
    pub fn for_video(max_file_size: usize) -> Self {
        Self::new(max_file_size, vec![VIDEO_CONTENT_TYPE.to_string()])
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    /// Validate file size
    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    /// Validate content type, ignoring parameters and case
    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        let normalized = normalize_content_type(content_type);

        if !self
            .allowed_content_types
            .iter()
            .any(|ct| ct == &normalized)
        {
            return Err(ValidationError::InvalidContentType {
                content_type: content_type.to_string(),
                allowed: self.allowed_content_types.clone(),
            });
        }

        Ok(())
    }

    /// Validate all aspects of an asset. The content type is checked first.
    pub fn validate_asset(&self, asset: &MediaAsset) -> Result<(), ValidationError> {
        self.validate_content_type(&asset.content_type)?;
        self.validate_file_size(asset.len())?;
        Ok(())
    }
}
