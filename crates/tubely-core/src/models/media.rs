use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Uploaded bytes plus the content type the client declared for them.
#[derive(Debug, Clone)]
pub struct MediaAsset {
    pub data: Bytes,
    pub content_type: String,
}

impl MediaAsset {
    pub fn new(data: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            content_type: content_type.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Width and height of the first video stream, both non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamGeometry {
    pub width: u32,
    pub height: u32,
}

impl StreamGeometry {
    /// Returns `None` when either dimension is zero.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self { width, height })
    }

    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }
}

impl Display for StreamGeometry {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Coarse aspect-ratio bucket, used as the storage key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrientationCategory {
    Landscape,
    Portrait,
    Other,
}

impl OrientationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrientationCategory::Landscape => "landscape",
            OrientationCategory::Portrait => "portrait",
            OrientationCategory::Other => "other",
        }
    }
}

impl Display for OrientationCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
