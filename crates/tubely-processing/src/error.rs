use std::time::Duration;
use tubely_core::AppError;
use tubely_db::RepositoryError;
use tubely_storage::StorageError;

use crate::pipeline::PipelineStage;
use crate::validator::ValidationError;
use crate::video::{ProbeError, RemuxError};

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Upload timed out after {0:?}")]
    Timeout(Duration),
}

/// Terminal failure of an upload request, tagged with the stage that produced it.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Failed to stage upload: {0}")]
    Staging(#[source] std::io::Error),

    #[error("Probe failed: {0}")]
    Probe(#[from] ProbeError),

    #[error("Remux failed: {0}")]
    Remux(#[from] RemuxError),

    #[error("Upload failed: {0}")]
    Upload(#[from] UploadError),

    #[error("Failed to record video: {0}")]
    Record(#[from] RepositoryError),
}

impl PipelineError {
    pub fn stage(&self) -> PipelineStage {
        match self {
            PipelineError::Validation(_) => PipelineStage::Validate,
            PipelineError::Forbidden(_) | PipelineError::NotFound(_) => PipelineStage::Authorize,
            PipelineError::Staging(_) => PipelineStage::Stage,
            PipelineError::Probe(_) => PipelineStage::Probe,
            PipelineError::Remux(_) => PipelineStage::Remux,
            PipelineError::Upload(_) => PipelineStage::Upload,
            PipelineError::Record(_) => PipelineStage::Record,
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            PipelineError::Probe(e) => e.is_timeout(),
            PipelineError::Remux(e) => e.is_timeout(),
            PipelineError::Upload(UploadError::Timeout(_)) => true,
            _ => false,
        }
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        let stage = err.stage().as_str();
        if err.is_timeout() {
            return AppError::Timeout {
                stage,
                message: err.to_string(),
            };
        }

        match err {
            PipelineError::Validation(ValidationError::FileTooLarge { max, .. }) => {
                AppError::PayloadTooLarge(format!(
                    "Video file is too big: max size is {} bytes",
                    max
                ))
            }
            PipelineError::Validation(ValidationError::InvalidContentType { .. }) => {
                AppError::InvalidInput("Invalid Mime type: only video/mp4 is accepted".to_string())
            }
            PipelineError::Validation(ValidationError::EmptyFile) => {
                AppError::InvalidInput("Video file is empty".to_string())
            }
            PipelineError::Forbidden(msg) => AppError::Forbidden(msg),
            PipelineError::NotFound(msg) => AppError::NotFound(msg),
            PipelineError::Probe(_) | PipelineError::Remux(_) => AppError::MediaProcessing {
                stage,
                message: err.to_string(),
            },
            PipelineError::Upload(_) => AppError::Storage(err.to_string()),
            PipelineError::Staging(_) | PipelineError::Record(_) => {
                AppError::Internal(err.to_string())
            }
        }
    }
}
