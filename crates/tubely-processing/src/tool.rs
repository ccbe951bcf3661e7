//! Seam between the pipeline and external media programs.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tubely_core::models::StreamGeometry;

use crate::video::{ProbeError, RemuxError};

/// A single invocation of an external media program against a local file.
///
/// Implementations run one process per call and never retry.
#[async_trait]
pub trait MediaTool: Send + Sync {
    type Output: Send;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn run(&self, input: &Path) -> Result<Self::Output, Self::Error>;
}

/// Reads stream geometry from a file.
pub type SharedProber = Arc<dyn MediaTool<Output = StreamGeometry, Error = ProbeError>>;

/// Rewrites a file's container and returns the path it wrote.
pub type SharedRemuxer = Arc<dyn MediaTool<Output = PathBuf, Error = RemuxError>>;
