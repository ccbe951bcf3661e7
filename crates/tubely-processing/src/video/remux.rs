//! Fast-start remuxing with ffmpeg

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tubely_core::constants::REMUX_OUTPUT_SUFFIX;

use crate::command::{validate_program, ToolCommand, ToolError};
use crate::tool::MediaTool;

#[derive(Debug, thiserror::Error)]
pub enum RemuxError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("Remux output {0} was not written")]
    MissingOutput(PathBuf),

    #[error("Remux output {0} is empty")]
    EmptyOutput(PathBuf),

    #[error("Failed to inspect remux output: {0}")]
    Io(#[from] std::io::Error),
}

impl RemuxError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RemuxError::Tool(e) if e.is_timeout())
    }
}

/// `<input>.processing`, next to the input.
pub fn remux_output_path(input: &Path) -> PathBuf {
    let mut name = OsString::from(input.as_os_str());
    name.push(REMUX_OUTPUT_SUFFIX);
    PathBuf::from(name)
}

/// Size of the remux output; a missing or zero-byte file is a failure even when
/// the tool exited cleanly.
pub async fn verify_remux_output(path: &Path) -> Result<u64, RemuxError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(meta.len()),
        Ok(meta) if meta.is_file() => Err(RemuxError::EmptyOutput(path.to_path_buf())),
        Ok(_) => Err(RemuxError::MissingOutput(path.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(RemuxError::MissingOutput(path.to_path_buf()))
        }
        Err(e) => Err(RemuxError::Io(e)),
    }
}

/// Rewrites an MP4 with its index up front, copying every stream as-is.
#[derive(Debug, Clone)]
pub struct FfmpegRemuxer {
    ffmpeg_path: PathBuf,
    timeout: Duration,
}

impl FfmpegRemuxer {
    pub fn new(ffmpeg_path: &str, timeout: Duration) -> Result<Self, ToolError> {
        Ok(Self {
            ffmpeg_path: validate_program(ffmpeg_path)?,
            timeout,
        })
    }
}

#[async_trait]
impl MediaTool for FfmpegRemuxer {
    type Output = PathBuf;
    type Error = RemuxError;

    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffmpeg",
        process.executable.path = %self.ffmpeg_path.display(),
        ffmpeg.operation = "faststart"
    ))]
    async fn run(&self, input: &Path) -> Result<PathBuf, RemuxError> {
        let output_path = remux_output_path(input);
        let start = std::time::Instant::now();

        ToolCommand::new(&self.ffmpeg_path)
            .args(["-y", "-v", "error", "-i"])
            .arg(input.to_string_lossy())
            .args([
                "-map",
                "0",
                "-c",
                "copy",
                "-map_metadata",
                "0",
                "-movflags",
                "+faststart",
                "-f",
                "mp4",
            ])
            .arg(output_path.to_string_lossy())
            .timeout(self.timeout)
            .execute()
            .await?;

        tracing::info!(
            output = %output_path.display(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Remux completed"
        );

        Ok(output_path)
    }
}
