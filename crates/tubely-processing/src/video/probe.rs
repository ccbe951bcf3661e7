//! Stream geometry extraction with ffprobe

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tubely_core::models::StreamGeometry;

use crate::command::{validate_program, ToolCommand, ToolError};
use crate::tool::MediaTool;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("Failed to parse ffprobe output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Expected exactly one video stream, found {0}")]
    StreamCount(usize),

    #[error("Video stream has no {0}")]
    MissingDimension(&'static str),

    #[error("Invalid stream geometry: {width}x{height}")]
    InvalidGeometry { width: u64, height: u64 },
}

impl ProbeError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProbeError::Tool(e) if e.is_timeout())
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u64>,
    height: Option<u64>,
}

/// Extract geometry from `ffprobe -of json` output restricted to `v:0`.
pub fn parse_probe_output(stdout: &[u8]) -> Result<StreamGeometry, ProbeError> {
    let output: ProbeOutput = serde_json::from_slice(stdout)?;

    let [stream] = output.streams.as_slice() else {
        return Err(ProbeError::StreamCount(output.streams.len()));
    };

    let width = stream
        .width
        .ok_or(ProbeError::MissingDimension("width"))?;
    let height = stream
        .height
        .ok_or(ProbeError::MissingDimension("height"))?;

    u32::try_from(width)
        .ok()
        .zip(u32::try_from(height).ok())
        .and_then(|(w, h)| StreamGeometry::new(w, h))
        .ok_or(ProbeError::InvalidGeometry { width, height })
}

/// Runs ffprobe against a local file.
#[derive(Debug, Clone)]
pub struct FfprobeTool {
    ffprobe_path: PathBuf,
    timeout: Duration,
}

impl FfprobeTool {
    pub fn new(ffprobe_path: &str, timeout: Duration) -> Result<Self, ToolError> {
        Ok(Self {
            ffprobe_path: validate_program(ffprobe_path)?,
            timeout,
        })
    }
}

#[async_trait]
impl MediaTool for FfprobeTool {
    type Output = StreamGeometry;
    type Error = ProbeError;

    fn name(&self) -> &'static str {
        "ffprobe"
    }

    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffprobe",
        process.executable.path = %self.ffprobe_path.display(),
        ffmpeg.operation = "probe"
    ))]
    async fn run(&self, input: &Path) -> Result<StreamGeometry, ProbeError> {
        let start = std::time::Instant::now();

        let output = ToolCommand::new(&self.ffprobe_path)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height",
                "-of",
                "json",
            ])
            .arg(input.to_string_lossy())
            .timeout(self.timeout)
            .execute()
            .await?;

        let geometry = parse_probe_output(&output.stdout)?;

        tracing::info!(
            width = geometry.width,
            height = geometry.height,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Video geometry extracted"
        );

        Ok(geometry)
    }
}
