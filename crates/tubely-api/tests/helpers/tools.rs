//! Fake media tools standing in for ffprobe and ffmpeg.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tubely_core::models::StreamGeometry;
use tubely_processing::{remux_output_path, MediaTool, ProbeError, RemuxError, ToolError};

pub struct FakeProber {
    geometry: Option<StreamGeometry>,
}

impl FakeProber {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            geometry: StreamGeometry::new(width, height),
        }
    }
}

#[async_trait]
impl MediaTool for FakeProber {
    type Output = StreamGeometry;
    type Error = ProbeError;

    fn name(&self) -> &'static str {
        "fake-ffprobe"
    }

    async fn run(&self, _input: &Path) -> Result<StreamGeometry, ProbeError> {
        self.geometry.ok_or(ProbeError::StreamCount(0))
    }
}

#[derive(Clone, Copy)]
pub enum RemuxBehaviour {
    Write,
    Fail,
}

pub struct FakeRemuxer {
    behaviour: RemuxBehaviour,
}

impl FakeRemuxer {
    pub fn new(behaviour: RemuxBehaviour) -> Self {
        Self { behaviour }
    }
}

#[async_trait]
impl MediaTool for FakeRemuxer {
    type Output = PathBuf;
    type Error = RemuxError;

    fn name(&self) -> &'static str {
        "fake-ffmpeg"
    }

    async fn run(&self, input: &Path) -> Result<PathBuf, RemuxError> {
        let output = remux_output_path(input);
        match self.behaviour {
            RemuxBehaviour::Write => {
                let data = tokio::fs::read(input).await?;
                tokio::fs::write(&output, data).await?;
                Ok(output)
            }
            RemuxBehaviour::Fail => {
                tokio::fs::write(&output, b"partial").await?;
                Err(RemuxError::Tool(ToolError::Wait {
                    tool: "fake-ffmpeg".to_string(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::Other,
                        "moov atom not found",
                    ),
                }))
            }
        }
    }
}
