//! Tubely Media Processing Library
//!
//! This crate turns an uploaded video into a fast-start MP4 in object storage:
//! probe, classify, remux, upload. External tools are reached through the
//! [`MediaTool`] trait so the pipeline can be driven by fakes in tests.

pub mod command;
pub mod error;
pub mod pipeline;
pub mod random;
pub mod tool;
pub mod validator;
pub mod video;

// Re-export commonly used types
pub use command::{ToolCommand, ToolError, ToolOutput};
pub use error::{PipelineError, UploadError};
pub use pipeline::{
    PipelineConfig, PipelineOutcome, PipelineRun, PipelineStage, RunState, VideoPipeline,
    VideoUploadService,
};
pub use random::{IdGenerator, RandomIdGenerator};
pub use tool::{MediaTool, SharedProber, SharedRemuxer};
pub use validator::{MediaValidator, ValidationError};
pub use video::{
    classify, remux_output_path, verify_remux_output, FfmpegRemuxer, FfprobeTool, ProbeError,
    RemuxError,
};
