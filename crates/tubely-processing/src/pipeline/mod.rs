//! Upload pipeline: per-run state, the stage orchestrator and the request-level service.

pub mod orchestrator;
pub mod run;
pub mod service;

pub use orchestrator::{PipelineConfig, PipelineOutcome, VideoPipeline};
pub use run::{PipelineRun, PipelineStage, RunState};
pub use service::VideoUploadService;
