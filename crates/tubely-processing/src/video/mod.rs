//! Video inspection and repackaging

pub mod classify;
pub mod probe;
pub mod remux;

pub use classify::classify;
pub use probe::{parse_probe_output, FfprobeTool, ProbeError};
pub use remux::{remux_output_path, verify_remux_output, FfmpegRemuxer, RemuxError};
