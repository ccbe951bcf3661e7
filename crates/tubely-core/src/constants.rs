//! Fixed values shared across crates.

/// The only container/codec pair accepted for upload.
pub const VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// Multipart form field carrying the video bytes.
pub const VIDEO_FORM_FIELD: &str = "video";

/// Issuer embedded in (and required of) access tokens.
pub const JWT_ISSUER: &str = "tubely-access";

/// Prefix of every per-run temporary workspace directory.
pub const PIPELINE_TEMP_PREFIX: &str = "tubely-run-";

/// Suffix appended to the raw upload path to name the remuxed output.
pub const REMUX_OUTPUT_SUFFIX: &str = ".processing";
