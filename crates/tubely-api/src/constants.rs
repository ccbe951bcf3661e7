//! Route paths and HTTP limits.

pub const HEALTH_PATH: &str = "/api/healthz";
pub const VIDEOS_PATH: &str = "/api/videos";
pub const VIDEO_PATH: &str = "/api/videos/{video_id}";
pub const VIDEO_UPLOAD_PATH: &str = "/api/video_upload/{video_id}";

/// Slack on top of the video size limit for multipart boundaries and part headers.
pub const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Body limit for the JSON routes.
pub const JSON_BODY_LIMIT_BYTES: usize = 64 * 1024;
