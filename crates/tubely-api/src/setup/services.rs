//! Service and repository wiring

use anyhow::{Context, Result};
use std::sync::Arc;
use tubely_core::Config;
use tubely_db::{InMemoryVideoRepository, VideoRepository};
use tubely_processing::{VideoPipeline, VideoUploadService};
use tubely_storage::Storage;

use crate::auth::JwtService;
use crate::state::AppState;

/// Build the application state around the ffprobe/ffmpeg pipeline.
pub fn initialize_services(config: &Config, storage: Arc<dyn Storage>) -> Result<Arc<AppState>> {
    let pipeline = VideoPipeline::from_config(config, storage)
        .context("Failed to configure media tools")?;

    tracing::info!(
        ffprobe_path = %config.ffprobe_path(),
        ffmpeg_path = %config.ffmpeg_path(),
        temp_dir = %config.pipeline_temp_dir().display(),
        "Video pipeline initialized"
    );

    let videos: Arc<dyn VideoRepository> = Arc::new(InMemoryVideoRepository::new());
    Ok(build_state(config, videos, pipeline))
}

/// Assemble state from already-built parts.
pub fn build_state(
    config: &Config,
    videos: Arc<dyn VideoRepository>,
    pipeline: VideoPipeline,
) -> Arc<AppState> {
    let upload_service = VideoUploadService::new(videos.clone(), Arc::new(pipeline));

    Arc::new(AppState {
        config: config.clone(),
        videos,
        upload_service,
        jwt: JwtService::from_config(config),
    })
}
