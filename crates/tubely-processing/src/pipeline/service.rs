use std::sync::Arc;

use tubely_core::models::{MediaAsset, Video};
use tubely_db::VideoRepository;
use uuid::Uuid;

use super::orchestrator::VideoPipeline;
use crate::error::PipelineError;

/// Attaches an uploaded file to an existing video record.
#[derive(Clone)]
pub struct VideoUploadService {
    videos: Arc<dyn VideoRepository>,
    pipeline: Arc<VideoPipeline>,
}

impl VideoUploadService {
    pub fn new(videos: Arc<dyn VideoRepository>, pipeline: Arc<VideoPipeline>) -> Self {
        Self { videos, pipeline }
    }

    /// Load the video and check `principal` owns it.
    ///
    /// Callers run this before reading the request body so that unknown videos and
    /// non-owners are rejected without buffering the upload.
    pub async fn authorize(&self, video_id: Uuid, principal: Uuid) -> Result<Video, PipelineError> {
        let video = self
            .videos
            .get_video(video_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("Video {} not found", video_id)))?;

        if !video.is_owned_by(principal) {
            return Err(PipelineError::Forbidden(
                "You are not the owner of this video".to_string(),
            ));
        }

        Ok(video)
    }

    /// Look up the video, check `principal` owns it, run the pipeline and store the
    /// resulting URL on the record.
    ///
    /// Ownership is checked again here, before any file I/O. If the record cannot be
    /// updated the uploaded object is deleted again.
    #[tracing::instrument(skip(self, asset), fields(video_id = %video_id, user_id = %principal))]
    pub async fn upload(
        &self,
        video_id: Uuid,
        principal: Uuid,
        asset: MediaAsset,
    ) -> Result<Video, PipelineError> {
        let mut video = self.authorize(video_id, principal).await?;

        tracing::info!(size_bytes = asset.len(), "Uploading video");

        let outcome = self.pipeline.run(&asset).await?;
        video.video_url = Some(outcome.location.url.clone());

        match self.videos.update_video(&video).await {
            Ok(updated) => {
                tracing::info!(
                    key = %outcome.location.key,
                    backend = %outcome.location.backend,
                    "Video upload recorded"
                );
                Ok(updated)
            }
            Err(e) => {
                tracing::error!(
                    key = %outcome.location.key,
                    error = %e,
                    "Failed to record video URL, removing uploaded object"
                );
                if let Err(delete_err) = self.pipeline.storage().delete(&outcome.location.key).await
                {
                    tracing::error!(
                        key = %outcome.location.key,
                        error = %delete_err,
                        "Failed to remove orphaned object"
                    );
                }
                Err(PipelineError::Record(e))
            }
        }
    }
}
