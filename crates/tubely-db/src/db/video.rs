use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tubely_core::models::Video;
use tubely_core::AppError;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Video {0} not found")]
    NotFound(Uuid),

    #[error("Video {0} already exists")]
    Conflict(Uuid),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => AppError::NotFound(format!("Video {} not found", id)),
            RepositoryError::Conflict(_) => AppError::Internal(err.to_string()),
        }
    }
}

/// Trait for video metadata operations
#[async_trait::async_trait]
pub trait VideoRepository: Send + Sync {
    async fn create_video(&self, video: Video) -> Result<Video, RepositoryError>;

    async fn get_video(&self, id: Uuid) -> Result<Option<Video>, RepositoryError>;

    /// Replace a stored record; `updated_at` is refreshed by the repository.
    async fn update_video(&self, video: &Video) -> Result<Video, RepositoryError>;
}

/// Process-local video store.
#[derive(Clone, Default)]
pub struct InMemoryVideoRepository {
    videos: Arc<RwLock<HashMap<Uuid, Video>>>,
}

impl InMemoryVideoRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl VideoRepository for InMemoryVideoRepository {
    #[tracing::instrument(skip(self, video), fields(video_id = %video.id))]
    async fn create_video(&self, video: Video) -> Result<Video, RepositoryError> {
        let mut videos = self.videos.write().await;
        if videos.contains_key(&video.id) {
            return Err(RepositoryError::Conflict(video.id));
        }
        videos.insert(video.id, video.clone());
        tracing::debug!(user_id = %video.user_id, "Video record created");
        Ok(video)
    }

    async fn get_video(&self, id: Uuid) -> Result<Option<Video>, RepositoryError> {
        Ok(self.videos.read().await.get(&id).cloned())
    }

    #[tracing::instrument(skip(self, video), fields(video_id = %video.id))]
    async fn update_video(&self, video: &Video) -> Result<Video, RepositoryError> {
        let mut videos = self.videos.write().await;
        let stored = videos
            .get_mut(&video.id)
            .ok_or(RepositoryError::NotFound(video.id))?;

        let mut updated = video.clone();
        updated.created_at = stored.created_at;
        updated.updated_at = Utc::now();
        *stored = updated.clone();

        tracing::debug!(video_url = ?updated.video_url, "Video record updated");
        Ok(updated)
    }
}
