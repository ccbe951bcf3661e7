use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tubely_core::models::{CreateVideoRequest, Video};
use tubely_core::AppError;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;
use crate::utils::upload::extract_video_field;

fn parse_video_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::InvalidInput("Invalid video ID".to_string()))
}

/// Create a draft video owned by the caller.
pub async fn create_video(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidatedJson(request): ValidatedJson<CreateVideoRequest>,
) -> Result<(StatusCode, Json<Video>), HttpAppError> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(AppError::InvalidInput("Title is required".to_string()).into());
    }

    let video = state
        .videos
        .create_video(Video::new(user.user_id, title, request.description))
        .await?;

    tracing::info!(video_id = %video.id, user_id = %user.user_id, "Video created");
    Ok((StatusCode::CREATED, Json(video)))
}

pub async fn get_video(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
) -> Result<Json<Video>, HttpAppError> {
    let video_id = parse_video_id(&video_id)?;
    let video = state
        .videos
        .get_video(video_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Video {} not found", video_id)))?;

    Ok(Json(video))
}

/// Accept a multipart `video` field, run it through the ingest pipeline and return the
/// updated record.
pub async fn upload_video(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<Json<Video>, HttpAppError> {
    let video_id = parse_video_id(&video_id)?;
    state
        .upload_service
        .authorize(video_id, user.user_id)
        .await?;

    let asset = extract_video_field(multipart, state.config.max_video_size_bytes()).await?;

    tracing::debug!(
        video_id = %video_id,
        size_bytes = asset.len(),
        content_type = %asset.content_type,
        "Video form received"
    );

    let video = state
        .upload_service
        .upload(video_id, user.user_id, asset)
        .await?;

    Ok(Json(video))
}
