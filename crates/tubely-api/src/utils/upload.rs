//! Multipart helpers for the upload handler

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use axum::http::StatusCode;
use bytes::BytesMut;
use tubely_core::constants::VIDEO_FORM_FIELD;
use tubely_core::models::MediaAsset;
use tubely_core::AppError;

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::PayloadTooLarge("Request body is too large".to_string());
    }
    AppError::InvalidInput(format!("Failed to read multipart: {}", err.body_text()))
}

fn too_large(max_size: usize) -> AppError {
    AppError::PayloadTooLarge(format!(
        "Video file is too big: max size is {} MB",
        max_size / 1024 / 1024
    ))
}

/// Read a field chunk by chunk, failing as soon as it grows past `max_size`.
async fn read_capped(mut field: Field<'_>, max_size: usize) -> Result<BytesMut, AppError> {
    let mut data = BytesMut::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        if data.len() + chunk.len() > max_size {
            tracing::debug!(
                received_bytes = data.len() + chunk.len(),
                max_bytes = max_size,
                "Video field exceeds size limit"
            );
            return Err(too_large(max_size));
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

/// Extract the single `video` field of the form.
///
/// Other fields are drained and ignored. A missing content type is reported as
/// `application/octet-stream` and left to the pipeline to reject.
pub async fn extract_video_field(
    mut multipart: Multipart,
    max_size: usize,
) -> Result<MediaAsset, AppError> {
    let mut asset: Option<MediaAsset> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or_default().to_string();

        if field_name != VIDEO_FORM_FIELD {
            read_capped(field, max_size).await?;
            continue;
        }

        if asset.is_some() {
            return Err(AppError::InvalidInput(format!(
                "Multiple '{}' fields are not allowed",
                VIDEO_FORM_FIELD
            )));
        }

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = read_capped(field, max_size).await?;
        asset = Some(MediaAsset::new(data.freeze(), content_type));
    }

    asset.ok_or_else(|| {
        AppError::InvalidInput(format!("Couldn't find '{}' field in form", VIDEO_FORM_FIELD))
    })
}
