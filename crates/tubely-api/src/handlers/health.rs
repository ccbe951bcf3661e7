use axum::{http::StatusCode, response::IntoResponse, Json};

/// Liveness probe - process is running.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "alive" })),
    )
}
