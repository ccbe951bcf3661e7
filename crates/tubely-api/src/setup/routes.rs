//! Route configuration and setup

use crate::constants::{
    HEALTH_PATH, JSON_BODY_LIMIT_BYTES, MULTIPART_OVERHEAD_BYTES, VIDEOS_PATH, VIDEO_PATH,
    VIDEO_UPLOAD_PATH,
};
use crate::handlers::{health, videos};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tubely_core::Config;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    let upload_limit = config
        .max_video_size_bytes()
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    tracing::info!(upload_limit_bytes = upload_limit, "Upload body limit configured");

    // The multipart reader enforces the per-field cap; this layer bounds the whole body.
    let upload_routes = Router::new()
        .route(VIDEO_UPLOAD_PATH, post(videos::upload_video))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(upload_limit));

    let video_routes = Router::new()
        .route(VIDEOS_PATH, post(videos::create_video))
        .route(VIDEO_PATH, get(videos::get_video))
        .layer(DefaultBodyLimit::max(JSON_BODY_LIMIT_BYTES));

    let app = Router::new()
        .route(HEALTH_PATH, get(health::healthz))
        .merge(video_routes)
        .merge(upload_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];

    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}
