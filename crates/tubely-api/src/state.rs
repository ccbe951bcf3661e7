//! Application state shared by every handler.

use std::sync::Arc;
use tubely_core::Config;
use tubely_db::VideoRepository;
use tubely_processing::VideoUploadService;

use crate::auth::JwtService;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub videos: Arc<dyn VideoRepository>,
    pub upload_service: VideoUploadService,
    pub jwt: JwtService,
}
