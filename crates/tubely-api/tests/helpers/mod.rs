//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p tubely-api --test videos_test`.
//! Storage is a `LocalStorage` in a temp directory and the media tools are fakes, so no
//! ffmpeg binary or network is needed.

#![allow(dead_code)]

pub mod tools;

use axum_test::TestServer;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tubely_api::auth::JwtService;
use tubely_api::setup::{routes, services};
use tubely_core::{BaseConfig, Config, MediaConfig, StorageBackend, StorageConfig};
use tubely_db::{InMemoryVideoRepository, VideoRepository};
use tubely_processing::{PipelineConfig, VideoPipeline};
use tubely_storage::{LocalStorage, Storage};
use uuid::Uuid;

use tools::{FakeProber, FakeRemuxer, RemuxBehaviour};

pub const TEST_JWT_SECRET: &str = "test-secret-key-min-32-characters-long-for-testing";
pub const TEST_BASE_URL: &str = "http://localhost:8091/assets";
pub const TEST_MAX_VIDEO_BYTES: usize = 64 * 1024;

/// Test application: server plus the directories it writes to.
pub struct TestApp {
    pub server: TestServer,
    pub jwt: JwtService,
    pub storage_dir: TempDir,
    pub temp_root: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn token_for(&self, user_id: Uuid) -> String {
        self.jwt.make_token(user_id).expect("Failed to sign test token")
    }

    /// Files left behind in the pipeline temp root.
    pub fn temp_entries(&self) -> usize {
        count_entries(self.temp_root.path())
    }

    /// Objects written to the storage directory, recursively.
    pub fn stored_files(&self) -> Vec<String> {
        let mut files = Vec::new();
        collect_files(self.storage_dir.path(), self.storage_dir.path(), &mut files);
        files.sort();
        files
    }
}

fn count_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| entries.count())
        .unwrap_or(0)
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, out);
        } else if let Ok(relative) = path.strip_prefix(root) {
            out.push(relative.to_string_lossy().replace('\\', "/"));
        }
    }
}

pub fn create_test_config(storage_dir: &Path, temp_root: &Path) -> Config {
    Config {
        base: BaseConfig {
            server_port: 8091,
            cors_origins: vec!["*".to_string()],
            jwt_secret: TEST_JWT_SECRET.to_string(),
            jwt_expiry_hours: 1,
            environment: "test".to_string(),
            log_format: "text".to_string(),
        },
        storage: StorageConfig {
            backend: StorageBackend::Local,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            aws_region: None,
            local_storage_path: Some(storage_dir.to_string_lossy().to_string()),
            local_storage_base_url: Some(TEST_BASE_URL.to_string()),
        },
        media: MediaConfig {
            max_video_size_bytes: TEST_MAX_VIDEO_BYTES,
            ffprobe_path: "ffprobe".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            probe_timeout_secs: 5,
            remux_timeout_secs: 5,
            upload_timeout_secs: 5,
            temp_dir: Some(temp_root.to_path_buf()),
        },
    }
}

/// Setup a test app whose prober reports `width`x`height` and whose remuxer behaves as
/// `remux`.
pub async fn setup_test_app_with(width: u32, height: u32, remux: RemuxBehaviour) -> TestApp {
    let storage_dir = tempfile::tempdir().expect("Failed to create storage directory");
    let temp_root = tempfile::tempdir().expect("Failed to create temp root");
    let config = create_test_config(storage_dir.path(), temp_root.path());

    let storage: Arc<dyn Storage> = Arc::new(
        LocalStorage::new(storage_dir.path(), TEST_BASE_URL.to_string())
            .await
            .expect("Failed to create local storage"),
    );

    let pipeline = VideoPipeline::new(
        Arc::new(FakeProber::new(width, height)),
        Arc::new(FakeRemuxer::new(remux)),
        storage,
        PipelineConfig {
            temp_root: temp_root.path().to_path_buf(),
            max_file_size: config.max_video_size_bytes(),
            upload_timeout: Duration::from_secs(5),
        },
    );

    let videos: Arc<dyn VideoRepository> = Arc::new(InMemoryVideoRepository::new());
    let state = services::build_state(&config, videos, pipeline);
    let jwt = state.jwt.clone();

    let app = routes::setup_routes(&config, state).expect("Failed to setup routes");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        jwt,
        storage_dir,
        temp_root,
    }
}

/// Landscape source, remuxer succeeds.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(1920, 1080, RemuxBehaviour::Write).await
}

/// Create a draft video as `user_id` and return its id.
pub async fn create_video_as(app: &TestApp, user_id: Uuid, title: &str) -> Uuid {
    let response = app
        .client()
        .post("/api/videos")
        .add_header("Authorization", format!("Bearer {}", app.token_for(user_id)))
        .json(&serde_json::json!({ "title": title, "description": "integration test" }))
        .await;
    assert_eq!(response.status_code(), 201);

    let body: serde_json::Value = response.json();
    Uuid::parse_str(
        body.get("id")
            .and_then(|v| v.as_str())
            .expect("Expected 'id' in create response"),
    )
    .expect("Invalid UUID in create response")
}
