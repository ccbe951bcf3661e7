//! End-to-end pipeline tests driven by fake media tools and an in-memory object store.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tubely_core::models::{MediaAsset, StorageLocation, StreamGeometry, Video};
use tubely_db::{InMemoryVideoRepository, RepositoryError, VideoRepository};
use tubely_processing::command::ToolError;
use tubely_processing::{
    remux_output_path, IdGenerator, MediaTool, PipelineConfig, PipelineError, PipelineStage,
    ProbeError, RemuxError, UploadError, ValidationError, VideoPipeline, VideoUploadService,
};
use tubely_storage::{Storage, StorageBackend, StorageError, StorageResult};
use uuid::Uuid;

#[derive(Clone, Copy)]
enum ProbeBehaviour {
    Geometry(u32, u32),
    Fail,
}

struct FakeProber {
    behaviour: ProbeBehaviour,
    calls: AtomicUsize,
}

#[async_trait]
impl MediaTool for FakeProber {
    type Output = StreamGeometry;
    type Error = ProbeError;

    fn name(&self) -> &'static str {
        "fake-ffprobe"
    }

    async fn run(&self, input: &Path) -> Result<StreamGeometry, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(input.exists(), "probe input should be staged on disk");
        match self.behaviour {
            ProbeBehaviour::Geometry(w, h) => Ok(StreamGeometry::new(w, h).unwrap()),
            ProbeBehaviour::Fail => Err(ProbeError::StreamCount(0)),
        }
    }
}

#[derive(Clone, Copy)]
enum RemuxBehaviour {
    Write,
    WriteEmpty,
    NoOutput,
    PartialThenFail,
    Timeout,
}

struct FakeRemuxer {
    behaviour: RemuxBehaviour,
    calls: AtomicUsize,
}

fn tool_timeout() -> ToolError {
    ToolError::Timeout {
        tool: "fake-ffmpeg".to_string(),
        timeout: Duration::from_millis(10),
    }
}

#[async_trait]
impl MediaTool for FakeRemuxer {
    type Output = PathBuf;
    type Error = RemuxError;

    fn name(&self) -> &'static str {
        "fake-ffmpeg"
    }

    async fn run(&self, input: &Path) -> Result<PathBuf, RemuxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let output = remux_output_path(input);
        match self.behaviour {
            RemuxBehaviour::Write => {
                let data = tokio::fs::read(input).await?;
                let processed = [b"faststart:".as_slice(), data.as_slice()].concat();
                tokio::fs::write(&output, processed).await?;
                Ok(output)
            }
            RemuxBehaviour::WriteEmpty => {
                tokio::fs::write(&output, b"").await?;
                Ok(output)
            }
            RemuxBehaviour::NoOutput => Ok(output),
            RemuxBehaviour::PartialThenFail => {
                tokio::fs::write(&output, b"partial").await?;
                Err(RemuxError::Tool(ToolError::Wait {
                    tool: "fake-ffmpeg".to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "crashed"),
                }))
            }
            RemuxBehaviour::Timeout => Err(RemuxError::Tool(tool_timeout())),
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum StoreBehaviour {
    Accept,
    Reject,
    Hang,
}

#[derive(Debug, Clone)]
struct PutRecord {
    key: String,
    content_type: String,
    data: Vec<u8>,
}

struct RecordingStorage {
    behaviour: StoreBehaviour,
    puts: Mutex<Vec<PutRecord>>,
    deletes: Mutex<Vec<String>>,
}

impl RecordingStorage {
    fn puts(&self) -> Vec<PutRecord> {
        self.puts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Storage for RecordingStorage {
    async fn put_object(
        &self,
        local_path: &Path,
        key: &str,
        content_type: &str,
    ) -> StorageResult<StorageLocation> {
        match self.behaviour {
            StoreBehaviour::Reject => {
                return Err(StorageError::UploadFailed("access denied".to_string()))
            }
            StoreBehaviour::Hang => tokio::time::sleep(Duration::from_secs(30)).await,
            StoreBehaviour::Accept => {}
        }
        let data = tokio::fs::read(local_path).await?;
        self.puts.lock().unwrap().push(PutRecord {
            key: key.to_string(),
            content_type: content_type.to_string(),
            data,
        });
        Ok(StorageLocation {
            backend: StorageBackend::S3,
            bucket: Some("tubely-test".to_string()),
            region: Some("us-east-2".to_string()),
            key: key.to_string(),
            url: format!("https://tubely-test.s3.us-east-2.amazonaws.com/{}", key),
        })
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.deletes.lock().unwrap().push(key.to_string());
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.puts.lock().unwrap().iter().any(|p| p.key == key))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

struct FixedIds;

impl IdGenerator for FixedIds {
    fn generate(&self) -> String {
        "fixed-id".to_string()
    }
}

/// Accepts creates, refuses every update.
struct ReadOnlyVideos(InMemoryVideoRepository);

#[async_trait]
impl VideoRepository for ReadOnlyVideos {
    async fn create_video(&self, video: Video) -> Result<Video, RepositoryError> {
        self.0.create_video(video).await
    }

    async fn get_video(&self, id: Uuid) -> Result<Option<Video>, RepositoryError> {
        self.0.get_video(id).await
    }

    async fn update_video(&self, video: &Video) -> Result<Video, RepositoryError> {
        Err(RepositoryError::NotFound(video.id))
    }
}

struct Harness {
    temp_root: TempDir,
    prober: Arc<FakeProber>,
    remuxer: Arc<FakeRemuxer>,
    storage: Arc<RecordingStorage>,
    pipeline: Arc<VideoPipeline>,
}

impl Harness {
    fn new(probe: ProbeBehaviour, remux: RemuxBehaviour, store: StoreBehaviour) -> Self {
        let temp_root = TempDir::new().unwrap();
        let prober = Arc::new(FakeProber {
            behaviour: probe,
            calls: AtomicUsize::new(0),
        });
        let remuxer = Arc::new(FakeRemuxer {
            behaviour: remux,
            calls: AtomicUsize::new(0),
        });
        let storage = Arc::new(RecordingStorage {
            behaviour: store,
            puts: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
        });
        let config = PipelineConfig {
            temp_root: temp_root.path().to_path_buf(),
            max_file_size: 1024,
            upload_timeout: Duration::from_millis(100),
        };
        let pipeline = VideoPipeline::new(
            prober.clone(),
            remuxer.clone(),
            storage.clone(),
            config,
        )
        .with_id_generator(Arc::new(FixedIds));

        Self {
            temp_root,
            prober,
            remuxer,
            storage,
            pipeline: Arc::new(pipeline),
        }
    }

    fn happy(width: u32, height: u32) -> Self {
        Self::new(
            ProbeBehaviour::Geometry(width, height),
            RemuxBehaviour::Write,
            StoreBehaviour::Accept,
        )
    }

    fn leftover_entries(&self) -> usize {
        std::fs::read_dir(self.temp_root.path()).unwrap().count()
    }

    fn probe_calls(&self) -> usize {
        self.prober.calls.load(Ordering::SeqCst)
    }

    fn remux_calls(&self) -> usize {
        self.remuxer.calls.load(Ordering::SeqCst)
    }
}

fn mp4(data: &[u8]) -> MediaAsset {
    MediaAsset::new(data.to_vec(), "video/mp4")
}

async fn seeded_service(
    harness: &Harness,
    owner: Uuid,
) -> (VideoUploadService, Arc<InMemoryVideoRepository>, Uuid) {
    let repo = Arc::new(InMemoryVideoRepository::new());
    let video = repo
        .create_video(Video::new(owner, "Boots", "a video about boots"))
        .await
        .unwrap();
    let service = VideoUploadService::new(repo.clone(), harness.pipeline.clone());
    (service, repo, video.id)
}

#[tokio::test]
async fn landscape_upload_is_prefixed_and_recorded() {
    let harness = Harness::happy(1920, 1080);
    let owner = Uuid::new_v4();
    let (service, repo, video_id) = seeded_service(&harness, owner).await;

    let video = service
        .upload(video_id, owner, mp4(b"raw-bytes"))
        .await
        .unwrap();

    let puts = harness.storage.puts();
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].key, "landscape/fixed-id.mp4");
    assert!(puts[0].key.starts_with("landscape/"));
    assert!(puts[0].key.ends_with(".mp4"));
    assert_eq!(puts[0].content_type, "video/mp4");
    assert_eq!(puts[0].data, b"faststart:raw-bytes");

    let expected_url = "https://tubely-test.s3.us-east-2.amazonaws.com/landscape/fixed-id.mp4";
    assert_eq!(video.video_url.as_deref(), Some(expected_url));
    let stored = repo.get_video(video_id).await.unwrap().unwrap();
    assert_eq!(stored.video_url.as_deref(), Some(expected_url));

    assert_eq!(harness.leftover_entries(), 0);
}

#[tokio::test]
async fn categories_follow_aspect_ratio() {
    for (width, height, prefix) in [
        (1080, 1920, "portrait/"),
        (1000, 1000, "other/"),
        (1280, 720, "landscape/"),
    ] {
        let harness = Harness::happy(width, height);
        let outcome = harness.pipeline.run(&mp4(b"data")).await.unwrap();
        assert!(
            outcome.location.key.starts_with(prefix),
            "{}x{} gave {}",
            width,
            height,
            outcome.location.key
        );
        assert_eq!(outcome.geometry, StreamGeometry::new(width, height).unwrap());
        assert_eq!(harness.leftover_entries(), 0);
    }
}

#[tokio::test]
async fn content_type_parameters_are_accepted() {
    let harness = Harness::happy(1920, 1080);
    let asset = MediaAsset::new(b"data".to_vec(), "video/mp4; codecs=\"avc1.42E01E\"");
    let outcome = harness.pipeline.run(&asset).await.unwrap();
    assert_eq!(harness.storage.puts()[0].content_type, "video/mp4");
    assert!(outcome.location.key.ends_with(".mp4"));
}

#[tokio::test]
async fn webm_is_rejected_before_any_file_or_process() {
    let harness = Harness::happy(1920, 1080);
    let asset = MediaAsset::new(b"data".to_vec(), "video/webm");

    let err = harness.pipeline.run(&asset).await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Validation(ValidationError::InvalidContentType { .. })
    ));
    assert_eq!(err.stage(), PipelineStage::Validate);
    assert_eq!(harness.probe_calls(), 0);
    assert_eq!(harness.leftover_entries(), 0);
}

#[tokio::test]
async fn oversized_and_empty_uploads_are_rejected() {
    let harness = Harness::happy(1920, 1080);

    let err = harness.pipeline.run(&mp4(&[0u8; 1025])).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Validation(ValidationError::FileTooLarge { .. })
    ));

    let err = harness.pipeline.run(&mp4(b"")).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Validation(ValidationError::EmptyFile)
    ));

    assert_eq!(harness.probe_calls(), 0);
    assert_eq!(harness.leftover_entries(), 0);
}

#[tokio::test]
async fn non_owner_is_forbidden_before_any_file_io() {
    let harness = Harness::happy(1920, 1080);
    let owner = Uuid::new_v4();
    let (service, repo, video_id) = seeded_service(&harness, owner).await;

    let err = service
        .upload(video_id, Uuid::new_v4(), mp4(b"data"))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Forbidden(_)));
    assert_eq!(harness.probe_calls(), 0);
    assert_eq!(harness.leftover_entries(), 0);
    assert!(harness.storage.puts().is_empty());
    assert!(repo
        .get_video(video_id)
        .await
        .unwrap()
        .unwrap()
        .video_url
        .is_none());
}

#[tokio::test]
async fn ownership_is_checked_before_content_type() {
    let harness = Harness::happy(1920, 1080);
    let (service, _repo, video_id) = seeded_service(&harness, Uuid::new_v4()).await;

    let asset = MediaAsset::new(b"data".to_vec(), "video/webm");
    let err = service
        .upload(video_id, Uuid::new_v4(), asset)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Forbidden(_)));
}

#[tokio::test]
async fn authorize_checks_record_and_owner() {
    let harness = Harness::happy(1920, 1080);
    let owner = Uuid::new_v4();
    let (service, _repo, video_id) = seeded_service(&harness, owner).await;

    let video = service.authorize(video_id, owner).await.unwrap();
    assert_eq!(video.id, video_id);

    let err = service
        .authorize(video_id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Forbidden(_)));

    let err = service
        .authorize(Uuid::new_v4(), owner)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::NotFound(_)));

    assert_eq!(harness.probe_calls(), 0);
    assert_eq!(harness.leftover_entries(), 0);
}

#[tokio::test]
async fn unknown_video_is_not_found() {
    let harness = Harness::happy(1920, 1080);
    let (service, _repo, _video_id) = seeded_service(&harness, Uuid::new_v4()).await;

    let err = service
        .upload(Uuid::new_v4(), Uuid::new_v4(), mp4(b"data"))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::NotFound(_)));
    assert_eq!(harness.leftover_entries(), 0);
}

#[tokio::test]
async fn probe_failure_stops_before_remux_and_upload() {
    let harness = Harness::new(
        ProbeBehaviour::Fail,
        RemuxBehaviour::Write,
        StoreBehaviour::Accept,
    );

    let err = harness.pipeline.run(&mp4(b"data")).await.unwrap_err();

    assert!(matches!(err, PipelineError::Probe(_)));
    assert_eq!(err.stage(), PipelineStage::Probe);
    assert_eq!(harness.remux_calls(), 0);
    assert!(harness.storage.puts().is_empty());
    assert_eq!(harness.leftover_entries(), 0);
}

#[tokio::test]
async fn missing_remux_output_is_remux_error() {
    let harness = Harness::new(
        ProbeBehaviour::Geometry(1920, 1080),
        RemuxBehaviour::NoOutput,
        StoreBehaviour::Accept,
    );

    let err = harness.pipeline.run(&mp4(b"data")).await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Remux(RemuxError::MissingOutput(_))
    ));
    assert!(harness.storage.puts().is_empty());
    assert_eq!(harness.leftover_entries(), 0);
}

#[tokio::test]
async fn empty_remux_output_is_remux_error() {
    let harness = Harness::new(
        ProbeBehaviour::Geometry(1920, 1080),
        RemuxBehaviour::WriteEmpty,
        StoreBehaviour::Accept,
    );

    let err = harness.pipeline.run(&mp4(b"data")).await.unwrap_err();

    assert!(matches!(err, PipelineError::Remux(RemuxError::EmptyOutput(_))));
    assert!(harness.storage.puts().is_empty());
    assert_eq!(harness.leftover_entries(), 0);
}

#[tokio::test]
async fn failed_remux_cleans_partial_output() {
    let harness = Harness::new(
        ProbeBehaviour::Geometry(1920, 1080),
        RemuxBehaviour::PartialThenFail,
        StoreBehaviour::Accept,
    );

    let err = harness.pipeline.run(&mp4(b"data")).await.unwrap_err();

    assert!(matches!(err, PipelineError::Remux(RemuxError::Tool(_))));
    assert!(!err.is_timeout());
    assert!(harness.storage.puts().is_empty());
    assert_eq!(harness.leftover_entries(), 0);
}

#[tokio::test]
async fn remux_timeout_is_reported_as_timeout() {
    let harness = Harness::new(
        ProbeBehaviour::Geometry(1920, 1080),
        RemuxBehaviour::Timeout,
        StoreBehaviour::Accept,
    );

    let err = harness.pipeline.run(&mp4(b"data")).await.unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(err.stage(), PipelineStage::Remux);
    assert_eq!(harness.leftover_entries(), 0);
}

#[tokio::test]
async fn upload_failure_leaves_no_temp_files() {
    let harness = Harness::new(
        ProbeBehaviour::Geometry(1920, 1080),
        RemuxBehaviour::Write,
        StoreBehaviour::Reject,
    );
    let owner = Uuid::new_v4();
    let (service, repo, video_id) = seeded_service(&harness, owner).await;

    let err = service
        .upload(video_id, owner, mp4(b"data"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Upload(UploadError::Storage(_))
    ));
    assert_eq!(err.stage(), PipelineStage::Upload);
    assert_eq!(harness.leftover_entries(), 0);
    assert!(repo
        .get_video(video_id)
        .await
        .unwrap()
        .unwrap()
        .video_url
        .is_none());
}

#[tokio::test]
async fn upload_timeout_is_reported_as_timeout() {
    let harness = Harness::new(
        ProbeBehaviour::Geometry(1920, 1080),
        RemuxBehaviour::Write,
        StoreBehaviour::Hang,
    );

    let err = harness.pipeline.run(&mp4(b"data")).await.unwrap_err();

    assert!(matches!(err, PipelineError::Upload(UploadError::Timeout(_))));
    assert!(err.is_timeout());
    assert_eq!(harness.leftover_entries(), 0);
}

#[tokio::test]
async fn record_failure_removes_uploaded_object() {
    let harness = Harness::happy(1920, 1080);
    let owner = Uuid::new_v4();
    let repo = Arc::new(ReadOnlyVideos(InMemoryVideoRepository::new()));
    let video = repo
        .create_video(Video::new(owner, "Boots", ""))
        .await
        .unwrap();
    let service = VideoUploadService::new(repo, harness.pipeline.clone());

    let err = service
        .upload(video.id, owner, mp4(b"data"))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Record(_)));
    assert_eq!(
        harness.storage.deletes.lock().unwrap().as_slice(),
        ["landscape/fixed-id.mp4".to_string()]
    );
    assert_eq!(harness.leftover_entries(), 0);
}

#[tokio::test]
async fn concurrent_runs_do_not_share_files() {
    let temp_root = TempDir::new().unwrap();
    let storage = Arc::new(RecordingStorage {
        behaviour: StoreBehaviour::Accept,
        puts: Mutex::new(Vec::new()),
        deletes: Mutex::new(Vec::new()),
    });
    let pipeline = Arc::new(VideoPipeline::new(
        Arc::new(FakeProber {
            behaviour: ProbeBehaviour::Geometry(1080, 1920),
            calls: AtomicUsize::new(0),
        }),
        Arc::new(FakeRemuxer {
            behaviour: RemuxBehaviour::Write,
            calls: AtomicUsize::new(0),
        }),
        storage.clone(),
        PipelineConfig {
            temp_root: temp_root.path().to_path_buf(),
            max_file_size: 1024,
            upload_timeout: Duration::from_secs(5),
        },
    ));

    let handles: Vec<_> = (0..8u8)
        .map(|i| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                let asset = mp4(&[i; 16]);
                pipeline.run(&asset).await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let puts = storage.puts();
    assert_eq!(puts.len(), 8);
    let mut keys: Vec<_> = puts.iter().map(|p| p.key.clone()).collect();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), 8);
    for put in &puts {
        // each upload carries exactly the bytes of one request
        let payload = &put.data[b"faststart:".len()..];
        assert!(payload.iter().all(|b| *b == payload[0]));
    }
    assert_eq!(std::fs::read_dir(temp_root.path()).unwrap().count(), 0);
}
