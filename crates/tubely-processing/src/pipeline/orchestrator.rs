//! Video ingest orchestration: stage → probe → classify → remux → upload → clean up.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tubely_core::constants::VIDEO_CONTENT_TYPE;
use tubely_core::models::{MediaAsset, OrientationCategory, StorageLocation, StreamGeometry};
use tubely_core::Config;
use tubely_storage::{video_key, Storage};

use super::run::PipelineRun;
use crate::command::ToolError;
use crate::error::{PipelineError, UploadError};
use crate::random::{IdGenerator, RandomIdGenerator};
use crate::tool::{SharedProber, SharedRemuxer};
use crate::validator::{
    extension_for_content_type, normalize_content_type, MediaValidator, ValidationError,
};
use crate::video::{classify, remux_output_path, verify_remux_output, FfmpegRemuxer, FfprobeTool};

/// Limits and locations used by every run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub temp_root: PathBuf,
    pub max_file_size: usize,
    pub upload_timeout: Duration,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            temp_root: config.pipeline_temp_dir(),
            max_file_size: config.max_video_size_bytes(),
            upload_timeout: config.upload_timeout(),
        }
    }
}

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub location: StorageLocation,
    pub geometry: StreamGeometry,
    pub category: OrientationCategory,
}

/// Sequences the media tools and storage for a single asset.
///
/// Holds no per-request state; every call to [`VideoPipeline::run`] gets its own
/// [`PipelineRun`], so one pipeline serves concurrent requests.
pub struct VideoPipeline {
    prober: SharedProber,
    remuxer: SharedRemuxer,
    storage: Arc<dyn Storage>,
    ids: Arc<dyn IdGenerator>,
    validator: MediaValidator,
    config: PipelineConfig,
}

impl VideoPipeline {
    pub fn new(
        prober: SharedProber,
        remuxer: SharedRemuxer,
        storage: Arc<dyn Storage>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            prober,
            remuxer,
            storage,
            ids: Arc::new(RandomIdGenerator::default()),
            validator: MediaValidator::for_video(config.max_file_size),
            config,
        }
    }

    /// Pipeline backed by the ffprobe and ffmpeg binaries named in `config`.
    pub fn from_config(config: &Config, storage: Arc<dyn Storage>) -> Result<Self, ToolError> {
        let prober = FfprobeTool::new(config.ffprobe_path(), config.probe_timeout())?;
        let remuxer = FfmpegRemuxer::new(config.ffmpeg_path(), config.remux_timeout())?;

        Ok(Self::new(
            Arc::new(prober),
            Arc::new(remuxer),
            storage,
            PipelineConfig::from_config(config),
        ))
    }

    /// Replace the source of object names.
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn validator(&self) -> &MediaValidator {
        &self.validator
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Validate the asset and, if it passes, run it through every stage.
    ///
    /// Temp files created here are deleted before returning, on success and on every
    /// failure path.
    #[tracing::instrument(skip(self, asset), fields(size_bytes = asset.len()))]
    pub async fn run(&self, asset: &MediaAsset) -> Result<PipelineOutcome, PipelineError> {
        self.validator.validate_asset(asset)?;

        let content_type = normalize_content_type(&asset.content_type);
        let extension = extension_for_content_type(&content_type).ok_or_else(|| {
            ValidationError::InvalidContentType {
                content_type: asset.content_type.clone(),
                allowed: vec![VIDEO_CONTENT_TYPE.to_string()],
            }
        })?;

        let mut run =
            PipelineRun::create(&self.config.temp_root, extension).map_err(PipelineError::Staging)?;

        let result = self.execute(&mut run, asset, &content_type, extension).await;
        if let Err(ref e) = result {
            run.failed(e.stage());
        }

        if let Err(e) = run.cleanup().await {
            // Cleanup failure does not fail the upload
            tracing::error!(
                run_id = %run.id(),
                error = %e,
                "Failed to clean up pipeline workspace"
            );
        }

        match result {
            Ok(outcome) => {
                run.recorded();
                tracing::info!(
                    run_id = %run.id(),
                    key = %outcome.location.key,
                    category = %outcome.category,
                    duration_ms = run.elapsed_ms(),
                    "Video pipeline completed"
                );
                Ok(outcome)
            }
            Err(e) => {
                tracing::warn!(
                    run_id = %run.id(),
                    stage = %e.stage(),
                    timeout = e.is_timeout(),
                    error = %e,
                    duration_ms = run.elapsed_ms(),
                    "Video pipeline failed"
                );
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        run: &mut PipelineRun,
        asset: &MediaAsset,
        content_type: &str,
        extension: &str,
    ) -> Result<PipelineOutcome, PipelineError> {
        tokio::fs::write(run.source_path(), &asset.data)
            .await
            .map_err(PipelineError::Staging)?;

        let geometry = self.prober.run(run.source_path()).await?;
        run.probed(geometry);

        let category = classify(&geometry);
        run.classified(category);

        // Track the expected output before running so a partial file is still removed.
        run.track_remux_output(remux_output_path(run.source_path()));
        let remuxed = self.remuxer.run(run.source_path()).await?;
        run.track_remux_output(remuxed.clone());
        let size = verify_remux_output(&remuxed).await?;
        run.remuxed();

        tracing::debug!(
            run_id = %run.id(),
            width = geometry.width,
            height = geometry.height,
            category = %category,
            size_bytes = size,
            "Video remuxed"
        );

        let key = video_key(category, &self.ids.generate(), extension).map_err(UploadError::from)?;
        let location = tokio::time::timeout(
            self.config.upload_timeout,
            self.storage.put_object(&remuxed, &key, content_type),
        )
        .await
        .map_err(|_| UploadError::Timeout(self.config.upload_timeout))?
        .map_err(UploadError::from)?;
        run.uploaded(location.clone());

        Ok(PipelineOutcome {
            location,
            geometry,
            category,
        })
    }
}
