//! Per-request pipeline state.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tempfile::TempDir;
use tubely_core::constants::PIPELINE_TEMP_PREFIX;
use tubely_core::models::{OrientationCategory, StorageLocation, StreamGeometry};
use uuid::Uuid;

/// Step of the pipeline a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Validate,
    Authorize,
    Stage,
    Probe,
    Classify,
    Remux,
    Upload,
    Record,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Validate => "validate",
            PipelineStage::Authorize => "authorize",
            PipelineStage::Stage => "stage",
            PipelineStage::Probe => "probe",
            PipelineStage::Classify => "classify",
            PipelineStage::Remux => "remux",
            PipelineStage::Upload => "upload",
            PipelineStage::Record => "record",
        }
    }
}

impl Display for PipelineStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Received,
    Probed,
    Classified,
    Remuxed,
    Uploaded,
    Recorded,
    Failed(PipelineStage),
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Recorded | RunState::Failed(_))
    }
}

/// One asset moving through the pipeline: its private workspace, the files written
/// there, and what each stage found out.
///
/// Dropping a run removes its workspace, so temp files never outlive a cancelled request.
#[derive(Debug)]
pub struct PipelineRun {
    id: Uuid,
    workspace: Option<TempDir>,
    source_path: PathBuf,
    remuxed_path: Option<PathBuf>,
    geometry: Option<StreamGeometry>,
    category: Option<OrientationCategory>,
    location: Option<StorageLocation>,
    state: RunState,
    started: Instant,
}

impl PipelineRun {
    /// Create a uniquely named workspace under `temp_root` for a file with `extension`.
    pub fn create(temp_root: &Path, extension: &str) -> io::Result<Self> {
        let id = Uuid::new_v4();
        let workspace = tempfile::Builder::new()
            .prefix(PIPELINE_TEMP_PREFIX)
            .tempdir_in(temp_root)?;
        let source_path = workspace
            .path()
            .join(format!("upload-{}.{}", id.simple(), extension));

        tracing::debug!(
            run_id = %id,
            workspace = %workspace.path().display(),
            "Pipeline run created"
        );

        Ok(Self {
            id,
            workspace: Some(workspace),
            source_path,
            remuxed_path: None,
            geometry: None,
            category: None,
            location: None,
            state: RunState::Received,
            started: Instant::now(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn remuxed_path(&self) -> Option<&Path> {
        self.remuxed_path.as_deref()
    }

    pub fn geometry(&self) -> Option<StreamGeometry> {
        self.geometry
    }

    pub fn category(&self) -> Option<OrientationCategory> {
        self.category
    }

    pub fn location(&self) -> Option<&StorageLocation> {
        self.location.as_ref()
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    fn advance(&mut self, next: RunState) {
        tracing::debug!(
            run_id = %self.id,
            from = ?self.state,
            to = ?next,
            elapsed_ms = self.elapsed_ms(),
            "Pipeline state transition"
        );
        self.state = next;
    }

    pub(crate) fn probed(&mut self, geometry: StreamGeometry) {
        self.geometry = Some(geometry);
        self.advance(RunState::Probed);
    }

    pub(crate) fn classified(&mut self, category: OrientationCategory) {
        self.category = Some(category);
        self.advance(RunState::Classified);
    }

    /// Register a file the remuxer wrote (or may have partially written) for cleanup.
    pub(crate) fn track_remux_output(&mut self, path: PathBuf) {
        self.remuxed_path = Some(path);
    }

    pub(crate) fn remuxed(&mut self) {
        self.advance(RunState::Remuxed);
    }

    pub(crate) fn uploaded(&mut self, location: StorageLocation) {
        self.location = Some(location);
        self.advance(RunState::Uploaded);
    }

    pub(crate) fn recorded(&mut self) {
        self.advance(RunState::Recorded);
    }

    pub(crate) fn failed(&mut self, stage: PipelineStage) {
        self.location = None;
        self.advance(RunState::Failed(stage));
    }

    /// Every temp file this run may have created.
    pub fn temp_files(&self) -> Vec<&Path> {
        let mut files = vec![self.source_path.as_path()];
        if let Some(remuxed) = self.remuxed_path.as_deref() {
            files.push(remuxed);
        }
        files
    }

    /// Delete the run's temp files and its workspace directory.
    pub async fn cleanup(&mut self) -> io::Result<()> {
        let mut first_error = None;

        for path in self.temp_files() {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(
                        run_id = %self.id,
                        path = %path.display(),
                        error = %e,
                        "Failed to remove temp file"
                    );
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if let Some(workspace) = self.workspace.take() {
            let path = workspace.path().to_path_buf();
            if let Err(e) = workspace.close() {
                tracing::warn!(
                    run_id = %self.id,
                    path = %path.display(),
                    error = %e,
                    "Failed to close workspace, retrying removal"
                );
                if let Err(e) = retry_remove_workspace(&path, e).await {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Second attempt at removing a workspace whose `TempDir::close` failed.
///
/// A directory that is already gone counts as removed. Otherwise the original close error
/// is returned.
async fn retry_remove_workspace(path: &Path, close_error: io::Error) -> io::Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => {
            tracing::error!(
                path = %path.display(),
                error = %e,
                "Workspace left behind after retry"
            );
            Err(close_error)
        }
    }
}
