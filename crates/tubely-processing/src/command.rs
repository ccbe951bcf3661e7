//! Builder for executing external tool commands with timeout support.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::Command;

/// Default command timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Characters never accepted in a tool path.
const DANGEROUS_CHARS: [char; 11] = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];

/// External tool failures.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Invalid program path: {0}")]
    InvalidProgram(String),

    #[error("{tool}: failed to spawn: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool}: I/O error waiting for process: {source}")]
    Wait {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool}: timed out after {timeout:?}")]
    Timeout { tool: String, timeout: Duration },

    #[error("{tool}: exited with status {status}: {stderr}")]
    Failed {
        tool: String,
        status: ExitStatus,
        stderr: String,
    },
}

impl ToolError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ToolError::Timeout { .. })
    }
}

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output.
    pub stdout: Vec<u8>,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

/// Reject program paths with shell metacharacters or traversal sequences.
pub fn validate_program(path: &str) -> Result<PathBuf, ToolError> {
    if path.trim().is_empty() {
        return Err(ToolError::InvalidProgram("empty path".to_string()));
    }
    if path.chars().any(|c| DANGEROUS_CHARS.contains(&c)) {
        return Err(ToolError::InvalidProgram(format!(
            "{} contains dangerous characters",
            path
        )));
    }
    if path.contains("..") {
        return Err(ToolError::InvalidProgram(format!(
            "{} contains directory traversal",
            path
        )));
    }
    Ok(PathBuf::from(path))
}

/// A builder for constructing and executing external tool invocations.
///
/// The child runs with a null stdin and is killed when the deadline passes.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// - [`ToolError::Spawn`] if the process cannot be started.
    /// - [`ToolError::Timeout`] if the process outlives the configured timeout.
    /// - [`ToolError::Failed`] if the process exits with a non-zero status.
    pub async fn execute(&self) -> Result<ToolOutput, ToolError> {
        let tool = self.program_name();
        let start = std::time::Instant::now();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|source| ToolError::Spawn {
            tool: tool.clone(),
            source,
        })?;

        let result = tokio::time::timeout(self.timeout, child.wait_with_output()).await;

        match result {
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

                tracing::debug!(
                    tool = %tool,
                    status = %output.status,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Tool process exited"
                );

                if !output.status.success() {
                    return Err(ToolError::Failed {
                        tool,
                        status: output.status,
                        stderr,
                    });
                }

                Ok(ToolOutput {
                    status: output.status,
                    stdout: output.stdout,
                    stderr,
                })
            }
            Ok(Err(source)) => Err(ToolError::Wait { tool, source }),
            // Dropping the wait future drops the child, and kill_on_drop reaps it.
            Err(_elapsed) => Err(ToolError::Timeout {
                tool,
                timeout: self.timeout,
            }),
        }
    }
}
