//! nsjail-backed [`SandboxRunner`].
//!
//! Writes the harness to a per-call scratch file and runs
//! `<runner> --config <config> -- <interpreter> <scratch file>`. The scratch
//! file is a [`tempfile::NamedTempFile`] held for the duration of the call,
//! so it is removed on every return path, including when the future is
//! dropped.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::NamedTempFile;

use super::executor::{RunnerError, RunnerResult, SandboxRunner};
use super::harness::WrappedProgram;
use super::subprocess;
use crate::error::CoreError;

/// Substring nsjail writes to stderr when it kills a process for exceeding
/// `time_limit`.
pub const DEFAULT_TIMEOUT_MARKER: &str = "run time >= time limit";

/// Filename prefix for scratch files, so stray ones are easy to attribute.
const SCRATCH_PREFIX: &str = "pyexec_";

/// Sandbox invocation settings.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Sandbox runner binary (default: `nsjail`, resolved via `PATH`).
    pub runner: PathBuf,
    /// Absolute path to the runner's config file.
    pub config_path: PathBuf,
    /// Python interpreter invoked inside the sandbox.
    pub interpreter: PathBuf,
    /// Directory for scratch files; the runner config must grant it read/write.
    pub scratch_dir: PathBuf,
    /// Wall-clock limit for one execution.
    pub timeout: Duration,
    /// Stderr substring that marks a runner-enforced timeout.
    pub timeout_marker: String,
}

impl SandboxConfig {
    /// Load sandbox settings from environment variables with defaults.
    ///
    /// | Env Var                  | Default                  |
    /// |--------------------------|--------------------------|
    /// | `SANDBOX_RUNNER`         | `nsjail`                 |
    /// | `SANDBOX_CONFIG`         | `nsjail.cfg`             |
    /// | `PYTHON_BIN`             | `python3`                |
    /// | `SCRATCH_DIR`            | `/tmp`                   |
    /// | `EXEC_TIMEOUT_SECS`      | `12`                     |
    /// | `SANDBOX_TIMEOUT_MARKER` | `run time >= time limit` |
    ///
    /// A relative `SANDBOX_CONFIG` is resolved against the current directory.
    pub fn from_env() -> Result<Self, CoreError> {
        let runner = std::env::var("SANDBOX_RUNNER").unwrap_or_else(|_| "nsjail".into());
        let config_path =
            std::env::var("SANDBOX_CONFIG").unwrap_or_else(|_| "nsjail.cfg".into());
        let interpreter = std::env::var("PYTHON_BIN").unwrap_or_else(|_| "python3".into());
        let scratch_dir = std::env::var("SCRATCH_DIR").unwrap_or_else(|_| "/tmp".into());

        let timeout_secs: u64 = std::env::var("EXEC_TIMEOUT_SECS")
            .unwrap_or_else(|_| "12".into())
            .parse()
            .map_err(|_| CoreError::Config("EXEC_TIMEOUT_SECS must be a valid u64".into()))?;

        let timeout_marker = std::env::var("SANDBOX_TIMEOUT_MARKER")
            .unwrap_or_else(|_| DEFAULT_TIMEOUT_MARKER.into());

        Ok(Self {
            runner: PathBuf::from(runner),
            config_path: absolutize(Path::new(&config_path))?,
            interpreter: PathBuf::from(interpreter),
            scratch_dir: PathBuf::from(scratch_dir),
            timeout: Duration::from_secs(timeout_secs),
            timeout_marker,
        })
    }

    /// Check that the settings can work before serving any requests.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !self.config_path.is_absolute() {
            return Err(CoreError::Config(format!(
                "Sandbox config path must be absolute: {}",
                self.config_path.display()
            )));
        }
        if !self.config_path.is_file() {
            return Err(CoreError::Config(format!(
                "Sandbox config not found: {}",
                self.config_path.display()
            )));
        }
        if !self.scratch_dir.is_dir() {
            return Err(CoreError::Config(format!(
                "Scratch directory does not exist: {}",
                self.scratch_dir.display()
            )));
        }
        if self.timeout.is_zero() {
            return Err(CoreError::Config(
                "Execution timeout must be greater than zero".into(),
            ));
        }
        if self.timeout_marker.is_empty() {
            return Err(CoreError::Config(
                "Sandbox timeout marker must not be empty".into(),
            ));
        }
        Ok(())
    }
}

fn absolutize(path: &Path) -> Result<PathBuf, CoreError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir()
        .map_err(|e| CoreError::Config(format!("Cannot resolve current directory: {e}")))?;
    Ok(cwd.join(path))
}

/// Runs harness programs through the nsjail command-line contract.
#[derive(Debug, Clone)]
pub struct NsjailRunner {
    config: SandboxConfig,
}

impl NsjailRunner {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    /// Create the scratch file and write the harness into it.
    fn write_scratch(&self, program: &WrappedProgram) -> Result<NamedTempFile, RunnerError> {
        let mut file = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .suffix(".py")
            .tempfile_in(&self.config.scratch_dir)
            .map_err(RunnerError::ScratchFile)?;
        file.write_all(program.as_str().as_bytes())
            .map_err(RunnerError::ScratchFile)?;
        file.flush().map_err(RunnerError::ScratchFile)?;
        Ok(file)
    }
}

#[async_trait]
impl SandboxRunner for NsjailRunner {
    async fn run(
        &self,
        program: &WrappedProgram,
        timeout: Duration,
    ) -> Result<RunnerResult, RunnerError> {
        // Dropping `scratch` deletes the file, whichever way this returns.
        let scratch = self.write_scratch(program)?;

        tracing::debug!(
            runner = %self.config.runner.display(),
            scratch = %scratch.path().display(),
            bytes = program.len(),
            "Invoking sandbox runner"
        );

        let mut cmd = tokio::process::Command::new(&self.config.runner);
        cmd.arg("--config")
            .arg(&self.config.config_path)
            .arg("--")
            .arg(&self.config.interpreter)
            .arg(scratch.path());

        let result = subprocess::run_command(&mut cmd, timeout).await;

        if let Err(e) = scratch.close() {
            tracing::warn!(error = %e, "Failed to remove scratch file");
        }

        result
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
