//! Types for software build execution.
//!
//! This module defines the error types, result types, and configuration
//! for building software definitions.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::consts::DEFAULT_COMMAND_TIMEOUT_SECS;
use crate::licensing::LicenseError;
use crate::platform::paths::cache_dir;
use crate::registry::RegistryError;
use crate::software::ResolveError;
use crate::util::hash::{HashError, ObjectHash};

/// Errors that can occur while planning or building software.
#[derive(Debug, Error)]
pub enum ExecuteError {
  /// The definition could not be resolved for the target.
  #[error(transparent)]
  Resolve(#[from] ResolveError),

  /// The dependency order could not be computed.
  #[error(transparent)]
  Registry(#[from] RegistryError),

  /// HTTP request failed while fetching a source.
  #[error("fetch failed for {url}: {message}")]
  FetchFailed { url: String, message: String },

  /// SHA256 hash mismatch after download.
  #[error("hash mismatch for {url}: expected {expected}, got {actual}")]
  HashMismatch {
    url: String,
    expected: String,
    actual: String,
  },

  /// The archive format could not be determined.
  #[error("unsupported archive: {0}")]
  UnsupportedArchive(PathBuf),

  /// Unpacking an archive failed.
  #[error("failed to extract {path}: {message}")]
  ExtractFailed { path: PathBuf, message: String },

  /// The extracted source does not contain the expected relative path.
  #[error("project directory not found after extraction: {0}")]
  MissingProjectDir(PathBuf),

  /// Command exited unsuccessfully.
  #[error("command failed with exit code {code:?}: {cmd}")]
  CmdFailed { cmd: String, code: Option<i32> },

  /// Command did not finish in time and was killed.
  #[error("command timed out after {}: {cmd}", humantime::format_duration(*timeout))]
  CmdTimeout { cmd: String, timeout: Duration },

  /// A build step failed; later steps were not run.
  #[error("{software}: build step {index} failed: {source}")]
  StepFailed {
    software: String,
    index: usize,
    #[source]
    source: Box<ExecuteError>,
  },

  /// Shipping the license record failed.
  #[error("license error: {0}")]
  License(#[from] LicenseError),

  /// Reading or writing the build completion marker failed.
  #[error("build marker error: {message}")]
  Marker { message: String },

  #[error("failed to hash definition: {0}")]
  Hash(#[from] HashError),

  /// I/O error during execution.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl ExecuteError {
  /// The exit code of the failing command, if the error came from one.
  pub fn exit_code(&self) -> Option<i32> {
    match self {
      ExecuteError::CmdFailed { code, .. } => *code,
      ExecuteError::StepFailed { source, .. } => source.exit_code(),
      _ => None,
    }
  }

  /// The command line that failed or timed out.
  pub fn failed_command(&self) -> Option<&str> {
    match self {
      ExecuteError::CmdFailed { cmd, .. } | ExecuteError::CmdTimeout { cmd, .. } => Some(cmd),
      ExecuteError::StepFailed { source, .. } => source.failed_command(),
      _ => None,
    }
  }
}

/// Result of building a single software definition.
#[derive(Debug, Clone)]
pub struct BuildResult {
  pub name: String,
  pub version: String,
  /// Hash of the resolved definition, recorded in the completion marker.
  pub hash: ObjectHash,
  /// Directory the build steps ran in.
  pub project_dir: PathBuf,
  /// True when an earlier build with the same hash was reused.
  pub cached: bool,
  /// Trimmed stdout of each step, in order.
  pub step_outputs: Vec<String>,
}

/// A definition that was not built because an earlier one failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSoftware {
  pub name: String,
  pub failed_dependency: String,
}

/// Result of building a target and its dependencies.
#[derive(Debug, Default)]
pub struct RunResult {
  /// Successfully built (or cached) definitions, in build order.
  pub built: Vec<BuildResult>,

  /// The definition that failed, if any (stops the run).
  pub failed: Option<(String, ExecuteError)>,

  /// Definitions not attempted because of the failure.
  pub skipped: Vec<SkippedSoftware>,
}

impl RunResult {
  pub fn is_success(&self) -> bool {
    self.failed.is_none() && self.skipped.is_empty()
  }

  pub fn total(&self) -> usize {
    self.built.len() + self.failed.iter().count() + self.skipped.len()
  }

  pub fn cached_count(&self) -> usize {
    self.built.iter().filter(|b| b.cached).count()
  }
}

/// Configuration for build execution.
#[derive(Debug, Clone)]
pub struct ExecuteConfig {
  /// Where sources are unpacked (`<source_dir>/<name>`).
  pub source_dir: PathBuf,

  /// Where downloads are cached (`<cache_dir>/downloads`).
  pub cache_dir: PathBuf,

  /// Maximum run time of a single build step.
  pub command_timeout: Duration,

  /// Shell to use for command execution.
  /// If None, uses /bin/sh (Unix) or powershell.exe (Windows).
  pub shell: Option<String>,
}

impl Default for ExecuteConfig {
  fn default() -> Self {
    let cache = cache_dir();
    Self {
      source_dir: cache.join("src"),
      cache_dir: cache,
      command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
      shell: None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn built(name: &str, cached: bool) -> BuildResult {
    BuildResult {
      name: name.to_string(),
      version: "1.0".to_string(),
      hash: ObjectHash("abc123".to_string()),
      project_dir: PathBuf::from("/src").join(name),
      cached,
      step_outputs: vec![],
    }
  }

  #[test]
  fn run_result_success_when_empty() {
    let result = RunResult::default();
    assert!(result.is_success());
    assert_eq!(result.total(), 0);
  }

  #[test]
  fn run_result_counts_cached() {
    let result = RunResult {
      built: vec![built("python3", true), built("setuptools3", false)],
      ..Default::default()
    };
    assert!(result.is_success());
    assert_eq!(result.total(), 2);
    assert_eq!(result.cached_count(), 1);
  }

  #[test]
  fn run_result_failure() {
    let result = RunResult {
      built: vec![built("python3", false)],
      failed: Some((
        "setuptools3".to_string(),
        ExecuteError::CmdFailed {
          cmd: "python3 bootstrap.py".to_string(),
          code: Some(1),
        },
      )),
      skipped: vec![],
    };
    assert!(!result.is_success());
    assert_eq!(result.total(), 2);
  }

  #[test]
  fn step_failure_exposes_exit_code() {
    let err = ExecuteError::StepFailed {
      software: "setuptools3".to_string(),
      index: 1,
      source: Box::new(ExecuteError::CmdFailed {
        cmd: "python3 setup.py install".to_string(),
        code: Some(2),
      }),
    };
    assert_eq!(err.exit_code(), Some(2));
    assert_eq!(err.failed_command(), Some("python3 setup.py install"));
    assert_eq!(
      err.to_string(),
      "setuptools3: build step 1 failed: command failed with exit code Some(2): python3 setup.py install"
    );
  }

  #[test]
  fn timeout_message_is_human_readable() {
    let err = ExecuteError::CmdTimeout {
      cmd: "sleep 10".to_string(),
      timeout: Duration::from_secs(90),
    };
    assert_eq!(err.to_string(), "command timed out after 1m 30s: sleep 10");
  }

  #[test]
  fn execute_config_default_timeout() {
    let config = ExecuteConfig::default();
    assert_eq!(config.command_timeout, Duration::from_secs(3600));
    assert!(config.shell.is_none());
    assert!(config.source_dir.starts_with(&config.cache_dir));
  }
}
