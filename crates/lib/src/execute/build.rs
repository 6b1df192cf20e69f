//! Single software build.
//!
//! Fetches and unpacks the source, runs the build steps in order inside the
//! project directory, ships the license, and records a completion marker so
//! an unchanged definition is not rebuilt.
//!
//! The marker hash covers the resolved definition and the build hashes of its
//! direct dependencies. A rebuilt dependency therefore rebuilds everything that
//! depends on it, transitively.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::consts::STATE_DIR;
use crate::execute::cmd::execute_cmd;
use crate::execute::extract::extract;
use crate::execute::fetch::fetch;
use crate::execute::types::{BuildResult, ExecuteConfig, ExecuteError};
use crate::licensing::{LicenseEntry, ship_license};
use crate::software::{BuildContext, ResolvedSoftware};
use crate::util::hash::{Hashable, ObjectHash};

/// Marker file content written after a successful build.
#[derive(Debug, Serialize, Deserialize)]
pub struct BuildMarker {
  /// Marker format version.
  pub version: u32,
  pub name: String,
  pub software_version: String,
  /// Build hash, see [`build_hash`].
  pub hash: ObjectHash,
}

#[derive(Serialize)]
struct BuildKey<'a> {
  software: &'a ResolvedSoftware,
  dependencies: &'a BTreeMap<String, ObjectHash>,
}

impl Hashable for BuildKey<'_> {}

/// Identity of a build: the resolved definition plus the build hash of each
/// direct dependency, keyed by name.
pub fn build_hash(
  resolved: &ResolvedSoftware,
  dependencies: &BTreeMap<String, ObjectHash>,
) -> Result<ObjectHash, ExecuteError> {
  Ok(
    BuildKey {
      software: resolved,
      dependencies,
    }
    .compute_hash()?,
  )
}

/// Path of the completion marker for `name` under an install directory.
pub fn marker_path(install_dir: &Path, name: &str) -> PathBuf {
  install_dir.join(STATE_DIR).join(format!("{}.json", name))
}

/// Read a completion marker.
///
/// Returns `None` if the marker doesn't exist.
pub fn read_build_marker(path: &Path) -> Result<Option<BuildMarker>, ExecuteError> {
  if !path.exists() {
    return Ok(None);
  }

  let content = std::fs::read_to_string(path).map_err(|e| ExecuteError::Marker { message: e.to_string() })?;
  let marker = serde_json::from_str(&content).map_err(|e| ExecuteError::Marker { message: e.to_string() })?;
  Ok(Some(marker))
}

async fn write_build_marker(path: &Path, marker: &BuildMarker) -> Result<(), ExecuteError> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).await?;
  }
  let content = serde_json::to_string(marker).map_err(|e| ExecuteError::Marker { message: e.to_string() })?;
  fs::write(path, format!("{}\n", content))
    .await
    .map_err(|e| ExecuteError::Marker { message: e.to_string() })
}

/// Build one resolved definition.
///
/// `dependencies` maps each direct dependency to its build hash from this run.
/// Steps run strictly in declared order; the first failing step aborts the
/// build with [`ExecuteError::StepFailed`] and no later step runs.
pub async fn build_software(
  resolved: &ResolvedSoftware,
  dependencies: &BTreeMap<String, ObjectHash>,
  ctx: &BuildContext,
  config: &ExecuteConfig,
) -> Result<BuildResult, ExecuteError> {
  let hash = build_hash(resolved, dependencies)?;
  let software_dir = config.source_dir.join(&resolved.name);
  let project_dir = match &resolved.relative_path {
    Some(rel) => software_dir.join(rel),
    None => software_dir.clone(),
  };

  let marker = marker_path(&ctx.install_dir, &resolved.name);
  match read_build_marker(&marker) {
    Ok(Some(existing)) if existing.hash == hash => {
      info!(name = %resolved.name, version = %resolved.version, "already built, skipping");
      return Ok(BuildResult {
        name: resolved.name.clone(),
        version: resolved.version.clone(),
        hash,
        project_dir,
        cached: true,
        step_outputs: Vec::new(),
      });
    }
    Ok(Some(existing)) => {
      debug!(name = %resolved.name, previous = %existing.hash, current = %hash, "definition or dependencies changed, rebuilding");
    }
    Ok(None) => {}
    Err(e) => {
      warn!(name = %resolved.name, error = %e, "unreadable build marker, rebuilding");
    }
  }

  info!(name = %resolved.name, version = %resolved.version, "building software");

  match &resolved.source {
    Some(source) => {
      let archive = fetch(&source.url, &source.sha256, &config.cache_dir).await?;
      extract(&archive, source.extract, &software_dir, config.command_timeout).await?;
      if !project_dir.is_dir() {
        return Err(ExecuteError::MissingProjectDir(project_dir));
      }
    }
    None => fs::create_dir_all(&project_dir).await?,
  }

  let mut step_outputs = Vec::with_capacity(resolved.steps.len());
  for (index, step) in resolved.steps.iter().enumerate() {
    let cwd = match &step.cwd {
      Some(cwd) => project_dir.join(cwd),
      None => project_dir.clone(),
    };

    let output = execute_cmd(
      &step.command,
      step.env.as_ref(),
      &cwd,
      config.command_timeout,
      config.shell.as_deref(),
    )
    .await
    .map_err(|source| ExecuteError::StepFailed {
      software: resolved.name.clone(),
      index,
      source: Box::new(source),
    })?;

    step_outputs.push(output);
  }

  ship_license(&ctx.install_dir, &LicenseEntry::from(resolved)).await?;

  write_build_marker(
    &marker,
    &BuildMarker {
      version: 1,
      name: resolved.name.clone(),
      software_version: resolved.version.clone(),
      hash: hash.clone(),
    },
  )
  .await?;

  info!(name = %resolved.name, steps = step_outputs.len(), "build complete");

  Ok(BuildResult {
    name: resolved.name.clone(),
    version: resolved.version.clone(),
    hash,
    project_dir,
    cached: false,
    step_outputs,
  })
}
