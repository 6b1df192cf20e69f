//! Build execution.
//!
//! Turns a target name into an ordered, resolved plan and builds it:
//!
//! 1. Compute the dependency order from the [`Registry`]
//! 2. Resolve every definition for the [`BuildContext`]
//! 3. Build each definition in order, stopping at the first failure
//!
//! Builds are sequential; a failure records every remaining definition as
//! skipped. Each build is keyed on its dependencies' build hashes, so a
//! rebuilt dependency also rebuilds its dependents.
//!
//! # Submodules
//!
//! - [`build`] - single definition build and completion markers
//! - [`cmd`] - build step execution
//! - [`extract`] - source archive extraction
//! - [`fetch`] - source download and checksum verification

pub mod build;
pub mod cmd;
pub mod extract;
pub mod fetch;
mod types;

pub use types::*;

use std::collections::BTreeMap;

use tracing::{error, info};

use crate::registry::Registry;
use crate::software::{BuildContext, ResolvedSoftware, resolve};
use crate::util::hash::ObjectHash;

/// Resolve the target and its dependencies, dependencies first.
///
/// The context's version override applies to the target only; dependencies
/// use their default versions.
pub fn plan(registry: &Registry, target: &str, ctx: &BuildContext) -> Result<Vec<ResolvedSoftware>, ExecuteError> {
  let order = registry.build_order(target)?;
  let dependency_ctx = BuildContext {
    version: None,
    ..ctx.clone()
  };

  order
    .into_iter()
    .map(|def| {
      let def_ctx = if def.name == target { ctx } else { &dependency_ctx };
      resolve(def, def_ctx).map_err(ExecuteError::from)
    })
    .collect()
}

/// Build the target and everything it depends on.
///
/// Planning errors (unknown software, missing dependency, cycles, template
/// errors) are returned as `Err`; build failures are reported in the
/// [`RunResult`].
pub async fn run(
  registry: &Registry,
  target: &str,
  ctx: &BuildContext,
  config: &ExecuteConfig,
) -> Result<RunResult, ExecuteError> {
  let planned = plan(registry, target, ctx)?;
  info!(target = %target, count = planned.len(), platform = %ctx.platform, "starting build");

  let mut result = RunResult::default();
  let mut build_hashes: BTreeMap<&str, ObjectHash> = BTreeMap::new();
  let mut remaining = planned.iter();

  for resolved in remaining.by_ref() {
    let dependencies: BTreeMap<String, ObjectHash> = resolved
      .dependencies
      .iter()
      .filter_map(|dep| build_hashes.get(dep.as_str()).map(|hash| (dep.clone(), hash.clone())))
      .collect();

    match build::build_software(resolved, &dependencies, ctx, config).await {
      Ok(built) => {
        build_hashes.insert(resolved.name.as_str(), built.hash.clone());
        result.built.push(built);
      }
      Err(e) => {
        error!(name = %resolved.name, error = %e, "build failed");
        result.failed = Some((resolved.name.clone(), e));
        break;
      }
    }
  }

  if let Some((failed_name, _)) = &result.failed {
    for resolved in remaining {
      result.skipped.push(SkippedSoftware {
        name: resolved.name.clone(),
        failed_dependency: failed_name.clone(),
      });
    }
  }

  Ok(result)
}
