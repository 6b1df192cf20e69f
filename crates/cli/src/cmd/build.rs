//! Implementation of the `softdef build` command.
//!
//! Builds the target and its dependencies in order. A failed build prints the
//! failing software, step, command and exit code and exits non-zero.

use anyhow::{Context, Result, anyhow};
use serde::Serialize;

use softdef_lib::execute::{ExecuteError, RunResult, run};

use super::{GlobalOpts, TargetArgs, build_context, load_config, load_registry};
use crate::output::{print_error, print_json, print_stat, print_success, print_warning, truncate_hash};

#[derive(Serialize)]
struct BuiltEntry<'a> {
  name: &'a str,
  version: &'a str,
  hash: &'a str,
  cached: bool,
}

#[derive(Serialize)]
struct FailureEntry<'a> {
  software: &'a str,
  step: Option<usize>,
  command: Option<&'a str>,
  exit_code: Option<i32>,
  error: String,
}

#[derive(Serialize)]
struct BuildOutput<'a> {
  success: bool,
  built: Vec<BuiltEntry<'a>>,
  failed: Option<FailureEntry<'a>>,
  skipped: Vec<&'a str>,
}

fn failure_entry<'a>(software: &'a str, err: &'a ExecuteError) -> FailureEntry<'a> {
  let step = match err {
    ExecuteError::StepFailed { index, .. } => Some(*index),
    _ => None,
  };
  FailureEntry {
    software,
    step,
    command: err.failed_command(),
    exit_code: err.exit_code(),
    error: err.to_string(),
  }
}

pub fn cmd_build(global: &GlobalOpts, args: &TargetArgs) -> Result<()> {
  let config = load_config(global, Some(args))?;
  let registry = load_registry(&config)?;
  let ctx = build_context(&config, args)?;
  let exec_config = config.execute_config();

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let result = rt
    .block_on(run(&registry, &args.name, &ctx, &exec_config))
    .with_context(|| format!("Failed to build {}", args.name))?;

  if args.output.is_json() {
    print_json(&build_output(&result))?;
  } else {
    print_summary(&result);
  }

  match &result.failed {
    Some((name, _)) => Err(anyhow!("Build of {} failed at {}", args.name, name)),
    None => Ok(()),
  }
}

fn build_output(result: &RunResult) -> BuildOutput<'_> {
  BuildOutput {
    success: result.is_success(),
    built: result
      .built
      .iter()
      .map(|b| BuiltEntry {
        name: &b.name,
        version: &b.version,
        hash: &b.hash.0,
        cached: b.cached,
      })
      .collect(),
    failed: result.failed.as_ref().map(|(name, err)| failure_entry(name, err)),
    skipped: result.skipped.iter().map(|s| s.name.as_str()).collect(),
  }
}

fn print_summary(result: &RunResult) {
  for built in &result.built {
    let state = if built.cached { "cached" } else { "built" };
    print_success(&format!(
      "{} {} ({}, {})",
      built.name,
      built.version,
      state,
      truncate_hash(&built.hash.0)
    ));
  }

  if let Some((name, err)) = &result.failed {
    let failure = failure_entry(name, err);
    print_error(&format!("{} failed", failure.software));
    if let Some(step) = failure.step {
      eprintln!("  step: {}", step + 1);
    }
    if let Some(command) = failure.command {
      eprintln!("  command: {}", command);
    }
    if let Some(code) = failure.exit_code {
      eprintln!("  exit code: {}", code);
    }
    eprintln!("  error: {}", failure.error);
  }

  for skipped in &result.skipped {
    print_warning(&format!(
      "{} skipped ({} failed)",
      skipped.name, skipped.failed_dependency
    ));
  }

  println!();
  print_stat("Built", &(result.built.len() - result.cached_count()).to_string());
  print_stat("Cached", &result.cached_count().to_string());
  if !result.is_success() {
    print_stat("Skipped", &result.skipped.len().to_string());
  }
}
