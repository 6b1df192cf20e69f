//! Implementation of the `softdef plan` command.
//!
//! Resolves the target and its dependencies and prints them in build order,
//! without fetching or running anything.

use anyhow::{Context, Result};

use softdef_lib::execute::plan;

use super::show::print_resolved;
use super::{GlobalOpts, TargetArgs, build_context, load_config, load_registry};

use crate::output::print_json;

pub fn cmd_plan(global: &GlobalOpts, args: &TargetArgs) -> Result<()> {
  let config = load_config(global, Some(args))?;
  let registry = load_registry(&config)?;
  let ctx = build_context(&config, args)?;

  let planned = plan(&registry, &args.name, &ctx).with_context(|| format!("Failed to plan {}", args.name))?;

  if args.output.is_json() {
    return print_json(&planned);
  }

  println!("Plan: {} ({} to build)", args.name, planned.len());
  println!("Install dir: {}", ctx.install_dir.display());
  for resolved in &planned {
    println!();
    print_resolved(resolved);
  }

  Ok(())
}
