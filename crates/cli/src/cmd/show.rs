//! Implementation of the `softdef show` command.
//!
//! Resolves a single definition for the target platform and prints it,
//! without checking that its dependencies are defined.

use anyhow::{Context, Result, bail};

use softdef_lib::software::{ResolvedSoftware, resolve};

use super::{GlobalOpts, TargetArgs, build_context, load_config, load_registry};
use crate::output::{print_json, print_stat, print_step, truncate_hash};

pub fn cmd_show(global: &GlobalOpts, args: &TargetArgs) -> Result<()> {
  let config = load_config(global, Some(args))?;
  let registry = load_registry(&config)?;
  let ctx = build_context(&config, args)?;

  let Some(def) = registry.get(&args.name) else {
    bail!("Unknown software: {}", args.name);
  };
  let resolved = resolve(def, &ctx).with_context(|| format!("Failed to resolve {}", args.name))?;

  if args.output.is_json() {
    return print_json(&resolved);
  }

  print_resolved(&resolved);
  Ok(())
}

pub(super) fn print_resolved(resolved: &ResolvedSoftware) {
  println!("{} {} ({})", resolved.name, resolved.version, resolved.platform);
  print_stat("License", &resolved.license);
  if resolved.skip_transitive_dependency_licensing {
    print_stat("Transitive licensing", "skipped");
  }
  if !resolved.dependencies.is_empty() {
    print_stat("Dependencies", &resolved.dependencies.join(", "));
  }
  if let Some(source) = &resolved.source {
    print_stat("Source", &source.url);
    print_stat("SHA256", &source.sha256);
    print_stat("Extract", source.extract.as_str());
  }
  if let Some(rel) = &resolved.relative_path {
    print_stat("Relative path", rel);
  }
  print_stat("Hash", truncate_hash(&resolved.definition_hash.0));

  if !resolved.vars.is_empty() {
    println!("  Vars:");
    for (key, value) in &resolved.vars {
      println!("    {} = {}", key, value);
    }
  }

  println!("  Steps:");
  for (index, step) in resolved.steps.iter().enumerate() {
    print_step(index + 1, &step.command);
  }
}
