mod build;
mod info;
mod list;
mod plan;
mod show;

pub use build::cmd_build;
pub use info::cmd_info;
pub use list::cmd_list;
pub use plan::cmd_plan;
pub use show::cmd_show;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::debug;

use softdef_lib::config::Config;
use softdef_lib::platform::Os;
use softdef_lib::registry::Registry;
use softdef_lib::software::BuildContext;

use crate::output::OutputFormat;

/// Options shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalOpts {
  pub config: Option<PathBuf>,
  pub software_dirs: Vec<PathBuf>,
}

/// Arguments of commands that operate on one software definition.
#[derive(Debug, Clone, Args)]
pub struct TargetArgs {
  /// Software name (e.g. setuptools3)
  pub name: String,

  /// Version to build instead of the definition's default
  #[arg(long = "version", value_name = "VERSION")]
  pub software_version: Option<String>,

  /// Target platform: linux, darwin or windows (default: host)
  #[arg(long)]
  pub platform: Option<String>,

  /// Install directory (overrides config)
  #[arg(long)]
  pub install_dir: Option<PathBuf>,

  /// Output format
  #[arg(short, long, value_enum, default_value_t)]
  pub output: OutputFormat,
}

/// Load configuration and apply command line overrides.
pub fn load_config(global: &GlobalOpts, target: Option<&TargetArgs>) -> Result<Config> {
  let mut config = Config::load(global.config.as_deref()).context("Failed to load configuration")?;
  config.software_dirs.extend(global.software_dirs.iter().cloned());

  if let Some(target) = target {
    if let Some(platform) = &target.platform {
      let os = platform
        .parse::<Os>()
        .with_context(|| format!("Invalid --platform: {}", platform))?;
      config.platform = Some(os);
    }
    if let Some(install_dir) = &target.install_dir {
      config.install_dir = install_dir.clone();
    }
  }

  debug!(?config, "effective configuration");
  Ok(config)
}

/// Built-in definitions plus every configured software directory.
pub fn load_registry(config: &Config) -> Result<Registry> {
  let mut registry = Registry::with_builtins().context("Failed to load built-in definitions")?;
  for dir in &config.software_dirs {
    registry
      .load_dir(dir)
      .with_context(|| format!("Failed to load definitions from {}", dir.display()))?;
  }
  Ok(registry)
}

pub fn build_context(config: &Config, target: &TargetArgs) -> Result<BuildContext> {
  let ctx = config.build_context().context("Failed to determine target platform")?;
  Ok(match &target.software_version {
    Some(version) => ctx.with_version(version),
    None => ctx,
  })
}
