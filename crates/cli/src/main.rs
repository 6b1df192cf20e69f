mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::{GlobalOpts, TargetArgs, cmd_build, cmd_info, cmd_list, cmd_plan, cmd_show};
use output::OutputFormat;

/// softdef - build software from declarative definitions
#[derive(Parser)]
#[command(name = "softdef")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Path to a softdef.toml configuration file
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Additional directory of *.toml software definitions (repeatable)
  #[arg(long = "software-dir", global = true)]
  software_dirs: Vec<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Show platform and effective directories
  Info {
    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// List known software definitions
  List {
    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// Show a definition resolved for the target platform
  Show(TargetArgs),

  /// Show the build order with resolved commands
  Plan(TargetArgs),

  /// Build a definition and its dependencies
  Build(TargetArgs),
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let filter = if cli.verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let global = GlobalOpts {
    config: cli.config,
    software_dirs: cli.software_dirs,
  };

  match cli.command {
    Commands::Info { output } => cmd_info(&global, output),
    Commands::List { output } => cmd_list(&global, output),
    Commands::Show(args) => cmd_show(&global, &args),
    Commands::Plan(args) => cmd_plan(&global, &args),
    Commands::Build(args) => cmd_build(&global, &args),
  }
}
