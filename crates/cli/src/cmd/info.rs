use anyhow::Result;
use serde::Serialize;

use softdef_lib::platform::platform_name;

use super::{GlobalOpts, load_config};
use crate::output::{OutputFormat, print_json, print_stat, print_warning};

#[derive(Serialize)]
struct InfoOutput {
  host_platform: Option<&'static str>,
  target_platform: Option<String>,
  install_dir: String,
  source_dir: String,
  cache_dir: String,
  software_dirs: Vec<String>,
  command_timeout: String,
}

pub fn cmd_info(global: &GlobalOpts, output: OutputFormat) -> Result<()> {
  let config = load_config(global, None)?;

  let info = InfoOutput {
    host_platform: platform_name(),
    target_platform: config.target_platform().ok().map(|os| os.to_string()),
    install_dir: config.install_dir.display().to_string(),
    source_dir: config.source_dir().display().to_string(),
    cache_dir: config.cache_dir.display().to_string(),
    software_dirs: config.software_dirs.iter().map(|d| d.display().to_string()).collect(),
    command_timeout: humantime::format_duration(config.command_timeout).to_string(),
  };

  if output.is_json() {
    return print_json(&info);
  }

  println!("System:");
  match info.host_platform {
    Some(name) => print_stat("Platform", name),
    None => print_warning("Could not detect platform."),
  }
  if let Some(target) = &info.target_platform {
    print_stat("Target", target);
  }
  println!();
  println!("Directories:");
  print_stat("Install", &info.install_dir);
  print_stat("Sources", &info.source_dir);
  print_stat("Cache", &info.cache_dir);
  for dir in &info.software_dirs {
    print_stat("Software", dir);
  }
  println!();
  print_stat("Command timeout", &info.command_timeout);

  Ok(())
}
