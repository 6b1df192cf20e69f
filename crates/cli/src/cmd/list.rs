use anyhow::Result;
use serde::Serialize;

use super::{GlobalOpts, load_config, load_registry};
use crate::output::{OutputFormat, print_info, print_json, symbols};

#[derive(Serialize)]
struct ListEntry<'a> {
  name: &'a str,
  default_version: &'a str,
  license: &'a str,
  dependencies: &'a [String],
}

pub fn cmd_list(global: &GlobalOpts, output: OutputFormat) -> Result<()> {
  let config = load_config(global, None)?;
  let registry = load_registry(&config)?;

  let entries: Vec<_> = registry
    .definitions()
    .map(|def| ListEntry {
      name: &def.name,
      default_version: &def.default_version,
      license: &def.license,
      dependencies: &def.dependencies,
    })
    .collect();

  if output.is_json() {
    return print_json(&entries);
  }

  if entries.is_empty() {
    print_info("No software definitions found.");
    return Ok(());
  }

  println!("Software ({}):", entries.len());
  for entry in &entries {
    let deps = if entry.dependencies.is_empty() {
      String::new()
    } else {
      format!(" (depends on {})", entry.dependencies.join(", "))
    };
    println!(
      "  {} {} {} [{}]{}",
      symbols::INFO,
      entry.name,
      entry.default_version,
      entry.license,
      deps
    );
  }

  Ok(())
}
