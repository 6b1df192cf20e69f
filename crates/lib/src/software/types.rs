use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::hash::{Hashable, is_sha256_hex};

use super::template::{self, TemplateError};

/// License tag used when a definition does not declare one.
pub const UNSPECIFIED_LICENSE: &str = "Unspecified";

/// How a downloaded source archive is unpacked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractMethod {
  /// Native tar (optionally gzip-compressed) or zip, chosen by file extension.
  #[default]
  Tar,
  /// 7-Zip on Windows, native extraction elsewhere.
  SevenZip,
  /// Native zip.
  Zip,
}

impl ExtractMethod {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Tar => "tar",
      Self::SevenZip => "seven_zip",
      Self::Zip => "zip",
    }
  }
}

/// Where the source for a definition comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSpec {
  /// URL template, usually embedding `%{version}`.
  pub url: String,
  /// Expected SHA-256 of the downloaded archive (lowercase hex).
  pub sha256: String,
  #[serde(default)]
  pub extract: ExtractMethod,
}

/// A single shell command run during the build.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildStep {
  pub command: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub env: Option<BTreeMap<String, String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub cwd: Option<String>,
}

impl BuildStep {
  pub fn new(command: &str) -> Self {
    Self {
      command: command.to_string(),
      env: None,
      cwd: None,
    }
  }

  pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
    self.env = Some(env);
    self
  }

  pub fn with_cwd(mut self, cwd: &str) -> Self {
    self.cwd = Some(cwd.to_string());
    self
  }
}

impl From<&str> for BuildStep {
  fn from(command: &str) -> Self {
    BuildStep::new(command)
  }
}

/// Per-platform variable tables.
///
/// `windows` applies when targeting Windows, `default` everywhere else.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformVars {
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub windows: BTreeMap<String, String>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub default: BTreeMap<String, String>,
}

impl PlatformVars {
  /// The table selected by a [`crate::platform::Os::vars_key`] value.
  pub fn table(&self, key: &str) -> &BTreeMap<String, String> {
    if key == "windows" { &self.windows } else { &self.default }
  }
}

fn default_license() -> String {
  UNSPECIFIED_LICENSE.to_string()
}

/// A declarative recipe for fetching, verifying and installing one piece of software.
///
/// Definitions are static data: they are loaded once and never mutated;
/// [`super::resolve`] produces a concrete, platform-specific view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SoftwareDef {
  pub name: String,
  pub default_version: String,
  #[serde(default = "default_license")]
  pub license: String,
  #[serde(default)]
  pub skip_transitive_dependency_licensing: bool,
  #[serde(default)]
  pub dependencies: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub relative_path: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source: Option<SourceSpec>,
  #[serde(default)]
  pub vars: PlatformVars,
  #[serde(default)]
  pub build: Vec<BuildStep>,
}

impl Hashable for SoftwareDef {}

/// Errors raised while loading or validating a definition.
#[derive(Debug, Error)]
pub enum DefinitionError {
  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse definition: {0}")]
  Parse(#[from] toml::de::Error),

  #[error("invalid software name: '{0}'")]
  InvalidName(String),

  #[error("{name}: default_version must not be empty")]
  EmptyVersion { name: String },

  #[error("{name}: sha256 must be 64 lowercase hex characters, got '{sha256}'")]
  InvalidChecksum { name: String, sha256: String },

  #[error("{name}: cannot depend on itself")]
  SelfDependency { name: String },

  #[error("{name}: dependency '{dependency}' listed more than once")]
  DuplicateDependency { name: String, dependency: String },

  #[error("{name}: build step {index} has an empty command")]
  EmptyCommand { name: String, index: usize },

  #[error("{name}: invalid template in {field}: {source}")]
  Template {
    name: String,
    field: String,
    #[source]
    source: TemplateError,
  },
}

pub(crate) fn is_valid_software_name(name: &str) -> bool {
  !name.is_empty()
    && name
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

impl SoftwareDef {
  /// Parse and validate a definition from TOML text.
  pub fn from_toml_str(content: &str) -> Result<Self, DefinitionError> {
    let def: SoftwareDef = toml::from_str(content)?;
    def.validate()?;
    Ok(def)
  }

  /// Read, parse and validate a definition file.
  pub fn from_file(path: &Path) -> Result<Self, DefinitionError> {
    let content = std::fs::read_to_string(path).map_err(|source| DefinitionError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_toml_str(&content)
  }

  /// Check structural invariants that do not depend on a build context.
  pub fn validate(&self) -> Result<(), DefinitionError> {
    if !is_valid_software_name(&self.name) {
      return Err(DefinitionError::InvalidName(self.name.clone()));
    }
    let name = || self.name.clone();

    if self.default_version.trim().is_empty() {
      return Err(DefinitionError::EmptyVersion { name: name() });
    }

    let mut seen = Vec::with_capacity(self.dependencies.len());
    for dependency in &self.dependencies {
      if dependency == &self.name {
        return Err(DefinitionError::SelfDependency { name: name() });
      }
      if seen.contains(&dependency) {
        return Err(DefinitionError::DuplicateDependency {
          name: name(),
          dependency: dependency.clone(),
        });
      }
      seen.push(dependency);
    }

    if let Some(source) = &self.source {
      if !is_sha256_hex(&source.sha256) {
        return Err(DefinitionError::InvalidChecksum {
          name: name(),
          sha256: source.sha256.clone(),
        });
      }
      self.check_template("source.url", &source.url)?;
    }

    if let Some(relative_path) = &self.relative_path {
      self.check_template("relative_path", relative_path)?;
    }

    for (key, value) in self.vars.windows.iter().chain(self.vars.default.iter()) {
      self.check_template(&format!("vars.{}", key), value)?;
    }

    for (index, step) in self.build.iter().enumerate() {
      if step.command.trim().is_empty() {
        return Err(DefinitionError::EmptyCommand { name: name(), index });
      }
      self.check_template(&format!("build[{}].command", index), &step.command)?;
      for (key, value) in step.env.iter().flatten() {
        self.check_template(&format!("build[{}].env.{}", index, key), value)?;
      }
      if let Some(cwd) = &step.cwd {
        self.check_template(&format!("build[{}].cwd", index), cwd)?;
      }
    }

    Ok(())
  }

  fn check_template(&self, field: &str, value: &str) -> Result<(), DefinitionError> {
    template::parse(value).map(|_| ()).map_err(|source| DefinitionError::Template {
      name: self.name.clone(),
      field: field.to_string(),
      source,
    })
  }
}
