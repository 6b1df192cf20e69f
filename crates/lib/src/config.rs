//! Engine configuration.
//!
//! Settings are layered: built-in defaults, then a TOML file, then
//! `SOFTDEF_*` environment variables. The CLI applies its flags last.
//!
//! ```toml
//! install_dir = "/opt/datadog-agent"
//! cache_dir = "/var/cache/softdef"
//! software_dirs = ["config/software"]
//! platform = "linux"
//! command_timeout = "1h"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::consts::{CONFIG_FILE_NAME, DEFAULT_COMMAND_TIMEOUT_SECS};
use crate::execute::ExecuteConfig;
use crate::platform::paths::{cache_dir, config_dir, default_install_dir};
use crate::platform::{Os, UnknownOs};
use crate::software::BuildContext;

pub const ENV_INSTALL_DIR: &str = "SOFTDEF_INSTALL_DIR";
pub const ENV_SOURCE_DIR: &str = "SOFTDEF_SOURCE_DIR";
pub const ENV_CACHE_DIR: &str = "SOFTDEF_CACHE_DIR";
pub const ENV_PLATFORM: &str = "SOFTDEF_PLATFORM";
pub const ENV_COMMAND_TIMEOUT: &str = "SOFTDEF_COMMAND_TIMEOUT";

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config: {0}")]
  Parse(#[from] toml::de::Error),

  #[error(transparent)]
  Platform(#[from] UnknownOs),

  #[error("invalid duration '{value}': {source}")]
  Duration {
    value: String,
    #[source]
    source: humantime::DurationError,
  },

  #[error("host platform is not supported; set `platform` explicitly")]
  UnsupportedHost,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
  install_dir: Option<PathBuf>,
  source_dir: Option<PathBuf>,
  cache_dir: Option<PathBuf>,
  software_dirs: Option<Vec<PathBuf>>,
  platform: Option<String>,
  command_timeout: Option<String>,
  shell: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
  pub install_dir: PathBuf,
  /// Explicit source directory; `None` means `<cache_dir>/src`.
  pub source_dir: Option<PathBuf>,
  pub cache_dir: PathBuf,
  /// Directories of `*.toml` definitions loaded on top of the built-ins.
  pub software_dirs: Vec<PathBuf>,
  /// Target platform; `None` means the host.
  pub platform: Option<Os>,
  pub command_timeout: Duration,
  pub shell: Option<String>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      install_dir: default_install_dir(),
      source_dir: None,
      cache_dir: cache_dir(),
      software_dirs: Vec::new(),
      platform: None,
      command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
      shell: None,
    }
  }
}

fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
  humantime::parse_duration(value).map_err(|source| ConfigError::Duration {
    value: value.to_string(),
    source,
  })
}

impl Config {
  /// Load configuration.
  ///
  /// An explicit `path` must exist. Without one, `<config_dir>/softdef.toml`
  /// is used if present. Environment overrides are applied afterwards.
  pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
    let mut config = Self::default();

    let file_path = match path {
      Some(p) => Some(p.to_path_buf()),
      None => Some(config_dir().join(CONFIG_FILE_NAME)).filter(|p| p.exists()),
    };

    if let Some(file_path) = file_path {
      debug!(path = ?file_path, "loading config");
      let content = std::fs::read_to_string(&file_path).map_err(|source| ConfigError::Read {
        path: file_path.clone(),
        source,
      })?;
      let file: ConfigFile = toml::from_str(&content)?;
      config.apply_file(file, file_path.parent())?;
    }

    config.apply_env()?;
    Ok(config)
  }

  /// Parse configuration text on top of the defaults, without environment overrides.
  pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
    let mut config = Self::default();
    let file: ConfigFile = toml::from_str(content)?;
    config.apply_file(file, None)?;
    Ok(config)
  }

  /// Relative `software_dirs` are taken relative to `base` (the config file's directory).
  fn apply_file(&mut self, file: ConfigFile, base: Option<&Path>) -> Result<(), ConfigError> {
    if let Some(install_dir) = file.install_dir {
      self.install_dir = install_dir;
    }
    if let Some(cache_dir) = file.cache_dir {
      self.cache_dir = cache_dir;
    }
    if let Some(source_dir) = file.source_dir {
      self.source_dir = Some(source_dir);
    }
    if let Some(dirs) = file.software_dirs {
      self.software_dirs = dirs
        .into_iter()
        .map(|dir| match base {
          Some(base) if dir.is_relative() => base.join(dir),
          _ => dir,
        })
        .collect();
    }
    if let Some(platform) = file.platform {
      self.platform = Some(platform.parse()?);
    }
    if let Some(timeout) = file.command_timeout {
      self.command_timeout = parse_duration(&timeout)?;
    }
    if let Some(shell) = file.shell {
      self.shell = Some(shell);
    }
    Ok(())
  }

  /// Apply `SOFTDEF_*` environment overrides.
  pub fn apply_env(&mut self) -> Result<(), ConfigError> {
    if let Ok(value) = std::env::var(ENV_INSTALL_DIR) {
      self.install_dir = PathBuf::from(value);
    }
    if let Ok(value) = std::env::var(ENV_CACHE_DIR) {
      self.cache_dir = PathBuf::from(value);
    }
    if let Ok(value) = std::env::var(ENV_SOURCE_DIR) {
      self.source_dir = Some(PathBuf::from(value));
    }
    if let Ok(value) = std::env::var(ENV_PLATFORM) {
      self.platform = Some(value.parse()?);
    }
    if let Ok(value) = std::env::var(ENV_COMMAND_TIMEOUT) {
      self.command_timeout = parse_duration(&value)?;
    }
    Ok(())
  }

  /// Where sources are unpacked: the explicit directory from any layer, or
  /// `src` under the effective cache directory.
  pub fn source_dir(&self) -> PathBuf {
    self
      .source_dir
      .clone()
      .unwrap_or_else(|| self.cache_dir.join("src"))
  }

  /// The target platform: the configured one, or the host.
  pub fn target_platform(&self) -> Result<Os, ConfigError> {
    self.platform.or_else(Os::current).ok_or(ConfigError::UnsupportedHost)
  }

  pub fn build_context(&self) -> Result<BuildContext, ConfigError> {
    Ok(BuildContext::new(self.target_platform()?, self.install_dir.clone()))
  }

  pub fn execute_config(&self) -> ExecuteConfig {
    ExecuteConfig {
      source_dir: self.source_dir(),
      cache_dir: self.cache_dir.clone(),
      command_timeout: self.command_timeout,
      shell: self.shell.clone(),
    }
  }
}
