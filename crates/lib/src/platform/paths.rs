use crate::consts::APP_NAME;
use std::path::{Path, PathBuf};

/// Returns the default install root for a project.
#[cfg(windows)]
pub fn default_install_dir() -> PathBuf {
  let drive = std::env::var("SYSTEMDRIVE").unwrap_or_else(|_| "C:".to_string());
  PathBuf::from(format!("{}\\", drive)).join("opt").join(APP_NAME)
}

/// Returns the default install root for a project.
#[cfg(not(windows))]
pub fn default_install_dir() -> PathBuf {
  PathBuf::from("/opt").join(APP_NAME)
}

/// Returns the user's home directory
#[cfg(windows)]
pub fn home_dir() -> PathBuf {
  std::env::var("USERPROFILE").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("."))
}

/// Returns the user's home directory
#[cfg(not(windows))]
pub fn home_dir() -> PathBuf {
  std::env::var("HOME").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("."))
}

/// Returns the directory for configuration files for the application
#[cfg(windows)]
pub fn config_dir() -> PathBuf {
  std::env::var("APPDATA")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join("AppData").join("Roaming"))
    .join(APP_NAME)
}

/// Returns the directory for configuration files for the application
#[cfg(not(windows))]
pub fn config_dir() -> PathBuf {
  let config_home = std::env::var("XDG_CONFIG_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".config"));
  config_home.join(APP_NAME)
}

/// Returns the directory for cache files (downloads, unpacked sources)
#[cfg(windows)]
pub fn cache_dir() -> PathBuf {
  std::env::var("LOCALAPPDATA")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join("AppData").join("Local"))
    .join(APP_NAME)
    .join("Cache")
}

/// Returns the directory for cache files (downloads, unpacked sources)
#[cfg(not(windows))]
pub fn cache_dir() -> PathBuf {
  let cache_home = std::env::var("XDG_CACHE_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".cache"));
  cache_home.join(APP_NAME)
}

/// Render a path with Windows separators.
///
/// Forward slashes become backslashes and trailing separators are dropped,
/// except on a bare drive root such as `C:\`.
pub fn windows_safe_path(path: &Path) -> String {
  let converted = path.to_string_lossy().replace('/', "\\");
  let trimmed = converted.trim_end_matches('\\');
  if trimmed.is_empty() || trimmed.ends_with(':') {
    format!("{}\\", trimmed)
  } else {
    trimmed.to_string()
  }
}

/// Render a path with Unix separators, dropping trailing separators.
pub fn unix_path(path: &Path) -> String {
  let rendered = path.to_string_lossy();
  let trimmed = rendered.trim_end_matches('/');
  if trimmed.is_empty() {
    "/".to_string()
  } else {
    trimmed.to_string()
  }
}
