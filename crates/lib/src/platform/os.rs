use std::fmt;
use std::str::FromStr;

/// Operating system variants a definition can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
  Linux,
  #[serde(rename = "darwin")]
  MacOs,
  Windows,
}

/// Error returned when a platform name is not recognized
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown platform '{0}' (expected linux, darwin or windows)")]
pub struct UnknownOs(pub String);

impl Os {
  /// Detect the current operating system at runtime
  pub fn current() -> Option<Self> {
    match std::env::consts::OS {
      "linux" => Some(Self::Linux),
      "macos" => Some(Self::MacOs),
      "windows" => Some(Self::Windows),
      _ => None,
    }
  }

  /// Returns the lowercase string identifier for this OS
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Linux => "linux",
      Self::MacOs => "darwin",
      Self::Windows => "windows",
    }
  }

  pub fn is_windows(&self) -> bool {
    matches!(self, Self::Windows)
  }

  /// Key of the per-platform variable table a definition uses on this OS.
  ///
  /// Windows gets its own table, every other platform shares `default`.
  pub fn vars_key(&self) -> &'static str {
    if self.is_windows() { "windows" } else { "default" }
  }
}

impl fmt::Display for Os {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for Os {
  type Err = UnknownOs;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "linux" => Ok(Self::Linux),
      "darwin" | "macos" | "mac_os_x" => Ok(Self::MacOs),
      "windows" => Ok(Self::Windows),
      other => Err(UnknownOs(other.to_string())),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn current_returns_supported_os() {
    assert!(Os::current().is_some(), "Current OS should be supported");
  }

  #[test]
  fn macos_uses_darwin_identifier() {
    assert_eq!(Os::MacOs.as_str(), "darwin");
  }

  #[test]
  fn parses_known_names() {
    assert_eq!("linux".parse::<Os>().unwrap(), Os::Linux);
    assert_eq!("Darwin".parse::<Os>().unwrap(), Os::MacOs);
    assert_eq!("macos".parse::<Os>().unwrap(), Os::MacOs);
    assert_eq!("windows".parse::<Os>().unwrap(), Os::Windows);
  }

  #[test]
  fn rejects_unknown_names() {
    assert_eq!("solaris".parse::<Os>(), Err(UnknownOs("solaris".to_string())));
  }

  #[test]
  fn only_windows_has_its_own_vars_table() {
    assert_eq!(Os::Windows.vars_key(), "windows");
    assert_eq!(Os::Linux.vars_key(), "default");
    assert_eq!(Os::MacOs.vars_key(), "default");
  }
}
