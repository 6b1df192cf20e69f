//! License shipping.
//!
//! Every built definition leaves a record of its license in the install
//! directory: a short text file under `LICENSES/` and an entry in
//! `license.json`, which lists all shipped software sorted by name.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::info;

use crate::consts::{LICENSE_MANIFEST, LICENSES_DIR};
use crate::software::ResolvedSoftware;

#[derive(Debug, Error)]
pub enum LicenseError {
  #[error("failed to write {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("malformed license manifest {path}: {source}")]
  Manifest {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseEntry {
  pub name: String,
  pub version: String,
  pub license: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub source_url: Option<String>,
  pub skip_transitive_dependency_licensing: bool,
}

impl From<&ResolvedSoftware> for LicenseEntry {
  fn from(resolved: &ResolvedSoftware) -> Self {
    Self {
      name: resolved.name.clone(),
      version: resolved.version.clone(),
      license: resolved.license.clone(),
      source_url: resolved.source.as_ref().map(|s| s.url.clone()),
      skip_transitive_dependency_licensing: resolved.skip_transitive_dependency_licensing,
    }
  }
}

impl LicenseEntry {
  /// File name of the text record under `LICENSES/`.
  pub fn file_name(&self) -> String {
    format!("{}-{}", self.name, self.license)
      .chars()
      .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
      .collect()
  }

  fn render(&self) -> String {
    let mut text = format!("name: {}\nversion: {}\nlicense: {}\n", self.name, self.version, self.license);
    if let Some(url) = &self.source_url {
      text.push_str(&format!("source: {}\n", url));
    }
    if self.skip_transitive_dependency_licensing {
      text.push_str("transitive dependency licensing: skipped\n");
    }
    text
  }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LicenseManifest {
  licenses: Vec<LicenseEntry>,
}

/// Read `license.json` from an install directory.
///
/// A missing manifest is an empty list.
pub fn read_manifest(install_dir: &Path) -> Result<Vec<LicenseEntry>, LicenseError> {
  let path = install_dir.join(LICENSE_MANIFEST);
  if !path.exists() {
    return Ok(Vec::new());
  }

  let content = std::fs::read_to_string(&path).map_err(|source| LicenseError::Read {
    path: path.clone(),
    source,
  })?;
  let manifest: LicenseManifest =
    serde_json::from_str(&content).map_err(|source| LicenseError::Manifest { path, source })?;
  Ok(manifest.licenses)
}

/// Record a shipped license in the install directory.
///
/// Returns the path of the text record.
pub async fn ship_license(install_dir: &Path, entry: &LicenseEntry) -> Result<PathBuf, LicenseError> {
  let write_err = |path: &Path| {
    let path = path.to_path_buf();
    move |source| LicenseError::Write { path, source }
  };

  let licenses_dir = install_dir.join(LICENSES_DIR);
  fs::create_dir_all(&licenses_dir).await.map_err(write_err(&licenses_dir))?;

  let record_path = licenses_dir.join(entry.file_name());
  fs::write(&record_path, entry.render())
    .await
    .map_err(write_err(&record_path))?;

  let mut licenses = read_manifest(install_dir)?;
  licenses.retain(|existing| existing.name != entry.name);
  licenses.push(entry.clone());
  licenses.sort_by(|a, b| a.name.cmp(&b.name));

  let manifest_path = install_dir.join(LICENSE_MANIFEST);
  let json = serde_json::to_string_pretty(&LicenseManifest { licenses }).map_err(|source| LicenseError::Manifest {
    path: manifest_path.clone(),
    source,
  })?;
  fs::write(&manifest_path, format!("{}\n", json))
    .await
    .map_err(write_err(&manifest_path))?;

  info!(name = %entry.name, license = %entry.license, "shipped license");
  Ok(record_path)
}
