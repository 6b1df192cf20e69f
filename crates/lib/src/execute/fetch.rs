//! Source fetching.
//!
//! This module handles downloading source archives with SHA256 verification.
//! Downloads stream to a `.part` file while hashing; the file only takes its
//! final name once the checksum matches.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::execute::types::ExecuteError;
use crate::util::hash::{hash_bytes, hash_file};

/// Length of the URL hash prefix in cached file names.
const URL_PREFIX_LEN: usize = 12;

/// Fetch a source archive into the download cache.
///
/// Downloads the file from `url` into `cache_dir/downloads/`, verifies the
/// SHA256 hash, and returns the path to the downloaded file. A cached file
/// with the expected hash is reused without touching the network.
///
/// # Arguments
///
/// * `url` - The URL to download from
/// * `expected_sha256` - The expected SHA256 hash (lowercase hex)
/// * `cache_dir` - The download cache root
pub async fn fetch(url: &str, expected_sha256: &str, cache_dir: &Path) -> Result<PathBuf, ExecuteError> {
  info!(url = %url, "fetching source");

  let downloads_dir = cache_dir.join("downloads");
  fs::create_dir_all(&downloads_dir).await?;

  let filename = url_to_filename(url);
  let dest_path = downloads_dir.join(&filename);

  if dest_path.exists() {
    debug!(path = ?dest_path, "checking cached file");
    if let Ok(actual) = hash_file(&dest_path) {
      let actual_hash = actual.0;
      if actual_hash == expected_sha256 {
        info!(path = ?dest_path, "using cached file");
        return Ok(dest_path);
      }
      debug!(expected = %expected_sha256, actual = %actual_hash, "cached file hash mismatch, re-downloading");
    }
  }

  let partial_path = downloads_dir.join(format!("{}.part", filename));
  let (actual_hash, size) = match download(url, &partial_path).await {
    Ok(done) => done,
    Err(e) => {
      discard(&partial_path).await;
      return Err(e);
    }
  };

  if actual_hash != expected_sha256 {
    discard(&partial_path).await;
    return Err(ExecuteError::HashMismatch {
      url: url.to_string(),
      expected: expected_sha256.to_string(),
      actual: actual_hash,
    });
  }

  fs::rename(&partial_path, &dest_path).await?;
  info!(path = ?dest_path, size, "download complete");

  Ok(dest_path)
}

/// Stream `url` into `path`, returning the hex SHA256 and size of the body.
async fn download(url: &str, path: &Path) -> Result<(String, u64), ExecuteError> {
  let fetch_failed = |message: String| ExecuteError::FetchFailed {
    url: url.to_string(),
    message,
  };

  let mut response = reqwest::get(url).await.map_err(|e| fetch_failed(e.to_string()))?;

  if !response.status().is_success() {
    return Err(fetch_failed(format!("HTTP {}", response.status())));
  }

  let mut file = fs::File::create(path).await?;
  let mut hasher = Sha256::new();
  let mut size = 0u64;

  while let Some(chunk) = response.chunk().await.map_err(|e| fetch_failed(e.to_string()))? {
    hasher.update(&chunk);
    file.write_all(&chunk).await?;
    size += chunk.len() as u64;
  }
  file.flush().await?;

  Ok((hex::encode(hasher.finalize()), size))
}

async fn discard(path: &Path) {
  match fs::remove_file(path).await {
    Ok(()) => {}
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
    Err(e) => warn!(path = ?path, error = %e, "failed to remove partial download"),
  }
}

/// Convert a URL to a safe filename.
///
/// Takes the last path component, sanitizes it, and prefixes it with a short
/// hash of the full URL so archives that share a name (GitHub's
/// `archive/v<version>.tar.gz`) do not collide. Falls back to a hash of the
/// URL if no suitable filename can be extracted.
pub fn url_to_filename(url: &str) -> String {
  if let Some(filename) = url.rsplit('/').next() {
    let filename = filename.split('?').next().unwrap_or(filename);

    let sanitized: String = filename
      .chars()
      .map(|c| {
        if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
          c
        } else {
          '_'
        }
      })
      .collect();

    if !sanitized.is_empty() && sanitized != "." && sanitized != ".." {
      return format!("{}-{}", &hash_bytes(url.as_bytes()).0[..URL_PREFIX_LEN], sanitized);
    }
  }

  format!("download_{}", &hash_bytes(url.as_bytes()).0[..16])
}
