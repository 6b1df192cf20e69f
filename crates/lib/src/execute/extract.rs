//! Source archive extraction.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use flate2::read::GzDecoder;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info};

use crate::execute::types::ExecuteError;
use crate::software::ExtractMethod;

/// Archive container formats understood by the native extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
  TarGz,
  Tar,
  Zip,
}

impl ArchiveKind {
  /// Detect the format from the file name.
  pub fn detect(path: &Path) -> Option<Self> {
    let name = path.file_name()?.to_string_lossy().to_ascii_lowercase();
    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
      Some(Self::TarGz)
    } else if name.ends_with(".tar") {
      Some(Self::Tar)
    } else if name.ends_with(".zip") {
      Some(Self::Zip)
    } else {
      None
    }
  }
}

/// Unpack `archive` into `dest`.
///
/// `dest` is removed first so every build starts from a fresh source tree.
/// `seven_zip` uses 7-Zip on Windows and the native extractor elsewhere;
/// each 7-Zip pass is bounded by `timeout`.
pub async fn extract(
  archive: &Path,
  method: ExtractMethod,
  dest: &Path,
  timeout: Duration,
) -> Result<(), ExecuteError> {
  let kind = match (ArchiveKind::detect(archive), method) {
    (Some(kind), _) => kind,
    (None, ExtractMethod::Zip) => ArchiveKind::Zip,
    (None, _) => return Err(ExecuteError::UnsupportedArchive(archive.to_path_buf())),
  };

  if fs::try_exists(dest).await? {
    debug!(path = ?dest, "removing previous source tree");
    fs::remove_dir_all(dest).await?;
  }
  fs::create_dir_all(dest).await?;

  info!(archive = ?archive, dest = ?dest, method = method.as_str(), "extracting source");

  if method == ExtractMethod::SevenZip && cfg!(windows) {
    return extract_seven_zip(archive, kind, dest, timeout).await;
  }

  let archive_path = archive.to_path_buf();
  let dest_path = dest.to_path_buf();
  tokio::task::spawn_blocking(move || extract_native(&archive_path, kind, &dest_path))
    .await
    .map_err(|e| ExecuteError::ExtractFailed {
      path: archive.to_path_buf(),
      message: e.to_string(),
    })?
}

fn extract_native(archive: &Path, kind: ArchiveKind, dest: &Path) -> Result<(), ExecuteError> {
  let failed = |message: String| ExecuteError::ExtractFailed {
    path: archive.to_path_buf(),
    message,
  };

  let file = std::fs::File::open(archive)?;
  match kind {
    ArchiveKind::TarGz => tar::Archive::new(GzDecoder::new(file))
      .unpack(dest)
      .map_err(|e| failed(e.to_string())),
    ArchiveKind::Tar => tar::Archive::new(file).unpack(dest).map_err(|e| failed(e.to_string())),
    ArchiveKind::Zip => {
      let mut zip = zip::ZipArchive::new(file).map_err(|e| failed(e.to_string()))?;
      zip.extract(dest).map_err(|e| failed(e.to_string()))
    }
  }
}

const SEVEN_ZIP: &str = "7z.exe";

/// Scratch directory under the destination for the intermediate tarball.
const SEVEN_ZIP_STAGING: &str = ".softdef-7z";

/// Arguments for `7z x <archive> -o<out_dir> -y`. Each path stays a single
/// argument so no shell quoting is involved.
fn seven_zip_args(archive: &Path, out_dir: &Path) -> Vec<OsString> {
  let mut output = OsString::from("-o");
  output.push(out_dir);
  vec!["x".into(), archive.into(), output, "-y".into()]
}

async fn run_seven_zip(args: Vec<OsString>, cwd: &Path, timeout: Duration) -> Result<(), String> {
  debug!(?args, "running 7-Zip");

  let mut cmd = Command::new(SEVEN_ZIP);
  cmd
    .args(&args)
    .current_dir(cwd)
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .kill_on_drop(true);

  let output = match tokio::time::timeout(timeout, cmd.output()).await {
    Ok(result) => result.map_err(|e| format!("failed to run {}: {}", SEVEN_ZIP, e))?,
    Err(_) => {
      return Err(format!(
        "{} timed out after {}",
        SEVEN_ZIP,
        humantime::format_duration(timeout)
      ));
    }
  };

  if !output.status.success() {
    return Err(format!(
      "{} exited with {}: {}",
      SEVEN_ZIP,
      output.status,
      String::from_utf8_lossy(&output.stderr).trim()
    ));
  }
  Ok(())
}

/// The `.tar` left in `staging` by the first 7-Zip pass.
fn find_staged_tarball(staging: &Path) -> Result<PathBuf, String> {
  let entries = std::fs::read_dir(staging).map_err(|e| e.to_string())?;
  for entry in entries {
    let path = entry.map_err(|e| e.to_string())?.path();
    if ArchiveKind::detect(&path) == Some(ArchiveKind::Tar) {
      return Ok(path);
    }
  }
  Err(format!("no tarball found in {}", staging.display()))
}

/// Extract with 7-Zip. Tarballs take two passes: the `.tar` is unpacked into
/// a staging directory first, then extracted into `dest`.
async fn extract_seven_zip(
  archive: &Path,
  kind: ArchiveKind,
  dest: &Path,
  timeout: Duration,
) -> Result<(), ExecuteError> {
  let failed = |message: String| ExecuteError::ExtractFailed {
    path: archive.to_path_buf(),
    message,
  };

  match kind {
    ArchiveKind::TarGz => {
      let staging = dest.join(SEVEN_ZIP_STAGING);
      run_seven_zip(seven_zip_args(archive, &staging), dest, timeout)
        .await
        .map_err(failed)?;
      let tarball = find_staged_tarball(&staging).map_err(failed)?;
      run_seven_zip(seven_zip_args(&tarball, dest), dest, timeout)
        .await
        .map_err(failed)?;
      fs::remove_dir_all(&staging).await?;
      Ok(())
    }
    ArchiveKind::Tar | ArchiveKind::Zip => run_seven_zip(seven_zip_args(archive, dest), dest, timeout)
      .await
      .map_err(failed),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::util::testutil::{tar_gz_bytes, zip_bytes};
  use tempfile::TempDir;

  const TIMEOUT: Duration = Duration::from_secs(60);

  #[test]
  fn detects_archive_kinds() {
    assert_eq!(ArchiveKind::detect(Path::new("v40.9.0.tar.gz")), Some(ArchiveKind::TarGz));
    assert_eq!(ArchiveKind::detect(Path::new("pkg.TGZ")), Some(ArchiveKind::TarGz));
    assert_eq!(ArchiveKind::detect(Path::new("pkg.tar")), Some(ArchiveKind::Tar));
    assert_eq!(ArchiveKind::detect(Path::new("pkg.zip")), Some(ArchiveKind::Zip));
    assert_eq!(ArchiveKind::detect(Path::new("pkg.rar")), None);
  }

  #[tokio::test]
  async fn extracts_tar_gz() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("v40.9.0.tar.gz");
    std::fs::write(
      &archive,
      tar_gz_bytes(&[("setuptools-40.9.0/bootstrap.py", "print('hi')\n")]),
    )
    .unwrap();

    let dest = temp.path().join("src");
    extract(&archive, ExtractMethod::SevenZip, &dest, TIMEOUT).await.unwrap();

    let content = std::fs::read_to_string(dest.join("setuptools-40.9.0").join("bootstrap.py")).unwrap();
    assert_eq!(content, "print('hi')\n");
  }

  #[tokio::test]
  async fn extracts_zip() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("pkg.zip");
    std::fs::write(&archive, zip_bytes(&[("pkg-1.0/setup.py", "")])).unwrap();

    let dest = temp.path().join("src");
    extract(&archive, ExtractMethod::Zip, &dest, TIMEOUT).await.unwrap();

    assert!(dest.join("pkg-1.0").join("setup.py").exists());
  }

  #[tokio::test]
  async fn replaces_previous_tree() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("pkg.tar.gz");
    std::fs::write(&archive, tar_gz_bytes(&[("pkg/new.txt", "new")])).unwrap();

    let dest = temp.path().join("src");
    std::fs::create_dir_all(dest.join("pkg")).unwrap();
    std::fs::write(dest.join("pkg").join("stale.txt"), "old").unwrap();

    extract(&archive, ExtractMethod::Tar, &dest, TIMEOUT).await.unwrap();

    assert!(dest.join("pkg").join("new.txt").exists());
    assert!(!dest.join("pkg").join("stale.txt").exists());
  }

  #[tokio::test]
  async fn unknown_extension_is_unsupported() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("pkg.rar");
    std::fs::write(&archive, b"rar").unwrap();

    let result = extract(&archive, ExtractMethod::Tar, &temp.path().join("src"), TIMEOUT).await;
    assert!(matches!(result, Err(ExecuteError::UnsupportedArchive(_))));
  }

  #[tokio::test]
  async fn corrupt_archive_reports_extract_failure() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("pkg.tar.gz");
    std::fs::write(&archive, b"not gzip at all").unwrap();

    let result = extract(&archive, ExtractMethod::Tar, &temp.path().join("src"), TIMEOUT).await;
    assert!(matches!(result, Err(ExecuteError::ExtractFailed { .. })));
  }

  #[test]
  fn seven_zip_paths_are_single_arguments() {
    let archive = Path::new(r"C:\Program Files\softdef\downloads\v40.9.0.tar.gz");
    let dest = Path::new(r"C:\softdef cache\src\setuptools3");

    let args = seven_zip_args(archive, dest);

    assert_eq!(
      args,
      vec![
        OsString::from("x"),
        OsString::from(r"C:\Program Files\softdef\downloads\v40.9.0.tar.gz"),
        OsString::from(r"-oC:\softdef cache\src\setuptools3"),
        OsString::from("-y"),
      ]
    );
    assert!(args.iter().all(|arg| !arg.to_string_lossy().contains('"')));
  }

  #[test]
  fn finds_staged_tarball() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("notes.txt"), "").unwrap();
    std::fs::write(temp.path().join("v40.9.0.tar"), "").unwrap();

    assert_eq!(find_staged_tarball(temp.path()).unwrap(), temp.path().join("v40.9.0.tar"));
  }

  #[test]
  fn empty_staging_reports_missing_tarball() {
    let temp = TempDir::new().unwrap();
    let err = find_staged_tarball(temp.path()).unwrap_err();
    assert!(err.contains("no tarball"));
  }
}
