//! Test utilities for softdef-lib.
//!
//! Cross-platform command strings for tests that run build steps, and
//! helpers that produce small source archives.

use std::io::Write;
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;

/// Returns a command that prints an environment variable.
#[cfg(unix)]
pub fn echo_env(var: &str) -> String {
  format!("echo ${}", var)
}

#[cfg(windows)]
pub fn echo_env(var: &str) -> String {
  format!("Write-Output $env:{}", var)
}

/// Returns a command that appends a line to a file.
#[cfg(unix)]
pub fn append_line(file: &Path, line: &str) -> String {
  format!("echo {} >> '{}'", line, file.display())
}

#[cfg(windows)]
pub fn append_line(file: &Path, line: &str) -> String {
  format!("Add-Content -Path '{}' -Value '{}'", file.display(), line)
}

/// Returns a command that creates an empty file in the current directory.
#[cfg(unix)]
pub fn touch(filename: &str) -> String {
  format!("touch {}", filename)
}

#[cfg(windows)]
pub fn touch(filename: &str) -> String {
  format!("New-Item -ItemType File -Path '{}' -Force | Out-Null", filename)
}

/// Build a gzip-compressed tarball from `(path, contents)` pairs.
pub fn tar_gz_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
  let encoder = GzEncoder::new(Vec::new(), Compression::default());
  let mut builder = tar::Builder::new(encoder);

  for (path, contents) in entries {
    let mut header = tar::Header::new_gnu();
    header.set_size(contents.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, path, contents.as_bytes()).unwrap();
  }

  builder.into_inner().unwrap().finish().unwrap()
}

/// Build a zip archive from `(path, contents)` pairs.
pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
  let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));

  for (path, contents) in entries {
    writer
      .start_file(*path, zip::write::SimpleFileOptions::default())
      .unwrap();
    writer.write_all(contents.as_bytes()).unwrap();
  }

  writer.finish().unwrap().into_inner()
}
