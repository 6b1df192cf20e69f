//! Build step execution.
//!
//! Runs a single shell command inside the project directory, with a
//! deadline.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info};

use crate::consts::SOURCE_DATE_EPOCH;
use crate::execute::types::ExecuteError;

/// Execute a build step.
///
/// The command inherits the caller's environment, gets
/// `SOURCE_DATE_EPOCH` set for reproducible timestamps, and then has the
/// step's own variables merged on top.
///
/// # Arguments
///
/// * `cmd` - The command string to execute
/// * `env` - Optional step-specific environment variables
/// * `cwd` - Working directory
/// * `timeout` - Maximum run time; the process is killed when exceeded
/// * `shell` - Shell override (defaults to /bin/sh on Unix, powershell.exe on Windows)
///
/// # Returns
///
/// The stdout of the command on success (trimmed).
pub async fn execute_cmd(
  cmd: &str,
  env: Option<&BTreeMap<String, String>>,
  cwd: &Path,
  timeout: Duration,
  shell: Option<&str>,
) -> Result<String, ExecuteError> {
  info!(cmd = %cmd, "executing command");

  let (shell_cmd, shell_args) = get_shell(shell);

  let mut command = Command::new(&shell_cmd);
  command
    .args(&shell_args)
    .arg(cmd)
    .current_dir(cwd)
    .env("SOURCE_DATE_EPOCH", SOURCE_DATE_EPOCH)
    .kill_on_drop(true);

  if let Some(step_env) = env {
    for (key, value) in step_env {
      command.env(key, value);
    }
  }

  debug!(shell = %shell_cmd, working_dir = ?cwd, "spawning process");

  let output = match tokio::time::timeout(timeout, command.output()).await {
    Ok(output) => output?,
    Err(_) => {
      return Err(ExecuteError::CmdTimeout {
        cmd: cmd.to_string(),
        timeout,
      });
    }
  };

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    if !stderr.is_empty() {
      debug!(stderr = %stderr, "command stderr");
    }
    if !stdout.is_empty() {
      debug!(stdout = %stdout, "command stdout");
    }

    return Err(ExecuteError::CmdFailed {
      cmd: cmd.to_string(),
      code: output.status.code(),
    });
  }

  let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();

  if !stdout.is_empty() {
    debug!(stdout = %stdout, "command output");
  }

  Ok(stdout)
}

/// Get the shell command and arguments for the current platform.
///
/// An explicit override picks its argument style from the shell name:
/// PowerShell gets `-NoProfile -ExecutionPolicy Bypass -Command`, cmd gets
/// `/C`, anything else is treated as a POSIX shell taking `-c`.
fn get_shell(override_shell: Option<&str>) -> (String, Vec<String>) {
  let powershell_args = || {
    vec![
      "-NoProfile".to_string(),
      "-ExecutionPolicy".to_string(),
      "Bypass".to_string(),
      "-Command".to_string(),
    ]
  };

  if let Some(shell) = override_shell {
    let args = if shell.contains("powershell") || shell.contains("pwsh") {
      powershell_args()
    } else if shell.contains("cmd") {
      vec!["/C".to_string()]
    } else {
      vec!["-c".to_string()]
    };
    return (shell.to_string(), args);
  }

  if cfg!(windows) {
    ("powershell.exe".to_string(), powershell_args())
  } else {
    ("/bin/sh".to_string(), vec!["-c".to_string()])
  }
}
