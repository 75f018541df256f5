//! Subprocess runner.
//!
//! Async subprocess execution with captured output and a hard timeout, used by
//! the process, container and GPU probes and by action triggers.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::timeout;

use crate::error::{Result, WatchError};

/// Default timeout for probe commands.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Output from a command.
#[derive(Debug)]
pub struct CliOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CliOutput {
    /// Check if command succeeded (exit code 0).
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Non-empty trimmed stdout lines.
    #[must_use]
    pub fn stdout_lines(&self) -> Vec<String> {
        self.stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Run a command with timeout.
///
/// # Errors
///
/// Returns error if:
/// - Command not found
/// - Command times out (the child is killed)
/// - Command fails to execute
pub async fn run_command(program: &str, args: &[&str], timeout_duration: Duration) -> Result<CliOutput> {
    run_command_in(program, args, None, timeout_duration).await
}

/// Run a command with timeout in an optional working directory.
///
/// # Errors
///
/// Same as [`run_command`].
pub async fn run_command_in(
    program: &str,
    args: &[&str],
    cwd: Option<&Path>,
    timeout_duration: Duration,
) -> Result<CliOutput> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let mut child = command.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            WatchError::ToolNotFound {
                name: program.to_string(),
            }
        } else {
            WatchError::unavailable(program, e)
        }
    })?;

    let result = timeout(timeout_duration, async {
        // Drain both pipes concurrently; a child blocked on a full pipe would
        // otherwise never exit.
        let stdout_handle = async {
            let mut stdout = String::new();
            if let Some(mut out) = child.stdout.take() {
                out.read_to_string(&mut stdout).await?;
            }
            Ok::<_, std::io::Error>(stdout)
        };

        let stderr_handle = async {
            let mut stderr = String::new();
            if let Some(mut err) = child.stderr.take() {
                err.read_to_string(&mut stderr).await?;
            }
            Ok::<_, std::io::Error>(stderr)
        };

        let (stdout_result, stderr_result) = tokio::join!(stdout_handle, stderr_handle);
        let stdout = stdout_result?;
        let stderr = stderr_result?;

        let status = child.wait().await?;

        Ok::<_, std::io::Error>(CliOutput {
            stdout,
            stderr,
            exit_code: status.code().unwrap_or(-1),
        })
    })
    .await;

    match result {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(WatchError::unavailable(program, e)),
        Err(_) => {
            let _ = child.kill().await;
            let _ = child.wait().await;
            Err(WatchError::Timeout(timeout_duration.as_secs()))
        }
    }
}
