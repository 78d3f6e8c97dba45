//! The one driver skeleton shared by every subprocess-backed converter:
//! build an argument vector, spawn with the workspace as cwd, pipe stdin,
//! read stdout to completion under a timeout, and fail loud on non-zero.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{ConvertError, ConvertResult};

/// Split a shell-quoted option string the same way the reference worker's
/// `shlex.split` does (an empty/whitespace-only string yields no args).
pub fn shlex_split(s: &str) -> Vec<String> {
    shlex::split(s).unwrap_or_default()
}

/// Run `executable args... <stdin` with `workspace` as cwd, returning
/// stdout on a zero exit and a `NonZeroExit`/`Timeout` error otherwise.
pub async fn run(
    executable: &str,
    args: &[String],
    workspace: &Path,
    stdin: &[u8],
    timeout: Option<Duration>,
) -> ConvertResult<Vec<u8>> {
    tracing::info!(executable, ?args, "spawning converter subprocess");

    let mut child = Command::new(executable)
        .args(args)
        .current_dir(workspace)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ConvertError::Spawn {
            executable: executable.to_string(),
            source,
        })?;

    let mut stdin_pipe = child.stdin.take().expect("stdin was piped");
    let input = stdin.to_vec();
    let write_task = tokio::spawn(async move {
        let _ = stdin_pipe.write_all(&input).await;
        drop(stdin_pipe);
    });

    let wait = child.wait_with_output();
    let output = match timeout {
        Some(d) => tokio::time::timeout(d, wait).await.map_err(|_| {
            ConvertError::Timeout {
                executable: executable.to_string(),
                timeout_secs: d.as_secs(),
            }
        })?,
        None => wait.await,
    }
    .map_err(ConvertError::Io)?;

    let _ = write_task.await;

    if !output.status.success() {
        return Err(ConvertError::NonZeroExit {
            executable: executable.to_string(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(output.stdout)
}
