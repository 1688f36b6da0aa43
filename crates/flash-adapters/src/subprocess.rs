// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancellable external-command execution shared by every stage runner that
//! shells out (expand, resize, eject). Write and verify stay in-process and
//! never go through here.

use std::process::ExitStatus;
use std::time::Duration;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// How long a killed child is given to exit after SIGTERM before SIGKILL,
/// per spec §5 ("graceful-then-forceful, ≤2s").
pub const GRACE_PERIOD: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum SubprocessError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to wait on {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with status {status}")]
    NonZeroExit { program: String, status: ExitStatus },
    #[error("cancelled while running {program}")]
    Cancelled { program: String },
}

impl SubprocessError {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            SubprocessError::NonZeroExit { status, .. } => status.code(),
            _ => None,
        }
    }
}

/// Run `cmd` to completion, or terminate it if `cancel` fires first.
/// Stdout is captured and returned on success. Only one of the two select
/// branches ever touches `child` mutably (`wait`, not `wait_with_output`,
/// which would consume it by value and make the cancel branch unable to
/// signal it), so this is safe under the borrow checker without unsafe
/// tricks.
pub async fn run_cancellable(
    program: &str,
    mut cmd: Command,
    cancel: &CancellationToken,
) -> Result<Vec<u8>, SubprocessError> {
    use tokio::io::AsyncReadExt;

    cmd.kill_on_drop(true);
    cmd.stdout(std::process::Stdio::piped());
    let mut child = cmd.spawn().map_err(|source| SubprocessError::Spawn {
        program: program.to_string(),
        source,
    })?;
    let mut stdout = child.stdout.take();

    let status = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            terminate(&mut child, program).await;
            return Err(SubprocessError::Cancelled { program: program.to_string() });
        }
        status = child.wait() => status.map_err(|source| SubprocessError::Wait {
            program: program.to_string(),
            source,
        })?,
    };

    let mut collected = Vec::new();
    if let Some(mut pipe) = stdout.take() {
        let _ = pipe.read_to_end(&mut collected).await;
    }

    if status.success() {
        Ok(collected)
    } else {
        Err(SubprocessError::NonZeroExit {
            program: program.to_string(),
            status,
        })
    }
}

/// Send SIGTERM, wait up to [`GRACE_PERIOD`], then SIGKILL if it's still
/// alive. Best-effort: a process that vanishes mid-signal is not an error.
async fn terminate(child: &mut tokio::process::Child, program: &str) {
    if let Some(raw_pid) = child.id() {
        let pid = Pid::from_raw(raw_pid as i32);
        let _ = signal::kill(pid, Signal::SIGTERM);
        match tokio::time::timeout(GRACE_PERIOD, child.wait()).await {
            Ok(_) => {}
            Err(_elapsed) => {
                tracing::warn!(program, pid = raw_pid, "grace period expired, sending SIGKILL");
                let _ = signal::kill(pid, Signal::SIGKILL);
                let _ = child.wait().await;
            }
        }
    } else {
        let _ = child.kill().await;
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
