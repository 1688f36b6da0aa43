// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resize stage: grows the filesystem on the (already expanded) last
//! partition to fill it. Dispatches on filesystem type: `resize2fs` for
//! ext2/3/4, `btrfs filesystem resize max` for btrfs.

use std::time::Duration;

use async_trait::async_trait;
use flash_core::error::JobErrorKind;
use flash_core::job::StageOutcome;
use tokio::process::Command;

use crate::stage::runner::{ProgressSink, StageContext, StageRunner};
use crate::subprocess::{self, SubprocessError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilesystemKind {
    Ext,
    Btrfs,
    Unknown,
}

pub struct ResizeRunner {
    pub timeout: Duration,
    pub filesystem: FilesystemKind,
    resize2fs_bin: String,
    btrfs_bin: String,
}

impl ResizeRunner {
    pub fn new(timeout: Duration, filesystem: FilesystemKind) -> Self {
        Self {
            timeout,
            filesystem,
            resize2fs_bin: "resize2fs".to_string(),
            btrfs_bin: "btrfs".to_string(),
        }
    }

    pub fn with_binaries(
        timeout: Duration,
        filesystem: FilesystemKind,
        resize2fs_bin: impl Into<String>,
        btrfs_bin: impl Into<String>,
    ) -> Self {
        Self {
            timeout,
            filesystem,
            resize2fs_bin: resize2fs_bin.into(),
            btrfs_bin: btrfs_bin.into(),
        }
    }
}

#[async_trait]
impl StageRunner for ResizeRunner {
    async fn run(&self, ctx: &StageContext, sink: &dyn ProgressSink) -> StageOutcome {
        match tokio::time::timeout(self.timeout, self.resize_once(ctx, sink)).await {
            Ok(outcome) => outcome,
            Err(_elapsed) => StageOutcome::Failure(JobErrorKind::StageTimeout(self.timeout)),
        }
    }
}

impl ResizeRunner {
    async fn resize_once(&self, ctx: &StageContext, sink: &dyn ProgressSink) -> StageOutcome {
        let partition = format!("{}1", ctx.device_path);
        let result = match self.filesystem {
            FilesystemKind::Ext => {
                let mut cmd = Command::new(&self.resize2fs_bin);
                cmd.arg(&partition);
                subprocess::run_cancellable(&self.resize2fs_bin, cmd, &ctx.cancel).await
            }
            FilesystemKind::Btrfs => {
                let mut cmd = Command::new(&self.btrfs_bin);
                cmd.args(["filesystem", "resize", "max", &partition]);
                subprocess::run_cancellable(&self.btrfs_bin, cmd, &ctx.cancel).await
            }
            FilesystemKind::Unknown => {
                return StageOutcome::Warning(format!(
                    "unrecognized filesystem on {partition}, skipping resize"
                ));
            }
        };

        match result {
            Ok(_) => {
                sink.log(format!("resized filesystem on {partition}"));
                StageOutcome::Success
            }
            Err(SubprocessError::Cancelled { .. }) => StageOutcome::Cancelled,
            Err(err) => StageOutcome::Warning(format!("filesystem resize failed: {err}")),
        }
    }
}

#[cfg(test)]
#[path = "resize_tests.rs"]
mod tests;
