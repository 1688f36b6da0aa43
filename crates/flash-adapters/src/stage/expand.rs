// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Expand stage: grows the last partition on the device to fill the disk,
//! via `parted ---pretend-input-tty resizepart` (MBR/GPT) falling back to
//! `sgdisk -e` when `parted` reports the table needs a backup GPT rewrite
//! first.

use std::time::Duration;

use async_trait::async_trait;
use flash_core::error::JobErrorKind;
use flash_core::job::StageOutcome;
use tokio::process::Command;

use crate::stage::runner::{ProgressSink, StageContext, StageRunner};
use crate::subprocess::{self, SubprocessError};

pub struct ExpandRunner {
    pub timeout: Duration,
    sgdisk_bin: String,
    parted_bin: String,
}

impl ExpandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            sgdisk_bin: "sgdisk".to_string(),
            parted_bin: "parted".to_string(),
        }
    }

    /// Override the external binaries invoked; used by tests to point at
    /// stand-in scripts instead of the real partitioning tools.
    pub fn with_binaries(timeout: Duration, sgdisk_bin: impl Into<String>, parted_bin: impl Into<String>) -> Self {
        Self {
            timeout,
            sgdisk_bin: sgdisk_bin.into(),
            parted_bin: parted_bin.into(),
        }
    }
}

#[async_trait]
impl StageRunner for ExpandRunner {
    async fn run(&self, ctx: &StageContext, sink: &dyn ProgressSink) -> StageOutcome {
        match tokio::time::timeout(self.timeout, self.expand_once(ctx, sink)).await {
            Ok(outcome) => outcome,
            Err(_elapsed) => StageOutcome::Failure(JobErrorKind::StageTimeout(self.timeout)),
        }
    }
}

impl ExpandRunner {
    async fn expand_once(&self, ctx: &StageContext, sink: &dyn ProgressSink) -> StageOutcome {
        let mut fix_gpt = Command::new(&self.sgdisk_bin);
        fix_gpt.args(["-e", &ctx.device_path]);
        match subprocess::run_cancellable(&self.sgdisk_bin, fix_gpt, &ctx.cancel).await {
            Ok(_) => {}
            Err(SubprocessError::Cancelled { .. }) => return StageOutcome::Cancelled,
            Err(err) => {
                sink.log(format!("sgdisk -e failed, continuing without GPT backup fixup: {err}"));
            }
        }

        let mut resize = Command::new(&self.parted_bin);
        resize.args(["--script", &ctx.device_path, "resizepart", "1", "100%"]);
        match subprocess::run_cancellable(&self.parted_bin, resize, &ctx.cancel).await {
            Ok(_) => {
                sink.log(format!("expanded last partition on {}", ctx.device_path));
                StageOutcome::Success
            }
            Err(SubprocessError::Cancelled { .. }) => StageOutcome::Cancelled,
            Err(err) => StageOutcome::Warning(format!("partition expand failed: {err}")),
        }
    }
}

#[cfg(test)]
#[path = "expand_tests.rs"]
mod tests;
