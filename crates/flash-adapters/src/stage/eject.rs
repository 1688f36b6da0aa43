// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Eject stage: attempts `udisksctl power-off`; on failure, downgrades to
//! `udisksctl unmount` and surfaces a warning rather than failing the job,
//! per spec §4.3.

use std::time::Duration;

use async_trait::async_trait;
use flash_core::job::StageOutcome;
use tokio::process::Command;

use crate::stage::runner::{ProgressSink, StageContext, StageRunner};
use crate::subprocess::{self, SubprocessError};

pub struct EjectRunner {
    pub timeout: Duration,
    udisksctl_bin: String,
}

impl EjectRunner {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            udisksctl_bin: "udisksctl".to_string(),
        }
    }

    pub fn with_binary(timeout: Duration, udisksctl_bin: impl Into<String>) -> Self {
        Self {
            timeout,
            udisksctl_bin: udisksctl_bin.into(),
        }
    }
}

#[async_trait]
impl StageRunner for EjectRunner {
    async fn run(&self, ctx: &StageContext, sink: &dyn ProgressSink) -> StageOutcome {
        match tokio::time::timeout(self.timeout, self.eject_once(ctx, sink)).await {
            Ok(outcome) => outcome,
            Err(_elapsed) => StageOutcome::Warning(format!(
                "eject timed out after {:?}, device may still be powered",
                self.timeout
            )),
        }
    }
}

impl EjectRunner {
    async fn eject_once(&self, ctx: &StageContext, sink: &dyn ProgressSink) -> StageOutcome {
        let mut power_off = Command::new(&self.udisksctl_bin);
        power_off.args(["power-off", "-b", &ctx.device_path]);
        match subprocess::run_cancellable(&self.udisksctl_bin, power_off, &ctx.cancel).await {
            Ok(_) => {
                sink.log(format!("powered off {}", ctx.device_path));
                return StageOutcome::Success;
            }
            Err(SubprocessError::Cancelled { .. }) => return StageOutcome::Cancelled,
            Err(err) => sink.log(format!("power-off failed, falling back to unmount: {err}")),
        }

        let mut unmount = Command::new(&self.udisksctl_bin);
        unmount.args(["unmount", "-b", &ctx.device_path]);
        match subprocess::run_cancellable(&self.udisksctl_bin, unmount, &ctx.cancel).await {
            Ok(_) => StageOutcome::Warning(format!(
                "{} was unmounted but could not be powered off; safe to remove",
                ctx.device_path
            )),
            Err(SubprocessError::Cancelled { .. }) => StageOutcome::Cancelled,
            Err(err) => StageOutcome::Warning(format!(
                "could not unmount or power off {}: {err}",
                ctx.device_path
            )),
        }
    }
}

#[cfg(test)]
#[path = "eject_tests.rs"]
mod tests;
