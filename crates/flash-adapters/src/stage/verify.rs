// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Verify stage: reads back the device prefix written in the Write stage
//! and compares its digest against the one cached then, per spec §4.3
//! ("hash the image once... and hash the device as it is read"). Never
//! re-decodes the source image — that would decompress it a second time
//! for no benefit, since the digest already captures it exactly.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use flash_core::error::JobErrorKind;
use flash_core::job::StageOutcome;
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use crate::stage::runner::{ProgressReport, ProgressSink, StageContext, StageRunner};

pub struct VerifyRunner {
    pub block_size: usize,
    pub timeout: Duration,
}

impl VerifyRunner {
    pub fn new(block_size: usize, timeout: Duration) -> Self {
        Self { block_size, timeout }
    }
}

#[async_trait]
impl StageRunner for VerifyRunner {
    async fn run(&self, ctx: &StageContext, sink: &dyn ProgressSink) -> StageOutcome {
        match tokio::time::timeout(self.timeout, self.verify_once(ctx, sink)).await {
            Ok(outcome) => outcome,
            Err(_elapsed) => StageOutcome::Failure(JobErrorKind::StageTimeout(self.timeout)),
        }
    }
}

impl VerifyRunner {
    async fn verify_once(&self, ctx: &StageContext, sink: &dyn ProgressSink) -> StageOutcome {
        let mut device = match tokio::fs::File::open(&ctx.device_path).await {
            Ok(f) => f,
            Err(e) => return StageOutcome::Failure(JobErrorKind::VerifyIoError(e.to_string())),
        };

        let total_bytes = ctx.bytes_written.or(ctx.image.uncompressed_bytes);
        let mut hasher = Sha256::new();
        let mut offset: u64 = 0;
        let started = Instant::now();
        let mut buf = vec![0u8; self.block_size];

        loop {
            if total_bytes.is_some_and(|total| offset >= total) {
                break;
            }
            let want = match total_bytes {
                Some(total) => self.block_size.min((total - offset) as usize),
                None => self.block_size,
            };

            let read = tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => return StageOutcome::Cancelled,
                read = device.read(&mut buf[..want]) => read,
            };
            let n = match read {
                Ok(n) => n,
                Err(e) => return StageOutcome::Failure(JobErrorKind::VerifyIoError(e.to_string())),
            };
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            offset += n as u64;

            let elapsed = started.elapsed().as_secs_f64();
            let speed_bps = if elapsed > 0.0 {
                Some(offset as f64 / elapsed)
            } else {
                None
            };
            sink.progress(ProgressReport {
                bytes_done: offset,
                total_bytes,
                speed_bps,
            });
        }

        if total_bytes.is_some_and(|total| offset < total) {
            return StageOutcome::Failure(JobErrorKind::VerifyIoError(format!(
                "device yielded only {offset} of {} expected bytes",
                total_bytes.unwrap_or_default()
            )));
        }

        let computed = format!("{:x}", hasher.finalize());
        match ctx.digest_cache.lock().get(&ctx.image.path) {
            Some(cached) if *cached == computed => {
                sink.log(format!("verified {offset} bytes against {}", ctx.device_path));
                StageOutcome::Success
            }
            Some(_) => {
                sink.log(format!(
                    "verify mismatch: device digest does not match image digest after {offset} bytes"
                ));
                StageOutcome::Failure(JobErrorKind::VerifyMismatch { offset })
            }
            None => StageOutcome::Failure(JobErrorKind::Internal(
                "verify ran with no cached digest from the write stage".to_string(),
            )),
        }
    }
}

#[cfg(test)]
#[path = "verify_tests.rs"]
mod tests;
