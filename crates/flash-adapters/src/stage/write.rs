// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write stage: streams the decoded image into the device node in
//! `block_size` chunks, hashing as it goes so verify never re-reads the
//! source image.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use flash_core::error::JobErrorKind;
use flash_core::job::StageOutcome;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use crate::image_source;
use crate::stage::runner::{ProgressReport, ProgressSink, StageContext, StageRunner};

pub struct WriteRunner {
    pub block_size: usize,
    pub timeout: Duration,
}

impl WriteRunner {
    pub fn new(block_size: usize, timeout: Duration) -> Self {
        Self { block_size, timeout }
    }
}

#[async_trait]
impl StageRunner for WriteRunner {
    async fn run(&self, ctx: &StageContext, sink: &dyn ProgressSink) -> StageOutcome {
        match tokio::time::timeout(self.timeout, self.write_once(ctx, sink)).await {
            Ok(outcome) => outcome,
            Err(_elapsed) => StageOutcome::Failure(JobErrorKind::StageTimeout(self.timeout)),
        }
    }
}

impl WriteRunner {
    async fn write_once(&self, ctx: &StageContext, sink: &dyn ProgressSink) -> StageOutcome {
        let mut device = match tokio::fs::OpenOptions::new()
            .write(true)
            .open(&ctx.device_path)
            .await
        {
            Ok(f) => f,
            Err(e) => return StageOutcome::Failure(JobErrorKind::WriteIoError(e.to_string())),
        };

        let mut rx = image_source::open(&ctx.image, self.block_size);
        let mut hasher = Sha256::new();
        let mut bytes_done: u64 = 0;
        let started = Instant::now();

        loop {
            if ctx.cancel.is_cancelled() {
                return StageOutcome::Cancelled;
            }
            let chunk = tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => return StageOutcome::Cancelled,
                chunk = rx.recv() => chunk,
            };
            let Some(chunk) = chunk else { break };
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => return StageOutcome::Failure(JobErrorKind::ImageReadError(e.to_string())),
            };
            hasher.update(&chunk);
            if let Err(e) = device.write_all(&chunk).await {
                return StageOutcome::Failure(JobErrorKind::WriteIoError(e.to_string()));
            }
            bytes_done += chunk.len() as u64;

            let elapsed = started.elapsed().as_secs_f64();
            let speed_bps = if elapsed > 0.0 {
                Some(bytes_done as f64 / elapsed)
            } else {
                None
            };
            sink.progress(ProgressReport {
                bytes_done,
                total_bytes: ctx.image.uncompressed_bytes,
                speed_bps,
            });
        }

        if let Err(e) = device.flush().await {
            return StageOutcome::Failure(JobErrorKind::WriteIoError(e.to_string()));
        }
        if let Err(e) = device.sync_all().await {
            return StageOutcome::Failure(JobErrorKind::WriteIoError(e.to_string()));
        }

        let digest = format!("{:x}", hasher.finalize());
        ctx.digest_cache.lock().insert(ctx.image.path.clone(), digest);
        sink.log(format!("wrote {bytes_done} bytes to {}", ctx.device_path));
        StageOutcome::Success
    }
}

#[cfg(test)]
#[path = "write_tests.rs"]
mod tests;
