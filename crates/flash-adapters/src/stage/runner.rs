// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The trait every stage runner implements, and the context/sink types that
//! carry a stage's inputs and progress reporting without pulling the whole
//! `Job` type (and its engine-owned mutation methods) into this crate.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use flash_core::image::Image;
use flash_core::job::StageOutcome;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// SHA-256 digests computed while writing images, keyed by image path, so
/// the verify stage can compare against the bytes actually streamed rather
/// than re-reading and re-hashing the source image a second time.
pub type DigestCache = Arc<Mutex<HashMap<PathBuf, String>>>;

#[derive(Debug, Clone, Copy)]
pub struct ProgressReport {
    pub bytes_done: u64,
    pub total_bytes: Option<u64>,
    pub speed_bps: Option<f64>,
}

/// Where a stage sends progress and log lines as it runs. Implemented by
/// the engine's executor; stage runners never touch the job table or the
/// event bus directly.
pub trait ProgressSink: Send + Sync {
    fn progress(&self, report: ProgressReport);
    fn log(&self, line: String);
}

/// Everything a stage runner needs to do its work, independent of which
/// stage it is.
#[derive(Clone)]
pub struct StageContext {
    pub device_path: String,
    pub image: Image,
    pub cancel: CancellationToken,
    pub digest_cache: DigestCache,
    /// Bytes actually written to the device, populated once Write
    /// completes; `None` for the write stage itself.
    pub bytes_written: Option<u64>,
}

impl StageContext {
    pub fn new(device_path: impl Into<String>, image: Image, cancel: CancellationToken) -> Self {
        Self {
            device_path: device_path.into(),
            image,
            cancel,
            digest_cache: Arc::new(Mutex::new(HashMap::new())),
            bytes_written: None,
        }
    }
}

#[async_trait]
pub trait StageRunner: Send + Sync {
    async fn run(&self, ctx: &StageContext, sink: &dyn ProgressSink) -> StageOutcome;
}
