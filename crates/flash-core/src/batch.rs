// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A batch groups the jobs submitted by one `start_batch` call, purely for
//! bulk cancel/retry addressing — it carries no state machine of its own.

use serde::{Deserialize, Serialize};

use crate::job::{JobId, JobOptions};
use crate::port::CellId;

crate::define_id! {
    /// Identifier for one `start_batch` submission.
    pub struct BatchId;
}

/// One device's request within a `start_batch` submission, before a
/// [`crate::job::Job`] exists for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTarget {
    pub cell_id: CellId,
    pub device_path: String,
}

/// The request body of a `start_batch` submission, per spec §6.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub image_name: String,
    pub options: JobOptions,
    pub targets: Vec<BatchTarget>,
    /// Per spec §4.5: scoped to this submission, but applied globally — the
    /// scheduler's effective cap becomes the most recent submit's value.
    pub concurrency_limit: usize,
}

/// A submitted batch: the ids of every job it admitted, in submission
/// order. Jobs created by a later `retry_job` call are not added back to
/// their original batch. Ephemeral per spec §3 — lives only long enough to
/// admit; jobs outlive it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub batch_id: BatchId,
    pub image_name: String,
    pub job_ids: Vec<JobId>,
    pub concurrency_limit: usize,
}

impl Batch {
    pub fn new(
        batch_id: BatchId,
        image_name: impl Into<String>,
        job_ids: Vec<JobId>,
        concurrency_limit: usize,
    ) -> Self {
        Self {
            batch_id,
            image_name: image_name.into(),
            job_ids,
            concurrency_limit,
        }
    }
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
