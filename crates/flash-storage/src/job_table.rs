// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory job table. No WAL, no snapshot, no on-disk persistence: job
//! history is explicitly ephemeral (see DESIGN.md), so a daemon restart
//! loses in-flight and completed job records by design.

use std::collections::HashMap;

use flash_core::job::{Job, JobId};
use flash_core::port::CellId;
use parking_lot::RwLock;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobTableError {
    #[error("no job with id {0}")]
    NotFound(JobId),
    #[error("cell {0} already has a non-terminal job")]
    CellBusy(CellId),
}

/// Keyed lookup over the live and historical jobs the daemon knows about,
/// guarded by a single lock (reads vastly outnumber writes: progress
/// lookups from every poller versus one state change per job per stage).
#[derive(Default)]
pub struct JobTable {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    jobs: HashMap<JobId, Job>,
    by_cell: HashMap<CellId, JobId>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly admitted job. Fails if `cell_id` already has a
    /// non-terminal job tracked, enforcing "at most one in-flight job per
    /// cell" (spec §4.1).
    pub fn insert(&self, job: Job) -> Result<(), JobTableError> {
        let mut inner = self.inner.write();
        if let Some(existing_id) = inner.by_cell.get(&job.cell_id) {
            if let Some(existing) = inner.jobs.get(existing_id) {
                if !existing.state.is_terminal() {
                    return Err(JobTableError::CellBusy(job.cell_id.clone()));
                }
            }
        }
        tracing::debug!(job_id = %job.job_id, cell_id = %job.cell_id, "admitting job");
        inner.by_cell.insert(job.cell_id.clone(), job.job_id.clone());
        inner.jobs.insert(job.job_id.clone(), job);
        Ok(())
    }

    pub fn get(&self, job_id: &JobId) -> Option<Job> {
        self.inner.read().jobs.get(job_id).cloned()
    }

    pub fn list(&self) -> Vec<Job> {
        self.inner.read().jobs.values().cloned().collect()
    }

    pub fn list_for_cell(&self, cell_id: &CellId) -> Option<Job> {
        let inner = self.inner.read();
        let job_id = inner.by_cell.get(cell_id)?;
        inner.jobs.get(job_id).cloned()
    }

    /// Replace a job record after an in-place mutation (state transition,
    /// progress tick, log append).
    pub fn update(&self, job: Job) -> Result<(), JobTableError> {
        let mut inner = self.inner.write();
        if !inner.jobs.contains_key(&job.job_id) {
            return Err(JobTableError::NotFound(job.job_id.clone()));
        }
        inner.jobs.insert(job.job_id.clone(), job);
        Ok(())
    }

    /// Apply `mutate` to the job in place and persist the result, returning
    /// whatever `mutate` returns. Saves every call site from a manual
    /// get/mutate/update round trip.
    pub fn mutate<R>(
        &self,
        job_id: &JobId,
        mutate: impl FnOnce(&mut Job) -> R,
    ) -> Result<R, JobTableError> {
        let mut inner = self.inner.write();
        let job = inner
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| JobTableError::NotFound(job_id.clone()))?;
        Ok(mutate(job))
    }
}

#[cfg(test)]
#[path = "job_table_tests.rs"]
mod tests;
