// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batch Scheduler: a FIFO admission queue plus a running set bounded by a
//! global concurrency cap, per spec §4.5. Knows nothing about job state or
//! cancellation tokens — those live on the [`crate::orchestrator::Orchestrator`]
//! — this type's only job is deciding *which* queued job_ids are allowed to
//! start next.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use flash_core::job::JobId;
use parking_lot::Mutex;

struct QueuedJob {
    job_id: JobId,
    device_path: String,
}

/// FIFO queue + running set. Cheap to share behind an `Arc` (all methods
/// take `&self`).
pub struct Scheduler {
    queue: Mutex<VecDeque<QueuedJob>>,
    running: Mutex<HashMap<JobId, String>>,
    limit: AtomicUsize,
}

impl Scheduler {
    pub fn new(initial_limit: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            running: Mutex::new(HashMap::new()),
            limit: AtomicUsize::new(initial_limit),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit.load(Ordering::Relaxed)
    }

    /// Per spec §4.5: "a later batch with a lower cap does not preempt
    /// running jobs; a higher cap takes effect on the next admission." The
    /// new value is simply stored — `admit_ready` reads it fresh every
    /// call and never inspects, let alone kills, the running set.
    pub fn set_limit(&self, n: usize) {
        self.limit.store(n, Ordering::Relaxed);
    }

    /// Push a freshly admitted-to-QUEUED job onto the back of the FIFO.
    pub fn enqueue(&self, job_id: JobId, device_path: impl Into<String>) {
        self.queue.lock().push_back(QueuedJob {
            job_id,
            device_path: device_path.into(),
        });
    }

    /// Remove `job_id` from the running set, freeing a concurrency slot and
    /// a device_path for the next `admit_ready` call. A no-op if the job
    /// was never running (e.g. it was cancelled while still queued).
    pub fn mark_finished(&self, job_id: &JobId) {
        self.running.lock().remove(job_id);
    }

    /// Drop a queued-but-not-yet-running job without ever admitting it
    /// (cancellation while QUEUED, per spec §5).
    pub fn remove_queued(&self, job_id: &JobId) {
        self.queue.lock().retain(|j| &j.job_id != job_id);
    }

    /// Admit as many queued jobs as the concurrency cap and device_path
    /// uniqueness (§5) allow, in strict FIFO order. A job whose
    /// `device_path` collides with one already running is deferred, not
    /// rejected — it stays in the queue in its original relative position
    /// for the next call to try again.
    pub fn admit_ready(&self) -> Vec<JobId> {
        let mut queue = self.queue.lock();
        let mut running = self.running.lock();
        let limit = self.limit.load(Ordering::Relaxed);

        let mut admitted = Vec::new();
        let mut deferred = VecDeque::with_capacity(queue.len());

        while let Some(job) = queue.pop_front() {
            let has_slot = running.len() < limit;
            let device_free = !running.values().any(|path| *path == job.device_path);
            if has_slot && device_free {
                running.insert(job.job_id.clone(), job.device_path.clone());
                admitted.push(job.job_id);
            } else {
                deferred.push_back(job);
            }
        }

        *queue = deferred;
        admitted
    }

    pub fn queue_len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn running_len(&self) -> usize {
        self.running.lock().len()
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
