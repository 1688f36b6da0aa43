// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The public facade: one method per HTTP operation documented in spec §6.
//! Wires the Scheduler, Executor, Event Bus, Job Table, Safety Gate, Device
//! Inventory and Image Source together behind a single process-wide
//! instance, per spec §9 ("a single process-wide scheduler instance is
//! created at startup... no implicit re-initialisation").

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use flash_adapters::{
    DeviceInventory, ProgressReport, ProgressSink, StageContext, StageRunner, safety_gate,
};
use flash_core::batch::{Batch, BatchId, BatchRequest};
use flash_core::clock::Clock;
use flash_core::error::JobErrorKind;
use flash_core::event::{JobEvent, JobUpdate};
use flash_core::id::IdGen;
use flash_core::image::Image;
use flash_core::job::{Job, JobId, JobState};
use flash_core::port::{CellId, Port, PortBinding};
use flash_core::drive::Drive;
use flash_storage::{JobTable, JobTableError};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;
use crate::event_bus::{EventBus, Subscription};
use crate::executor::{Executor, StageRunners};
use crate::scheduler::Scheduler;

/// Discards progress and log callbacks. Used for one-off stage
/// invocations outside a job's pipeline (manual eject).
struct NullSink;

impl ProgressSink for NullSink {
    fn progress(&self, _report: ProgressReport) {}
    fn log(&self, _line: String) {}
}

fn placeholder_image() -> Image {
    Image {
        name: String::new(),
        path: PathBuf::new(),
        compressed: false,
        uncompressed_bytes: None,
        digest: None,
    }
}

pub struct Orchestrator<C: Clock> {
    job_table: Arc<JobTable>,
    scheduler: Arc<Scheduler>,
    event_bus: EventBus,
    inventory: Arc<dyn DeviceInventory>,
    executor: Executor<C>,
    eject_runner: Arc<dyn StageRunner>,
    images_dir: PathBuf,
    clock: C,
    cancel_tokens: Mutex<HashMap<JobId, CancellationToken>>,
    id_gen: Arc<dyn IdGen>,
}

impl<C: Clock> Orchestrator<C> {
    pub fn new(
        inventory: Arc<dyn DeviceInventory>,
        runners: StageRunners,
        images_dir: PathBuf,
        clock: C,
        id_gen: Arc<dyn IdGen>,
        default_concurrency: usize,
        event_buffer_capacity: usize,
    ) -> Arc<Self> {
        let job_table = Arc::new(JobTable::new());
        let event_bus = EventBus::new(event_buffer_capacity);
        let eject_runner = runners.eject.clone();
        let executor = Executor::new(
            job_table.clone(),
            runners,
            Arc::new(event_bus.clone()),
            inventory.clone(),
            clock.clone(),
        );

        Arc::new(Self {
            job_table,
            scheduler: Arc::new(Scheduler::new(default_concurrency)),
            event_bus,
            inventory,
            executor,
            eject_runner,
            images_dir,
            clock,
            cancel_tokens: Mutex::new(HashMap::new()),
            id_gen,
        })
    }

    /// Admit a batch of jobs, one per target, per spec §4.5/§6. Safety Gate
    /// rejections land their target in FAILED immediately; a target whose
    /// cell already has a non-terminal job is skipped entirely (the
    /// existing job is the only record for that cell, per the
    /// at-most-one-non-terminal-job-per-cell invariant).
    pub async fn start_batch(self: &Arc<Self>, req: BatchRequest) -> Result<Vec<Job>, EngineError> {
        // Per spec §8: zero eligible cells returns an empty job list and
        // leaves scheduler state untouched — no image resolution, no
        // concurrency-limit update, no admission sweep.
        if req.targets.is_empty() {
            return Ok(Vec::new());
        }
        let mut seen_paths = std::collections::HashSet::new();
        for target in &req.targets {
            if !seen_paths.insert(target.device_path.as_str()) {
                return Err(EngineError::DuplicateDevicePath(target.device_path.clone()));
            }
        }

        let _image = flash_adapters::image_source::resolve(&req.image_name, &self.images_dir)?;
        let drives = self.inventory.list_drives().await?;
        self.scheduler.set_limit(req.concurrency_limit);

        let batch_id = BatchId::new(self.id_gen.next());
        let mut job_ids = Vec::with_capacity(req.targets.len());
        let mut jobs = Vec::with_capacity(req.targets.len());

        for target in &req.targets {
            let drive: Option<&Drive> = drives.iter().find(|d| d.device_path == target.device_path);
            let job_id = JobId::new(self.id_gen.next());
            let mut job = Job::new(
                job_id.clone(),
                target.cell_id.clone(),
                target.device_path.clone(),
                req.image_name.clone(),
                req.options,
                &self.clock,
            );

            if let Err(reason) = safety_gate::check(drive, &target.device_path, false) {
                job.state = JobState::Failed;
                job.error = Some(JobErrorKind::PreflightRejected(reason.to_string()));
                job.ended_epoch_ms = Some(self.clock.epoch_ms());
                match self.job_table.insert(job.clone()) {
                    Ok(()) => {
                        self.publish_update(&job);
                        jobs.push(job);
                    }
                    Err(JobTableError::CellBusy(cell_id)) => {
                        tracing::warn!(%cell_id, "batch target skipped, cell already has a non-terminal job");
                    }
                    Err(other) => return Err(other.into()),
                }
                continue;
            }

            match self.job_table.insert(job.clone()) {
                Ok(()) => {
                    self.publish_update(&job);
                    self.scheduler.enqueue(job_id.clone(), target.device_path.clone());
                    job_ids.push(job_id);
                    jobs.push(job);
                }
                Err(JobTableError::CellBusy(cell_id)) => {
                    tracing::warn!(%cell_id, "batch target skipped, cell already has a non-terminal job");
                }
                Err(other) => return Err(other.into()),
            }
        }

        let batch = Batch::new(batch_id, req.image_name, job_ids, req.concurrency_limit);
        tracing::info!(batch_id = %batch.batch_id, job_count = batch.job_ids.len(), "admitted batch");

        self.clone().try_admit().await;
        Ok(jobs)
    }

    pub fn list_jobs(&self) -> Vec<Job> {
        self.job_table.list()
    }

    pub fn job(&self, job_id: &JobId) -> Option<Job> {
        self.job_table.get(job_id)
    }

    pub async fn list_drives(&self) -> Result<Vec<Drive>, EngineError> {
        Ok(self.inventory.list_drives().await?)
    }

    pub async fn list_ports(&self, ports: &[Port]) -> Result<Vec<PortBinding>, EngineError> {
        Ok(self.inventory.bind_ports(ports).await?)
    }

    pub fn subscribe(&self) -> Subscription {
        self.event_bus.subscribe()
    }

    /// Periodic job_log coalescing tick; the daemon binary drives this on a
    /// `tokio::time::interval` (see [`crate::env::job_log_coalesce_window`]).
    pub fn flush_logs(&self) {
        self.event_bus.flush_logs();
    }

    /// Cancel a single job. A QUEUED job never had a runner started, so it
    /// transitions straight to CANCELLED here; a running job's token is
    /// signalled and the executor task tears itself down asynchronously.
    pub fn cancel_job(&self, job_id: &JobId) -> Result<(), EngineError> {
        let job = self
            .job_table
            .get(job_id)
            .ok_or_else(|| EngineError::JobNotFound(job_id.clone()))?;
        if job.state.is_terminal() {
            return Err(EngineError::AlreadyTerminal(job_id.clone()));
        }

        if job.state == JobState::Queued {
            self.scheduler.remove_queued(job_id);
            self.job_table.mutate(job_id, |j| {
                j.state = JobState::Cancelled;
                j.stage = "cancelled".to_string();
                j.ended_epoch_ms = Some(self.clock.epoch_ms());
            })?;
            if let Some(updated) = self.job_table.get(job_id) {
                self.publish_update(&updated);
            }
            return Ok(());
        }

        if let Some(token) = self.cancel_tokens.lock().get(job_id) {
            token.cancel();
        }
        Ok(())
    }

    /// Signal every non-terminal job's cancel token without waiting for
    /// any of them to actually finish tearing down, per spec §4.5.
    pub fn cancel_batch(&self) {
        for job in self.job_table.list() {
            if !job.state.is_terminal() {
                let _ = self.cancel_job(&job.job_id);
            }
        }
    }

    /// Retry one terminal job, producing a fresh QUEUED job with a new id
    /// bound to the same cell/device/image/options. The original record is
    /// left untouched (spec §4.4).
    pub async fn retry_job(self: &Arc<Self>, job_id: &JobId) -> Result<Job, EngineError> {
        let old = self
            .job_table
            .get(job_id)
            .ok_or_else(|| EngineError::JobNotFound(job_id.clone()))?;
        if !old.state.is_terminal() {
            return Err(EngineError::NotTerminal(job_id.clone()));
        }

        let new_job_id = JobId::new(self.id_gen.next());
        let job = old.retry(new_job_id.clone(), &self.clock);
        self.job_table.insert(job.clone())?;
        self.publish_update(&job);
        self.scheduler.enqueue(new_job_id, job.device_path.clone());
        self.clone().try_admit().await;
        Ok(job)
    }

    /// Retry every FAILED job; CANCELLED jobs are left alone (spec §4.5,
    /// open question (b)).
    pub async fn retry_batch(self: &Arc<Self>) -> Result<Vec<Job>, EngineError> {
        let failed_ids: Vec<JobId> = self
            .job_table
            .list()
            .into_iter()
            .filter(|j| j.state == JobState::Failed)
            .map(|j| j.job_id)
            .collect();

        let mut retried = Vec::with_capacity(failed_ids.len());
        for job_id in failed_ids {
            retried.push(self.retry_job(&job_id).await?);
        }
        Ok(retried)
    }

    /// Manually eject the drive at `cell_id`/`device_path`, independent of
    /// any job pipeline's own eject stage. Refuses while the cell has a
    /// non-terminal job — ejecting out from under a running write would
    /// corrupt it.
    pub async fn eject_cell(&self, cell_id: &CellId, device_path: &str) -> Result<(), EngineError> {
        if let Some(job) = self.job_table.list_for_cell(cell_id) {
            if !job.state.is_terminal() {
                return Err(EngineError::AlreadyTerminal(job.job_id));
            }
        }

        let ctx = StageContext::new(device_path, placeholder_image(), CancellationToken::new());
        match self.eject_runner.run(&ctx, &NullSink).await {
            flash_core::job::StageOutcome::Success
            | flash_core::job::StageOutcome::Warning(_)
            | flash_core::job::StageOutcome::Cancelled => Ok(()),
            flash_core::job::StageOutcome::Failure(kind) => Err(EngineError::Eject(kind)),
        }
    }

    fn publish_update(&self, job: &Job) {
        self.event_bus.publish(JobEvent::JobUpdate(JobUpdate {
            job_id: job.job_id.clone(),
            cell_id: job.cell_id.clone(),
            state: job.state,
            stage: job.stage.clone(),
            progress: job.progress,
            speed_bps: job.speed_bps,
            eta_seconds: job.eta_seconds,
        }));
    }

    /// Admit as many queued jobs as the scheduler currently allows and
    /// start executing each. Re-resolves the image per job rather than
    /// caching it from submission time, since `Job` only carries
    /// `image_name` — a cheap re-stat, not a re-read of the image bytes.
    async fn try_admit(self: Arc<Self>) {
        for job_id in self.scheduler.admit_ready() {
            let Some(job) = self.job_table.get(&job_id) else {
                self.scheduler.mark_finished(&job_id);
                continue;
            };
            match flash_adapters::image_source::resolve(&job.image_name, &self.images_dir) {
                Ok(image) => self.clone().spawn_execution(job_id, image),
                Err(err) => {
                    tracing::error!(%job_id, %err, "image vanished between submission and admission");
                    let _ = self.job_table.mutate(&job_id, |j| {
                        j.state = JobState::Failed;
                        j.error = Some(JobErrorKind::ImageNotFound(err.to_string()));
                        j.ended_epoch_ms = Some(self.clock.epoch_ms());
                    });
                    if let Some(updated) = self.job_table.get(&job_id) {
                        self.publish_update(&updated);
                    }
                    self.scheduler.mark_finished(&job_id);
                }
            }
        }
    }

    fn spawn_execution(self: Arc<Self>, job_id: JobId, image: Image) {
        let token = CancellationToken::new();
        self.cancel_tokens.lock().insert(job_id.clone(), token.clone());
        tokio::spawn(async move {
            self.executor.run(job_id.clone(), image, token).await;
            self.cancel_tokens.lock().remove(&job_id);
            self.scheduler.mark_finished(&job_id);
            self.try_admit().await;
        });
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
