// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Drives one job through its pipeline: pick the stage runner for the
//! current [`StageKind`], run it, feed the [`StageOutcome`] back through
//! the pure [`advance`] function, and repeat until the job reaches a
//! terminal state.

use std::sync::Arc;

use flash_adapters::{DeviceInventory, ProgressReport, ProgressSink, StageContext, StageRunner, safety_gate};
use flash_core::clock::Clock;
use flash_core::error::JobErrorKind;
use flash_core::event::{JobEvent, JobLog, JobUpdate};
use flash_core::image::Image;
use flash_core::job::{Job, JobId, JobState, StageKind, StageOutcome};
use flash_core::port::CellId;
use flash_storage::JobTable;
use tokio_util::sync::CancellationToken;

use crate::events::EventPublisher;
use crate::monitor::SpeedMonitor;

/// One [`StageRunner`] per pipeline step. Assembled once at daemon startup
/// (real tools) or once per test (fakes), then shared across every job the
/// Executor runs.
#[derive(Clone)]
pub struct StageRunners {
    pub write: Arc<dyn StageRunner>,
    pub verify: Arc<dyn StageRunner>,
    pub expand: Arc<dyn StageRunner>,
    pub resize: Arc<dyn StageRunner>,
    pub eject: Arc<dyn StageRunner>,
}

impl StageRunners {
    fn for_stage(&self, stage: StageKind) -> &Arc<dyn StageRunner> {
        match stage {
            StageKind::Write => &self.write,
            StageKind::Verify => &self.verify,
            StageKind::Expand => &self.expand,
            StageKind::Resize => &self.resize,
            StageKind::Eject => &self.eject,
        }
    }
}

pub struct Executor<C: Clock> {
    job_table: Arc<JobTable>,
    runners: StageRunners,
    publisher: Arc<dyn EventPublisher>,
    inventory: Arc<dyn DeviceInventory>,
    clock: C,
}

impl<C: Clock> Executor<C> {
    pub fn new(
        job_table: Arc<JobTable>,
        runners: StageRunners,
        publisher: Arc<dyn EventPublisher>,
        inventory: Arc<dyn DeviceInventory>,
        clock: C,
    ) -> Self {
        Self {
            job_table,
            runners,
            publisher,
            inventory,
            clock,
        }
    }

    /// Re-consult the Safety Gate immediately before running `device_path`'s
    /// next stage, per spec §4.7 ("at each stage boundary"). A drive that
    /// vanished, got mounted, or lost its removable flag since admission
    /// fails the job with `DeviceStateChanged` rather than letting the
    /// stage runner touch it.
    async fn check_safety(&self, device_path: &str) -> Result<(), JobErrorKind> {
        let drives = match self.inventory.list_drives().await {
            Ok(drives) => drives,
            Err(err) => {
                return Err(JobErrorKind::DeviceStateChanged(format!(
                    "could not re-scan devices: {err}"
                )));
            }
        };
        let drive = drives.iter().find(|d| d.device_path == device_path);
        safety_gate::check(drive, device_path, false)
            .map_err(|reason| JobErrorKind::DeviceStateChanged(reason.to_string()))
    }

    /// Run `job_id` from QUEUED to a terminal state. Expected to be spawned
    /// as its own task by the Scheduler; returns once the job is DONE,
    /// FAILED or CANCELLED.
    pub async fn run(&self, job_id: JobId, image: Image, cancel: CancellationToken) {
        let Some(mut job) = self.job_table.get(&job_id) else {
            tracing::error!(%job_id, "executor asked to run a job missing from the table");
            return;
        };

        job.admit();
        self.persist_and_publish(&job);

        let mut ctx = StageContext::new(job.device_path.clone(), image, cancel);
        let pipeline = job.pipeline();
        let mut stage = pipeline.first();

        loop {
            let outcome = match self.check_safety(&ctx.device_path).await {
                Ok(()) => {
                    let sink = ExecutorSink::new(
                        job_id.clone(),
                        job.cell_id.clone(),
                        job.state,
                        stage.tag().to_string(),
                        self.job_table.clone(),
                        self.publisher.clone(),
                    );
                    let outcome = self.runners.for_stage(stage).run(&ctx, &sink).await;
                    if stage == StageKind::Write {
                        ctx.bytes_written = sink.final_bytes();
                    }
                    outcome
                }
                Err(kind) => {
                    tracing::warn!(%job_id, stage = stage.tag(), %kind, "safety gate rejected stage boundary");
                    StageOutcome::Failure(kind)
                }
            };

            job.apply(stage, outcome, &self.clock);
            self.persist_and_publish(&job);

            if job.state.is_terminal() {
                tracing::info!(%job_id, state = ?job.state, "job finished");
                return;
            }

            stage = match pipeline.after(stage) {
                Some(next) => next,
                None => stage, // Eject ran without a state change; job.apply already advanced us.
            };
        }
    }

    fn persist_and_publish(&self, job: &Job) {
        if self.job_table.update(job.clone()).is_err() {
            tracing::warn!(job_id = %job.job_id, "tried to update a job no longer in the table");
        }
        self.publisher.publish(JobEvent::JobUpdate(JobUpdate {
            job_id: job.job_id.clone(),
            cell_id: job.cell_id.clone(),
            state: job.state,
            stage: job.stage.clone(),
            progress: job.progress,
            speed_bps: job.speed_bps,
            eta_seconds: job.eta_seconds,
        }));
    }
}

/// Bridges stage-runner progress callbacks into job table updates and
/// Event Bus publications. One instance per stage invocation, so its
/// [`SpeedMonitor`] never carries a stale EMA across a stage boundary.
struct ExecutorSink {
    job_id: JobId,
    cell_id: CellId,
    state: JobState,
    stage_tag: String,
    job_table: Arc<JobTable>,
    publisher: Arc<dyn EventPublisher>,
    monitor: parking_lot::Mutex<SpeedMonitor>,
    last_bytes: std::sync::atomic::AtomicU64,
}

impl ExecutorSink {
    fn new(
        job_id: JobId,
        cell_id: CellId,
        state: JobState,
        stage_tag: String,
        job_table: Arc<JobTable>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            job_id,
            cell_id,
            state,
            stage_tag,
            job_table,
            publisher,
            monitor: parking_lot::Mutex::new(SpeedMonitor::new()),
            last_bytes: std::sync::atomic::AtomicU64::new(0),
        }
    }

    fn final_bytes(&self) -> Option<u64> {
        let bytes = self.last_bytes.load(std::sync::atomic::Ordering::Relaxed);
        if bytes == 0 {
            None
        } else {
            Some(bytes)
        }
    }
}

impl ProgressSink for ExecutorSink {
    fn progress(&self, report: ProgressReport) {
        self.last_bytes
            .store(report.bytes_done, std::sync::atomic::Ordering::Relaxed);
        let speed = report
            .speed_bps
            .map(|bps| self.monitor.lock().sample(bps))
            .or_else(|| self.monitor.lock().current());
        let eta = match (speed, report.total_bytes) {
            (Some(s), Some(total)) if s > 0.0 && total >= report.bytes_done => {
                Some(((total - report.bytes_done) as f64 / s).ceil() as u64)
            }
            _ => None,
        };
        let progress = report
            .total_bytes
            .filter(|t| *t > 0)
            .map(|t| (report.bytes_done as f64 / t as f64).min(1.0))
            .unwrap_or(0.0);

        // Best-effort: the job may have just reached a terminal state (e.g.
        // cancelled mid-stage) and been dropped from a retained reference
        // elsewhere; a missing job here is not an error for a progress tick.
        let _ = self.job_table.mutate(&self.job_id, |job| {
            job.progress = progress;
            job.speed_bps = speed;
            job.eta_seconds = eta;
        });

        self.publisher.publish(JobEvent::JobUpdate(JobUpdate {
            job_id: self.job_id.clone(),
            cell_id: self.cell_id.clone(),
            state: self.state,
            stage: self.stage_tag.clone(),
            progress,
            speed_bps: speed,
            eta_seconds: eta,
        }));
    }

    fn log(&self, line: String) {
        let _ = self.job_table.mutate(&self.job_id, |job| job.push_log(line.clone()));
        self.publisher.publish(JobEvent::JobLog(JobLog {
            job_id: self.job_id.clone(),
            lines: vec![line],
        }));
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
