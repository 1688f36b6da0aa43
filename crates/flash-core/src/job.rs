// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Job State Machine: a single device's journey through
//! write → verify → expand → resize → eject, expressed as a pure
//! transition function so the full graph can be exhaustively unit tested
//! without touching a subprocess or a block device.

use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::JobErrorKind;
use crate::port::CellId;

crate::define_id! {
    /// Identifier for one device's run through the pipeline.
    pub struct JobId;
}

/// Per-job toggles selected at batch-submission time, per spec §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JobOptions {
    pub verify: bool,
    pub expand_partition: bool,
    pub resize_filesystem: bool,
    pub eject_after_done: bool,
}

/// One step of the pipeline. Distinct from [`JobState`]: `Eject` never gets
/// its own job state (the wire `state` enum is fixed at eight values), it
/// only ever shows up in the free-text `stage` tag while the job's `state`
/// stays at whatever state precedes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Write,
    Verify,
    Expand,
    Resize,
    Eject,
}

impl StageKind {
    /// Human-readable tag used for the `stage` wire field.
    pub fn tag(&self) -> &'static str {
        match self {
            StageKind::Write => "write",
            StageKind::Verify => "verify",
            StageKind::Expand => "expand",
            StageKind::Resize => "resize",
            StageKind::Eject => "eject",
        }
    }
}

/// The ordered list of stages a job will run, derived once from its
/// [`JobOptions`] at admission time. Write always runs; everything else is
/// opt-in, in the fixed order write → verify → expand → resize → eject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<StageKind>,
}

impl Pipeline {
    pub fn for_options(opts: &JobOptions) -> Self {
        let mut stages = vec![StageKind::Write];
        if opts.verify {
            stages.push(StageKind::Verify);
        }
        if opts.expand_partition {
            stages.push(StageKind::Expand);
        }
        if opts.resize_filesystem {
            stages.push(StageKind::Resize);
        }
        if opts.eject_after_done {
            stages.push(StageKind::Eject);
        }
        Self { stages }
    }

    pub fn first(&self) -> StageKind {
        self.stages[0]
    }

    /// The stage that runs immediately after `stage`, if any.
    pub fn after(&self, stage: StageKind) -> Option<StageKind> {
        let index = self.stages.iter().position(|s| *s == stage)?;
        self.stages.get(index + 1).copied()
    }
}

/// Wire-stable job state, per spec §3. Exactly these eight values — adding a
/// ninth (e.g. for eject) would break the documented enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Writing,
    Verifying,
    Expanding,
    Resizing,
    Done,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed | JobState::Cancelled)
    }

    /// The job state a stage runs under. `Eject` has no entry: its outcome
    /// never changes `state` on its own, see [`StageKind`].
    fn for_stage(stage: StageKind) -> Option<JobState> {
        match stage {
            StageKind::Write => Some(JobState::Writing),
            StageKind::Verify => Some(JobState::Verifying),
            StageKind::Expand => Some(JobState::Expanding),
            StageKind::Resize => Some(JobState::Resizing),
            StageKind::Eject => None,
        }
    }
}

/// What a stage runner reported back to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    /// The stage completed cleanly.
    Success,
    /// The stage completed with a non-fatal problem (only meaningful for
    /// Expand, Resize and Eject; Write and Verify never warn).
    Warning(String),
    /// The stage failed fatally; the job transitions to FAILED.
    Failure(JobErrorKind),
    /// Cancellation was observed while the stage was running.
    Cancelled,
}

/// Where a transition left the job: still running (with the next stage to
/// invoke and the job state to display while it runs), or terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    Running {
        state: JobState,
        stage: StageKind,
        warning: Option<String>,
    },
    Terminal {
        state: JobState,
        error: Option<JobErrorKind>,
        warning: Option<String>,
    },
}

/// Pure transition function: given the stage that just ran and its outcome,
/// compute where the job goes next. No I/O, no clock, no randomness —
/// exhaustively unit testable over the whole graph in spec.md §4.4.
pub fn advance(pipeline: &Pipeline, finished: StageKind, outcome: StageOutcome) -> Advance {
    match outcome {
        StageOutcome::Cancelled => Advance::Terminal {
            state: JobState::Cancelled,
            error: None,
            warning: None,
        },
        StageOutcome::Failure(kind) => Advance::Terminal {
            state: JobState::Failed,
            error: Some(kind),
            warning: None,
        },
        StageOutcome::Warning(msg) if !allows_warning(finished) => {
            // Write/Verify never warn; treat as a logic error surfaced as
            // an internal failure rather than silently dropping the message.
            Advance::Terminal {
                state: JobState::Failed,
                error: Some(JobErrorKind::Internal(format!(
                    "stage {:?} is not permitted to warn: {msg}",
                    finished
                ))),
                warning: None,
            }
        }
        StageOutcome::Success | StageOutcome::Warning(_) => {
            let warning = match outcome {
                StageOutcome::Warning(msg) => Some(msg),
                _ => None,
            };
            match pipeline.after(finished) {
                Some(next) => match JobState::for_stage(next) {
                    Some(state) => Advance::Running { state, stage: next, warning },
                    // next is Eject: state doesn't move, only the display
                    // stage tag does. The caller runs Eject and calls
                    // `advance` again with `finished = Eject` to land on
                    // Done (carrying the eject warning, if any, forward).
                    None => Advance::Running {
                        state: match JobState::for_stage(finished) {
                            Some(state) => state,
                            None => unreachable!(
                                "only Eject maps to None, and Eject cannot precede itself"
                            ),
                        },
                        stage: next,
                        warning,
                    },
                },
                None => Advance::Terminal {
                    state: JobState::Done,
                    error: None,
                    warning,
                },
            }
        }
    }
}

fn allows_warning(stage: StageKind) -> bool {
    matches!(stage, StageKind::Expand | StageKind::Resize | StageKind::Eject)
}

/// A single device's run through the pipeline. Constructed once per
/// admission; a retried job is a brand-new `Job` with a fresh [`JobId`],
/// per spec §5 ("the old job record is untouched").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: JobId,
    pub cell_id: CellId,
    pub device_path: String,
    pub image_name: String,
    pub options: JobOptions,
    pub state: JobState,
    pub stage: String,
    /// Fraction complete within the current stage, in `[0.0, 1.0]`.
    pub progress: f64,
    pub speed_bps: Option<f64>,
    pub eta_seconds: Option<u64>,
    pub error: Option<JobErrorKind>,
    pub warning: Option<String>,
    pub log_tail: Vec<String>,
    pub started_epoch_ms: u64,
    pub ended_epoch_ms: Option<u64>,
}

/// Bound on how many of the most recent log lines a `Job` retains, per
/// spec §3 ("bounded ring buffer of recent log lines (≥ 200, ≤ 2000)").
pub const LOG_TAIL_CAPACITY: usize = 500;

impl Job {
    pub fn new(
        job_id: JobId,
        cell_id: CellId,
        device_path: impl Into<String>,
        image_name: impl Into<String>,
        options: JobOptions,
        clock: &impl Clock,
    ) -> Self {
        Self {
            job_id,
            cell_id,
            device_path: device_path.into(),
            image_name: image_name.into(),
            options,
            state: JobState::Queued,
            stage: "queued".to_string(),
            progress: 0.0,
            speed_bps: None,
            eta_seconds: None,
            error: None,
            warning: None,
            log_tail: Vec::new(),
            started_epoch_ms: clock.epoch_ms(),
            ended_epoch_ms: None,
        }
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::for_options(&self.options)
    }

    /// Transition from QUEUED into the first pipeline stage once the
    /// Scheduler admits this job.
    pub fn admit(&mut self) {
        debug_assert_eq!(self.state, JobState::Queued);
        let first = self.pipeline().first();
        self.state = match JobState::for_stage(first) {
            Some(state) => state,
            None => unreachable!("write is always the first stage"),
        };
        self.stage = first.tag().to_string();
        self.progress = 0.0;
    }

    /// Apply a stage outcome via the pure [`advance`] function, updating
    /// this job's `state`, `stage`, `progress`, `error`, `warning` and
    /// `ended_epoch_ms` in place.
    pub fn apply(&mut self, finished: StageKind, outcome: StageOutcome, clock: &impl Clock) {
        match advance(&self.pipeline(), finished, outcome) {
            Advance::Running { state, stage, warning } => {
                self.state = state;
                self.stage = stage.tag().to_string();
                self.progress = 0.0;
                self.speed_bps = None;
                self.eta_seconds = None;
                if warning.is_some() {
                    self.warning = warning;
                }
            }
            Advance::Terminal { state, error, warning } => {
                self.state = state;
                self.stage = state_tag(state);
                self.progress = if state == JobState::Done { 1.0 } else { self.progress };
                self.error = error;
                if warning.is_some() {
                    self.warning = warning;
                }
                self.speed_bps = None;
                self.eta_seconds = None;
                self.ended_epoch_ms = Some(clock.epoch_ms());
            }
        }
    }

    /// Append a line to `log_tail`, trimming to [`LOG_TAIL_CAPACITY`].
    pub fn push_log(&mut self, line: impl Into<String>) {
        self.log_tail.push(line.into());
        if self.log_tail.len() > LOG_TAIL_CAPACITY {
            let excess = self.log_tail.len() - LOG_TAIL_CAPACITY;
            self.log_tail.drain(0..excess);
        }
    }

    /// Produce a fresh job in QUEUED for the same cell/device/image/options,
    /// with a new id. The original record is left untouched by design —
    /// callers keep both in the job table.
    pub fn retry(&self, new_job_id: JobId, clock: &impl Clock) -> Job {
        Job::new(
            new_job_id,
            self.cell_id.clone(),
            self.device_path.clone(),
            self.image_name.clone(),
            self.options,
            clock,
        )
    }
}

fn state_tag(state: JobState) -> String {
    match state {
        JobState::Queued => "queued",
        JobState::Writing => "write",
        JobState::Verifying => "verify",
        JobState::Expanding => "expand",
        JobState::Resizing => "resize",
        JobState::Done => "done",
        JobState::Failed => "failed",
        JobState::Cancelled => "cancelled",
    }
    .to_string()
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
