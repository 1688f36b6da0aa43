// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire events published on the Event Bus, per spec §6. Every event is
//! tagged by `type` so a single subscriber stream can carry all three
//! kinds without a wrapper envelope.

use serde::{Deserialize, Serialize};

use crate::drive::Drive;
use crate::job::{JobId, JobState};
use crate::port::CellId;

/// A change to one job's live view: state, stage, progress, speed, ETA.
/// Published on every field change, and coalesced at the Event Bus so a
/// burst of progress ticks collapses to the latest value within a short
/// window (see spec §6, "job_log coalescing").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobUpdate {
    pub job_id: JobId,
    pub cell_id: CellId,
    pub state: JobState,
    pub stage: String,
    pub progress: f64,
    pub speed_bps: Option<f64>,
    pub eta_seconds: Option<u64>,
}

/// One or more log lines appended to a job's `log_tail`. Carries a `Vec`
/// rather than a single line because the Event Bus coalesces bursts of
/// lines for the same job within a short window (spec §6) into one event
/// before fanning it out to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobLog {
    pub job_id: JobId,
    pub lines: Vec<String>,
}

/// A drive appeared, disappeared, or changed mount state at a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveChange {
    pub cell_id: CellId,
    pub drive: Option<Drive>,
}

/// Every event the Event Bus fans out to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    JobUpdate(JobUpdate),
    JobLog(JobLog),
    DriveChange(DriveChange),
    /// Sent to a subscriber whose ring buffer dropped events it couldn't
    /// keep up with; the subscriber should re-fetch a full snapshot via
    /// `list_jobs`/`list_drives` rather than trust its incremental state.
    Resync,
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
