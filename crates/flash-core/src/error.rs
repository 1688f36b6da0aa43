// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy shared by every stage of the pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable error kind attached to a FAILED job, per spec §7. The `Display`
/// impl is the human message; the variant's `snake_case` serialization is
/// the wire-stable `kind` tag an external HTTP layer maps to a status code.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum JobErrorKind {
    #[error("preflight check rejected the target device: {0}")]
    PreflightRejected(String),

    #[error("device state changed before the stage could run: {0}")]
    DeviceStateChanged(String),

    #[error("image not found: {0}")]
    ImageNotFound(String),

    #[error("failed to read image: {0}")]
    ImageReadError(String),

    #[error("write I/O error: {0}")]
    WriteIoError(String),

    #[error("verification mismatch at byte offset {offset}")]
    VerifyMismatch { offset: u64 },

    #[error("verify I/O error: {0}")]
    VerifyIoError(String),

    #[error("stage timed out after {0:?}")]
    StageTimeout(std::time::Duration),

    #[error("job was cancelled")]
    Cancelled,

    #[error("subprocess exited with code {0}")]
    SubprocessExit(i32),

    #[error("internal error: {0}")]
    Internal(String),
}

impl JobErrorKind {
    /// Convenience mapping an external HTTP layer can use; this crate never
    /// runs an HTTP server itself (see SPEC_FULL.md §7).
    pub fn http_status_hint(&self) -> u16 {
        match self {
            JobErrorKind::PreflightRejected(_) | JobErrorKind::DeviceStateChanged(_) => 409,
            JobErrorKind::ImageNotFound(_) => 404,
            JobErrorKind::ImageReadError(_)
            | JobErrorKind::WriteIoError(_)
            | JobErrorKind::VerifyMismatch { .. }
            | JobErrorKind::VerifyIoError(_)
            | JobErrorKind::StageTimeout(_)
            | JobErrorKind::Cancelled
            | JobErrorKind::SubprocessExit(_) => 400,
            JobErrorKind::Internal(_) => 500,
        }
    }
}

/// Reason the Safety Gate rejected a destructive operation on a device.
/// The caller (Scheduler at admission, or the Job State Machine at a stage
/// boundary) decides whether this becomes `PreflightRejected` or
/// `DeviceStateChanged` based on when it fired.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RejectReason {
    #[error("device {0} is missing")]
    Missing(String),

    #[error("device {0} hosts the root or boot filesystem")]
    SystemDevice(String),

    #[error("device {0} is not marked removable")]
    NotRemovable(String),

    #[error("device {0} has a mounted partition: {1}")]
    Mounted(String, String),
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
