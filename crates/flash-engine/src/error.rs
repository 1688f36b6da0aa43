// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors surfaced by batch admission and job control, as distinct from
//! [`flash_core::error::JobErrorKind`] which covers in-flight pipeline
//! failures.

use flash_core::error::RejectReason;
use flash_core::job::JobId;
use flash_core::port::CellId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no job with id {0}")]
    JobNotFound(JobId),
    #[error(transparent)]
    Storage(#[from] flash_storage::JobTableError),
    #[error("cell {cell_id} rejected: {reason}")]
    SafetyGateRejected { cell_id: CellId, reason: RejectReason },
    #[error("duplicate device path {0} within one batch submission")]
    DuplicateDevicePath(String),
    #[error("job {0} is already terminal and cannot be cancelled")]
    AlreadyTerminal(JobId),
    #[error("job {0} is not terminal and cannot be retried")]
    NotTerminal(JobId),
    #[error(transparent)]
    ImageResolution(#[from] flash_adapters::image_source::ImageSourceError),
    #[error(transparent)]
    Inventory(#[from] flash_adapters::inventory::InventoryError),
    #[error("eject failed: {0}")]
    Eject(#[source] flash_core::error::JobErrorKind),
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
