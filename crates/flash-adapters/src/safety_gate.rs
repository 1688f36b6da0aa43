// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Safety Gate: the one place that decides whether it is acceptable to
//! write to a device. Consulted at batch admission and re-consulted at
//! every stage boundary, per spec §4.1 and §5.

use flash_core::drive::Drive;
use flash_core::error::RejectReason;

/// Evaluate whether `drive` may be written to. Order matters: missing and
/// system-device checks run before the removable/mounted checks so the
/// most dangerous condition is reported first.
///
/// `allow_non_removable` lets a caller that has an explicit user override
/// skip the removable check, per spec §4.7 ("is marked non-removable while
/// the user has not explicitly overridden"); this crate never sets it
/// itself (no such key exists in the enumerated job-options bag of spec
/// §9), it only carries the capability for the out-of-scope HTTP layer to
/// exercise.
pub fn check(
    drive: Option<&Drive>,
    device_path: &str,
    allow_non_removable: bool,
) -> Result<(), RejectReason> {
    let Some(drive) = drive else {
        return Err(RejectReason::Missing(device_path.to_string()));
    };
    if drive.is_system {
        return Err(RejectReason::SystemDevice(device_path.to_string()));
    }
    if !drive.removable && !allow_non_removable {
        return Err(RejectReason::NotRemovable(device_path.to_string()));
    }
    if drive.mounted {
        return Err(RejectReason::Mounted(
            device_path.to_string(),
            drive.device_path.clone(),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[path = "safety_gate_tests.rs"]
mod tests;
