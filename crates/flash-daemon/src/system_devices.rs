// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolves the disk(s) the Safety Gate must never let a job near: whatever
//! hosts `/`, `/boot`, or `/boot/efi` on this workstation, per spec §4.1
//! ("a device is system iff it or any partition of it hosts the root
//! filesystem or a boot mountpoint"). Runs once at daemon startup — the set
//! is handed to [`flash_adapters::SystemInventory::new`] and never
//! refreshed, since the workstation's own root disk doesn't move.

use std::collections::HashSet;

use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum SystemDeviceError {
    #[error("failed to run findmnt for {0}: {1}")]
    Spawn(&'static str, std::io::Error),
}

const BOOT_MOUNTPOINTS: [&str; 3] = ["/", "/boot", "/boot/efi"];

/// Resolve every boot mountpoint's backing partition, then widen each to
/// its parent disk — a mounted `/dev/sda2` must reject writes to `/dev/sda`
/// as a whole, not just the partition node itself.
pub async fn detect() -> Result<HashSet<String>, SystemDeviceError> {
    let mut disks = HashSet::new();
    for mountpoint in BOOT_MOUNTPOINTS {
        if let Some(partition) = source_of(mountpoint).await? {
            disks.insert(parent_disk(&partition));
        }
    }
    Ok(disks)
}

async fn source_of(mountpoint: &'static str) -> Result<Option<String>, SystemDeviceError> {
    let output = Command::new("findmnt")
        .args(["-no", "SOURCE", mountpoint])
        .output()
        .await
        .map_err(|e| SystemDeviceError::Spawn(mountpoint, e))?;
    if !output.status.success() {
        // Not every workstation has a separate /boot or /boot/efi mount;
        // a failed lookup there just means nothing to add, not an error.
        return Ok(None);
    }
    let source = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if source.is_empty() { Ok(None) } else { Ok(Some(source)) }
}

/// Widen a partition device node to its parent disk: `/dev/sda1` ->
/// `/dev/sda`, `/dev/nvme0n1p1` -> `/dev/nvme0n1`, `/dev/mmcblk0p1` ->
/// `/dev/mmcblk0`. A path with no trailing partition number (already a
/// whole-disk device, or an unrecognized scheme) is returned unchanged.
fn parent_disk(path: &str) -> String {
    let no_trailing_digits = path.trim_end_matches(|c: char| c.is_ascii_digit());
    if no_trailing_digits.len() == path.len() {
        return path.to_string();
    }
    if let Some(before_p) = no_trailing_digits.strip_suffix('p') {
        if before_p.ends_with(|c: char| c.is_ascii_digit()) {
            return before_p.to_string();
        }
    }
    no_trailing_digits.to_string()
}

#[cfg(test)]
#[path = "system_devices_tests.rs"]
mod tests;
