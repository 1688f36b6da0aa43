// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device Inventory: turns `lsblk` output and a handful of sysfs reads into
//! the [`Drive`] snapshots the rest of the system works with. Nothing here
//! is cached between calls — every scan reflects the kernel's current view.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use flash_core::drive::{Drive, UsbSpeed};
use flash_core::port::{Port, PortBinding};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("failed to run lsblk: {0}")]
    LsblkSpawn(std::io::Error),
    #[error("lsblk exited with status {0}")]
    LsblkExit(std::process::ExitStatus),
    #[error("failed to parse lsblk output: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Raw `lsblk -J -b -O` row, a small slice of the full field set.
#[derive(Debug, Deserialize)]
struct LsblkDevice {
    name: String,
    size: u64,
    model: Option<String>,
    serial: Option<String>,
    rm: bool,
    mountpoint: Option<String>,
    #[serde(rename = "mountpoints", default)]
    mountpoints: Vec<Option<String>>,
    #[serde(default)]
    children: Vec<LsblkDevice>,
}

#[derive(Debug, Deserialize)]
struct LsblkOutput {
    blockdevices: Vec<LsblkDevice>,
}

impl LsblkDevice {
    fn is_mounted(&self) -> bool {
        self.mountpoint.is_some()
            || self.mountpoints.iter().any(|m| m.is_some())
            || self.children.iter().any(LsblkDevice::is_mounted)
    }
}

/// Scans the host's block devices and USB topology.
#[async_trait]
pub trait DeviceInventory: Send + Sync {
    async fn list_drives(&self) -> Result<Vec<Drive>, InventoryError>;
    async fn bind_ports(&self, ports: &[Port]) -> Result<Vec<PortBinding>, InventoryError>;
}

/// Real inventory backed by `lsblk` and `/sys`.
pub struct SystemInventory {
    system_devices: HashSet<String>,
}

impl SystemInventory {
    /// `system_devices` is the set of device-node paths (e.g. `/dev/sda`)
    /// the Safety Gate must never let us near — the boot/root disk(s),
    /// resolved once at daemon startup from `findmnt`.
    pub fn new(system_devices: HashSet<String>) -> Self {
        Self { system_devices }
    }

    async fn run_lsblk(&self) -> Result<LsblkOutput, InventoryError> {
        let output = tokio::process::Command::new("lsblk")
            .args(["-J", "-b", "-O"])
            .output()
            .await
            .map_err(InventoryError::LsblkSpawn)?;
        if !output.status.success() {
            return Err(InventoryError::LsblkExit(output.status));
        }
        Ok(serde_json::from_slice(&output.stdout)?)
    }

    fn to_drive(&self, dev: &LsblkDevice) -> Drive {
        let device_path = format!("/dev/{}", dev.name);
        let by_path = by_path_for(&device_path);
        let usb_speed = by_path
            .as_deref()
            .and_then(speed_mbits_for_by_path)
            .map(|raw| UsbSpeed::from_sysfs_mbits(&raw))
            .unwrap_or(UsbSpeed::Unknown);
        Drive {
            is_system: self.system_devices.contains(&device_path),
            mounted: dev.is_mounted(),
            device_path,
            by_path,
            size_bytes: dev.size,
            model: dev.model.clone(),
            serial: dev.serial.clone(),
            removable: dev.rm,
            usb_speed,
        }
    }
}

#[async_trait]
impl DeviceInventory for SystemInventory {
    async fn list_drives(&self) -> Result<Vec<Drive>, InventoryError> {
        let parsed = self.run_lsblk().await?;
        Ok(parsed.blockdevices.iter().map(|d| self.to_drive(d)).collect())
    }

    async fn bind_ports(&self, ports: &[Port]) -> Result<Vec<PortBinding>, InventoryError> {
        let drives = self.list_drives().await?;
        Ok(ports
            .iter()
            .map(|port| {
                let drive = drives
                    .iter()
                    .find(|d| d.by_path.as_deref() == Some(port.port_topology_path.as_str()))
                    .cloned();
                PortBinding {
                    port: port.clone(),
                    drive,
                }
            })
            .collect())
    }
}

/// Resolve `/dev/disk/by-path/*` back to a device node, returning the
/// by-path name if one points at `device_path`.
fn by_path_for(device_path: &str) -> Option<String> {
    let dir = Path::new("/dev/disk/by-path");
    let entries = std::fs::read_dir(dir).ok()?;
    for entry in entries.flatten() {
        let target = std::fs::canonicalize(entry.path()).ok()?;
        if target.to_str() == Some(device_path) {
            return entry.file_name().into_string().ok();
        }
    }
    None
}

/// Read the advertised link speed (Mbit/s) for the USB device backing
/// `by_path`, by walking up from `/sys/class/block/<dev>` to the nearest
/// ancestor `usb*` node's `speed` attribute.
fn speed_mbits_for_by_path(by_path: &str) -> Option<String> {
    let dev_name = by_path.rsplit('/').next()?;
    let sys_block = Path::new("/sys/class/block").join(dev_name);
    let device_link = std::fs::canonicalize(sys_block.join("device")).ok()?;
    let mut current = device_link.as_path();
    loop {
        let speed_path = current.join("speed");
        if let Ok(contents) = std::fs::read_to_string(&speed_path) {
            return Some(contents);
        }
        current = current.parent()?;
        if current == Path::new("/sys") || current == Path::new("/") {
            return None;
        }
    }
}

#[cfg(feature = "test-support")]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// In-memory inventory for engine/daemon tests — no `lsblk`, no `/sys`.
    #[derive(Clone, Default)]
    pub struct FakeInventory {
        drives: Arc<Mutex<Vec<Drive>>>,
    }

    impl FakeInventory {
        pub fn new(drives: Vec<Drive>) -> Self {
            Self {
                drives: Arc::new(Mutex::new(drives)),
            }
        }

        pub fn set_drives(&self, drives: Vec<Drive>) {
            *self.drives.lock() = drives;
        }
    }

    #[async_trait]
    impl DeviceInventory for FakeInventory {
        async fn list_drives(&self) -> Result<Vec<Drive>, InventoryError> {
            Ok(self.drives.lock().clone())
        }

        async fn bind_ports(&self, ports: &[Port]) -> Result<Vec<PortBinding>, InventoryError> {
            let drives = self.drives.lock().clone();
            Ok(ports
                .iter()
                .map(|port| {
                    let drive = drives
                        .iter()
                        .find(|d| d.by_path.as_deref() == Some(port.port_topology_path.as_str()))
                        .cloned();
                    PortBinding {
                        port: port.clone(),
                        drive,
                    }
                })
                .collect())
        }
    }
}

#[cfg(test)]
#[path = "inventory_tests.rs"]
mod tests;
