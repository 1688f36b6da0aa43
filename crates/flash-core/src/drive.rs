// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Block-device snapshot as seen by the Device Inventory component.

use serde::{Deserialize, Serialize};

/// Advertised USB transfer speed of the topology device a drive is attached
/// through. `Unknown` covers non-USB media and sysfs read failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsbSpeed {
    Usb2_0,
    Usb3_0,
    Usb3_2,
    Unknown,
}

impl UsbSpeed {
    /// Parse the contents of a `/sys/.../speed` file (Mbit/s, as a plain
    /// number) into a speed class.
    pub fn from_sysfs_mbits(raw: &str) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(mbits) if mbits >= 10000.0 => UsbSpeed::Usb3_2,
            Ok(mbits) if mbits >= 5000.0 => UsbSpeed::Usb3_0,
            Ok(mbits) if mbits > 0.0 => UsbSpeed::Usb2_0,
            _ => UsbSpeed::Unknown,
        }
    }
}

/// A point-in-time snapshot of one block device. Short-lived: recomputed on
/// every `list_drives` call, never cached across calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drive {
    pub device_path: String,
    pub by_path: Option<String>,
    pub size_bytes: u64,
    pub model: Option<String>,
    pub serial: Option<String>,
    pub removable: bool,
    pub is_system: bool,
    pub mounted: bool,
    pub usb_speed: UsbSpeed,
}

impl Drive {
    /// Human-friendly size, e.g. `"14.9 GB"`. Matches the `_human` wire
    /// convention documented for size fields.
    pub fn size_human(&self) -> String {
        crate::time_fmt::format_bytes(self.size_bytes)
    }
}

#[cfg(test)]
#[path = "drive_tests.rs"]
mod tests;
