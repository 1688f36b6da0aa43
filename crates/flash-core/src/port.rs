// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Logical port-grid slots, supplied by the layout collaborator and bound
//! to physical USB topology paths.

use crate::drive::Drive;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Identifier for a logical cell in the port grid.
    pub struct CellId;
}

/// A logical slot in the port grid, as supplied by the layout collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub cell_id: CellId,
    pub label: String,
    /// Stable by-path identifier describing the USB topology
    /// (controller + hub chain + endpoint), independent of the kernel's
    /// device-node assignment.
    pub port_topology_path: String,
    pub usb_hint: Option<String>,
}

/// A `Port` enriched with whatever `Drive` is currently bound to its
/// topology path, for the physical-ports view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortBinding {
    pub port: Port,
    pub drive: Option<Drive>,
}

/// Validate that no two ports share a `port_topology_path`. Returns the
/// offending path on the first collision found.
pub fn find_duplicate_topology_path(ports: &[Port]) -> Option<&str> {
    let mut seen = std::collections::HashSet::new();
    for port in ports {
        if !seen.insert(port.port_topology_path.as_str()) {
            return Some(port.port_topology_path.as_str());
        }
    }
    None
}

#[cfg(test)]
#[path = "port_tests.rs"]
mod tests;
