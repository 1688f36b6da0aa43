// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon-wide configuration, read once at startup. Mirrors the teacher's
//! `daemon/src/env.rs` + `lifecycle::Config` split: a small typed struct
//! assembled from `std::env::var` lookups with sane defaults, rather than a
//! config file — matching every other env-driven knob in this workspace.

use std::path::PathBuf;

use flash_adapters::FilesystemKind;

/// Where the daemon keeps its log file. Resolution order: `FLASHD_STATE_DIR`
/// > `XDG_STATE_HOME/flashd` > `~/.local/state/flashd`.
fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("FLASHD_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("flashd");
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".local/state/flashd")
}

/// Which filesystem-growth tool the Resize stage invokes. This workstation
/// images one filesystem family across every cell in a run (see
/// DESIGN.md's resolution of the open question around per-partition
/// fstype detection), so one global choice rather than per-job detection
/// is the pragmatic default; operators imaging a different filesystem
/// family override it with `FLASHD_RESIZE_FILESYSTEM=btrfs`, or disable
/// the stage's tool dispatch entirely with `=none` (every Resize then
/// warns and no-ops, which is harmless since Resize failures are
/// non-fatal per spec §7).
fn resize_filesystem() -> FilesystemKind {
    match std::env::var("FLASHD_RESIZE_FILESYSTEM").as_deref() {
        Ok("btrfs") => FilesystemKind::Btrfs,
        Ok("none") => FilesystemKind::Unknown,
        _ => FilesystemKind::Ext,
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory `start_batch` resolves `image_name` against.
    pub images_dir: PathBuf,
    pub log_path: PathBuf,
    pub resize_filesystem: FilesystemKind,
}

impl Config {
    pub fn load() -> Self {
        let state_dir = state_dir();
        Self {
            images_dir: flash_engine::env::images_dir(),
            log_path: state_dir.join("flashd.log"),
            resize_filesystem: resize_filesystem(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
