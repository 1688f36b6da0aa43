// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment-driven tuning knobs for the stage runners. Every knob has a
//! sane default so the daemon runs unconfigured; operators override via env
//! vars rather than a config file, matching the rest of the ambient stack.

use std::time::Duration;

fn duration_secs_from_env(key: &str, default_secs: u64) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(default_secs))
}

/// Per-stage timeouts, read once at daemon startup.
#[derive(Debug, Clone, Copy)]
pub struct StageTimeouts {
    pub write: Duration,
    pub verify: Duration,
    pub expand: Duration,
    pub resize: Duration,
    pub eject: Duration,
}

impl StageTimeouts {
    /// Defaults match spec §5 exactly: write/verify default to 30 minutes
    /// (see [`Self::scaled_for_image`] for the image-size scaling factor),
    /// expand/resize/eject default to 60 seconds each.
    pub fn from_env() -> Self {
        Self {
            write: duration_secs_from_env("FLASHD_WRITE_TIMEOUT_SECS", 1800),
            verify: duration_secs_from_env("FLASHD_VERIFY_TIMEOUT_SECS", 1800),
            expand: duration_secs_from_env("FLASHD_EXPAND_TIMEOUT_SECS", 60),
            resize: duration_secs_from_env("FLASHD_RESIZE_TIMEOUT_SECS", 60),
            eject: duration_secs_from_env("FLASHD_EJECT_TIMEOUT_SECS", 60),
        }
    }

    /// Scale the write/verify timeouts to the image being flashed, per spec
    /// §5 ("write: 30 min default × image-size scaling"). One timeout unit
    /// per 4 GiB of uncompressed image, with the configured value as a
    /// floor — a 512 MiB image still gets the full default window, a 64 GiB
    /// image gets proportionally more. Unknown length (an undetermined
    /// compressed stream) keeps the configured default unscaled.
    pub fn scaled_for_image(&self, uncompressed_bytes: Option<u64>) -> Self {
        const SCALING_UNIT_BYTES: u64 = 4 * 1024 * 1024 * 1024;
        let factor = match uncompressed_bytes {
            Some(bytes) => ((bytes as f64 / SCALING_UNIT_BYTES as f64).ceil() as u32).max(1),
            None => 1,
        };
        Self {
            write: self.write * factor,
            verify: self.verify * factor,
            expand: self.expand,
            resize: self.resize,
            eject: self.eject,
        }
    }
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            write: Duration::from_secs(1800),
            verify: Duration::from_secs(1800),
            expand: Duration::from_secs(60),
            resize: Duration::from_secs(60),
            eject: Duration::from_secs(60),
        }
    }
}

/// Size of the in-process copy buffer used by write and verify, per spec
/// §4.2 ("4 MiB blocks").
pub fn write_block_size() -> usize {
    std::env::var("FLASHD_BLOCK_SIZE_BYTES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(4 * 1024 * 1024)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
