// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment-driven tuning knobs for the scheduler and event bus, read
//! once at daemon startup. Mirrors `flash_adapters::env`'s plain
//! `std::env::var` + typed default convention rather than a config file.

use std::path::PathBuf;
use std::time::Duration;

/// Default global concurrency cap applied before any `start_batch` call
/// supplies its own, per spec §4.5.
pub fn default_concurrency_limit() -> usize {
    std::env::var("FLASHD_DEFAULT_CONCURRENCY")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(2)
}

/// Directory `Orchestrator::start_batch` resolves `image_name` against.
pub fn images_dir() -> PathBuf {
    std::env::var("FLASHD_IMAGES_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("images"))
}

/// Size of each subscriber's bounded event ring buffer, per spec §4.6
/// ("e.g. 256 events").
pub fn event_buffer_capacity() -> usize {
    std::env::var("FLASHD_EVENT_BUFFER_CAPACITY")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(256)
}

/// Coalescing window for `job_log` bursts, per spec §4.6 ("e.g. 100 ms").
pub fn job_log_coalesce_window() -> Duration {
    std::env::var("FLASHD_JOB_LOG_COALESCE_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or_else(|| Duration::from_millis(100))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
