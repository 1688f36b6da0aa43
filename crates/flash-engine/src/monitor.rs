// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Speed and ETA smoothing. Raw per-chunk throughput is jittery enough to
//! make the UI flicker, so progress ticks are folded into an exponential
//! moving average before they're surfaced on a [`Job`](flash_core::job::Job).

/// Smooths an instantaneous bytes/sec measurement into a steadier speed
/// estimate and derives an ETA from it. One instance per running job.
pub struct SpeedMonitor {
    /// Smoothing factor in `(0.0, 1.0]`; higher weights recent samples
    /// more heavily. `0.3` settles within roughly the window named in
    /// spec §4.5 ("~2s window") for chunks arriving every few hundred ms.
    alpha: f64,
    ema_bps: Option<f64>,
}

impl SpeedMonitor {
    pub fn new() -> Self {
        Self {
            alpha: 0.3,
            ema_bps: None,
        }
    }

    pub fn with_alpha(alpha: f64) -> Self {
        Self { alpha, ema_bps: None }
    }

    /// Fold in a new instantaneous speed sample, returning the smoothed
    /// estimate.
    pub fn sample(&mut self, instantaneous_bps: f64) -> f64 {
        let next = match self.ema_bps {
            None => instantaneous_bps,
            Some(prev) => self.alpha * instantaneous_bps + (1.0 - self.alpha) * prev,
        };
        self.ema_bps = Some(next);
        next
    }

    pub fn current(&self) -> Option<f64> {
        self.ema_bps
    }

    /// ETA in whole seconds to cover `remaining_bytes` at the current
    /// smoothed speed. `None` until at least one sample has arrived, or if
    /// the smoothed speed is not positive.
    pub fn eta_seconds(&self, remaining_bytes: u64) -> Option<u64> {
        let speed = self.ema_bps?;
        if speed <= 0.0 {
            return None;
        }
        Some((remaining_bytes as f64 / speed).ceil() as u64)
    }
}

impl Default for SpeedMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
