// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Wires the real adapters (`lsblk`/sysfs inventory, in-process write/verify,
//! `parted`/`resize2fs`/`udisksctl` stage runners) to the engine's
//! [`flash_engine::Orchestrator`] and exposes the process entry point
//! (`flashd`, see `main.rs`). No HTTP server lives here — see
//! `SPEC_FULL.md` §6: this crate is the library an external HTTP surface
//! would hold one `Arc<Orchestrator<_>>` from and call directly.

pub mod build;
pub mod config;
pub mod system_devices;

pub use build::{BuildError, build_orchestrator};
pub use config::Config;
