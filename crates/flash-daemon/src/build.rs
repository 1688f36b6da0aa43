// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Assembles the real, process-wide [`Orchestrator`] from [`Config`]: the
//! `lsblk`/sysfs-backed inventory, the five real stage runners, and the
//! id/clock/concurrency knobs read from the environment. Exactly one of
//! these is built per daemon lifetime, per spec §9 ("a single process-wide
//! scheduler instance is created at startup... no implicit
//! re-initialisation").

use std::sync::Arc;

use flash_adapters::{DeviceInventory, EjectRunner, ExpandRunner, ResizeRunner, SystemInventory, VerifyRunner, WriteRunner};
use flash_core::clock::SystemClock;
use flash_core::id::UuidIdGen;
use flash_engine::{Orchestrator, StageRunners};
use thiserror::Error;

use crate::config::Config;
use crate::system_devices::{self, SystemDeviceError};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    SystemDevices(#[from] SystemDeviceError),
}

pub async fn build_orchestrator(config: &Config) -> Result<Arc<Orchestrator<SystemClock>>, BuildError> {
    let system_devices = system_devices::detect().await?;
    tracing::info!(devices = ?system_devices, "resolved system/boot disks the Safety Gate will always reject");

    let inventory: Arc<dyn DeviceInventory> = Arc::new(SystemInventory::new(system_devices));

    let timeouts = flash_adapters::env::StageTimeouts::from_env();
    let block_size = flash_adapters::env::write_block_size();

    let runners = StageRunners {
        write: Arc::new(WriteRunner::new(block_size, timeouts.write)),
        verify: Arc::new(VerifyRunner::new(block_size, timeouts.verify)),
        expand: Arc::new(ExpandRunner::new(timeouts.expand)),
        resize: Arc::new(ResizeRunner::new(timeouts.resize, config.resize_filesystem)),
        eject: Arc::new(EjectRunner::new(timeouts.eject)),
    };

    Ok(Orchestrator::new(
        inventory,
        runners,
        config.images_dir.clone(),
        SystemClock,
        Arc::new(UuidIdGen),
        flash_engine::env::default_concurrency_limit(),
        flash_engine::env::event_buffer_capacity(),
    ))
}
