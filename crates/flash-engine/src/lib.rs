// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The Flash Job Orchestrator's engine: the Batch Scheduler, the per-job
//! Executor driving the Job State Machine through its Stage Runners, the
//! Event Bus fanning progress and log events out to subscribers, and the
//! `Orchestrator` facade tying all of it to one process-wide instance.

pub mod env;
pub mod error;
pub mod event_bus;
pub mod events;
pub mod executor;
pub mod monitor;
pub mod orchestrator;
pub mod scheduler;

pub use error::EngineError;
pub use event_bus::{EventBus, Subscription};
pub use executor::{Executor, StageRunners};
pub use monitor::SpeedMonitor;
pub use orchestrator::Orchestrator;
pub use scheduler::Scheduler;
