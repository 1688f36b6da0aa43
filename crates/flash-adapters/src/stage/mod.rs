// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stage runners: one type per pipeline step, each a thin wrapper around
//! either in-process I/O (write, verify) or an external tool (expand,
//! resize, eject) behind the same [`runner::StageRunner`] trait.

pub mod eject;
pub mod expand;
pub mod resize;
pub mod runner;
pub mod verify;
pub mod write;

#[cfg(feature = "test-support")]
pub mod fake;

pub use eject::EjectRunner;
pub use expand::ExpandRunner;
pub use resize::{FilesystemKind, ResizeRunner};
pub use runner::{DigestCache, ProgressReport, ProgressSink, StageContext, StageRunner};
pub use verify::VerifyRunner;
pub use write::WriteRunner;
