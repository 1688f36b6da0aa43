// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `flashd`: the Flash Job Orchestrator daemon process.
//!
//! Builds the real [`flash_engine::Orchestrator`] over the host's block
//! devices and drives its two background duties — periodic `job_log`
//! coalescing and graceful shutdown — until terminated. No network
//! listener lives here; see `SPEC_FULL.md` §6 for what an HTTP surface
//! embedding this crate would call directly against the same
//! `Arc<Orchestrator<_>>`.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use flash_daemon::{Config, build_orchestrator};
use tokio::signal::unix::{SignalKind, signal};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("flashd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: flashd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load();
    let _log_guard = setup_logging(&config)?;

    info!("starting flash job orchestrator daemon");

    let orchestrator = build_orchestrator(&config).await?;

    spawn_log_flush_task(orchestrator.clone());

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(images_dir = %config.images_dir.display(), "daemon ready");
    println!("READY");

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }

    // Signal every running job to unwind; we do not wait for them here,
    // mirroring cancel_batch's fire-and-forget contract (spec §4.5) — the
    // process exiting tears down their tokio tasks regardless.
    orchestrator.cancel_batch();
    info!("daemon stopped");
    Ok(())
}

fn print_help() {
    println!("flashd {}", env!("CARGO_PKG_VERSION"));
    println!("Flash Job Orchestrator daemon — writes a disk image to many removable");
    println!("USB block devices in parallel.");
    println!();
    println!("USAGE:");
    println!("    flashd");
    println!();
    println!("flashd has no network listener; it is a library entry point for an");
    println!("external control surface to embed and drive via flash-engine's");
    println!("Orchestrator facade.");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Print help information");
    println!("    -v, --version    Print version information");
}

/// Drives [`flash_engine::Orchestrator::flush_logs`] on
/// [`flash_engine::env::job_log_coalesce_window`], coalescing bursty
/// `job_log` pushes into a single `JobEvent::Log` per tick per job.
fn spawn_log_flush_task<C: flash_core::clock::Clock>(
    orchestrator: std::sync::Arc<flash_engine::Orchestrator<C>>,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(flash_engine::env::job_log_coalesce_window());
        loop {
            interval.tick().await;
            orchestrator.flush_logs();
        }
    });
}

fn setup_logging(
    config: &flash_daemon::Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, std::io::Error> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_name = config
        .log_path
        .file_name()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "log path has no file name"))?;
    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().unwrap_or_else(|| std::path::Path::new(".")),
        file_name,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
