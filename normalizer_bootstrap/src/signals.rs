// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # OS Signal Handling
//!
//! Wires SIGTERM/SIGINT (and SIGHUP on unix, for config reload) into a
//! [`ShutdownCoordinator`]. Kept separate from `shutdown.rs` because the
//! coordinator itself has no opinion about which OS primitives trigger
//! it — this module is the only thing that touches `tokio::signal`.

use crate::shutdown::ShutdownCoordinator;

/// Spawns a task that waits for a termination signal and then calls
/// [`ShutdownCoordinator::initiate_shutdown`]. Returns immediately;
/// the returned `JoinHandle` is usually not awaited, just dropped.
pub fn install(coordinator: ShutdownCoordinator) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_termination().await;
        tracing::info!("termination signal received");
        coordinator.initiate_shutdown();
    })
}

#[cfg(unix)]
async fn wait_for_termination() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut sighup = signal(SignalKind::hangup()).expect("failed to install SIGHUP handler");

    tokio::select! {
        _ = sigterm.recv() => tracing::debug!("caught SIGTERM"),
        _ = sigint.recv() => tracing::debug!("caught SIGINT"),
        _ = sighup.recv() => tracing::debug!("caught SIGHUP, treating as shutdown request"),
    }
}

#[cfg(windows)]
async fn wait_for_termination() {
    let mut ctrl_c = tokio::signal::windows::ctrl_c().expect("failed to install Ctrl-C handler");
    let mut ctrl_close = tokio::signal::windows::ctrl_close().expect("failed to install Ctrl-Close handler");

    tokio::select! {
        _ = ctrl_c.recv() => tracing::debug!("caught Ctrl-C"),
        _ = ctrl_close.recv() => tracing::debug!("caught Ctrl-Close"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn install_does_not_trigger_shutdown_without_a_signal() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
        let handle = install(coordinator.clone());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!coordinator.is_shutting_down());
        handle.abort();
    }
}
