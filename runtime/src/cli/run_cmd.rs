// Copyright 2026 Reviewtrack Contributors
// SPDX-License-Identifier: Apache-2.0

//! Run the monitor in the foreground until Ctrl-C.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Notify;

use crate::rest::{self, AppState};
use crate::scheduler;

pub async fn run(http_port: Option<u16>) -> Result<()> {
    let config = super::load_config()?;
    let monitor = super::build_monitor(&config)?;
    let shutdown = Arc::new(Notify::new());

    let scheduler_handle = scheduler::spawn(
        monitor.clone(),
        config.schedule.clone(),
        shutdown.clone(),
    );

    let rest_handle = http_port.map(|port| {
        let state = Arc::new(AppState::new(monitor.clone(), config.mode));
        tokio::spawn(async move {
            if let Err(e) = rest::start(port, state).await {
                tracing::error!("REST API stopped: {e:#}");
            }
        })
    });

    tracing::info!(data_dir = %config.data_dir.display(), "reviewtrack running, Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");

    shutdown.notify_one();
    if let Some(handle) = rest_handle {
        handle.abort();
    }
    if let Err(e) = scheduler_handle.await {
        tracing::warn!("scheduler task ended abnormally: {e}");
    }
    Ok(())
}
