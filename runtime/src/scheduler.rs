// Copyright 2026 Reviewtrack Contributors
// SPDX-License-Identifier: Apache-2.0

//! Periodic check loop.
//!
//! Runs one cycle at startup, then one per interval. A failed cycle is
//! followed by the cooldown instead of the full interval. Shutdown is
//! honoured at every wait.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use crate::config::ScheduleConfig;
use crate::monitor::Monitor;

/// Spawn the check loop until `shutdown` is notified.
pub fn spawn(
    monitor: Arc<Monitor>,
    schedule: ScheduleConfig,
    shutdown: Arc<Notify>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(run(monitor, schedule, shutdown))
}

pub async fn run(monitor: Arc<Monitor>, schedule: ScheduleConfig, shutdown: Arc<Notify>) {
    tracing::info!(
        "scheduler started: interval={}s cooldown={}s",
        schedule.interval.as_secs(),
        schedule.cooldown.as_secs()
    );

    loop {
        let wait = tokio::select! {
            _ = shutdown.notified() => break,
            result = monitor.run_scheduled() => match result {
                Ok(_) => schedule.interval,
                Err(e) => {
                    tracing::warn!(
                        "cycle failed, retrying in {}s: {e}",
                        schedule.cooldown.as_secs()
                    );
                    schedule.cooldown
                }
            },
        };

        if !sleep_or_shutdown(wait, &shutdown).await {
            break;
        }
    }

    monitor.shutdown().await;
    tracing::info!("scheduler stopped");
}

/// False when shutdown arrived first.
async fn sleep_or_shutdown(wait: Duration, shutdown: &Notify) -> bool {
    tokio::select! {
        _ = shutdown.notified() => false,
        _ = tokio::time::sleep(wait) => true,
    }
}
