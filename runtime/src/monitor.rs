// Copyright 2026 Reviewtrack Contributors
// SPDX-License-Identifier: Apache-2.0

//! Cycle runner shared by the scheduler, the REST surface and the CLI.
//!
//! At most one cycle runs at a time. On-demand triggers that arrive while a
//! cycle is in flight are rejected; timer triggers wait their turn.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

use reviewtrack::{ChangeRecord, EntityRegistry};

use crate::engine::ChangeDetector;
use crate::report::ReportSink;

#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("a check cycle is already running")]
    AlreadyRunning,

    #[error("check cycle failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Running,
}

/// Outcome of a finished cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub changes: Vec<ChangeRecord>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonitorStatus {
    pub state: SchedulerState,
    pub last_started_at: Option<DateTime<Utc>>,
    pub last_finished_at: Option<DateTime<Utc>>,
    /// Human-readable result of the last cycle.
    pub last_outcome: Option<String>,
    pub last_change_count: usize,
    pub cycles_completed: u64,
}

impl Default for MonitorStatus {
    fn default() -> Self {
        Self {
            state: SchedulerState::Idle,
            last_started_at: None,
            last_finished_at: None,
            last_outcome: None,
            last_change_count: 0,
            cycles_completed: 0,
        }
    }
}

pub struct Monitor {
    registry: Arc<dyn EntityRegistry>,
    detector: ChangeDetector,
    sink: Arc<dyn ReportSink>,
    cycle: Mutex<()>,
    status: RwLock<MonitorStatus>,
}

impl Monitor {
    pub fn new(
        registry: Arc<dyn EntityRegistry>,
        detector: ChangeDetector,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            registry,
            detector,
            sink,
            cycle: Mutex::new(()),
            status: RwLock::new(MonitorStatus::default()),
        }
    }

    pub fn registry(&self) -> &Arc<dyn EntityRegistry> {
        &self.registry
    }

    pub fn detector(&self) -> &ChangeDetector {
        &self.detector
    }

    pub fn status(&self) -> MonitorStatus {
        self.status
            .read()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Run a cycle now, or fail fast if one is already running.
    pub async fn run_now(&self) -> Result<CycleReport, CycleError> {
        let Ok(_guard) = self.cycle.try_lock() else {
            tracing::info!("on-demand check rejected, cycle already running");
            return Err(CycleError::AlreadyRunning);
        };
        self.run_locked("on-demand").await
    }

    /// Run a cycle once any in-flight one has finished.
    pub async fn run_scheduled(&self) -> Result<CycleReport, CycleError> {
        let _guard = self.cycle.lock().await;
        self.run_locked("scheduled").await
    }

    /// Release long-lived acquisition resources.
    pub async fn shutdown(&self) {
        self.detector.source().shutdown().await;
    }

    async fn run_locked(&self, trigger: &str) -> Result<CycleReport, CycleError> {
        let started = Utc::now();
        self.update_status(|s| {
            s.state = SchedulerState::Running;
            s.last_started_at = Some(started);
        });
        tracing::info!(trigger, "check cycle started");

        let result = self.cycle_body().await;

        let finished = Utc::now();
        self.update_status(|s| {
            s.state = SchedulerState::Idle;
            s.last_finished_at = Some(finished);
            s.cycles_completed += 1;
            match &result {
                Ok(report) => {
                    s.last_outcome = Some(report.message.clone());
                    s.last_change_count = report.changes.len();
                }
                Err(e) => {
                    s.last_outcome = Some(e.to_string());
                    s.last_change_count = 0;
                }
            }
        });

        match &result {
            Ok(report) => tracing::info!(
                trigger,
                changes = report.changes.len(),
                elapsed_ms = (finished - started).num_milliseconds(),
                "check cycle finished"
            ),
            Err(e) => tracing::error!(trigger, "check cycle failed: {e}"),
        }
        result
    }

    async fn cycle_body(&self) -> Result<CycleReport, CycleError> {
        let entities = self
            .registry
            .list_entities()
            .map_err(|e| CycleError::Failed(format!("cannot read entity registry: {e}")))?;

        self.detector.source().reinitialize().await;

        let active = entities.iter().filter(|e| e.active).count();
        let changes = self.detector.run_cycle(&entities).await;

        if let Err(e) = self.sink.report(&changes).await {
            tracing::warn!(sink = self.sink.name(), "report delivery failed: {e:#}");
        }

        let message = match changes.len() {
            0 => format!("checked {active} entities, no changes"),
            1 => format!("checked {active} entities, 1 change detected"),
            n => format!("checked {active} entities, {n} changes detected"),
        };
        Ok(CycleReport { changes, message })
    }

    fn update_status(&self, f: impl FnOnce(&mut MonitorStatus)) {
        if let Ok(mut s) = self.status.write() {
            f(&mut s);
        }
    }
}
