// Copyright 2026 Reviewtrack Contributors
// SPDX-License-Identifier: Apache-2.0

//! CLI subcommand implementations for the reviewtrack binary.

pub mod baselines_cmd;
pub mod check_cmd;
pub mod entities_cmd;
pub mod output;
pub mod run_cmd;

use std::sync::Arc;

use anyhow::{Context, Result};

use reviewtrack::{JsonBaselineStore, JsonEntityRegistry};

use crate::acquisition::SourceSelector;
use crate::config::Config;
use crate::engine::ChangeDetector;
use crate::monitor::Monitor;
use crate::report::build_sink;

/// Load configuration from the environment and reject unusable setups.
pub fn load_config() -> Result<Config> {
    let config = Config::from_env().context("invalid configuration")?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Load configuration without credential checks, for commands that only
/// touch local data.
pub fn load_local_config() -> Result<Config> {
    Config::from_env().context("invalid configuration")
}

pub fn open_registry(config: &Config) -> JsonEntityRegistry {
    JsonEntityRegistry::new(config.entities_path())
}

pub fn open_store(config: &Config) -> Result<JsonBaselineStore> {
    JsonBaselineStore::open(&config.data_dir)
        .with_context(|| format!("cannot open data dir {}", config.data_dir.display()))
}

/// Wire registry, source, store and sink into a monitor.
pub fn build_monitor(config: &Config) -> Result<Arc<Monitor>> {
    let source = SourceSelector::from_config(config)?;
    tracing::info!(mode = config.mode.as_str(), "acquisition source selected");

    let detector = ChangeDetector::new(Arc::new(source), Arc::new(open_store(config)?));
    let sink = build_sink(config)?;
    tracing::info!(sink = sink.name(), "report sink ready");

    Ok(Arc::new(Monitor::new(
        Arc::new(open_registry(config)),
        detector,
        sink,
    )))
}
