// Copyright 2026 Reviewtrack Contributors
// SPDX-License-Identifier: Apache-2.0

//! Run a single check cycle and print what changed.

use anyhow::Result;
use chrono::Utc;

use crate::cli::output;
use crate::report::format_report;

pub async fn run() -> Result<()> {
    let config = super::load_config()?;
    let monitor = super::build_monitor(&config)?;

    let outcome = monitor.run_now().await;
    monitor.shutdown().await;
    let report = outcome?;

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "success": true,
            "message": report.message,
            "changes": report.changes,
        }));
    } else if !output::is_quiet() {
        println!("  {}", report.message);
        if !report.changes.is_empty() {
            println!();
            for line in format_report(&report.changes, Utc::now()).lines() {
                println!("  {line}");
            }
        }
    }
    Ok(())
}
