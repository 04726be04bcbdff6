// Copyright 2026 Reviewtrack Contributors
// SPDX-License-Identifier: Apache-2.0

//! Report sinks: where change records go once a cycle has produced them.
//!
//! A sink sees each record once. Delivery failures are returned to the
//! caller, which logs them; nothing is retried.

pub mod docs;
pub mod jsonl;

use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use reviewtrack::ChangeRecord;

use crate::config::{Config, ReportKind};

pub use self::docs::DocsSink;
pub use self::jsonl::JsonlSink;

/// Receives the change records of one cycle.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Deliver `records`. Must do nothing when `records` is empty.
    async fn report(&self, records: &[ChangeRecord]) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// Writes each record as a structured log event.
pub struct LogSink;

#[async_trait]
impl ReportSink for LogSink {
    async fn report(&self, records: &[ChangeRecord]) -> Result<()> {
        for r in records {
            tracing::info!(
                target: "reviewtrack::report",
                entity = %r.entity_id,
                name = %r.entity_name,
                kind = %r.kind,
                rating_from = r.previous_rating,
                rating_to = r.current_rating,
                count_from = r.previous_count,
                count_to = r.current_count,
                new_reviews = r.new_reviews.len(),
                "review change"
            );
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Build the sink named by the configuration.
pub fn build_sink(config: &Config) -> Result<Arc<dyn ReportSink>> {
    Ok(match config.report.kind {
        ReportKind::Log => Arc::new(LogSink),
        ReportKind::Jsonl => Arc::new(JsonlSink::open(&config.report_path())?),
        ReportKind::Docs => Arc::new(DocsSink::from_config(&config.report, config.api.timeout_ms)?),
    })
}

/// Render records as plain text, one block per entity.
pub fn format_report(records: &[ChangeRecord], generated_at: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Review changes, {}",
        generated_at.format("%Y-%m-%d %H:%M UTC")
    );

    for r in records {
        let _ = writeln!(out);
        let _ = writeln!(out, "{} ({})", r.entity_name, r.kind.as_str().replace('_', " "));
        let _ = writeln!(
            out,
            "Rating: {:.1} -> {:.1} ({:+.2})",
            r.previous_rating,
            r.current_rating,
            r.rating_delta()
        );
        let _ = writeln!(
            out,
            "Reviews: {} -> {} ({:+})",
            r.previous_count,
            r.current_count,
            r.count_delta()
        );
        for review in &r.new_reviews {
            let author = if review.author.is_empty() {
                "Anonymous"
            } else {
                review.author.as_str()
            };
            let _ = write!(
                out,
                "  - {} {} on {}",
                stars(review.rating),
                author,
                review.published_at.format("%Y-%m-%d")
            );
            match review.text.as_deref() {
                Some(text) => {
                    let _ = writeln!(out, ": {}", truncate(text, 280));
                }
                None => {
                    let _ = writeln!(out);
                }
            }
        }
    }
    out
}

fn stars(rating: u8) -> String {
    if rating == 0 {
        return "(no rating)".to_string();
    }
    let filled = rating.min(5) as usize;
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

fn truncate(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}
