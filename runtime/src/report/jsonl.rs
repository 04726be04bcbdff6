// Copyright 2026 Reviewtrack Contributors
// SPDX-License-Identifier: Apache-2.0

//! JSONL report sink. One change record per line, append-only.
//!
//! Rotates to `.1`, `.2`, ... once the file exceeds `MAX_LOG_SIZE`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use reviewtrack::ChangeRecord;

use super::ReportSink;

/// Maximum report file size before rotation (50 MB).
const MAX_LOG_SIZE: u64 = 50 * 1024 * 1024;

/// Maximum number of rotated files to keep.
const MAX_ROTATIONS: u32 = 5;

#[derive(Serialize)]
struct ReportLine<'a> {
    reported_at: DateTime<Utc>,
    #[serde(flatten)]
    record: &'a ChangeRecord,
}

struct Writer {
    file: File,
    current_size: u64,
}

pub struct JsonlSink {
    path: PathBuf,
    writer: Mutex<Writer>,
}

impl JsonlSink {
    /// Open or create the report file.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = open_append(path)?;
        let current_size = file.metadata().map(|m| m.len()).unwrap_or(0);
        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(Writer { file, current_size }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rotate files: reports.jsonl → reports.jsonl.1, .1 → .2, etc.
    fn rotate(&self, writer: &mut Writer) -> Result<()> {
        writer.file.flush()?;

        for i in (1..MAX_ROTATIONS).rev() {
            let from = rotation_path(&self.path, i);
            if from.exists() {
                let _ = std::fs::rename(&from, rotation_path(&self.path, i + 1));
            }
        }
        let _ = std::fs::rename(&self.path, rotation_path(&self.path, 1));

        writer.file = open_append(&self.path)?;
        writer.current_size = 0;
        Ok(())
    }
}

#[async_trait]
impl ReportSink for JsonlSink {
    async fn report(&self, records: &[ChangeRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| anyhow::anyhow!("report writer lock poisoned"))?;
        if writer.current_size >= MAX_LOG_SIZE {
            self.rotate(&mut writer)?;
        }

        let reported_at = Utc::now();
        for record in records {
            let json = serde_json::to_string(&ReportLine {
                reported_at,
                record,
            })?;
            writeln!(writer.file, "{json}")
                .with_context(|| format!("writing {}", self.path.display()))?;
            writer.current_size += json.len() as u64 + 1;
        }
        writer.file.flush()?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "jsonl"
    }
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open report file: {}", path.display()))
}

fn rotation_path(base: &Path, index: u32) -> PathBuf {
    let name = format!(
        "{}.{index}",
        base.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("reports.jsonl")
    );
    base.with_file_name(name)
}
