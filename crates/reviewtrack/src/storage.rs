// Copyright 2026 Reviewtrack Contributors
// SPDX-License-Identifier: Apache-2.0

//! Baseline storage: the last-known snapshot per entity.
//!
//! The JSON store keeps one `baselines/<entity>.json` file per entity,
//! replaced atomically on every `put`, plus an append-only
//! `history/<entity>.jsonl` with every snapshot ever written.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::types::{Snapshot, TrackError, TrackResult};

/// Durable owner of the latest snapshot for each entity.
pub trait BaselineStore: Send + Sync {
    /// The baseline for `entity_id`, or `None` if none was ever written.
    fn get(&self, entity_id: &str) -> TrackResult<Option<Snapshot>>;
    /// Replace the baseline for `snapshot.entity_id`.
    fn put(&self, snapshot: &Snapshot) -> TrackResult<()>;
    /// Every stored baseline, ordered by entity id.
    fn list_all(&self) -> TrackResult<Vec<Snapshot>>;
    /// Past snapshots for an entity, newest first, at most `limit`.
    fn history(&self, entity_id: &str, limit: usize) -> TrackResult<Vec<Snapshot>>;
}

/// File-backed store rooted at a data directory.
pub struct JsonBaselineStore {
    baseline_dir: PathBuf,
    history_dir: PathBuf,
}

impl JsonBaselineStore {
    /// Create or open a store under `root`.
    pub fn open(root: impl AsRef<Path>) -> TrackResult<Self> {
        let root = root.as_ref();
        let baseline_dir = root.join("baselines");
        let history_dir = root.join("history");
        std::fs::create_dir_all(&baseline_dir)?;
        std::fs::create_dir_all(&history_dir)?;
        Ok(Self {
            baseline_dir,
            history_dir,
        })
    }

    fn baseline_path(&self, entity_id: &str) -> TrackResult<PathBuf> {
        Ok(self
            .baseline_dir
            .join(format!("{}.json", file_stem(entity_id)?)))
    }

    fn history_path(&self, entity_id: &str) -> TrackResult<PathBuf> {
        Ok(self
            .history_dir
            .join(format!("{}.jsonl", file_stem(entity_id)?)))
    }
}

impl BaselineStore for JsonBaselineStore {
    fn get(&self, entity_id: &str) -> TrackResult<Option<Snapshot>> {
        let path = self.baseline_path(entity_id)?;
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read(&path)?;
        Ok(Some(serde_json::from_slice(&data)?))
    }

    fn put(&self, snapshot: &Snapshot) -> TrackResult<()> {
        let path = self.baseline_path(&snapshot.entity_id)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(snapshot)?)?;
        std::fs::rename(&tmp, &path)?;

        let mut line = serde_json::to_vec(snapshot)?;
        line.push(b'\n');
        let mut history = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.history_path(&snapshot.entity_id)?)?;
        history.write_all(&line)?;
        Ok(())
    }

    fn list_all(&self) -> TrackResult<Vec<Snapshot>> {
        let mut out = Vec::new();
        for entry in std::fs::read_dir(&self.baseline_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let data = std::fs::read(&path)?;
            match serde_json::from_slice::<Snapshot>(&data) {
                Ok(snap) => out.push(snap),
                Err(e) => {
                    tracing::warn!("skipping unreadable baseline {}: {e}", path.display());
                }
            }
        }
        out.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        Ok(out)
    }

    fn history(&self, entity_id: &str, limit: usize) -> TrackResult<Vec<Snapshot>> {
        let path = self.history_path(entity_id)?;
        if !path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(std::fs::File::open(&path)?);
        let mut snaps = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            // A torn final line from a crash mid-append is skipped.
            if let Ok(snap) = serde_json::from_str::<Snapshot>(&line) {
                snaps.push(snap);
            }
        }
        snaps.reverse();
        snaps.truncate(limit);
        Ok(snaps)
    }
}

/// Map an entity id to a file stem. Form encoding is injective, so
/// distinct ids never share a file.
fn file_stem(entity_id: &str) -> TrackResult<String> {
    if entity_id.trim().is_empty() || entity_id.starts_with('.') {
        return Err(TrackError::InvalidEntity(format!(
            "cannot store snapshot for id '{entity_id}'"
        )));
    }
    Ok(url::form_urlencoded::byte_serialize(entity_id.as_bytes()).collect())
}

/// In-process store, used by tests and embedders that bring their own
/// persistence.
#[derive(Default)]
pub struct MemoryBaselineStore {
    inner: RwLock<HashMap<String, Vec<Snapshot>>>,
}

impl MemoryBaselineStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BaselineStore for MemoryBaselineStore {
    fn get(&self, entity_id: &str) -> TrackResult<Option<Snapshot>> {
        let guard = self
            .inner
            .read()
            .map_err(|_| TrackError::Io(std::io::Error::other("baseline lock poisoned")))?;
        Ok(guard.get(entity_id).and_then(|h| h.last().cloned()))
    }

    fn put(&self, snapshot: &Snapshot) -> TrackResult<()> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| TrackError::Io(std::io::Error::other("baseline lock poisoned")))?;
        guard
            .entry(snapshot.entity_id.clone())
            .or_default()
            .push(snapshot.clone());
        Ok(())
    }

    fn list_all(&self) -> TrackResult<Vec<Snapshot>> {
        let guard = self
            .inner
            .read()
            .map_err(|_| TrackError::Io(std::io::Error::other("baseline lock poisoned")))?;
        let mut out: Vec<Snapshot> = guard.values().filter_map(|h| h.last().cloned()).collect();
        out.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        Ok(out)
    }

    fn history(&self, entity_id: &str, limit: usize) -> TrackResult<Vec<Snapshot>> {
        let guard = self
            .inner
            .read()
            .map_err(|_| TrackError::Io(std::io::Error::other("baseline lock poisoned")))?;
        Ok(guard
            .get(entity_id)
            .map(|h| h.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}
