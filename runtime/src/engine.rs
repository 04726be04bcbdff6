// Copyright 2026 Reviewtrack Contributors
// SPDX-License-Identifier: Apache-2.0

//! Change-detection engine.
//!
//! Per entity: acquire the current snapshot, compare it with the stored
//! baseline, and replace the baseline with what was just observed. The
//! engine never fails a cycle because of one entity.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;

use reviewtrack::{detect_changes, BaselineStore, ChangeRecord, Entity};

use crate::acquisition::ReviewSource;

pub struct ChangeDetector {
    source: Arc<dyn ReviewSource>,
    store: Arc<dyn BaselineStore>,
}

impl ChangeDetector {
    pub fn new(source: Arc<dyn ReviewSource>, store: Arc<dyn BaselineStore>) -> Self {
        Self { source, store }
    }

    pub fn source(&self) -> &Arc<dyn ReviewSource> {
        &self.source
    }

    pub fn store(&self) -> &Arc<dyn BaselineStore> {
        &self.store
    }

    /// Check one entity. `Ok(None)` covers "no data", first observation and
    /// "nothing moved".
    pub async fn check_entity(&self, entity: &Entity) -> Result<Option<ChangeRecord>> {
        let Some(current) = self.source.acquire(entity).await? else {
            tracing::info!(entity = %entity.id, "no data this cycle, baseline kept");
            return Ok(None);
        };

        let baseline = match self.store.get(&entity.id) {
            Ok(baseline) => baseline,
            Err(e) => {
                tracing::warn!(entity = %entity.id, "baseline unreadable, treating as absent: {e}");
                None
            }
        };

        let record = match &baseline {
            None => {
                tracing::info!(
                    entity = %entity.id,
                    rating = current.rating,
                    reviews = current.review_count,
                    "first observation, baseline established"
                );
                None
            }
            Some(prev) => detect_changes(prev, &current, self.source.kind(), Utc::now()),
        };

        if let Err(e) = self.store.put(&current) {
            tracing::error!(entity = %entity.id, "failed to persist baseline: {e}");
        }

        if let Some(r) = &record {
            tracing::info!(
                entity = %r.entity_id,
                kind = %r.kind,
                rating_from = r.previous_rating,
                rating_to = r.current_rating,
                count_from = r.previous_count,
                count_to = r.current_count,
                new_reviews = r.new_reviews.len(),
                "change detected"
            );
        }
        Ok(record)
    }

    /// Check every active entity in order.
    pub async fn run_cycle(&self, entities: &[Entity]) -> Vec<ChangeRecord> {
        let mut records = Vec::new();
        for entity in entities {
            if !entity.active {
                tracing::debug!(entity = %entity.id, "inactive, skipped");
                continue;
            }
            match self.check_entity(entity).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => tracing::warn!(entity = %entity.id, "check failed: {e:#}"),
            }
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use reviewtrack::{
        ChangeKind, MemoryBaselineStore, Review, Snapshot, SourceKind, TrackError, TrackResult,
    };
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Source that serves whatever the test last scripted per entity.
    struct ScriptedSource {
        kind: SourceKind,
        snapshots: Mutex<HashMap<String, Option<Snapshot>>>,
        failing: Vec<String>,
    }

    impl ScriptedSource {
        fn new(kind: SourceKind) -> Self {
            Self {
                kind,
                snapshots: Mutex::new(HashMap::new()),
                failing: Vec::new(),
            }
        }
        fn set(&self, snap: Snapshot) {
            self.snapshots
                .lock()
                .unwrap()
                .insert(snap.entity_id.clone(), Some(snap));
        }
        fn set_none(&self, id: &str) {
            self.snapshots.lock().unwrap().insert(id.to_string(), None);
        }
    }

    #[async_trait]
    impl ReviewSource for ScriptedSource {
        async fn acquire(&self, entity: &Entity) -> Result<Option<Snapshot>> {
            if self.failing.contains(&entity.id) {
                anyhow::bail!("adapter exploded");
            }
            Ok(self
                .snapshots
                .lock()
                .unwrap()
                .get(&entity.id)
                .cloned()
                .flatten())
        }
        fn kind(&self) -> SourceKind {
            self.kind
        }
    }

    /// Store whose reads always fail.
    struct BrokenReads(MemoryBaselineStore);

    impl BaselineStore for BrokenReads {
        fn get(&self, _entity_id: &str) -> TrackResult<Option<Snapshot>> {
            Err(TrackError::NotFound("disk on fire".into()))
        }
        fn put(&self, snapshot: &Snapshot) -> TrackResult<()> {
            self.0.put(snapshot)
        }
        fn list_all(&self) -> TrackResult<Vec<Snapshot>> {
            self.0.list_all()
        }
        fn history(&self, entity_id: &str, limit: usize) -> TrackResult<Vec<Snapshot>> {
            self.0.history(entity_id, limit)
        }
    }

    fn t0() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn review(id: &str, author: &str, stars: u8, days: i64) -> Review {
        Review {
            id: id.to_string(),
            author: author.to_string(),
            rating: stars,
            text: Some(format!("{author} says hi")),
            published_at: t0() + Duration::days(days),
            author_url: None,
            photo_url: None,
        }
    }

    fn snap(id: &str, rating: f64, count: u64, reviews: Vec<Review>, kind: SourceKind) -> Snapshot {
        Snapshot {
            entity_id: id.to_string(),
            name: format!("Place {id}"),
            rating,
            review_count: count,
            reviews,
            observed_at: t0(),
            source: kind,
        }
    }

    fn detector(source: Arc<ScriptedSource>) -> (ChangeDetector, Arc<MemoryBaselineStore>) {
        let store = Arc::new(MemoryBaselineStore::new());
        (ChangeDetector::new(source, store.clone()), store)
    }

    #[tokio::test]
    async fn test_first_observation_sets_baseline_only() {
        let src = Arc::new(ScriptedSource::new(SourceKind::Structured));
        src.set(snap("a", 4.5, 10, vec![], SourceKind::Structured));
        let (engine, store) = detector(src);

        let records = engine.run_cycle(&[Entity::new("a", "A")]).await;
        assert!(records.is_empty());
        assert_eq!(store.get("a").unwrap().unwrap().review_count, 10);
    }

    #[tokio::test]
    async fn test_repeat_cycle_is_noop() {
        let src = Arc::new(ScriptedSource::new(SourceKind::Structured));
        src.set(snap("a", 4.5, 10, vec![review("r1", "Ann", 5, 0)], SourceKind::Structured));
        let (engine, _) = detector(src);
        let entities = [Entity::new("a", "A")];

        engine.run_cycle(&entities).await;
        assert!(engine.run_cycle(&entities).await.is_empty());
        assert!(engine.run_cycle(&entities).await.is_empty());
    }

    #[tokio::test]
    async fn test_new_review_detected_then_absorbed() {
        let src = Arc::new(ScriptedSource::new(SourceKind::Structured));
        src.set(snap("a", 4.2, 100, vec![review("r1", "Ann", 4, 0)], SourceKind::Structured));
        let (engine, _) = detector(src.clone());
        let entities = [Entity::new("a", "A")];
        engine.run_cycle(&entities).await;

        src.set(snap(
            "a",
            4.5,
            103,
            vec![
                review("r2", "Bo", 5, 2),
                review("r1", "Ann", 4, 0),
                review("r3", "Cy", 5, 3),
            ],
            SourceKind::Structured,
        ));
        let records = engine.run_cycle(&entities).await;
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.kind, ChangeKind::Both);
        assert_eq!(r.previous_count, 100);
        assert_eq!(r.current_count, 103);
        let ids: Vec<_> = r.new_reviews.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["r3", "r2"]);

        // The new baseline already holds these reviews.
        assert!(engine.run_cycle(&entities).await.is_empty());
    }

    #[tokio::test]
    async fn test_rating_tolerance() {
        let src = Arc::new(ScriptedSource::new(SourceKind::Structured));
        src.set(snap("a", 4.50, 10, vec![], SourceKind::Structured));
        let (engine, _) = detector(src.clone());
        let entities = [Entity::new("a", "A")];
        engine.run_cycle(&entities).await;

        src.set(snap("a", 4.51, 10, vec![], SourceKind::Structured));
        assert!(engine.run_cycle(&entities).await.is_empty());

        src.set(snap("a", 4.53, 10, vec![], SourceKind::Structured));
        let records = engine.run_cycle(&entities).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, ChangeKind::RatingOnly);
    }

    #[tokio::test]
    async fn test_extraction_novelty_ignores_fresh_ids() {
        let src = Arc::new(ScriptedSource::new(SourceKind::Extraction));
        src.set(snap(
            "a",
            4.0,
            20,
            vec![review("scrape-1", "Ann", 4, 0)],
            SourceKind::Extraction,
        ));
        let (engine, _) = detector(src.clone());
        let entities = [Entity::new("a", "A")];
        engine.run_cycle(&entities).await;

        src.set(snap(
            "a",
            4.0,
            21,
            vec![
                review("scrape-9", "Bo", 2, 1),
                review("scrape-7", "Ann", 4, 0),
            ],
            SourceKind::Extraction,
        ));
        let records = engine.run_cycle(&entities).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, ChangeKind::NewReviewsOnly);
        assert_eq!(records[0].new_reviews.len(), 1);
        assert_eq!(records[0].new_reviews[0].author, "Bo");
    }

    #[tokio::test]
    async fn test_no_data_keeps_baseline() {
        let src = Arc::new(ScriptedSource::new(SourceKind::Structured));
        src.set(snap("a", 4.5, 10, vec![], SourceKind::Structured));
        let (engine, store) = detector(src.clone());
        let entities = [Entity::new("a", "A")];
        engine.run_cycle(&entities).await;

        src.set_none("a");
        assert!(engine.run_cycle(&entities).await.is_empty());
        assert_eq!(store.get("a").unwrap().unwrap().rating, 4.5);
        assert_eq!(store.history("a", 10).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_errors_are_isolated_per_entity() {
        let mut src = ScriptedSource::new(SourceKind::Structured);
        src.failing.push("b".to_string());
        let src = Arc::new(src);
        for id in ["a", "c"] {
            src.set(snap(id, 4.0, 5, vec![], SourceKind::Structured));
        }
        let (engine, _) = detector(src.clone());
        let entities = [
            Entity::new("a", "A"),
            Entity::new("b", "B"),
            Entity::new("c", "C"),
        ];
        engine.run_cycle(&entities).await;

        for id in ["a", "c"] {
            src.set(snap(id, 3.0, 6, vec![], SourceKind::Structured));
        }
        let records = engine.run_cycle(&entities).await;
        let ids: Vec<_> = records.iter().map(|r| r.entity_id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);
    }

    #[tokio::test]
    async fn test_inactive_entities_skipped() {
        let src = Arc::new(ScriptedSource::new(SourceKind::Structured));
        src.set(snap("a", 4.5, 10, vec![], SourceKind::Structured));
        let (engine, store) = detector(src);
        let mut entity = Entity::new("a", "A");
        entity.active = false;

        engine.run_cycle(&[entity]).await;
        assert!(store.get("a").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unreadable_baseline_treated_as_absent() {
        let src = Arc::new(ScriptedSource::new(SourceKind::Structured));
        src.set(snap("a", 4.5, 10, vec![], SourceKind::Structured));
        let store = Arc::new(BrokenReads(MemoryBaselineStore::new()));
        let engine = ChangeDetector::new(src, store.clone());

        let entities = [Entity::new("a", "A")];
        assert!(engine.run_cycle(&entities).await.is_empty());
        assert!(engine.run_cycle(&entities).await.is_empty());
        assert_eq!(store.0.history("a", 10).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_degraded_extraction_yields_record() {
        let src = Arc::new(ScriptedSource::new(SourceKind::Extraction));
        src.set(snap("a", 4.4, 50, vec![], SourceKind::Extraction));
        let (engine, store) = detector(src.clone());
        let entities = [Entity::new("a", "A")];
        engine.run_cycle(&entities).await;

        // Every selector failed: zero values, still a snapshot.
        let mut degraded = snap("a", 0.0, 0, vec![], SourceKind::Extraction);
        degraded.name = "A".to_string();
        src.set(degraded);
        let records = engine.run_cycle(&entities).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, ChangeKind::RatingOnly);
        assert_eq!(store.get("a").unwrap().unwrap().rating, 0.0);
    }
}
