// Copyright 2026 Reviewtrack Contributors
// SPDX-License-Identifier: Apache-2.0

//! Core data types: monitored entities, review snapshots and change records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of individual reviews kept in a snapshot.
///
/// The review list is a recent sample, never the full population.
pub const MAX_REVIEWS_PER_SNAPSHOT: usize = 10;

/// A monitored business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Stable identifier.
    pub id: String,
    /// Display name as configured.
    pub name: String,
    /// Structured-API locator (a Places `place_id`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
    /// Page-URL locator for the extraction source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,
    /// Inactive entities are kept but skipped by check cycles.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Entity {
    /// Create an active entity with no locators.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            place_id: None,
            page_url: None,
            active: true,
        }
    }

    pub fn with_place_id(mut self, place_id: impl Into<String>) -> Self {
        self.place_id = Some(place_id.into());
        self
    }

    pub fn with_page_url(mut self, page_url: impl Into<String>) -> Self {
        self.page_url = Some(page_url.into());
        self
    }

    /// The structured-API locator, if present and non-blank.
    pub fn place_locator(&self) -> Option<&str> {
        self.place_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// The page-URL locator, if present and non-blank.
    pub fn page_locator(&self) -> Option<&str> {
        self.page_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Reject entities that can never be stored or looked up.
    pub fn validate(&self) -> TrackResult<()> {
        if self.id.trim().is_empty() {
            return Err(TrackError::InvalidEntity("empty id".to_string()));
        }
        if self.id.contains(['/', '\\']) || self.id.starts_with('.') {
            return Err(TrackError::InvalidEntity(format!(
                "id '{}' must not contain path separators or start with '.'",
                self.id
            )));
        }
        Ok(())
    }
}

/// Which acquisition path produced a snapshot.
///
/// The kind decides how reviews are matched across observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Schema-stable API records with deterministic review ids.
    #[default]
    Structured,
    /// Rendered-page extraction without stable review ids.
    Extraction,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Structured => "structured",
            Self::Extraction => "extraction",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One user review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    #[serde(default)]
    pub author: String,
    /// Star rating 1-5, or 0 when it could not be recovered.
    #[serde(default)]
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Best-effort absolute publish time.
    pub published_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

impl Review {
    /// Text with absence folded into the empty string.
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// One observation of an entity's review state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub entity_id: String,
    /// Display name as observed by the source.
    #[serde(default)]
    pub name: String,
    /// Aggregate rating, 0.0 if unknown.
    #[serde(default)]
    pub rating: f64,
    /// Total review count, 0 if unknown. Independent of `reviews.len()`.
    #[serde(default)]
    pub review_count: u64,
    #[serde(default)]
    pub reviews: Vec<Review>,
    pub observed_at: DateTime<Utc>,
    #[serde(default)]
    pub source: SourceKind,
}

impl Snapshot {
    /// A snapshot with every field at its zero-value fallback.
    pub fn empty(entity: &Entity, source: SourceKind, observed_at: DateTime<Utc>) -> Self {
        Self {
            entity_id: entity.id.clone(),
            name: entity.name.clone(),
            rating: 0.0,
            review_count: 0,
            reviews: Vec::new(),
            observed_at,
            source,
        }
    }

    /// The same snapshot with its reviews sorted most recent first, the
    /// order every outward view uses.
    pub fn into_newest_first(mut self) -> Self {
        sort_newest_first(&mut self.reviews);
        self
    }
}

/// Sort reviews by publish time descending. Stable for equal timestamps.
pub fn sort_newest_first(reviews: &mut [Review]) {
    reviews.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}

/// Which signals fired for a change record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    RatingOnly,
    NewReviewsOnly,
    Both,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RatingOnly => "rating_only",
            Self::NewReviewsOnly => "new_reviews_only",
            Self::Both => "both",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delta between a baseline and the current snapshot of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub entity_id: String,
    pub entity_name: String,
    pub previous_rating: f64,
    pub current_rating: f64,
    pub previous_count: u64,
    pub current_count: u64,
    /// Reviews judged new, most recent first.
    pub new_reviews: Vec<Review>,
    pub kind: ChangeKind,
    pub detected_at: DateTime<Utc>,
}

impl ChangeRecord {
    /// Signed rating movement.
    pub fn rating_delta(&self) -> f64 {
        self.current_rating - self.previous_rating
    }

    /// Signed review count movement.
    pub fn count_delta(&self) -> i64 {
        self.current_count as i64 - self.previous_count as i64
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Invalid entity: {0}")]
    InvalidEntity(String),
}

pub type TrackResult<T> = Result<T, TrackError>;
