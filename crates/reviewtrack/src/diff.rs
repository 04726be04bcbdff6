// Copyright 2026 Reviewtrack Contributors
// SPDX-License-Identifier: Apache-2.0

//! Change detection between a baseline snapshot and the current one.

use chrono::{DateTime, Utc};

use crate::identity::unseen_reviews;
use crate::types::{sort_newest_first, ChangeKind, ChangeRecord, Snapshot, SourceKind};

/// Rating movements at or below this are source rounding noise.
pub const RATING_TOLERANCE: f64 = 0.01;

/// Precision the rating delta is rounded to before comparing, so that
/// float artifacts like `1.01 - 1.0 = 0.010000000000000009` stay at the
/// tolerance instead of crossing it.
const DELTA_PRECISION: f64 = 1e6;

/// Whether two aggregate ratings differ by more than [`RATING_TOLERANCE`].
pub fn rating_changed(previous: f64, current: f64) -> bool {
    let delta = ((current - previous).abs() * DELTA_PRECISION).round() / DELTA_PRECISION;
    delta > RATING_TOLERANCE
}

/// Compare `baseline` against `current`.
///
/// Returns `None` when neither the rating nor the total count moved. New
/// reviews are only looked for once one of those signals fired, and are
/// matched with the identity rule of `source`.
pub fn detect_changes(
    baseline: &Snapshot,
    current: &Snapshot,
    source: SourceKind,
    detected_at: DateTime<Utc>,
) -> Option<ChangeRecord> {
    let rating_moved = rating_changed(baseline.rating, current.rating);
    let count_moved = baseline.review_count != current.review_count;

    if !rating_moved && !count_moved {
        return None;
    }

    let mut new_reviews = unseen_reviews(&baseline.reviews, &current.reviews, source);
    sort_newest_first(&mut new_reviews);

    let kind = match (rating_moved, new_reviews.is_empty()) {
        (true, false) => ChangeKind::Both,
        (true, true) => ChangeKind::RatingOnly,
        (false, _) => ChangeKind::NewReviewsOnly,
    };

    let entity_name = if current.name.trim().is_empty() {
        baseline.name.clone()
    } else {
        current.name.clone()
    };

    Some(ChangeRecord {
        entity_id: current.entity_id.clone(),
        entity_name,
        previous_rating: baseline.rating,
        current_rating: current.rating,
        previous_count: baseline.review_count,
        current_count: current.review_count,
        new_reviews,
        kind,
        detected_at,
    })
}
