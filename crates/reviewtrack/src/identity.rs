// Copyright 2026 Reviewtrack Contributors
// SPDX-License-Identifier: Apache-2.0

//! Review identity across observations.
//!
//! The two sources disagree on what makes a review "the same review":
//!
//! * Structured records carry an absolute publish timestamp, so an id built
//!   from entity id + timestamp + normalized author is reproducible run after
//!   run. Matching is by id only; edits to text or rating do not make a
//!   review new.
//! * Extracted reviews only carry a relative time ("3 weeks ago") that drifts
//!   between runs, so no id can be reproduced. Matching is by the structural
//!   tuple (author, rating, text).
//!
//! The rule is picked from the active source. It is deliberately not unified:
//! doing so would change which reviews are reported after a mode switch.

use crate::types::{Review, SourceKind};
use std::collections::HashSet;

/// Lower-case an author name and collapse every non-alphanumeric run to `_`.
pub fn normalize_author(author: &str) -> String {
    let mut out = String::with_capacity(author.len());
    let mut pending_sep = false;
    for ch in author.trim().chars() {
        if ch.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Deterministic id for a structured-source review.
pub fn structured_review_id(entity_id: &str, published_unix: i64, author: &str) -> String {
    format!("{entity_id}_{published_unix}_{}", normalize_author(author))
}

/// Key used to decide whether a review was already seen.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReviewKey {
    Id(String),
    Structural {
        author: String,
        rating: u8,
        text: String,
    },
}

impl ReviewKey {
    pub fn of(review: &Review, source: SourceKind) -> Self {
        match source {
            SourceKind::Structured => Self::Id(review.id.clone()),
            SourceKind::Extraction => Self::Structural {
                author: review.author.trim().to_string(),
                rating: review.rating,
                text: review.text_or_empty().trim().to_string(),
            },
        }
    }
}

/// Reviews in `current` that have no counterpart in `baseline`, in their
/// original order.
pub fn unseen_reviews(baseline: &[Review], current: &[Review], source: SourceKind) -> Vec<Review> {
    let known: HashSet<ReviewKey> = baseline.iter().map(|r| ReviewKey::of(r, source)).collect();
    let mut emitted: HashSet<ReviewKey> = HashSet::new();
    current
        .iter()
        .filter(|r| {
            let key = ReviewKey::of(r, source);
            !known.contains(&key) && emitted.insert(key)
        })
        .cloned()
        .collect()
}
