// Copyright 2026 Reviewtrack Contributors
// SPDX-License-Identifier: Apache-2.0

//! Reviewtrack: core library for review snapshots, review identity,
//! change detection and baseline storage.

pub mod diff;
pub mod identity;
pub mod registry;
pub mod storage;
pub mod types;

pub use diff::{detect_changes, rating_changed, RATING_TOLERANCE};
pub use identity::{normalize_author, structured_review_id, unseen_reviews, ReviewKey};
pub use registry::{EntityRegistry, JsonEntityRegistry, MemoryEntityRegistry};
pub use storage::{BaselineStore, JsonBaselineStore, MemoryBaselineStore};
pub use types::*;
