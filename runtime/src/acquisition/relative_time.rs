// Copyright 2026 Reviewtrack Contributors
// SPDX-License-Identifier: Apache-2.0

//! Resolve relative review ages ("3 weeks ago") into absolute timestamps.

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use std::sync::OnceLock;

fn pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*(\d+|an?|one)\s+(day|week|month|year)s?\b").ok())
        .as_ref()
}

/// Subtract the described age from `now`.
///
/// Recognises a leading count (digits, or "a"/"an"/"one") followed by a day,
/// week, month or year unit. A month is 30 days and a year 365. Anything
/// else, including "Edited" prefixes and sub-day ages, resolves to `now`.
pub fn resolve(description: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    let Some(caps) = pattern().and_then(|re| re.captures(description)) else {
        return now;
    };

    let amount: i64 = match caps[1].to_ascii_lowercase().as_str() {
        "a" | "an" | "one" => 1,
        digits => match digits.parse() {
            Ok(n) => n,
            Err(_) => return now,
        },
    };

    let days_per_unit = match caps[2].to_ascii_lowercase().as_str() {
        "day" => 1,
        "week" => 7,
        "month" => 30,
        "year" => 365,
        _ => return now,
    };

    amount
        .checked_mul(days_per_unit)
        .and_then(Duration::try_days)
        .and_then(|age| now.checked_sub_signed(age))
        .unwrap_or(now)
}
