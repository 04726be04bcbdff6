// Copyright 2026 Reviewtrack Contributors
// SPDX-License-Identifier: Apache-2.0

//! Output mode flags shared by every subcommand.
//!
//! `main` records the global flags once; commands query them here instead
//! of threading them through every call.

use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, Default)]
pub struct OutputMode {
    pub json: bool,
    pub quiet: bool,
}

static MODE: OnceLock<OutputMode> = OnceLock::new();

/// Record the global output flags. Later calls are ignored.
pub fn init(mode: OutputMode) {
    let _ = MODE.set(mode);
}

fn mode() -> OutputMode {
    MODE.get().copied().unwrap_or_default()
}

pub fn is_json() -> bool {
    mode().json
}

pub fn is_quiet() -> bool {
    mode().quiet
}

/// Pretty-print a JSON value to stdout.
pub fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(_) => println!("{value}"),
    }
}

/// Five-character star bar for an aggregate rating.
pub fn rating_bar(rating: f64) -> String {
    let filled = rating.round().clamp(0.0, 5.0) as usize;
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bar() {
        assert_eq!(rating_bar(4.6), "★★★★★");
        assert_eq!(rating_bar(3.2), "★★★☆☆");
        assert_eq!(rating_bar(0.0), "☆☆☆☆☆");
        assert_eq!(rating_bar(9.0), "★★★★★");
    }
}
