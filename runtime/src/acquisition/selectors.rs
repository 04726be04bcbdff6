// Copyright 2026 Reviewtrack Contributors
// SPDX-License-Identifier: Apache-2.0

//! Selector-fallback chains for rendered review pages.
//!
//! Every field is read through an ordered chain of CSS selector specs. The
//! first spec whose element yields a value the field parser accepts wins;
//! when the whole chain is exhausted the field takes its zero value. A
//! selector that does not compile, matches nothing, or yields unparseable
//! text is simply a miss.
//!
//! The chains are data: the defaults are embedded from `selectors.json` at
//! compile time and can be replaced at startup from a file, so a page
//! layout change does not need a rebuild.
//!
//! Extraction works on an HTML string with the `scraper` crate, whose types
//! are `!Send`; everything here is synchronous and returns owned values.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;

use reviewtrack::{Entity, Review, Snapshot, SourceKind, MAX_REVIEWS_PER_SNAPSHOT};

use super::relative_time;

/// Default selector configuration, embedded at compile time.
const SELECTORS_JSON: &str = include_str!("selectors.json");

/// One extraction strategy: a selector plus where to read the value from.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldSpec {
    pub selector: String,
    /// Attribute to read; element text when absent.
    #[serde(default)]
    pub attr: Option<String>,
    /// Prefix removed from the raw value before parsing.
    #[serde(default)]
    pub strip_prefix: Option<String>,
}

impl FieldSpec {
    fn raw_values<'a>(&self, scope: ElementRef<'a>) -> Vec<String> {
        let Ok(sel) = Selector::parse(&self.selector) else {
            tracing::debug!("selector does not compile: {}", self.selector);
            return Vec::new();
        };
        scope
            .select(&sel)
            .filter_map(|el| match &self.attr {
                Some(attr) => el.value().attr(attr).map(str::to_string),
                None => Some(element_text(&el)),
            })
            .map(|raw| match &self.strip_prefix {
                Some(prefix) => raw
                    .strip_prefix(prefix.as_str())
                    .map(str::to_string)
                    .unwrap_or(raw),
                None => raw,
            })
            .collect()
    }
}

/// Ordered fallback chain for one field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct SelectorChain(pub Vec<FieldSpec>);

impl SelectorChain {
    /// First value, in chain order and then document order, that `parse`
    /// accepts.
    pub fn first<T>(&self, scope: ElementRef<'_>, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
        self.0
            .iter()
            .find_map(|spec| {
                spec.raw_values(scope)
                    .iter()
                    .find_map(|raw| parse(raw.as_str()))
            })
    }

    /// Elements matched by the first selector that matches anything.
    pub fn elements<'a>(&self, scope: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        for spec in &self.0 {
            let Ok(sel) = Selector::parse(&spec.selector) else {
                continue;
            };
            let found: Vec<_> = scope.select(&sel).collect();
            if !found.is_empty() {
                return found;
            }
        }
        Vec::new()
    }

    /// Selectors in this chain that do not compile.
    fn invalid_selectors(&self) -> Vec<String> {
        self.0
            .iter()
            .filter(|spec| Selector::parse(&spec.selector).is_err())
            .map(|spec| spec.selector.clone())
            .collect()
    }
}

/// A control that dismisses a consent interstitial.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DismissControl {
    /// Click the first element matching a CSS selector.
    Css { selector: String },
    /// Click the first button whose visible text contains `text`.
    ButtonText { text: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConsentSelectors {
    /// Lower-case fragments of a consent page title.
    #[serde(default)]
    pub title_markers: Vec<String>,
    /// Dismiss controls in priority order.
    #[serde(default)]
    pub dismiss: Vec<DismissControl>,
}

impl ConsentSelectors {
    pub fn is_consent_title(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        self.title_markers
            .iter()
            .any(|m| !m.is_empty() && title.contains(&m.to_lowercase()))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewSelectors {
    pub container: SelectorChain,
    #[serde(default)]
    pub author: SelectorChain,
    #[serde(default)]
    pub rating: SelectorChain,
    #[serde(default)]
    pub text: SelectorChain,
    #[serde(default)]
    pub relative_time: SelectorChain,
    #[serde(default)]
    pub author_url: SelectorChain,
    #[serde(default)]
    pub photo_url: SelectorChain,
}

/// Every chain the extraction adapter uses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectorConfig {
    #[serde(default)]
    pub consent: ConsentSelectors,
    /// Controls that load more reviews, tried in order.
    #[serde(default)]
    pub load_more: Vec<String>,
    /// Scrollable review feeds, used when no load-more control exists.
    #[serde(default)]
    pub scroll_containers: Vec<String>,
    #[serde(default)]
    pub name: SelectorChain,
    #[serde(default)]
    pub rating: SelectorChain,
    #[serde(default)]
    pub review_count: SelectorChain,
    #[serde(default)]
    pub review: ReviewSelectors,
}

impl SelectorConfig {
    /// The compiled-in defaults.
    pub fn embedded() -> Result<Self> {
        Self::from_json(SELECTORS_JSON).context("embedded selectors.json is invalid")
    }

    /// Load an override file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading selectors file {}", path.display()))?;
        Self::from_json(&data).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        let invalid: Vec<String> = [
            &config.name,
            &config.rating,
            &config.review_count,
            &config.review.container,
            &config.review.author,
            &config.review.rating,
            &config.review.text,
            &config.review.relative_time,
            &config.review.author_url,
            &config.review.photo_url,
        ]
        .iter()
        .flat_map(|chain| chain.invalid_selectors())
        .collect();
        if !invalid.is_empty() {
            anyhow::bail!("invalid CSS selectors: {}", invalid.join(", "));
        }
        Ok(config)
    }
}

/// Pull a snapshot out of rendered HTML.
///
/// Never fails: each field and each review degrades on its own.
pub fn extract_snapshot(
    html: &str,
    entity: &Entity,
    config: &SelectorConfig,
    now: DateTime<Utc>,
) -> Snapshot {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let name = config.name.first(root, parse_non_empty).unwrap_or_else(|| {
        tracing::debug!(entity = %entity.id, "name chain exhausted, using configured name");
        entity.name.clone()
    });
    let rating = config.rating.first(root, parse_aggregate_rating).unwrap_or_else(|| {
        tracing::debug!(entity = %entity.id, "rating chain exhausted");
        0.0
    });
    let review_count = config.review_count.first(root, parse_count).unwrap_or_else(|| {
        tracing::debug!(entity = %entity.id, "review count chain exhausted");
        0
    });

    let containers = config.review.container.elements(root);
    if containers.is_empty() {
        tracing::debug!(entity = %entity.id, "no review containers matched");
    }
    let reviews = containers
        .into_iter()
        .take(MAX_REVIEWS_PER_SNAPSHOT)
        .map(|el| extract_review(el, &config.review, now))
        .collect();

    Snapshot {
        entity_id: entity.id.clone(),
        name,
        rating,
        review_count,
        reviews,
        observed_at: now,
        source: SourceKind::Extraction,
    }
}

fn extract_review(el: ElementRef<'_>, chains: &ReviewSelectors, now: DateTime<Utc>) -> Review {
    let published_at = chains
        .relative_time
        .first(el, parse_non_empty)
        .map(|desc| relative_time::resolve(&desc, now))
        .unwrap_or(now);

    Review {
        // No stable id exists on the page; matching uses the structural tuple.
        id: format!("scrape-{}", uuid::Uuid::new_v4()),
        author: chains.author.first(el, parse_non_empty).unwrap_or_default(),
        rating: chains.rating.first(el, parse_star_label).unwrap_or(0),
        text: chains.text.first(el, parse_non_empty),
        published_at,
        author_url: chains.author_url.first(el, parse_non_empty),
        photo_url: chains.photo_url.first(el, parse_non_empty),
    }
}

// ── Field parsers ────────────────────────────────────────────────────────────

fn element_text(el: &ElementRef<'_>) -> String {
    el.text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn number_pattern() -> Option<&'static Regex> {
    static RE: std::sync::OnceLock<Option<Regex>> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+(?:[.,]\d+)?").ok()).as_ref()
}

/// Aggregate rating such as "4.5", "4,5" or "4.5 stars"; must lie in 0..=5.
pub fn parse_aggregate_rating(raw: &str) -> Option<f64> {
    let m = number_pattern()?.find(raw)?;
    let value: f64 = m.as_str().replace(',', ".").parse().ok()?;
    (0.0..=5.0).contains(&value).then_some(value)
}

/// Review total such as "1,234 reviews", "(1.234)" or "2 345".
///
/// Digits are read from the first digit through the end of the numeric run.
/// Separators must be followed by exactly three digits.
pub fn parse_count(raw: &str) -> Option<u64> {
    let start = raw.find(|c: char| c.is_ascii_digit())?;
    let run: String = raw[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || is_group_separator(*c))
        .collect();
    // Every group after a separator is a full thousands group; "4.3" is a
    // rating, not a count.
    let mut groups = run.trim_end_matches(is_group_separator).split(is_group_separator);
    let mut digits = groups.next()?.to_string();
    for group in groups {
        if group.len() != 3 {
            return None;
        }
        digits.push_str(group);
    }
    digits.parse().ok()
}

fn is_group_separator(c: char) -> bool {
    matches!(c, ',' | '.' | ' ' | '\u{a0}' | '\u{202f}')
}

/// Star rating from an accessible label ("5 stars", "Rated 4.0 out of 5").
pub fn parse_star_label(raw: &str) -> Option<u8> {
    let start = raw.find(|c: char| c.is_ascii_digit())?;
    let digits: String = raw[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    let value: u8 = digits.parse().ok()?;
    (1..=5).contains(&value).then_some(value)
}
