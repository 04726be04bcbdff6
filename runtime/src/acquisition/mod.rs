// Copyright 2026 Reviewtrack Contributors
// SPDX-License-Identifier: Apache-2.0

//! Review acquisition: one contract, two sources.
//!
//! Both the Places API adapter and the rendered-page extractor answer the
//! same question ("what does this entity's review state look like right
//! now?") through [`ReviewSource`]. [`SourceSelector`] picks one of them
//! once at startup from [`SourceMode`].

pub mod http_client;
pub mod places;
pub mod relative_time;
pub mod scrape;
pub mod selectors;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use reviewtrack::{Entity, Snapshot, SourceKind};

use crate::config::{Config, SourceMode};
use crate::renderer::chromium::ChromiumLauncher;

use self::places::PlacesSource;
use self::scrape::ScrapeSource;
use self::selectors::SelectorConfig;

/// Produces the current review snapshot for an entity.
///
/// `Ok(None)` means "no data this time": the entity is skipped for the
/// cycle and its baseline stays untouched. Adapters recover their own
/// failures into `Ok(None)`; callers still isolate an `Err` per entity.
#[async_trait]
pub trait ReviewSource: Send + Sync {
    async fn acquire(&self, entity: &Entity) -> Result<Option<Snapshot>>;

    /// Which identity rule applies to reviews this source produces.
    fn kind(&self) -> SourceKind;

    /// Drop any failed long-lived resources so the next call retries them.
    async fn reinitialize(&self) {}

    /// Release long-lived resources.
    async fn shutdown(&self) {}
}

/// The configured acquisition path.
pub enum SourceSelector {
    Structured(PlacesSource),
    Extraction(ScrapeSource),
}

impl SourceSelector {
    /// Build the adapter named by `config.mode`.
    pub fn from_config(config: &Config) -> Result<Self> {
        match config.mode {
            SourceMode::Api => Ok(Self::Structured(PlacesSource::new(&config.api)?)),
            SourceMode::Scrape => {
                let selectors = match &config.scrape.selectors_file {
                    Some(path) => SelectorConfig::from_file(path)?,
                    None => SelectorConfig::embedded()?,
                };
                let launcher = Arc::new(ChromiumLauncher::new(config.scrape.chromium_path.clone()));
                Ok(Self::Extraction(ScrapeSource::new(
                    launcher,
                    selectors,
                    config.scrape.clone(),
                )))
            }
        }
    }

    pub fn mode(&self) -> SourceMode {
        match self {
            Self::Structured(_) => SourceMode::Api,
            Self::Extraction(_) => SourceMode::Scrape,
        }
    }
}

#[async_trait]
impl ReviewSource for SourceSelector {
    async fn acquire(&self, entity: &Entity) -> Result<Option<Snapshot>> {
        match self {
            Self::Structured(s) => s.acquire(entity).await,
            Self::Extraction(s) => s.acquire(entity).await,
        }
    }

    fn kind(&self) -> SourceKind {
        match self {
            Self::Structured(s) => s.kind(),
            Self::Extraction(s) => s.kind(),
        }
    }

    async fn reinitialize(&self) {
        match self {
            Self::Structured(s) => s.reinitialize().await,
            Self::Extraction(s) => s.reinitialize().await,
        }
    }

    async fn shutdown(&self) {
        match self {
            Self::Structured(s) => s.shutdown().await,
            Self::Extraction(s) => s.shutdown().await,
        }
    }
}
