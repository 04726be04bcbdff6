// Copyright 2026 Reviewtrack Contributors
// SPDX-License-Identifier: Apache-2.0

//! Runtime configuration read from `REVIEWTRACK_*` environment variables.
//!
//! Configuration is resolved once at startup. Anything that would leave the
//! process half-configured (unknown mode, missing credentials) is a
//! [`ConfigError`] and stops startup.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_API_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place/details/json";
const DEFAULT_DOCS_BASE_URL: &str = "https://docs.googleapis.com/v1/documents";
const DEFAULT_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;
const DEFAULT_COOLDOWN_SECS: u64 = 60 * 60;
const DEFAULT_API_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_NAV_TIMEOUT_MS: u64 = 45_000;
const DEFAULT_SETTLE_MS: u64 = 3_000;
const MIN_INTERVAL_SECS: u64 = 60;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("unknown source mode '{0}' (expected 'api' or 'scrape')")]
    UnknownMode(String),
    #[error("unknown report sink '{0}' (expected 'log', 'jsonl' or 'docs')")]
    UnknownReport(String),
    #[error("{0} is required when {1}")]
    Missing(&'static str, &'static str),
    #[error("invalid value for {name}: '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Which acquisition adapter serves every `acquire` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    Api,
    Scrape,
}

impl FromStr for SourceMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "api" | "structured" => Ok(Self::Api),
            "scrape" | "extraction" | "browser" => Ok(Self::Scrape),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}

impl SourceMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Scrape => "scrape",
        }
    }
}

/// Where change reports go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Log,
    Jsonl,
    Docs,
}

impl FromStr for ReportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log" => Ok(Self::Log),
            "jsonl" => Ok(Self::Jsonl),
            "docs" => Ok(Self::Docs),
            other => Err(ConfigError::UnknownReport(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub key: Option<String>,
    pub base_url: String,
    pub language: Option<String>,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub chromium_path: Option<PathBuf>,
    pub nav_timeout_ms: u64,
    pub settle_ms: u64,
    pub selectors_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub interval: Duration,
    pub cooldown: Duration,
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub kind: ReportKind,
    pub jsonl_path: Option<PathBuf>,
    pub docs_base_url: String,
    pub docs_document_id: Option<String>,
    pub docs_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mode: SourceMode,
    pub data_dir: PathBuf,
    pub api: ApiConfig,
    pub scrape: ScrapeConfig,
    pub schedule: ScheduleConfig,
    pub report: ReportConfig,
}

impl Config {
    /// Resolve configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| -> Option<String> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let read_u64 = |name: &'static str, default: u64| -> Result<u64, ConfigError> {
            match read(name) {
                None => Ok(default),
                Some(v) => v.parse::<u64>().map_err(|_| ConfigError::Invalid { name, value: v }),
            }
        };

        let mode = match read("REVIEWTRACK_MODE") {
            Some(v) => v.parse()?,
            None => SourceMode::Api,
        };
        let report_kind = match read("REVIEWTRACK_REPORT") {
            Some(v) => v.parse()?,
            None => ReportKind::Log,
        };

        let data_dir = read("REVIEWTRACK_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let interval_secs = read_u64("REVIEWTRACK_INTERVAL_SECS", DEFAULT_INTERVAL_SECS)?;
        if interval_secs < MIN_INTERVAL_SECS {
            return Err(ConfigError::Invalid {
                name: "REVIEWTRACK_INTERVAL_SECS",
                value: interval_secs.to_string(),
            });
        }

        Ok(Self {
            mode,
            api: ApiConfig {
                key: read("REVIEWTRACK_API_KEY"),
                base_url: read("REVIEWTRACK_API_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
                language: read("REVIEWTRACK_LANGUAGE"),
                timeout_ms: read_u64("REVIEWTRACK_API_TIMEOUT_MS", DEFAULT_API_TIMEOUT_MS)?,
            },
            scrape: ScrapeConfig {
                chromium_path: read("REVIEWTRACK_CHROMIUM_PATH").map(PathBuf::from),
                nav_timeout_ms: read_u64("REVIEWTRACK_NAV_TIMEOUT_MS", DEFAULT_NAV_TIMEOUT_MS)?,
                settle_ms: read_u64("REVIEWTRACK_SETTLE_MS", DEFAULT_SETTLE_MS)?,
                selectors_file: read("REVIEWTRACK_SELECTORS_FILE").map(PathBuf::from),
            },
            schedule: ScheduleConfig {
                interval: Duration::from_secs(interval_secs),
                cooldown: Duration::from_secs(read_u64(
                    "REVIEWTRACK_COOLDOWN_SECS",
                    DEFAULT_COOLDOWN_SECS,
                )?),
            },
            report: ReportConfig {
                kind: report_kind,
                jsonl_path: read("REVIEWTRACK_REPORT_FILE").map(PathBuf::from),
                docs_base_url: read("REVIEWTRACK_DOCS_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_DOCS_BASE_URL.to_string()),
                docs_document_id: read("REVIEWTRACK_DOCS_DOCUMENT_ID"),
                docs_token: read("REVIEWTRACK_DOCS_TOKEN"),
            },
            data_dir,
        })
    }

    /// Reject combinations that cannot run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mode == SourceMode::Api && self.api.key.is_none() {
            return Err(ConfigError::Missing(
                "REVIEWTRACK_API_KEY",
                "REVIEWTRACK_MODE=api",
            ));
        }
        if self.report.kind == ReportKind::Docs {
            if self.report.docs_document_id.is_none() {
                return Err(ConfigError::Missing(
                    "REVIEWTRACK_DOCS_DOCUMENT_ID",
                    "REVIEWTRACK_REPORT=docs",
                ));
            }
            if self.report.docs_token.is_none() {
                return Err(ConfigError::Missing(
                    "REVIEWTRACK_DOCS_TOKEN",
                    "REVIEWTRACK_REPORT=docs",
                ));
            }
        }
        Ok(())
    }

    pub fn entities_path(&self) -> PathBuf {
        self.data_dir.join("entities.json")
    }

    pub fn report_path(&self) -> PathBuf {
        self.report
            .jsonl_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("reports.jsonl"))
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".reviewtrack")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config_from(&[]).unwrap();
        assert_eq!(cfg.mode, SourceMode::Api);
        assert_eq!(cfg.report.kind, ReportKind::Log);
        assert_eq!(cfg.schedule.interval, Duration::from_secs(604_800));
        assert_eq!(cfg.schedule.cooldown, Duration::from_secs(3_600));
        assert_eq!(cfg.scrape.settle_ms, 3_000);
        assert!(cfg.data_dir.ends_with(".reviewtrack"));
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let err = config_from(&[("REVIEWTRACK_MODE", "carrier-pigeon")]).unwrap_err();
        assert_eq!(err, ConfigError::UnknownMode("carrier-pigeon".to_string()));
    }

    #[test]
    fn test_mode_aliases() {
        assert_eq!("SCRAPE".parse::<SourceMode>().unwrap(), SourceMode::Scrape);
        assert_eq!("structured".parse::<SourceMode>().unwrap(), SourceMode::Api);
    }

    #[test]
    fn test_api_mode_requires_key() {
        let cfg = config_from(&[]).unwrap();
        assert!(matches!(cfg.validate(), Err(ConfigError::Missing(..))));

        let cfg = config_from(&[("REVIEWTRACK_API_KEY", "k")]).unwrap();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_scrape_mode_needs_no_key() {
        let cfg = config_from(&[("REVIEWTRACK_MODE", "scrape")]).unwrap();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_docs_report_requires_document_and_token() {
        let cfg = config_from(&[
            ("REVIEWTRACK_MODE", "scrape"),
            ("REVIEWTRACK_REPORT", "docs"),
            ("REVIEWTRACK_DOCS_DOCUMENT_ID", "doc-1"),
        ])
        .unwrap();
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::Missing(
                "REVIEWTRACK_DOCS_TOKEN",
                "REVIEWTRACK_REPORT=docs"
            ))
        );
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        assert!(config_from(&[("REVIEWTRACK_SETTLE_MS", "soon")]).is_err());
        assert!(config_from(&[("REVIEWTRACK_INTERVAL_SECS", "5")]).is_err());
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let cfg = config_from(&[("REVIEWTRACK_MODE", "  "), ("REVIEWTRACK_API_KEY", "")]).unwrap();
        assert_eq!(cfg.mode, SourceMode::Api);
        assert!(cfg.api.key.is_none());
    }
}
