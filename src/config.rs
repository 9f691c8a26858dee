//! Configuration management for dirsnap
//!
//! Defaults can be overridden by a `dirsnap.toml` in the working directory,
//! then by `DIRSNAP_*` environment variables, then by CLI flags.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "dirsnap.toml";

/// Global configuration for dirsnap
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DirsnapConfig {
    /// Directory listing configuration
    pub listing: ListingConfig,
    /// Purge behavior configuration
    pub purge: PurgeConfig,
}

/// Configuration for directory listings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Leave hidden (dot) files out of snapshots and purges
    pub skip_hidden: bool,
}

/// Configuration for the purge operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PurgeConfig {
    /// Refuse to purge while no snapshot is held for the current directory
    pub require_snapshot: bool,
    /// Maximum failure entries carried in a purge report (0 = unlimited)
    pub max_reported_failures: usize,
}

impl Default for PurgeConfig {
    fn default() -> Self {
        Self {
            require_snapshot: true,
            max_reported_failures: 0,
        }
    }
}

impl DirsnapConfig {
    /// Load configuration from `dirsnap.toml` in the working directory if
    /// present, fall back to defaults, then apply environment overrides.
    pub fn load_or_default() -> Self {
        let config = match fs::read_to_string(CONFIG_FILE) {
            Ok(raw) => match toml::from_str(&raw) {
                Ok(config) => config,
                Err(err) => {
                    tracing::warn!("Ignoring malformed {}: {}", CONFIG_FILE, err);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        };
        config.with_env_overrides()
    }

    /// Load configuration from a specific TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        Ok(toml::from_str(&raw)?)
    }

    /// Override fields from environment variables if present.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("DIRSNAP_SKIP_HIDDEN") {
            if let Some(flag) = parse_bool(&val) {
                self.listing.skip_hidden = flag;
            }
        }

        if let Ok(val) = std::env::var("DIRSNAP_REQUIRE_SNAPSHOT") {
            if let Some(flag) = parse_bool(&val) {
                self.purge.require_snapshot = flag;
            }
        }

        if let Ok(val) = std::env::var("DIRSNAP_MAX_REPORTED_FAILURES") {
            if let Ok(max) = val.parse::<usize>() {
                self.purge.max_reported_failures = max;
            }
        }

        self
    }
}

fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
