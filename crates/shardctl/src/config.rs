//! TOML configuration for the shardctl CLI.
//!
//! Every section is optional; a missing file means all defaults.

use std::path::Path;

use serde::Deserialize;
use shardctl_types::DEFAULT_N_SHARDS;

/// Top-level configuration, parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Controller parameters.
    pub controller: ControllerSection,
    /// Logging configuration.
    pub log: LogSection,
}

/// `[controller]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ControllerSection {
    /// Number of shards the controller assigns.
    pub n_shards: Option<usize>,
}

/// `[log]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Log level filter (e.g. `"info"`, `"debug"`, `"warn"`).
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl CliConfig {
    /// Load config from a TOML file, or use defaults if no path given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)?;
                let config: CliConfig = toml::from_str(&content)?;
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse config from a TOML string (used in tests).
    #[cfg(test)]
    pub fn from_toml(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Effective shard count (config value or [`DEFAULT_N_SHARDS`]).
    pub fn n_shards(&self) -> usize {
        self.controller.n_shards.unwrap_or(DEFAULT_N_SHARDS)
    }
}
