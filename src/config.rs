//! Configuration
//!
//! Hierarchical configuration loading from:
//! - config.toml (default configuration)
//! - config.local.toml (git-ignored local overrides)
//! - environment variables (`SELECTENGINE_*` prefix)
//!
//! ```bash
//! SELECTENGINE_EXECUTION__JOBS=4
//! SELECTENGINE_LOGGING__LEVEL=debug
//! ```

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub io: IoConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Well-known file names within an input/output directory pair (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IoConfig {
    #[serde(default = "default_input_csv")]
    pub input_csv: String,
    #[serde(default = "default_universe_json")]
    pub universe_json: String,
    #[serde(default = "default_selection_json")]
    pub selection_json: String,
}

fn default_input_csv() -> String {
    "input_data.csv".to_string()
}
fn default_universe_json() -> String {
    "universe.json".to_string()
}
fn default_selection_json() -> String {
    "selection.json".to_string()
}

impl Default for IoConfig {
    fn default() -> Self {
        IoConfig {
            input_csv: default_input_csv(),
            universe_json: default_universe_json(),
            selection_json: default_selection_json(),
        }
    }
}

/// Execution tuning: selections run embarrassingly parallel (spec §5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Worker threads for the selection-level rayon pool. 0 = rayon's
    /// default (all available cores).
    #[serde(default)]
    pub jobs: usize,

    /// Reject input tables wider than this many rows (None = unlimited).
    #[serde(default)]
    pub max_rows: Option<usize>,

    /// Reject plans that would materialize more than this many columns
    /// (None = unlimited).
    #[serde(default)]
    pub max_materialized_columns: Option<usize>,

    /// Soft wall-clock budget per selection, in seconds (None = unlimited).
    /// Checked after the selection's plan has run, not enforced mid-step.
    #[serde(default)]
    pub selection_timeout_secs: Option<u64>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            jobs: 0,
            max_rows: None,
            max_materialized_columns: None,
            selection_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl ExecutionConfig {
    pub fn resource_limits(&self) -> crate::exec::ResourceLimits {
        crate::exec::ResourceLimits {
            max_rows: self.max_rows,
            max_materialized_columns: self.max_materialized_columns,
            timeout: self.selection_timeout_secs.map(std::time::Duration::from_secs),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            io: IoConfig::default(),
            execution: ExecutionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Merges `config.toml`, then `config.local.toml` (git-ignored local
    /// overrides), then `SELECTENGINE_*` environment variables, in that
    /// order. Every file is optional — a fresh checkout with no config
    /// files still loads the defaults above.
    pub fn load() -> Result<Self, figment::Error> {
        Figment::from(figment::providers::Serialized::defaults(Config::default()))
            .merge(Toml::file("config.toml"))
            .merge(Toml::file("config.local.toml"))
            .merge(Env::prefixed("SELECTENGINE_").split("__"))
            .extract()
    }

    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::from(figment::providers::Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("SELECTENGINE_").split("__"))
            .extract()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_well_known_file_names() {
        let config = Config::default();
        assert_eq!(config.io.input_csv, "input_data.csv");
        assert_eq!(config.io.universe_json, "universe.json");
        assert_eq!(config.io.selection_json, "selection.json");
    }

    #[test]
    fn default_config_serializes_to_toml() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("[io]"));
        assert!(toml_str.contains("[execution]"));
        assert!(toml_str.contains("[logging]"));
    }

    #[test]
    fn unset_limits_convert_to_unlimited_resource_limits() {
        let limits = ExecutionConfig::default().resource_limits();
        assert!(limits.max_rows.is_none());
        assert!(limits.max_materialized_columns.is_none());
        assert!(limits.timeout.is_none());
    }

    #[test]
    fn configured_limits_convert_through() {
        let exec = ExecutionConfig {
            jobs: 4,
            max_rows: Some(1_000),
            max_materialized_columns: Some(64),
            selection_timeout_secs: Some(30),
        };
        let limits = exec.resource_limits();
        assert_eq!(limits.max_rows, Some(1_000));
        assert_eq!(limits.max_materialized_columns, Some(64));
        assert_eq!(limits.timeout, Some(std::time::Duration::from_secs(30)));
    }
}
