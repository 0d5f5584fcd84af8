//! CLI configuration.
//!
//! Resolved in layers: built-in defaults, then an optional YAML file, then
//! environment variables. Command-line flags are applied last by `main`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default state directory, relative to the working directory.
pub const DEFAULT_STATE_DIR: &str = ".escrow";

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(other.to_string()),
        }
    }
}

/// Configuration for the `escrow` binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Directory holding `instances/` and `ledger.json`.
    pub state_dir: PathBuf,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            log_format: LogFormat::Text,
        }
    }
}

impl CliConfig {
    /// Load defaults, then `path` if given, then the process environment.
    ///
    /// Variables:
    /// - `ESCROW_STATE_DIR` (default: `.escrow`)
    /// - `ESCROW_LOG_FORMAT` (`text` or `json`, default: `text`)
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        base.with_env(|var| std::env::var(var).ok())
    }

    /// Parse a YAML configuration file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay environment variables read through `lookup`.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(dir) = lookup("ESCROW_STATE_DIR") {
            if dir.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    var: "ESCROW_STATE_DIR",
                    value: dir,
                });
            }
            self.state_dir = PathBuf::from(dir);
        }
        if let Some(format) = lookup("ESCROW_LOG_FORMAT") {
            self.log_format = format.parse().map_err(|value| ConfigError::InvalidValue {
                var: "ESCROW_LOG_FORMAT",
                value,
            })?;
        }
        Ok(self)
    }

    /// Apply command-line flags, which take precedence over everything else.
    pub fn with_overrides(mut self, state_dir: Option<PathBuf>, log_format: Option<LogFormat>) -> Self {
        if let Some(dir) = state_dir {
            self.state_dir = dir;
        }
        if let Some(format) = log_format {
            self.log_format = format;
        }
        self
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid YAML or has unknown keys.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// File that was parsed.
        path: PathBuf,
        /// Parser diagnostic.
        #[source]
        source: serde_yaml::Error,
    },

    /// An environment variable holds a value the field cannot take.
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue {
        /// Variable name, e.g. `ESCROW_LOG_FORMAT`.
        var: &'static str,
        /// The rejected value.
        value: String,
    },
}
