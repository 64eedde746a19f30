#![forbid(unsafe_code)]

//! Runtime configuration.
//!
//! Every tunable of the runtime is collected in a single [`TrellisConfig`]
//! that can be loaded from TOML or JSON at startup.
//!
//! ```toml
//! # trellis.toml
//! [grid]
//! overlap_mode = "error"
//!
//! [reconcile]
//! max_restarts_per_child = 2
//!
//! [session]
//! max_deferred = 256
//! ```
//!
//! ```rust,ignore
//! let config = TrellisConfig::load("trellis.toml")?;
//! let session = Session::with_config(config)?;
//! ```
//!
//! `TrellisConfig::default()` reproduces the built-in behavior.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use trellis_layout::OverlapMode;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrellisConfig {
    pub grid: GridConfig,
    pub reconcile: ReconcileConfig,
    pub session: SessionConfig,
}

/// Defaults for sparse grid containers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Policy applied when an assignment overlaps existing entries.
    pub overlap_mode: OverlapMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// How many times one child position may request a rerender within a
    /// single pass before the pass fails.
    pub max_restarts_per_child: u32,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            max_restarts_per_child: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Distinct entries each root's deferred update queue may hold. On
    /// overflow the root is refreshed as a whole once it is idle.
    pub max_deferred: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { max_deferred: 1024 }
    }
}

impl TrellisConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Load from a `.json` or `.toml` file (by extension, TOML otherwise) and
    /// validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_file(path)?,
            _ => Self::from_toml_file(path)?,
        };
        let errors = config.validate();
        if errors.is_empty() {
            tracing::debug!(path = %path.display(), "loaded trellis config");
            Ok(config)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Check every parameter. An empty list means the config is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.reconcile.max_restarts_per_child == 0 {
            errors.push("reconcile.max_restarts_per_child must be >= 1".into());
        }
        if self.session.max_deferred == 0 {
            errors.push("session.max_deferred must be > 0".into());
        }
        errors
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(toml::de::Error),
    #[error("JSON parse error: {0}")]
    Json(serde_json::Error),
    #[error("validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}

impl From<ConfigError> for trellis_core::Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = TrellisConfig::default();
        assert!(config.validate().is_empty());
        assert_eq!(config.grid.overlap_mode, OverlapMode::Warn);
        assert_eq!(config.reconcile.max_restarts_per_child, 1);
        assert_eq!(config.session.max_deferred, 1024);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = TrellisConfig::from_toml_str("[grid]\noverlap_mode = \"override\"\n")
            .expect("valid toml");
        assert_eq!(config.grid.overlap_mode, OverlapMode::Override);
        assert_eq!(config.session, SessionConfig::default());
    }

    #[test]
    fn json_round_trip() {
        let mut config = TrellisConfig::default();
        config.session.max_deferred = 8;
        let json = serde_json::to_string(&config).expect("serialize");
        assert_eq!(TrellisConfig::from_json_str(&json).expect("parse"), config);
    }

    #[test]
    fn validation_reports_every_problem() {
        let config = TrellisConfig::from_toml_str(
            "[reconcile]\nmax_restarts_per_child = 0\n[session]\nmax_deferred = 0\n",
        )
        .expect("parses");
        assert_eq!(config.validate().len(), 2);
    }

    #[test]
    fn unknown_overlap_mode_is_a_parse_error() {
        let err = TrellisConfig::from_toml_str("[grid]\noverlap_mode = \"merge\"\n")
            .err()
            .expect("rejected");
        assert!(matches!(err, ConfigError::Toml(_)));
        let core: trellis_core::Error = err.into();
        assert!(core.to_string().starts_with("configuration error: TOML parse error"));
    }
}
