// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of PumpSteer.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Application configuration.
//!
//! Loaded from an explicit path, then `pumpsteer.toml`, then `pumpsteer.json`
//! in the working directory, and finally built from defaults. Environment
//! variables override whatever was loaded.

use anyhow::{Context, Result};
use pumpsteer_core::persistence::DEFAULT_STATE_PATH;
use pumpsteer_types::{EngineConfig, ValidationResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

pub const TOML_CONFIG_FILE: &str = "pumpsteer.toml";
pub const JSON_CONFIG_FILE: &str = "pumpsteer.json";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where the engine state is kept between runs
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    /// Default tracing filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_state_path() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_PATH)
}

fn default_log_level() -> String {
    "info".to_owned()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
            log_level: default_log_level(),
            engine: EngineConfig::default(),
        }
    }
}

/// Where a configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

impl AppConfig {
    /// Load configuration using the fallback chain and apply env overrides.
    ///
    /// An explicit path must exist; the working-directory files are optional.
    /// The result is not validated yet.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, ConfigSource)> {
        let (mut config, source) = match explicit {
            Some(path) => (Self::from_file(path)?, ConfigSource::File(path.to_path_buf())),
            None => Self::discover(Path::new("."))?,
        };
        config.apply_env_overrides();
        Ok((config, source))
    }

    /// Look for a config file in `dir`, falling back to defaults
    pub fn discover(dir: &Path) -> Result<(Self, ConfigSource)> {
        for name in [TOML_CONFIG_FILE, JSON_CONFIG_FILE] {
            let path = dir.join(name);
            if path.exists() {
                return Ok((Self::from_file(&path)?, ConfigSource::File(path)));
            }
        }
        Ok((Self::default(), ConfigSource::Defaults))
    }

    /// Parse a TOML or JSON file, chosen by extension
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let config: Self = if is_json {
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        };

        Ok(config)
    }

    /// Apply `PUMPSTEER_*` environment overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(tz) = lookup("PUMPSTEER_TIMEZONE") {
            self.engine.timezone = tz;
        }
        if let Some(level) = lookup("PUMPSTEER_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(path) = lookup("PUMPSTEER_STATE_PATH") {
            self.state_path = PathBuf::from(path);
        }
    }

    /// Validate configuration with detailed error reporting
    pub fn validate_detailed(&self) -> ValidationResult {
        let mut result = self.engine.validate_detailed();

        if self.state_path.as_os_str().is_empty() {
            result.add_error("state_path", "State path cannot be empty");
        }
        if self.log_level.trim().is_empty() {
            result.add_warning("log_level", "Empty log level, falling back to 'info'");
        }

        result
    }

    /// Validate configuration, failing on the first error
    pub fn validate(&self) -> Result<()> {
        let result = self.validate_detailed();
        for issue in &result.warnings {
            warn!("Config warning: {issue}");
        }
        if let Some(issue) = result.errors.first() {
            anyhow::bail!("Invalid configuration: {issue}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_discover_without_files_uses_defaults() {
        let dir = tempdir().unwrap();
        let (config, source) = AppConfig::discover(dir.path()).unwrap();

        assert_eq!(source, ConfigSource::Defaults);
        assert_eq!(config.state_path, PathBuf::from(DEFAULT_STATE_PATH));
        assert_eq!(config.engine.timezone, "UTC");
    }

    #[test]
    fn test_toml_preferred_over_json() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(TOML_CONFIG_FILE),
            "log_level = \"debug\"\n\n[engine]\ntimezone = \"Europe/Stockholm\"\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join(JSON_CONFIG_FILE),
            r#"{"log_level": "warn"}"#,
        )
        .unwrap();

        let (config, source) = AppConfig::discover(dir.path()).unwrap();

        assert_eq!(source, ConfigSource::File(dir.path().join(TOML_CONFIG_FILE)));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.engine.timezone, "Europe/Stockholm");
        // Untouched sections keep their defaults
        assert!((config.engine.output.braking_temp - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_json_config_partial_sections() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.json");
        std::fs::write(
            &path,
            r#"{"state_path": "/tmp/ps.json", "engine": {"learning": {"max_sessions": 20}}}"#,
        )
        .unwrap();

        let config = AppConfig::from_file(&path).unwrap();

        assert_eq!(config.state_path, PathBuf::from("/tmp/ps.json"));
        assert_eq!(config.engine.learning.max_sessions, 20);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(TOML_CONFIG_FILE);
        std::fs::write(&path, "engine = [").unwrap();

        assert!(AppConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("PUMPSTEER_TIMEZONE", "Europe/Prague"),
            ("PUMPSTEER_STATE_PATH", "/var/lib/pumpsteer/state.json"),
        ]);
        let mut config = AppConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| (*v).to_owned()));

        assert_eq!(config.engine.timezone, "Europe/Prague");
        assert_eq!(config.state_path, PathBuf::from("/var/lib/pumpsteer/state.json"));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_validation_rejects_unknown_timezone() {
        let mut config = AppConfig::default();
        config.engine.timezone = "Mars/Olympus".to_owned();

        let result = config.validate_detailed();
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.field == "timezone"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_empty_state_path() {
        let config = AppConfig {
            state_path: PathBuf::new(),
            ..AppConfig::default()
        };

        assert!(config.validate_detailed().has_errors());
    }
}
