//! Layered catalog configuration: defaults → optional TOML file → environment.
//!
//! # Invariants
//! - Every loaded configuration has passed `LibraryConfig::validate`.
//! - Environment keys use the `LIBRARY__SECTION__KEY` shape.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

use crate::model::author::Author;
use crate::model::book_definition::BookDefinition;
use crate::model::book_instance::BookInstanceStatus;
use crate::model::publisher::Publisher;

const ENV_PREFIX: &str = "LIBRARY";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_REGION_CAPACITY: usize = 1_000;

/// Region names the cache knows about; anything else in config is a typo.
pub const KNOWN_REGIONS: [&str; 4] = [
    Author::REGION,
    Publisher::REGION,
    BookDefinition::REGION,
    BookInstanceStatus::REGION,
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: String, reason: String },
}

impl ConfigError {
    fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file; `None` means an in-memory database.
    pub path: Option<PathBuf>,
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub default_capacity: usize,
    /// Per-region capacity overrides keyed by region name.
    pub regions: BTreeMap<String, usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_capacity: DEFAULT_REGION_CAPACITY,
            regions: BTreeMap::new(),
        }
    }
}

impl CacheConfig {
    pub fn capacity_for(&self, region: &str) -> usize {
        self.regions
            .get(region)
            .copied()
            .unwrap_or(self.default_capacity)
    }

    /// Cache configuration that never stores anything.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Absolute directory for rolling log files; `None` disables file logging.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: crate::logging::default_log_level().to_string(),
            dir: None,
        }
    }
}

impl LibraryConfig {
    /// Loads configuration from `file` (when given) and `LIBRARY__*` env vars.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.busy_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "database.busy_timeout_ms",
                "must be greater than zero",
            ));
        }
        if self.cache.default_capacity == 0 {
            return Err(ConfigError::invalid(
                "cache.default_capacity",
                "must be greater than zero",
            ));
        }
        for (region, capacity) in &self.cache.regions {
            if !KNOWN_REGIONS.contains(&region.as_str()) {
                return Err(ConfigError::invalid(
                    format!("cache.regions.{region}"),
                    format!("unknown region; expected one of {}", KNOWN_REGIONS.join(", ")),
                ));
            }
            if *capacity == 0 {
                return Err(ConfigError::invalid(
                    format!("cache.regions.{region}"),
                    "must be greater than zero",
                ));
            }
        }
        if let Some(dir) = self.logging.dir.as_ref() {
            if !dir.is_absolute() {
                return Err(ConfigError::invalid(
                    "logging.dir",
                    format!("must be an absolute path, got `{}`", dir.display()),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp config file");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn defaults_are_valid() {
        let config = LibraryConfig::default();
        config.validate().expect("defaults should validate");
        assert!(config.cache.enabled);
        assert_eq!(config.database.busy_timeout_ms, DEFAULT_BUSY_TIMEOUT_MS);
    }

    #[test]
    fn file_values_override_defaults() {
        let file = write_config(
            r#"
            [database]
            busy_timeout_ms = 250

            [cache]
            default_capacity = 16

            [cache.regions]
            "author" = 4
            "#,
        );

        let config = LibraryConfig::load(Some(file.path())).expect("config should load");
        assert_eq!(config.database.busy_timeout_ms, 250);
        assert_eq!(config.cache.capacity_for(Author::REGION), 4);
        assert_eq!(config.cache.capacity_for(Publisher::REGION), 16);
    }

    #[test]
    fn unknown_region_is_rejected() {
        let mut config = LibraryConfig::default();
        config.cache.regions.insert("autor".to_string(), 10);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("unknown region"), "{err}");
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let mut config = LibraryConfig::default();
        config.cache.default_capacity = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn relative_log_dir_is_rejected() {
        let mut config = LibraryConfig::default();
        config.logging.dir = Some(PathBuf::from("logs"));
        assert!(config.validate().is_err());
    }
}
