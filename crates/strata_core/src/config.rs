//! # Manager Configuration
//!
//! Loaded once at startup, never consulted again on the hot path.
//!
//! ```toml
//! initial_capacity = 1024
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// Entity slots allocated when a manager is created.
pub const DEFAULT_INITIAL_CAPACITY: usize = 100;

/// Tunables for a [`Manager`](crate::ecs::Manager).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManagerConfig {
    /// Entity, handle and component slots allocated up front.
    pub initial_capacity: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
        }
    }
}

impl ManagerConfig {
    /// Parses a config from TOML text and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the
    /// same errors as [`ManagerConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `initial_capacity` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_capacity == 0 {
            return Err(ConfigError::Invalid(
                "initial_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_constant() {
        let config = ManagerConfig::default();
        assert_eq!(config.initial_capacity, DEFAULT_INITIAL_CAPACITY);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_overrides_capacity() {
        let config = ManagerConfig::from_toml_str("initial_capacity = 4096").unwrap();
        assert_eq!(config.initial_capacity, 4096);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = ManagerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ManagerConfig::default());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = ManagerConfig::from_toml_str("initial_capacity = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = ManagerConfig::from_toml_str("growth = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join("strata_config_that_does_not_exist.toml");
        let err = ManagerConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
