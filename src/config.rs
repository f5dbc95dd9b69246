//! Engine configuration.
//!
//! Settings are layered: built-in defaults, then `OPMETA_*` environment
//! variables, then (optionally) a TOML file. The resolved config is installed
//! once per process; caches read it lazily on first use.
//!
//! ```toml
//! # opmeta.toml
//! parse_cache_size = 2048
//! inversion_cache_size = 8192
//! ```

use std::path::Path;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable overriding [`EngineConfig::parse_cache_size`]
pub const PARSE_CACHE_SIZE_VAR: &str = "OPMETA_PARSE_CACHE_SIZE";
/// Environment variable overriding [`EngineConfig::inversion_cache_size`]
pub const INVERSION_CACHE_SIZE_VAR: &str = "OPMETA_INVERSION_CACHE_SIZE";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of parsed computation trees kept in the LRU cache
    pub parse_cache_size: usize,
    /// Maximum number of memoized inversion results
    pub inversion_cache_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            parse_cache_size: 1024,
            inversion_cache_size: 4096,
        }
    }
}

impl EngineConfig {
    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `OPMETA_*` overrides. Unparseable or zero values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(size) = env_size(PARSE_CACHE_SIZE_VAR) {
            self.parse_cache_size = size;
        }
        if let Some(size) = env_size(INVERSION_CACHE_SIZE_VAR) {
            self.inversion_cache_size = size;
        }
        self
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(text)?;
        Ok(file.overlay(Self::default()))
    }

    /// Environment-resolved config overlaid with the keys present in a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let file: ConfigFile = toml::from_str(&text)?;
        Ok(file.overlay(Self::from_env()))
    }
}

/// On-disk shape of the config; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    parse_cache_size: Option<usize>,
    inversion_cache_size: Option<usize>,
}

impl ConfigFile {
    fn overlay(self, mut base: EngineConfig) -> EngineConfig {
        if let Some(size) = self.parse_cache_size {
            base.parse_cache_size = size;
        }
        if let Some(size) = self.inversion_cache_size {
            base.inversion_cache_size = size;
        }
        base
    }
}

fn env_size(var: &str) -> Option<usize> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .filter(|&n: &usize| n > 0)
}

static CONFIG: OnceLock<EngineConfig> = OnceLock::new();

/// Install the process-wide config. Fails (returning the rejected config) if
/// a config is already installed or a cache has already initialized itself.
pub fn install(config: EngineConfig) -> Result<(), EngineConfig> {
    CONFIG.set(config)
}

/// The installed config, initializing from the environment on first use
pub fn current() -> &'static EngineConfig {
    CONFIG.get_or_init(EngineConfig::from_env)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.parse_cache_size, 1024);
        assert_eq!(config.inversion_cache_size, 4096);
    }

    #[test]
    fn test_from_toml_partial() {
        let config = EngineConfig::from_toml_str("parse_cache_size = 8\n").unwrap();
        assert_eq!(config.parse_cache_size, 8);
        assert_eq!(config.inversion_cache_size, 4096);
    }

    #[test]
    fn test_from_toml_rejects_unknown_keys() {
        let err = EngineConfig::from_toml_str("cache = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("opmeta-config-{}.toml", std::process::id()));
        std::fs::write(&path, "inversion_cache_size = 16\n").unwrap();
        let config = EngineConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.inversion_cache_size, 16);
    }

    #[test]
    fn test_from_missing_file() {
        let err = EngineConfig::from_file("/nonexistent/opmeta.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_install_rejected_once_config_is_active() {
        let active = current().clone();
        let rejected = EngineConfig {
            parse_cache_size: 3,
            ..EngineConfig::default()
        };
        assert_eq!(install(rejected.clone()), Err(rejected));
        assert_eq!(current(), &active);
    }

    #[test]
    fn test_env_size_parsing() {
        std::env::set_var("OPMETA_TEST_ENV_SIZE_OK", " 32 ");
        std::env::set_var("OPMETA_TEST_ENV_SIZE_ZERO", "0");
        std::env::set_var("OPMETA_TEST_ENV_SIZE_BAD", "lots");
        assert_eq!(env_size("OPMETA_TEST_ENV_SIZE_OK"), Some(32));
        assert_eq!(env_size("OPMETA_TEST_ENV_SIZE_ZERO"), None);
        assert_eq!(env_size("OPMETA_TEST_ENV_SIZE_BAD"), None);
        assert_eq!(env_size("OPMETA_TEST_ENV_SIZE_UNSET"), None);
    }
}
