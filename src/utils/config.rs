//! Configuration loading.
//!
//! Sources in increasing priority:
//! - built-in defaults
//! - a JSON file
//! - `HDKEY_*` environment variables

use crate::primitives::network::{Network, Purpose};
use crate::utils::logging::LogLevel;
use crate::{HdError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

/// Prefix of the environment variables read by [`HdConfig::apply_env`].
pub const ENV_PREFIX: &str = "HDKEY_";

/// Defaults applied when keys are created or serialized without explicit
/// parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HdConfig {
    pub network: Network,
    pub purpose: Purpose,
    pub log_level: LogLevel,
}

impl Default for HdConfig {
    fn default() -> Self {
        Self {
            network: Network::Mainnet,
            purpose: Purpose::Legacy,
            log_level: LogLevel::Info,
        }
    }
}

impl HdConfig {
    /// Defaults, then `path` if it exists, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(path)?,
            Some(path) => {
                log::debug!("config file {:?} not found, using defaults", path);
                Self::default()
            }
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Read a JSON file. Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config = serde_json::from_str(&contents)?;
        log::debug!("loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        log::debug!("configuration saved to {:?}", path);
        Ok(())
    }

    /// Override fields from `HDKEY_NETWORK`, `HDKEY_PURPOSE` and
    /// `HDKEY_LOG_LEVEL`.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|name| match env::var(name) {
            Ok(value) => Ok(Some(value)),
            Err(env::VarError::NotPresent) => Ok(None),
            Err(env::VarError::NotUnicode(_)) => Err(HdError::Config(format!(
                "Environment variable {} is not valid unicode",
                name
            ))),
        })
    }

    /// Override fields from an arbitrary variable source. `lookup` receives
    /// the full variable name, e.g. `HDKEY_NETWORK`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Result<Option<String>>,
    {
        if let Some(value) = lookup(&format!("{}NETWORK", ENV_PREFIX))? {
            self.network = value.parse()?;
        }
        if let Some(value) = lookup(&format!("{}PURPOSE", ENV_PREFIX))? {
            self.purpose = value.parse()?;
        }
        if let Some(value) = lookup(&format!("{}LOG_LEVEL", ENV_PREFIX))? {
            self.log_level = value.parse()?;
        }
        Ok(())
    }
}
