//! Configuration management for the derived-data caches.
//!
//! Provides layered configuration loading with priority:
//! 1. Default values (hardcoded)
//! 2. Optional config file
//! 3. Environment variables (highest priority)
//!

mod close_delay;
mod gate;
pub use close_delay::*;
pub use gate::*;

#[cfg(test)]
mod config_test;

//---
use crate::Result;
use config::{Config, Environment, File};
use serde::Deserialize;
use serde::Serialize;

/// Environment variable prefix, e.g. `DCACHE__GATE__MAX_WAIT_MS=500`
pub const ENV_PREFIX: &str = "DCACHE";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Settings {
    /// Grace periods applied by the close-delay decorators
    #[serde(default)]
    pub close_delay: CloseDelayConfig,
    /// TempLock and wipe timer bounds
    #[serde(default)]
    pub gate: GateConfig,
}

impl Settings {
    /// Load configuration from multiple sources with priority:
    /// 1. Built-in defaults
    /// 2. Config file (when `path` is given, it must exist)
    /// 3. Environment variables
    ///
    /// # Arguments
    /// * `path` - Optional path to a TOML file, with or without extension
    ///
    /// # Returns
    /// Merged and validated configuration
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = Config::builder();

        if let Some(path) = path {
            config = config.add_source(File::with_name(path).required(true));
        }

        config = config.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let settings: Settings = config.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validates all subsystem configurations
    pub fn validate(&self) -> Result<()> {
        self.close_delay.validate()?;
        self.gate.validate()?;
        Ok(())
    }
}
