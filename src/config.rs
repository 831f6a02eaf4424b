//! Configuration using Figment
//!
//! Configuration is loaded from:
//! 1. a TOML file (base configuration, optional)
//! 2. Environment variables prefixed with `PSLAB_`, using `__` between
//!    section and key (e.g. `PSLAB_PROTOCOL__TIMEOUT_MS=750`)
//!
//! Every field has a default, so an absent file yields a working setup.
//!
//! # Example
//! ```no_run
//! use pslab_protocol::config::PslabConfig;
//!
//! let config = PslabConfig::load()?;
//! config.validate()?;
//! println!("Timeout: {:?}", config.protocol.timeout());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/pslab.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PslabConfig {
    /// Application settings
    pub application: ApplicationConfig,
    /// Protocol engine settings
    pub protocol: ProtocolConfig,
    /// Serial port settings
    pub serial: SerialConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Protocol engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Timeout applied to every blocking read and write, in milliseconds
    pub timeout_ms: u64,
    /// Prefix the device's version identifier must start with
    pub expected_version: String,
}

/// Serial port configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Port path (e.g., "/dev/ttyACM0", "COM3")
    pub port: String,
    /// Line speed
    pub baud_rate: u32,
}

impl ProtocolConfig {
    /// Timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 500,
            expected_version: "CS".to_string(),
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".to_string(),
            baud_rate: 1_000_000,
        }
    }
}

impl PslabConfig {
    /// Load configuration from [`DEFAULT_CONFIG_PATH`] and environment variables
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    ///
    /// A missing file is not an error; defaults and environment still apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(PslabConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("PSLAB_").split("__"))
            .extract()
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            ));
        }

        if self.protocol.timeout_ms == 0 {
            return Err("Invalid timeout_ms 0. Must be greater than zero".to_string());
        }

        if self.protocol.expected_version.is_empty() {
            return Err("expected_version must not be empty".to_string());
        }

        if self.serial.baud_rate == 0 {
            return Err("Invalid baud_rate 0. Must be greater than zero".to_string());
        }

        Ok(())
    }
}
