//! Instrument configuration using Figment
//!
//! Configuration is loaded from:
//! 1. `config/rust_ivi.toml` (base configuration)
//! 2. Environment variables (prefixed with `RUSTIVI_`)
//!
//! # Environment Variable Overrides
//!
//! Nested keys are separated by a double underscore:
//!
//! ```text
//! RUSTIVI_APPLICATION__LOG_LEVEL=debug
//! RUSTIVI_APPLICATION__NAME="Bench 3"
//! ```
//!
//! # Example
//!
//! ```no_run
//! use rust_ivi::config::IviConfig;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = IviConfig::load()?;
//!     let registry = config.registry()?;
//!     for instrument in config.enabled_instruments() {
//!         let mut driver = instrument.connect(&registry)?;
//!         println!("{}: {}", instrument.id, driver.identity_model()?);
//!     }
//!     Ok(())
//! }
//! ```

use crate::adapters::{MockTransport, SerialTransport, Transport, VisaTransport};
use crate::driver::{Driver, DriverOptions};
use crate::error::IviResult;
use crate::models::ModelRegistry;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File or environment could not be read into the config structs
    #[error("Configuration load error: {0}")]
    LoadError(#[from] figment::Error),
    /// Values loaded but inconsistent
    #[error("Configuration validation error: {0}")]
    ValidationError(String),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IviConfig {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Instrument definitions
    #[serde(default)]
    pub instruments: Vec<InstrumentDefinition>,
    /// Extra model tables in TOML, registered next to the built-in ones
    #[serde(default)]
    pub model_files: Vec<PathBuf>,
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
        }
    }
}

/// How an instrument is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// VISA resource string (GPIB, USB-TMC, LXI)
    #[default]
    Visa,
    /// Serial port path
    Serial,
    /// In-process mock, for dry runs
    Mock,
}

/// Instrument definition in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentDefinition {
    /// Unique instrument identifier
    pub id: String,
    /// Model name or supported instrument model (e.g. "PST-3202")
    pub model: String,
    /// VISA resource string or serial port
    #[serde(default)]
    pub resource: String,
    /// Transport used for `resource`
    #[serde(default)]
    pub transport: TransportKind,
    /// Never talk to the instrument
    #[serde(default)]
    pub simulate: bool,
    /// Verify the reported model on connect
    #[serde(default)]
    pub id_query: bool,
    /// Reset the instrument on connect
    #[serde(default)]
    pub reset: bool,
    /// Transport timeout in milliseconds
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
    /// Baud rate for serial transports
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// DSR/DTR handshaking for serial transports
    #[serde(default)]
    pub dsr_dtr: bool,
    /// Whether this instrument is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// ============================================================================
// Default value functions
// ============================================================================

fn default_name() -> String {
    "rust_ivi".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout() -> u64 {
    5000
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_enabled() -> bool {
    true
}

// ============================================================================
// Configuration Loading and Validation
// ============================================================================

impl IviConfig {
    /// Load configuration from `config/rust_ivi.toml` and environment
    /// variables
    ///
    /// Configuration is loaded in this order of precedence (highest to lowest):
    /// 1. Environment variables (`RUSTIVI_` prefix)
    /// 2. `config/rust_ivi.toml`
    ///
    /// # Errors
    ///
    /// Returns a ConfigError if the file cannot be loaded or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config/rust_ivi.toml")
    }

    /// Load configuration from a specific file path
    ///
    /// # Errors
    ///
    /// Returns a ConfigError if the file cannot be loaded or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config: Self = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("RUSTIVI_").split("__"))
            .extract()
            .map_err(ConfigError::LoadError)?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    ///
    /// Checks:
    /// - Log level is valid (trace, debug, info, warn, error)
    /// - Instrument IDs are unique
    /// - Online VISA/serial instruments have a resource and a timeout
    /// - Every instrument names a known model (built-in or from `model_files`)
    ///
    /// # Errors
    ///
    /// Returns a ConfigError with a descriptive message for any validation failure.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        let registry = self.registry()?;

        let mut ids = std::collections::HashSet::new();
        for instrument in &self.instruments {
            if !ids.insert(&instrument.id) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate instrument ID: '{}'",
                    instrument.id
                )));
            }

            if !registry.contains(&instrument.model) {
                return Err(ConfigError::ValidationError(format!(
                    "Instrument '{}': unknown model '{}'",
                    instrument.id, instrument.model
                )));
            }

            let online = !instrument.simulate && instrument.transport != TransportKind::Mock;
            if online && instrument.resource.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "Instrument '{}': 'resource' cannot be empty",
                    instrument.id
                )));
            }
            if online && instrument.timeout_ms == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "Instrument '{}': 'timeout_ms' must be > 0",
                    instrument.id
                )));
            }
        }

        Ok(())
    }

    /// Built-in model tables plus those listed in `model_files`
    ///
    /// # Errors
    ///
    /// Returns a ValidationError naming the file that failed to load.
    pub fn registry(&self) -> Result<ModelRegistry, ConfigError> {
        let mut registry =
            ModelRegistry::builtin().map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        for path in &self.model_files {
            let name = registry
                .load_file(path)
                .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
            debug!("Loaded model '{}' from {}", name, path.display());
        }
        Ok(registry)
    }

    /// Get all enabled instruments
    pub fn enabled_instruments(&self) -> Vec<&InstrumentDefinition> {
        self.instruments
            .iter()
            .filter(|inst| inst.enabled)
            .collect()
    }

    /// Look up an instrument by ID
    pub fn instrument(&self, id: &str) -> Option<&InstrumentDefinition> {
        self.instruments.iter().find(|inst| inst.id == id)
    }
}

impl InstrumentDefinition {
    /// Driver options derived from this definition
    pub fn options(&self) -> DriverOptions {
        DriverOptions {
            simulate: self.simulate,
            id_query: self.id_query,
            reset: self.reset,
        }
    }

    /// Open the configured transport; `None` when simulating.
    ///
    /// # Errors
    ///
    /// Transport errors from opening the VISA session or serial port.
    pub fn open_transport(&self) -> IviResult<Option<Box<dyn Transport>>> {
        if self.simulate {
            return Ok(None);
        }
        let timeout = Duration::from_millis(self.timeout_ms);
        let transport: Box<dyn Transport> = match self.transport {
            TransportKind::Visa => {
                let mut visa = VisaTransport::new(&self.resource).with_timeout(timeout);
                visa.open()?;
                Box::new(visa)
            }
            TransportKind::Serial => {
                let mut serial = SerialTransport::new(&self.resource, self.baud_rate)
                    .with_timeout(timeout)
                    .with_dsr_dtr(self.dsr_dtr);
                serial.open()?;
                Box::new(serial)
            }
            TransportKind::Mock => Box::new(MockTransport::new()),
        };
        debug!("Opened {} transport for '{}'", transport.name(), self.id);
        Ok(Some(transport))
    }

    /// Resolve the model, open the transport and initialize a driver.
    ///
    /// # Errors
    ///
    /// Unknown model, transport and initialization errors.
    pub fn connect(&self, registry: &ModelRegistry) -> IviResult<Driver> {
        let model = registry.find(&self.model)?.clone();
        Driver::open(model, self.open_transport()?, self.options())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instrument(id: &str, model: &str) -> InstrumentDefinition {
        InstrumentDefinition {
            id: id.to_string(),
            model: model.to_string(),
            resource: "GPIB0::5::INSTR".to_string(),
            transport: TransportKind::Visa,
            simulate: false,
            id_query: false,
            reset: false,
            timeout_ms: default_timeout(),
            baud_rate: default_baud_rate(),
            dsr_dtr: false,
            enabled: true,
        }
    }

    #[test]
    fn test_config_validation_valid() {
        let config = IviConfig {
            instruments: vec![instrument("psu", "PST-3202"), instrument("load", "3311C")],
            ..IviConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = IviConfig::default();
        config.application.log_level = "verbose".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(msg)) if msg.contains("log_level")
        ));
    }

    #[test]
    fn test_config_validation_duplicate_ids() {
        let config = IviConfig {
            instruments: vec![instrument("psu", "PST-3202"), instrument("psu", "PST-3201")],
            ..IviConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(msg)) if msg.contains("Duplicate")
        ));
    }

    #[test]
    fn test_config_validation_unknown_model() {
        let config = IviConfig {
            instruments: vec![instrument("psu", "E3631A")],
            ..IviConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_empty_resource() {
        let mut psu = instrument("psu", "PST-3202");
        psu.resource.clear();
        let mut config = IviConfig {
            instruments: vec![psu],
            ..IviConfig::default()
        };
        assert!(config.validate().is_err());

        // simulated instruments need no resource
        config.instruments[0].simulate = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_connect_simulated() {
        let mut psu = instrument("psu", "PST-3202");
        psu.simulate = true;
        let registry = ModelRegistry::builtin().unwrap();
        let mut driver = psu.connect(&registry).unwrap();
        assert!(driver.is_simulating());
        assert_eq!(
            driver.identity_model().unwrap(),
            "Not available while simulating"
        );
    }

    #[test]
    fn test_enabled_instruments() {
        let mut disabled = instrument("scope", "WaveRunner");
        disabled.enabled = false;
        let config = IviConfig {
            instruments: vec![instrument("psu", "PST-3202"), disabled],
            ..IviConfig::default()
        };
        assert_eq!(config.enabled_instruments().len(), 1);
        assert!(config.instrument("scope").is_some());
    }
}
