//! Configuration System
//!
//! This module provides configuration management using Figment.
//!
//! # Configuration Sources
//!
//! Configuration is loaded from (in order of precedence):
//! 1. Environment variables prefixed with `RUSTIVI_`
//! 2. TOML configuration file (default: `config/rust_ivi.toml`)
//!
//! # Example
//!
//! ```no_run
//! use rust_ivi::config::IviConfig;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load from default location
//!     let config = IviConfig::load()?;
//!
//!     // Or load from custom location
//!     let config = IviConfig::load_from("custom/path.toml")?;
//!
//!     println!("App name: {}", config.application.name);
//!     println!("Enabled instruments: {}", config.enabled_instruments().len());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Environment Variables
//!
//! Any configuration value can be overridden via environment variables with
//! the `RUSTIVI_` prefix and key path separated by double underscores:
//!
//! ```text
//! # Set application name
//! RUSTIVI_APPLICATION__NAME="Bench 3"
//!
//! # Set log level
//! RUSTIVI_APPLICATION__LOG_LEVEL=debug
//! ```

pub mod ivi_config;

pub use ivi_config::{
    ApplicationConfig, ConfigError, InstrumentDefinition, IviConfig, TransportKind,
};
