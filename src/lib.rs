//! Table-driven IVI-style instrument drivers.
//!
//! This library talks to programmable bench instruments (DC power supplies,
//! DC electronic loads, oscilloscopes, spectrum analyzers and
//! multimeter/supply combos) over SCPI-like ASCII command sets. Every
//! supported model is a declarative
//! [`model::ModelDescription`]: channel envelopes, attribute command
//! templates, value mappings and utility commands. One generic
//! [`driver::Driver`] turns that table into an attribute surface with a
//! per-instance validity cache.
//!
//! # Architecture
//!
//! - [`adapters`]: the [`adapters::Transport`] trait plus VISA, serial and
//!   mock implementations.
//! - [`value`], [`mapping`], [`channel`], [`range`], [`attribute`]: the typed
//!   building blocks of a model table.
//! - [`model`]: the table itself, built in code or loaded from TOML.
//! - [`cache`]: attribute value slots with validity flags.
//! - [`driver`]: the engine applying the access rules.
//! - [`waveform`]: scope waveform preambles and sample scaling.
//! - [`models`]: built-in tables and the model registry.
//! - [`config`]: instrument definitions loaded with figment.
//!
//! # Example
//!
//! ```
//! use rust_ivi::adapters::MockTransport;
//! use rust_ivi::driver::Driver;
//! use rust_ivi::models::gwinstek;
//!
//! # fn main() -> Result<(), rust_ivi::error::IviError> {
//! let mock = MockTransport::new().with_reply(":output:state ?", "1");
//! let mut psu = Driver::new(gwinstek::pst3202()?, mock.clone())?;
//!
//! psu.set("voltage_level", "output1", 5.0)?;
//! assert!(psu.get_bool("enabled", "output2")?);
//! assert_eq!(
//!     mock.writes(),
//!     vec![":channel1:voltage 5.000000".to_string()]
//! );
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod attribute;
pub mod block;
pub mod cache;
pub mod channel;
pub mod config;
pub mod driver;
pub mod error;
pub mod mapping;
pub mod model;
pub mod models;
pub mod range;
pub mod value;
pub mod waveform;

pub use driver::{Driver, DriverOptions, Identity, OutputState};
pub use error::{IviError, IviResult};
pub use value::Value;
