//! Custom error types for the driver engine.
//!
//! This module defines the primary error type, `IviError`, used by every
//! accessor in the crate. Using the `thiserror` crate, it provides one
//! consistent error surface for the failures an instrument call can produce.
//!
//! ## Error Hierarchy
//!
//! - **Selector errors** (`UnknownChannel`, `UnknownAttribute`): the caller named
//!   a channel or attribute the model does not define.
//! - **Validation errors** (`OutOfRange`, `UnsupportedValue`, `ReadOnly`,
//!   `NotSupported`): the request was rejected before any I/O happened.
//! - **Response errors** (`MalformedResponse`, `UnrecognizedValue`,
//!   `InvalidAcquisitionType`, `IdMismatch`): the instrument answered, but
//!   not with something usable.
//! - **Model errors** (`InvalidModel`, `UnknownModel`, `Template`): a model
//!   table is inconsistent or a command template could not be rendered.
//! - **`Transport`**: wraps the `anyhow::Error` raised by the transport. The
//!   inner error is kept as-is; nothing in this crate retries.
//!
//! All errors surface synchronously to the caller of the accessor. A failed
//! set never leaves partially updated cache state behind.

use thiserror::Error;

/// Convenience alias for results using the driver error type.
pub type IviResult<T> = std::result::Result<T, IviError>;

/// Errors raised by driver accessors and model loading.
#[derive(Error, Debug)]
pub enum IviError {
    /// No channel matches the selector.
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    /// The model declares no such attribute in the requested scope.
    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),

    /// A numeric value falls outside the attribute's limit.
    #[error("Value {value} out of range for '{attribute}' (allowed {min}..={max})")]
    OutOfRange {
        /// Attribute or operation argument being checked.
        attribute: String,
        /// Rejected value.
        value: f64,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },

    /// A value of the wrong kind, or a token outside an enumeration.
    #[error("Unsupported value '{value}' for '{attribute}'")]
    UnsupportedValue {
        /// Attribute or argument name.
        attribute: String,
        /// Rejected value as text.
        value: String,
    },

    /// The reply could not be parsed into the expected kind.
    #[error("Malformed response to '{command}': '{response}'")]
    MalformedResponse {
        /// Command that was sent.
        command: String,
        /// Reply received.
        response: String,
    },

    /// An enumerated reply outside the attribute's mapping.
    #[error("Unrecognized value '{response}' for '{attribute}'")]
    UnrecognizedValue {
        /// Attribute being read.
        attribute: String,
        /// Reply received.
        response: String,
    },

    /// Write to an attribute without a write command.
    #[error("Attribute '{0}' is read-only")]
    ReadOnly(String),

    /// The model has no command for the operation.
    #[error("Operation '{0}' is not supported by this model")]
    NotSupported(String),

    /// The scope's acquisition mode cannot produce the requested waveform.
    #[error("Invalid acquisition type for waveform transfer: {0}")]
    InvalidAcquisitionType(String),

    /// The ID query reported a different instrument model.
    #[error("Instrument ID mismatch, expecting {expected}, got {actual}")]
    IdMismatch {
        /// Prefix declared by the model table.
        expected: String,
        /// Model reported by the instrument.
        actual: String,
    },

    /// A model table is inconsistent or could not be parsed.
    #[error("Invalid model description: {0}")]
    InvalidModel(String),

    /// No model table matches the name.
    #[error("Unknown instrument model: {0}")]
    UnknownModel(String),

    /// I/O was required but the driver has no transport.
    #[error("No transport attached to instrument '{0}'")]
    NotConnected(String),

    /// A command template could not be rendered.
    #[error("Failed to render command template '{template}': {reason}")]
    Template {
        /// Template text.
        template: String,
        /// Renderer message.
        reason: String,
    },

    /// Failure reported by the transport.
    #[error("Transport error: {0}")]
    Transport(#[from] anyhow::Error),
}

impl IviError {
    /// Shorthand for an out-of-range rejection of a numeric value.
    pub(crate) fn out_of_range(attribute: impl Into<String>, value: f64, min: f64, max: f64) -> Self {
        IviError::OutOfRange {
            attribute: attribute.into(),
            value,
            min,
            max,
        }
    }

    /// Shorthand for an unsupported-value rejection.
    pub(crate) fn unsupported(attribute: impl Into<String>, value: impl ToString) -> Self {
        IviError::UnsupportedValue {
            attribute: attribute.into(),
            value: value.to_string(),
        }
    }

    /// Shorthand for a response that could not be parsed.
    pub(crate) fn malformed(command: impl Into<String>, response: impl Into<String>) -> Self {
        IviError::MalformedResponse {
            command: command.into(),
            response: response.into(),
        }
    }
}
