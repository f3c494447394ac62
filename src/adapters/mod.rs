//! Transport adapters.
//!
//! The driver engine talks to instruments only through the [`Transport`]
//! trait: line-oriented ASCII writes and queries plus raw reads for binary
//! block replies. Implementations wrap existing I/O libraries:
//!
//! - [`MockTransport`]: scripted replies and call logging for tests and demos
//! - [`VisaTransport`]: GPIB/USB/LAN instruments through `visa-rs`
//!   (feature `instrument_visa`)
//! - [`SerialTransport`]: RS-232 instruments through `serialport`
//!   (feature `instrument_serial`)
//!
//! Errors are plain `anyhow::Error`s; the driver wraps them in
//! [`IviError::Transport`](crate::error::IviError::Transport) without
//! rewriting them.

pub mod mock_adapter;
pub mod serial_adapter;
pub mod visa_adapter;

pub use mock_adapter::MockTransport;
pub use serial_adapter::SerialTransport;
pub use visa_adapter::VisaTransport;

use anyhow::{anyhow, Result};

/// Line-oriented instrument I/O.
///
/// Commands are passed without a line terminator; implementations append
/// their own.
pub trait Transport: Send {
    /// Send a command that produces no reply.
    fn write(&mut self, command: &str) -> Result<()>;

    /// Send a query and return its reply line.
    fn ask(&mut self, command: &str) -> Result<String>;

    /// Read whatever the instrument sends next as raw bytes.
    fn read_raw(&mut self) -> Result<Vec<u8>>;

    /// Send raw bytes, e.g. a binary block.
    fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        let _ = data;
        Err(anyhow!("{} does not support raw writes", self.name()))
    }

    /// Interface clear. Transports without one do nothing.
    fn clear(&mut self) -> Result<()> {
        Ok(())
    }

    /// Short name used in log messages.
    fn name(&self) -> &str {
        "transport"
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, command: &str) -> Result<()> {
        (**self).write(command)
    }

    fn ask(&mut self, command: &str) -> Result<String> {
        (**self).ask(command)
    }

    fn read_raw(&mut self) -> Result<Vec<u8>> {
        (**self).read_raw()
    }

    fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        (**self).write_raw(data)
    }

    fn clear(&mut self) -> Result<()> {
        (**self).clear()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
