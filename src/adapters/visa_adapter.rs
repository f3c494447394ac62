//! VISA transport for GPIB/USB/Ethernet instruments
//!
//! Wraps the `visa-rs` crate. Supports resource strings like:
//! - "GPIB0::1::INSTR" (GPIB interface)
//! - "USB0::0x1234::0x5678::SERIAL::INSTR" (USB)
//! - "TCPIP0::192.168.1.100::INSTR" (Ethernet/LXI)
//!
//! Without the `instrument_visa` feature the type still exists so
//! configuration code compiles, but opening it fails.

use super::Transport;
use anyhow::Result;
use std::time::Duration;

#[cfg(feature = "instrument_visa")]
use anyhow::{anyhow, Context};
#[cfg(feature = "instrument_visa")]
use std::io::Write;
#[cfg(feature = "instrument_visa")]
use tracing::debug;
#[cfg(feature = "instrument_visa")]
use visa_rs::prelude::*;

/// VISA transport for instrument communication
pub struct VisaTransport {
    /// VISA resource string (e.g., "GPIB0::1::INSTR")
    resource_string: String,

    /// Open timeout
    timeout: Duration,

    /// Line terminator for commands (typically "\n" for SCPI)
    line_terminator: String,

    #[cfg(feature = "instrument_visa")]
    instrument: Option<Instrument>,
}

impl VisaTransport {
    /// Create a new, unopened VISA transport with default settings
    ///
    /// # Arguments
    /// * `resource_string` - VISA resource identifier (e.g., "GPIB0::1::INSTR")
    pub fn new(resource_string: impl Into<String>) -> Self {
        Self {
            resource_string: resource_string.into(),
            timeout: Duration::from_secs(5),
            line_terminator: "\n".to_string(),
            #[cfg(feature = "instrument_visa")]
            instrument: None,
        }
    }

    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set line terminator for commands
    pub fn with_line_terminator(mut self, terminator: impl Into<String>) -> Self {
        self.line_terminator = terminator.into();
        self
    }

    /// Resource string this transport talks to.
    pub fn resource(&self) -> &str {
        &self.resource_string
    }

    /// Open the VISA session.
    #[cfg(feature = "instrument_visa")]
    pub fn open(&mut self) -> Result<()> {
        let rm = DefaultRM::new().context("Failed to create VISA resource manager")?;
        let c_string = std::ffi::CString::new(self.resource_string.as_str())
            .context("Failed to create CString")?;
        let visa_string = VisaString::from(c_string);
        let session = rm
            .open(&visa_string, AccessMode::NO_LOCK, self.timeout)
            .with_context(|| format!("Failed to open VISA resource '{}'", self.resource_string))?;
        self.instrument = Some(session);
        debug!("VISA resource '{}' opened", self.resource_string);
        Ok(())
    }

    /// Open the VISA session.
    #[cfg(not(feature = "instrument_visa"))]
    pub fn open(&mut self) -> Result<()> {
        Err(anyhow::anyhow!(
            "VISA support not enabled. Rebuild with --features instrument_visa"
        ))
    }

    #[cfg(feature = "instrument_visa")]
    fn session(&mut self) -> Result<&mut Instrument> {
        self.instrument
            .as_mut()
            .ok_or_else(|| anyhow!("VISA instrument not connected"))
    }
}

#[cfg(feature = "instrument_visa")]
impl Transport for VisaTransport {
    fn write(&mut self, command: &str) -> Result<()> {
        let message = format!("{}{}", command, self.line_terminator);
        self.session()?
            .write_all(message.as_bytes())
            .with_context(|| format!("VISA write failed for: {}", command))?;
        debug!("VISA command sent: {}", command);
        Ok(())
    }

    fn ask(&mut self, command: &str) -> Result<String> {
        self.write(command)?;
        let reply = crate::block::read_message(self.session()?)
            .with_context(|| format!("VISA query failed for: {}", command))?;
        let reply = String::from_utf8_lossy(&reply).trim().to_string();
        debug!("VISA query '{}' -> '{}'", command, reply);
        Ok(reply)
    }

    fn read_raw(&mut self) -> Result<Vec<u8>> {
        let data = crate::block::read_message(self.session()?).context("VISA read failed")?;
        debug!("VISA raw read: {} bytes", data.len());
        Ok(data)
    }

    fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        self.session()?
            .write_all(data)
            .context("VISA raw write failed")?;
        debug!("VISA raw write: {} bytes", data.len());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.session()?.clear().context("VISA device clear failed")?;
        Ok(())
    }

    fn name(&self) -> &str {
        "visa"
    }
}

#[cfg(not(feature = "instrument_visa"))]
impl Transport for VisaTransport {
    fn write(&mut self, _command: &str) -> Result<()> {
        self.open()
    }

    fn ask(&mut self, _command: &str) -> Result<String> {
        self.open().map(|_| String::new())
    }

    fn read_raw(&mut self) -> Result<Vec<u8>> {
        self.open().map(|_| Vec::new())
    }

    fn name(&self) -> &str {
        "visa"
    }
}
