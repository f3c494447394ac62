//! Serial transport for RS-232 instruments
//!
//! Wraps the `serialport` crate. Prodigit loads and GW Instek supplies are
//! commonly wired this way.

use super::Transport;
use anyhow::Result;
use std::time::Duration;

#[cfg(feature = "instrument_serial")]
use anyhow::{anyhow, Context};
#[cfg(feature = "instrument_serial")]
use serialport::SerialPort;
#[cfg(feature = "instrument_serial")]
use std::io::Write;
#[cfg(feature = "instrument_serial")]
use tracing::debug;

/// Serial transport for RS-232 communication
pub struct SerialTransport {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    port_name: String,

    /// Baud rate (e.g., 9600, 115200)
    baud_rate: u32,

    /// Read timeout
    timeout: Duration,

    /// Line terminator for commands (e.g., "\r\n")
    line_terminator: String,

    /// Assert DTR after opening; PST supplies and Prodigit loads wait for it
    dsr_dtr: bool,

    #[cfg(feature = "instrument_serial")]
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    /// Create a new, unopened serial transport
    ///
    /// # Arguments
    /// * `port_name` - Serial port path (e.g., "/dev/ttyUSB0", "COM3")
    /// * `baud_rate` - Communication speed (e.g., 9600, 115200)
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            timeout: Duration::from_secs(1),
            line_terminator: "\r\n".to_string(),
            dsr_dtr: false,
            #[cfg(feature = "instrument_serial")]
            port: None,
        }
    }

    /// Set the read timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set line terminator for commands
    pub fn with_line_terminator(mut self, terminator: impl Into<String>) -> Self {
        self.line_terminator = terminator.into();
        self
    }

    /// Use DSR/DTR handshaking
    pub fn with_dsr_dtr(mut self, dsr_dtr: bool) -> Self {
        self.dsr_dtr = dsr_dtr;
        self
    }

    /// Port this transport talks to.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Open the serial port.
    #[cfg(feature = "instrument_serial")]
    pub fn open(&mut self) -> Result<()> {
        let mut port = serialport::new(&self.port_name, self.baud_rate)
            .timeout(self.timeout)
            .open()
            .with_context(|| {
                format!(
                    "Failed to open serial port '{}' at {} baud",
                    self.port_name, self.baud_rate
                )
            })?;
        if self.dsr_dtr {
            port.write_data_terminal_ready(true)
                .context("Failed to assert DTR")?;
        }
        self.port = Some(port);
        debug!(
            "Serial port '{}' opened at {} baud",
            self.port_name, self.baud_rate
        );
        Ok(())
    }

    /// Open the serial port.
    #[cfg(not(feature = "instrument_serial"))]
    pub fn open(&mut self) -> Result<()> {
        Err(anyhow::anyhow!(
            "Serial support not enabled. Rebuild with --features instrument_serial"
        ))
    }

    #[cfg(feature = "instrument_serial")]
    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| anyhow!("Serial port '{}' not open", self.port_name))
    }
}

#[cfg(feature = "instrument_serial")]
impl Transport for SerialTransport {
    fn write(&mut self, command: &str) -> Result<()> {
        let message = format!("{}{}", command, self.line_terminator);
        let port = self.port()?;
        port.write_all(message.as_bytes())
            .context("Failed to write to serial port")?;
        port.flush().context("Failed to flush serial port")?;
        debug!("Sent serial command: {}", command);
        Ok(())
    }

    fn ask(&mut self, command: &str) -> Result<String> {
        self.write(command)?;
        let reply = crate::block::read_message(self.port()?)
            .with_context(|| format!("Serial query failed for: {}", command))?;
        let reply = String::from_utf8_lossy(&reply).trim().to_string();
        debug!("Serial query '{}' -> '{}'", command, reply);
        Ok(reply)
    }

    fn read_raw(&mut self) -> Result<Vec<u8>> {
        crate::block::read_message(self.port()?).context("Failed to read from serial port")
    }

    fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        let port = self.port()?;
        port.write_all(data).context("Failed to write to serial port")?;
        port.flush().context("Failed to flush serial port")?;
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.port()?
            .clear(serialport::ClearBuffer::All)
            .context("Failed to clear serial buffers")
    }

    fn name(&self) -> &str {
        "serial"
    }
}

#[cfg(not(feature = "instrument_serial"))]
impl Transport for SerialTransport {
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
        "serial"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let transport = SerialTransport::new("/dev/ttyUSB0", 9600);
        assert_eq!(transport.port_name(), "/dev/ttyUSB0");
        assert_eq!(transport.baud_rate, 9600);
        assert_eq!(transport.line_terminator, "\r\n");
        assert!(!transport.dsr_dtr);
        assert!(transport.with_dsr_dtr(true).dsr_dtr);
    }

    #[cfg(not(feature = "instrument_serial"))]
    #[test]
    fn test_disabled_feature_reports_error() {
        let mut transport = SerialTransport::new("/dev/ttyUSB0", 9600);
        assert!(transport.ask("*IDN?").is_err());
    }
}
