//! Serial transport for USB-CDC / RS-232 instruments.
//!
//! Wraps a blocking `serialport` handle. Reads keep pulling from the port
//! until the requested count has arrived or the per-call deadline passes,
//! so a reply split across several USB packets is still collected in one call.

use super::Transport;
use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Default line speed of PSLab-class devices.
pub const DEFAULT_BAUD_RATE: u32 = 1_000_000;

/// Serial transport backed by the `serialport` crate.
pub struct SerialTransport {
    /// Port name (e.g., "/dev/ttyACM0", "COM3")
    port_name: String,

    /// `None` once the port has been closed
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    /// Open `port_name` at `baud_rate`, 8N1, no flow control.
    pub fn open(port_name: &str, baud_rate: u32) -> io::Result<Self> {
        let port = serialport::new(port_name, baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .open()
            .map_err(io::Error::from)?;

        debug!(port = port_name, baud_rate, "Serial port opened");
        Ok(Self::from_port(port_name.to_string(), port))
    }

    /// Wrap an already opened port.
    pub fn from_port(port_name: String, port: Box<dyn SerialPort>) -> Self {
        Self {
            port_name,
            port: Some(port),
        }
    }

    /// Port path this transport was opened on.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Release the port. Later I/O fails with `NotConnected`.
    pub fn close(&mut self) {
        if self.port.take().is_some() {
            debug!(port = %self.port_name, "Serial port closed");
        }
    }

    fn port_mut(&mut self) -> io::Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "serial port is closed")
        })
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, bytes: &[u8], timeout: Duration) -> io::Result<()> {
        let port = self.port_mut()?;
        port.set_timeout(timeout).map_err(io::Error::from)?;
        port.write_all(bytes)?;
        port.flush()?;
        trace!(len = bytes.len(), "Serial write");
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        let port = self.port_mut()?;
        let deadline = Instant::now() + timeout;
        let mut filled = 0;

        while filled < buf.len() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            port.set_timeout(remaining).map_err(io::Error::from)?;

            match port.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        trace!(requested = buf.len(), received = filled, "Serial read");
        Ok(filled)
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }
}
