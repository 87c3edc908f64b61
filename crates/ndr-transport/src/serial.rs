//! Serial command link
//!
//! Bench and field setups reach the positional radios over RS-232. The
//! console echoes commands and prints the same `>` prompt as the TCP port.

use std::io::Write;
use std::time::Duration;

use serialport::SerialPort;
use tracing::{debug, info};

use crate::error::TransportError;
use crate::framing::{read_frame, FrameBuffer};
use crate::{ConnectionMode, Transport};

/// Default console baud rate
pub const DEFAULT_BAUD_RATE: u32 = 921_600;

/// Blocking serial transport
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
    path: String,
    frames: FrameBuffer,
}

impl SerialTransport {
    /// Open `path` at `baud_rate`, 8N1 without flow control
    pub fn open(path: &str, baud_rate: u32, timeout: Duration) -> Result<Self, TransportError> {
        debug!("Opening {} at {} baud", path, baud_rate);
        let port = serialport::new(path, baud_rate)
            .timeout(timeout)
            .open()
            .map_err(|e| TransportError::ConnectFailed {
                address: path.to_string(),
                reason: e.to_string(),
            })?;
        info!("Opened serial port {} at {} baud", path, baud_rate);

        Ok(Self {
            port: Some(port),
            path: path.to_string(),
            frames: FrameBuffer::new(),
        })
    }

    /// Port path this transport was opened on
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("path", &self.path)
            .field("open", &self.port.is_some())
            .finish()
    }
}

impl Transport for SerialTransport {
    fn mode(&self) -> ConnectionMode {
        ConnectionMode::Serial
    }

    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::NotConnected)?;
        self.frames.clear();
        port.write_all(data).map_err(TransportError::from_io)?;
        port.flush().map_err(TransportError::from_io)?;
        Ok(())
    }

    fn receive(&mut self, terminator: &[u8], timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::NotConnected)?;
        read_frame(port.as_mut(), &mut self.frames, terminator, timeout, |p, t| {
            p.set_timeout(t).map_err(TransportError::from)
        })
    }

    fn disconnect(&mut self) {
        if self.port.take().is_some() {
            info!("Closed serial port {}", self.path);
        }
        self.frames.clear();
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }
}
