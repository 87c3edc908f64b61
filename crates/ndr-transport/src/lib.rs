//! NDR Transport Library
//!
//! Blocking byte links to NDR radios. Every link is used strictly as
//! request/reply: one command is written, then one reply is read before the
//! next command goes out.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use ndr_transport::{open, ConnectionMode};
//!
//! let mut link = open(ConnectionMode::Tcp, "192.168.0.10", 8617, Duration::from_secs(2)).unwrap();
//! link.send(b"STAT?\n").unwrap();
//! let reply = link.receive(b">", Duration::from_secs(2)).unwrap();
//! println!("{}", String::from_utf8_lossy(&reply));
//! ```

pub mod error;
pub mod framing;
pub mod scanner;
pub mod serial;
pub mod tcp;
pub mod udp;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use error::TransportError;
pub use scanner::{PortScanner, SerialPortInfo};
pub use serial::SerialTransport;
pub use tcp::TcpTransport;
pub use udp::UdpTransport;

/// Kind of link to a radio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    #[default]
    Tcp,
    Udp,
    Serial,
}

impl ConnectionMode {
    pub fn name(&self) -> &'static str {
        match self {
            ConnectionMode::Tcp => "tcp",
            ConnectionMode::Udp => "udp",
            ConnectionMode::Serial => "serial",
        }
    }
}

impl fmt::Display for ConnectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConnectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tcp" => Ok(ConnectionMode::Tcp),
            "udp" => Ok(ConnectionMode::Udp),
            "serial" | "tty" => Ok(ConnectionMode::Serial),
            other => Err(format!("unknown connection mode '{}'", other)),
        }
    }
}

/// A blocking request/reply byte link
pub trait Transport: Send {
    /// Kind of link
    fn mode(&self) -> ConnectionMode;

    /// Write one complete command
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Read one complete reply
    ///
    /// Stream links read until `terminator` has been seen; datagram links
    /// return the next datagram. Fails with [`TransportError::Timeout`] if
    /// nothing complete arrives within `timeout`.
    fn receive(&mut self, terminator: &[u8], timeout: Duration) -> Result<Vec<u8>, TransportError>;

    /// Close the link; later sends fail with [`TransportError::NotConnected`]
    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;
}

/// Open a link of the given kind
///
/// `address` is a host name or IP for network links and a device path for
/// serial links. `port_or_baud` is the port number or the baud rate.
pub fn open(
    mode: ConnectionMode,
    address: &str,
    port_or_baud: u32,
    timeout: Duration,
) -> Result<Box<dyn Transport>, TransportError> {
    let port = || {
        u16::try_from(port_or_baud)
            .map_err(|_| TransportError::InvalidAddress(format!("{}:{}", address, port_or_baud)))
    };
    Ok(match mode {
        ConnectionMode::Tcp => Box::new(TcpTransport::connect(address, port()?, timeout)?),
        ConnectionMode::Udp => Box::new(UdpTransport::connect(address, port()?)?),
        ConnectionMode::Serial => Box::new(SerialTransport::open(address, port_or_baud, timeout)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse() {
        assert_eq!("TCP".parse::<ConnectionMode>(), Ok(ConnectionMode::Tcp));
        assert_eq!("serial".parse::<ConnectionMode>(), Ok(ConnectionMode::Serial));
        assert!("carrier-pigeon".parse::<ConnectionMode>().is_err());
    }

    #[test]
    fn test_open_rejects_port_out_of_range() {
        let err = open(ConnectionMode::Tcp, "127.0.0.1", 70_000, Duration::from_millis(10))
            .err()
            .unwrap();
        assert!(matches!(err, TransportError::InvalidAddress(_)));
    }
}
