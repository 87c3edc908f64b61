//! Error types for NDR transports

use std::io;

use thiserror::Error;

/// Errors that can occur on a command link
#[derive(Debug, Error)]
pub enum TransportError {
    /// Link is closed or was never opened
    #[error("not connected")]
    NotConnected,

    /// No complete reply arrived in time
    #[error("timeout waiting for reply")]
    Timeout,

    /// Peer closed the connection
    #[error("connection closed by peer")]
    Closed,

    /// Address could not be resolved or parsed
    #[error("invalid address {0}")]
    InvalidAddress(String),

    /// Failed to open the link
    #[error("failed to connect to {address}: {reason}")]
    ConnectFailed { address: String, reason: String },

    /// Failed to enumerate serial ports
    #[error("failed to enumerate ports: {0}")]
    EnumerationFailed(String),

    /// I/O error on an open link
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serial port error
    #[error("serial port error: {0}")]
    SerialPort(#[from] serialport::Error),
}

impl TransportError {
    /// Classify an I/O error from a read or write on an open link
    pub fn from_io(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => TransportError::Timeout,
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => TransportError::Closed,
            _ => TransportError::Io(e),
        }
    }

    /// Whether the error was a reply timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_timeouts_classify_as_timeout() {
        let e = TransportError::from_io(io::Error::from(io::ErrorKind::WouldBlock));
        assert!(e.is_timeout());
        let e = TransportError::from_io(io::Error::from(io::ErrorKind::TimedOut));
        assert!(e.is_timeout());
        assert_eq!(e.to_string(), "timeout waiting for reply");
    }

    #[test]
    fn test_reset_classifies_as_closed() {
        let e = TransportError::from_io(io::Error::from(io::ErrorKind::ConnectionReset));
        assert!(matches!(e, TransportError::Closed));
    }
}
