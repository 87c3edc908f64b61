//! Error types for the NDR driver

use ndr_protocol::models::ComponentKind;
use ndr_protocol::ProtocolError;
use ndr_transport::TransportError;
use thiserror::Error;

/// Errors that can occur driving a radio
#[derive(Debug, Error)]
pub enum DriverError {
    /// No transport attached
    #[error("not connected")]
    NotConnected,

    /// Transport failure (includes reply timeouts)
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// Encoding failure, malformed reply or radio-reported error
    #[error("{0}")]
    Protocol(#[from] ProtocolError),

    /// No model of that name in the database
    #[error("unknown radio model {0}")]
    UnknownModel(String),

    /// No component of that kind at that index
    #[error("no {} at index {index}", .kind.name())]
    NoSuchComponent { kind: ComponentKind, index: u32 },

    /// Identification self-test failed after connecting
    #[error("radio did not identify itself: {0}")]
    SelfTestFailed(String),
}

impl DriverError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, DriverError::Transport(e) if e.is_timeout())
    }
}
