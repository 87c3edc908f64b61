//! Error types for NDR command encoding and reply parsing

use thiserror::Error;

/// Errors that can occur while parsing reply data
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Reply contained no data line for the expected command
    #[error("no reply line for {0}")]
    MissingReply(String),

    /// Reply was not well-formed for the protocol flavor
    #[error("malformed reply: {0}")]
    Malformed(String),

    /// A required response field was absent
    #[error("missing response field: {0}")]
    MissingField(String),

    /// A token could not be converted to the declared type
    #[error("invalid {kind} value for {key}: {token:?}")]
    InvalidValue {
        key: String,
        kind: &'static str,
        token: String,
    },
}

/// Higher-level protocol errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Parse error
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A required parameter had no proposed, cached or default value
    #[error("missing required parameter: {0}")]
    MissingParameter(String),

    /// A positional parameter was skipped while a later one was supplied
    #[error("cannot omit positional parameter {0} before a later one")]
    PositionalGap(String),

    /// A bound value could not be encoded as the declared type
    #[error("cannot encode {key} as {kind}")]
    Unencodable { key: String, kind: &'static str },

    /// The radio answered with an error report
    #[error("radio reported error: {0}")]
    RadioError(String),

    /// A reply carried another request's sequence number
    #[error("reply to message {got}, expected {expected}")]
    SequenceMismatch { expected: u32, got: u64 },

    /// Command is not available in the requested direction
    #[error("command {mnemonic} does not support {direction}")]
    UnsupportedDirection {
        mnemonic: String,
        direction: &'static str,
    },
}
