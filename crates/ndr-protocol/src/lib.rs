//! NDR Protocol Library
//!
//! This crate describes the command vocabulary of the NDR radio line and
//! provides encoding and reply parsing for both wire flavors the radios
//! speak:
//!
//! - **Positional**: ASCII command lines (`FRQ 3, 2450.0`), replies echo the
//!   mnemonic followed by ordered tokens and end with a `>` prompt
//! - **JSON**: one JSON object per command (`{"cmd":"tuner","params":{...}}`),
//!   field names mapped per command
//!
//! # Architecture
//!
//! - [`CommandSpec`] declares one wire command as data
//! - [`ProtocolCodec`] turns a spec plus bound values into bytes and a reply
//!   back into a [`CachedConfiguration`]
//! - [`models::RadioDatabase`] holds the per-model tables (ranges, rate
//!   tables, command sets)
//!
//! Both codecs produce the same configuration shape, so callers never see
//! which flavor a radio uses.
//!
//! # Example
//!
//! ```rust
//! use ndr_protocol::{keys, CommandSpec, Configuration, Direction, ParamSpec, FieldSpec,
//!     Protocol, Request, ValueKind, create_codec};
//!
//! let spec = CommandSpec::new("FRQ")
//!     .set_param(ParamSpec::required(keys::INDEX, ValueKind::Int))
//!     .set_param(ParamSpec::required(keys::FREQUENCY, ValueKind::Float))
//!     .query_param(ParamSpec::required(keys::INDEX, ValueKind::Int))
//!     .field(FieldSpec::new(keys::FREQUENCY, ValueKind::Float));
//!
//! let codec = create_codec(Protocol::Positional);
//! let mut params = Configuration::new();
//! params.insert(keys::INDEX.into(), 3.into());
//! params.insert(keys::FREQUENCY.into(), 2450.0.into());
//!
//! let bytes = codec
//!     .encode(&Request { spec: &spec, direction: Direction::Set, params: &params, sequence: 1 })
//!     .unwrap();
//! assert_eq!(bytes, b"FRQ 3, 2450.0\n");
//! ```

pub mod error;
pub mod json;
pub mod keys;
pub mod models;
pub mod positional;
pub mod quantize;
pub mod spec;
pub mod value;

pub use error::{ParseError, ProtocolError};
pub use models::{RadioDatabase, RadioModel};
pub use quantize::{quantize, Quantizer};
pub use spec::{CommandSpec, FieldSpec, ParamSpec};
pub use value::{CachedConfiguration, ConfigValue, Configuration, ValueKind};

use serde::{Deserialize, Serialize};

/// Identifies which wire flavor a radio speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    /// Mnemonic followed by ordered tokens
    Positional,
    /// One JSON object per command
    Json,
}

impl Protocol {
    /// Returns a human-readable name for the protocol
    pub fn name(&self) -> &'static str {
        match self {
            Protocol::Positional => "NDR positional",
            Protocol::Json => "NDR JSON",
        }
    }
}

/// Whether a command reads or writes the radio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Query,
    Set,
}

impl Direction {
    pub fn name(&self) -> &'static str {
        match self {
            Direction::Query => "query",
            Direction::Set => "set",
        }
    }
}

/// One command ready to be encoded
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    /// Command being issued
    pub spec: &'a CommandSpec,
    /// Query or set
    pub direction: Direction,
    /// Bound values for the parameters of `direction`
    pub params: &'a Configuration,
    /// Message sequence number (carried by the JSON flavor)
    pub sequence: u32,
}

impl Request<'_> {
    /// The parameter list governing serialization
    pub fn param_specs(&self) -> &[ParamSpec] {
        match self.direction {
            Direction::Query => &self.spec.query_params,
            Direction::Set => &self.spec.set_params,
        }
    }
}

/// Object-safe encode/decode strategy for one wire flavor
pub trait ProtocolCodec: Send + Sync {
    /// Flavor implemented by this codec
    fn protocol(&self) -> Protocol;

    /// Encode a command to its wire form
    fn encode(&self, request: &Request<'_>) -> Result<Vec<u8>, ProtocolError>;

    /// Parse a reply to `request`
    ///
    /// For queries the result holds every declared response field (`None`
    /// for nullable fields the radio left out). For sets it is empty; only
    /// radio-reported errors matter.
    fn decode(&self, request: &Request<'_>, reply: &[u8])
        -> Result<CachedConfiguration, ProtocolError>;

    /// Wrap a free-form command line for passthrough
    fn encode_raw(&self, command: &str) -> Vec<u8> {
        let mut bytes = command.trim_end().as_bytes().to_vec();
        bytes.push(b'\n');
        bytes
    }

    /// Byte sequence that ends a reply on stream transports
    fn reply_terminator(&self) -> &'static [u8];
}

/// Create a codec for the given protocol
pub fn create_codec(protocol: Protocol) -> Box<dyn ProtocolCodec> {
    match protocol {
        Protocol::Positional => Box::new(positional::PositionalCodec::new()),
        Protocol::Json => Box::new(json::JsonCodec::new()),
    }
}
