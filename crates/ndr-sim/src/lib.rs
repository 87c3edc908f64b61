//! NDR Simulation Library
//!
//! This crate provides stand-ins for real radios so the driver can be
//! exercised without hardware:
//!
//! - **VirtualRadio**: answers commands from a model's tables in either wire
//!   flavor and remembers what was set
//! - **ScriptedTransport**: replays canned replies and records what was sent
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use ndr_sim::VirtualRadio;
//! use ndr_transport::Transport;
//!
//! let mut radio = VirtualRadio::for_model("NDR308").unwrap();
//! radio.send(b"FRQ 1, 1000.0\n").unwrap();
//! radio.receive(b">", Duration::ZERO).unwrap();
//!
//! radio.send(b"FRQ? 1\n").unwrap();
//! let reply = radio.receive(b">", Duration::ZERO).unwrap();
//! assert_eq!(reply, b"FRQ 1, 1000.0\r\n>");
//! ```

pub mod error;
pub mod radio;
pub mod scripted;

pub use error::SimError;
pub use radio::{SimHandle, SimState, VirtualRadio, VirtualRadioConfig};
pub use scripted::{ScriptHandle, ScriptedTransport};
