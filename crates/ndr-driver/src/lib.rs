//! NDR Driver Library
//!
//! Drives NDR software-defined radios: configurable components with
//! cached state, command transactions, and the radio-level handler that
//! ties them to a transport.
//!
//! # Architecture
//!
//! - [`CommandLink`] pairs a transport with the radio's codec
//! - [`CommandTransaction`] sends one command and records the outcome
//! - [`ConfigurableComponent`] reconciles proposed settings with its cache
//!   and works out which commands to send
//! - [`RadioHandler`] owns the components of one model and routes the
//!   nested [`RadioConfiguration`] tree to them
//!
//! Operations report failure as `false` (or an empty/partial result) and
//! keep error text available through `get_last_command_error_info`.
//!
//! # Example
//!
//! ```rust
//! use ndr_driver::{ConfigurationTree, RadioHandler};
//! use ndr_protocol::keys::FREQUENCY;
//! use ndr_sim::VirtualRadio;
//!
//! let mut radio = RadioHandler::for_model("NDR308").unwrap();
//! assert!(radio.connect_with(Box::new(VirtualRadio::for_model("NDR308").unwrap())));
//!
//! let mut tree = ConfigurationTree::default();
//! tree.tuners.entry(1).or_default().insert(FREQUENCY.into(), 2450e6.into());
//! assert!(radio.set_configuration(&tree));
//! ```

pub mod component;
pub mod config;
pub mod error;
pub mod link;
pub mod radio;
pub mod status;
pub mod transaction;

pub use component::{CacheState, ConfigurableComponent};
pub use config::{
    BandConfiguration, CachedConfigurationTree, ConfigurationTree, IndexedConfiguration,
    RadioConfiguration,
};
pub use error::DriverError;
pub use link::{CommandLink, SharedLink, DEFAULT_TIMEOUT};
pub use radio::RadioHandler;
pub use status::{RadioStatus, VersionInfo};
pub use transaction::CommandTransaction;
