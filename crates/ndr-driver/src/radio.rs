//! Radio handler
//!
//! One [`RadioHandler`] drives one physical radio. It owns the link to the
//! radio and every configurable component the model carries, and routes the
//! nested configuration tree to and from those components.

use std::ops::Range;
use std::time::Duration;

use ndr_protocol::keys::{FREQUENCY, MODEL, RESET_TYPE};
use ndr_protocol::models::{ComponentKind, DefaultLink, RateEntry};
use ndr_protocol::{ConfigValue, Configuration, RadioDatabase, RadioModel};
use ndr_transport::{ConnectionMode, Transport};
use tracing::{error, info, warn};

use crate::component::ConfigurableComponent;
use crate::config::{CachedConfigurationTree, ConfigurationTree};
use crate::error::DriverError;
use crate::link::{lock_link, CommandLink, SharedLink, DEFAULT_TIMEOUT};
use crate::status::{RadioStatus, VersionInfo};
use crate::transaction::CommandTransaction;

/// Order in which tree branches are applied
const TREE_ORDER: [ComponentKind; 7] = [
    ComponentKind::Tuner,
    ComponentKind::Wbddc,
    ComponentKind::Nbddc,
    ComponentKind::Wbduc,
    ComponentKind::WbddcGroup,
    ComponentKind::NbddcGroup,
    ComponentKind::GigePort,
];

/// Driver for a single radio
#[derive(Debug)]
pub struct RadioHandler {
    model: RadioModel,
    link: SharedLink,
    components: Vec<ConfigurableComponent>,
    version: Option<VersionInfo>,
    errors: Vec<String>,
    last_error: Option<String>,
}

impl RadioHandler {
    /// Create a handler for `model`, not yet connected
    pub fn new(model: RadioModel) -> Self {
        Self::with_timeout(model, DEFAULT_TIMEOUT)
    }

    /// Create a handler with a non-default reply timeout
    pub fn with_timeout(model: RadioModel, timeout: Duration) -> Self {
        let link = CommandLink::new(model.protocol, timeout).shared();
        let components = model
            .components
            .iter()
            .flat_map(|table| {
                table
                    .indices()
                    .map(|index| ConfigurableComponent::from_table(table, index))
            })
            .map(|component| component.with_link(link.clone()))
            .collect();

        Self {
            model,
            link,
            components,
            version: None,
            errors: Vec::new(),
            last_error: None,
        }
    }

    /// Create a handler for a model looked up by name
    pub fn for_model(name: &str) -> Result<Self, DriverError> {
        RadioDatabase::by_name(name)
            .map(Self::new)
            .ok_or_else(|| DriverError::UnknownModel(name.to_string()))
    }

    pub fn model(&self) -> &RadioModel {
        &self.model
    }

    /// Transport the model is normally reached over
    pub fn default_mode(&self) -> ConnectionMode {
        match self.model.default_link {
            DefaultLink::Tcp(_) => ConnectionMode::Tcp,
            DefaultLink::Udp(_) => ConnectionMode::Udp,
            DefaultLink::Serial(_) => ConnectionMode::Serial,
        }
    }

    /// Port (or baud rate) the model is normally reached on
    pub fn default_port(&self) -> u32 {
        match self.model.default_link {
            DefaultLink::Tcp(port) | DefaultLink::Udp(port) => u32::from(port),
            DefaultLink::Serial(baud) => baud,
        }
    }

    pub fn timeout(&self) -> Duration {
        lock_link(&self.link).timeout()
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        lock_link(&self.link).set_timeout(timeout);
    }

    // ========================================================================
    // Connection
    // ========================================================================

    /// Open a transport to the radio and check it answers
    ///
    /// `port_or_baud` is a port number for network modes and a baud rate
    /// for serial.
    pub fn connect(&mut self, mode: ConnectionMode, address: &str, port_or_baud: u32) -> bool {
        match ndr_transport::open(mode, address, port_or_baud, self.timeout()) {
            Ok(transport) => self.connect_with(transport),
            Err(e) => {
                error!("Failed to connect to {} at {}: {}", self.model.name, address, e);
                self.last_error = Some(e.to_string());
                false
            }
        }
    }

    /// Attach an already opened transport
    ///
    /// Stream transports must answer the identification query before the
    /// connection is accepted. Datagram transports are accepted as is.
    pub fn connect_with(&mut self, transport: Box<dyn Transport>) -> bool {
        let mode = transport.mode();
        lock_link(&self.link).attach(transport);
        self.invalidate();
        self.last_error = None;

        if mode == ConnectionMode::Udp {
            info!("Connected to {} over {}", self.model.name, mode);
            return true;
        }

        let mut identify = CommandTransaction::query(&self.model.identify, None);
        let passed = identify.send(&self.link);
        let failure = identify.error_info().join("; ");
        let reported = match identify.response_info().get(MODEL) {
            Some(Some(ConfigValue::Str(model))) => Some(model.clone()),
            _ => None,
        };

        if !passed {
            let e = DriverError::SelfTestFailed(failure);
            warn!("{}", e);
            self.last_error = Some(e.to_string());
            self.disconnect();
            return false;
        }

        if let Some(reported) = reported {
            if !reported.to_ascii_uppercase().contains(self.model.name) {
                warn!(
                    "Radio identified as {} but is driven as {}",
                    reported, self.model.name
                );
            }
        }
        info!("Connected to {} over {}", self.model.name, mode);
        true
    }

    pub fn disconnect(&mut self) {
        lock_link(&self.link).detach();
        self.invalidate();
    }

    pub fn is_connected(&self) -> bool {
        lock_link(&self.link).is_connected()
    }

    /// Why the last connection attempt failed
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn invalidate(&mut self) {
        self.version = None;
        for component in &mut self.components {
            component.invalidate();
        }
    }

    // ========================================================================
    // Identification, status and reset
    // ========================================================================

    /// Identification and version strings, queried once per connection
    pub fn get_version_info(&mut self) -> VersionInfo {
        if let Some(version) = &self.version {
            return version.clone();
        }
        self.errors.clear();
        if !self.is_connected() {
            self.errors.push(DriverError::NotConnected.to_string());
            return VersionInfo::default();
        }

        let mut replies = ndr_protocol::CachedConfiguration::new();
        let mut answered = false;
        for spec in &self.model.version_commands {
            let mut tx = CommandTransaction::query(spec, None);
            if tx.send(&self.link) {
                answered = true;
                for (key, value) in tx.into_response() {
                    if value.is_some() || !replies.contains_key(&key) {
                        replies.insert(key, value);
                    }
                }
            } else {
                self.errors.extend_from_slice(tx.error_info());
            }
        }

        let version = VersionInfo::from_replies(&replies);
        if answered {
            self.version = Some(version.clone());
        }
        version
    }

    /// Current health; `None` if the radio could not be asked
    pub fn get_status(&mut self) -> Option<RadioStatus> {
        self.errors.clear();
        let spec = &self.model.status;
        let mut tx = CommandTransaction::query(&spec.command, None);
        if !tx.send(&self.link) {
            self.errors.extend_from_slice(tx.error_info());
            return None;
        }
        let status = RadioStatus::from_reply(spec, tx.response_info());
        if status.is_none() {
            self.errors
                .push(format!("{}: reply carried no status", spec.command.mnemonic));
        }
        status
    }

    /// Reset the radio
    ///
    /// The reset is not acknowledged, so success only means the command was
    /// written. Every cache is dropped afterwards.
    pub fn reset(&mut self, reset_type: Option<i64>) -> bool {
        self.errors.clear();
        let mut params = Configuration::new();
        if let Some(reset_type) = reset_type {
            params.insert(RESET_TYPE.to_string(), ConfigValue::Int(reset_type));
        }
        let mut tx = CommandTransaction::set(&self.model.reset, params, None);
        let sent = tx.send(&self.link);
        self.errors.extend_from_slice(tx.error_info());
        if sent {
            info!("Reset {}", self.model.name);
            self.invalidate();
        }
        sent
    }

    /// Send a free-form command and return the reply lines
    pub fn send_command(&mut self, command: &str) -> Result<Vec<String>, DriverError> {
        lock_link(&self.link).send_raw(command, None)
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Apply a (partial) configuration tree
    ///
    /// Returns true only if every command sent succeeded. Settings for
    /// components the model does not have are reported as errors.
    pub fn set_configuration(&mut self, tree: &ConfigurationTree) -> bool {
        self.errors.clear();
        if !self.is_connected() {
            self.errors.push(DriverError::NotConnected.to_string());
            return false;
        }

        let mut success = true;
        let radio = tree.radio_settings();
        if !radio.is_empty() {
            success &= self.set_component(ComponentKind::Radio, None, &radio);
        }
        for kind in TREE_ORDER {
            let Some(branch) = tree.branch(kind) else {
                continue;
            };
            for (index, settings) in branch {
                success &= self.set_component(kind, Some(*index), settings);
            }
        }
        success
    }

    fn set_component(&mut self, kind: ComponentKind, index: Option<u32>, settings: &Configuration) -> bool {
        let Some(component) = self
            .components
            .iter_mut()
            .find(|c| c.kind() == kind && c.index() == index)
        else {
            let e = DriverError::NoSuchComponent {
                kind,
                index: index.unwrap_or_default(),
            };
            warn!("{}", e);
            self.errors.push(e.to_string());
            return false;
        };

        let ok = component.set_configuration(settings);
        let label = label(component);
        self.errors.extend(
            component
                .get_last_command_error_info()
                .iter()
                .map(|e| format!("{}: {}", label, e)),
        );
        ok
    }

    /// Configuration tree, querying only components not yet queried
    pub fn get_configuration(&mut self) -> CachedConfigurationTree {
        self.collect(false)
    }

    /// Configuration tree, re-querying every component
    pub fn query_configuration(&mut self) -> CachedConfigurationTree {
        self.collect(true)
    }

    fn collect(&mut self, refresh: bool) -> CachedConfigurationTree {
        self.errors.clear();
        let connected = self.is_connected();
        if !connected {
            self.errors.push(DriverError::NotConnected.to_string());
        }

        let mut tree = CachedConfigurationTree::default();
        for component in &mut self.components {
            let config = match (connected, refresh) {
                (false, _) => component.cached_configuration().clone(),
                (true, true) => component.query_configuration(),
                (true, false) => component.get_configuration(),
            };
            if connected {
                let label = label(component);
                self.errors.extend(
                    component
                        .get_last_command_error_info()
                        .iter()
                        .map(|e| format!("{}: {}", label, e)),
                );
            }

            match (component.index(), tree.branch_mut(component.kind())) {
                (Some(index), Some(branch)) => {
                    branch.insert(index, config);
                }
                _ => {
                    for (key, value) in config {
                        tree.set_radio_setting(&key, value);
                    }
                }
            }
        }
        tree
    }

    /// Errors from the most recent operation, oldest first
    pub fn get_last_command_error_info(&self) -> &[String] {
        &self.errors
    }

    // ========================================================================
    // Components and capabilities
    // ========================================================================

    pub fn components(&self) -> &[ConfigurableComponent] {
        &self.components
    }

    /// Component of `kind` at `index` (`None` index for radio-wide settings)
    pub fn component(&self, kind: ComponentKind, index: Option<u32>) -> Option<&ConfigurableComponent> {
        self.components
            .iter()
            .find(|c| c.kind() == kind && c.index() == index)
    }

    pub fn component_mut(&mut self, kind: ComponentKind, index: Option<u32>) -> Option<&mut ConfigurableComponent> {
        self.components
            .iter_mut()
            .find(|c| c.kind() == kind && c.index() == index)
    }

    /// Valid indices for a component kind; `None` if the model has none
    pub fn index_range(&self, kind: ComponentKind) -> Option<Range<u32>> {
        self.model.index_range(kind)
    }

    /// Lowest and highest tunable frequency in Hz
    pub fn tuner_frequency_range(&self) -> Option<(f64, f64)> {
        self.model
            .quantizer(ComponentKind::Tuner, FREQUENCY)
            .map(|q| (q.min, q.max))
    }

    pub fn wbddc_rates(&self) -> &[RateEntry] {
        &self.model.wbddc_rates
    }

    pub fn nbddc_rates(&self) -> &[RateEntry] {
        &self.model.nbddc_rates
    }

    pub fn wbduc_rates(&self) -> &[RateEntry] {
        &self.model.wbduc_rates
    }
}

impl Drop for RadioHandler {
    fn drop(&mut self) {
        lock_link(&self.link).detach();
    }
}

fn label(component: &ConfigurableComponent) -> String {
    match component.index() {
        Some(index) => format!("{} {}", component.kind().name(), index),
        None => component.kind().name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndr_sim::VirtualRadio;

    fn connected(name: &str) -> (RadioHandler, ndr_sim::SimHandle) {
        let radio = VirtualRadio::for_model(name).unwrap();
        let sim = radio.handle();
        let mut handler = RadioHandler::for_model(name).unwrap();
        assert!(handler.connect_with(Box::new(radio)));
        (handler, sim)
    }

    #[test]
    fn test_components_follow_model_tables() {
        let handler = RadioHandler::for_model("NDR308").unwrap();
        assert!(handler.component(ComponentKind::Radio, None).is_some());
        assert!(handler.component(ComponentKind::Tuner, Some(8)).is_some());
        assert!(handler.component(ComponentKind::Tuner, Some(0)).is_none());
        assert!(handler.component(ComponentKind::Wbduc, Some(1)).is_none());
        assert_eq!(handler.index_range(ComponentKind::Nbddc), Some(1..17));
    }

    #[test]
    fn test_unknown_model() {
        let err = RadioHandler::for_model("NDR999").unwrap_err();
        assert!(matches!(err, DriverError::UnknownModel(_)));
    }

    #[test]
    fn test_default_link() {
        let handler = RadioHandler::for_model("NDR358").unwrap();
        assert_eq!(handler.default_mode(), ConnectionMode::Udp);
        assert_eq!(handler.default_port(), 19091);
    }

    #[test]
    fn test_not_connected() {
        let mut handler = RadioHandler::for_model("NDR308").unwrap();
        assert!(!handler.is_connected());
        let mut tree = ConfigurationTree::default();
        tree.tuners
            .entry(1)
            .or_default()
            .insert(FREQUENCY.into(), 100e6.into());
        assert!(!handler.set_configuration(&tree));
        assert_eq!(handler.get_last_command_error_info(), &["not connected".to_string()]);
    }

    #[test]
    fn test_connect_runs_self_test() {
        let (handler, sim) = connected("NDR308");
        assert!(handler.is_connected());
        let sim = sim.lock().unwrap();
        assert_eq!(sim.requests().len(), 1);
        assert!(sim.requests()[0].starts_with("*IDN?"));
    }

    #[test]
    fn test_frequency_range() {
        let handler = RadioHandler::for_model("NDR308").unwrap();
        assert_eq!(handler.tuner_frequency_range(), Some((20e6, 6000e6)));
    }
}
