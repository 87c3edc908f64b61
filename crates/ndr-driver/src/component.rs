//! Configurable components
//!
//! A component is one hardware sub-unit (a tuner, a DDC, an Ethernet port)
//! driven by an ordered list of command specs. It keeps the last known
//! hardware state and, when asked to change part of it, works out which
//! commands have to be sent.
//!
//! Values in the cache are in caller units. Quantizers snap proposed values
//! to what the hardware supports and convert to and from wire units.

use ndr_protocol::keys::INDEX;
use ndr_protocol::models::{ComponentKind, ComponentTable};
use ndr_protocol::{
    CachedConfiguration, CommandSpec, ConfigValue, Configuration, ParamSpec, Quantizer, ValueKind,
};
use tracing::{debug, info};

use crate::link::SharedLink;
use crate::transaction::CommandTransaction;

/// Whether anything is known about the hardware yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Empty cache; the next `get_configuration` queries
    Unqueried,
    /// Filled by a query or a successful set
    Queried,
}

/// One hardware sub-unit and its cached configuration
#[derive(Debug, Clone)]
pub struct ConfigurableComponent {
    kind: ComponentKind,
    index: Option<u32>,
    commands: Vec<CommandSpec>,
    quantizers: Vec<(&'static str, Quantizer)>,
    valid_keys: Vec<&'static str>,
    cache: CachedConfiguration,
    link: Option<SharedLink>,
    errors: Vec<String>,
}

impl ConfigurableComponent {
    /// Create a component from its command list
    ///
    /// `index` is `None` for radio-wide settings that take no index.
    pub fn new(
        kind: ComponentKind,
        index: Option<u32>,
        commands: Vec<CommandSpec>,
        quantizers: Vec<(&'static str, Quantizer)>,
    ) -> Self {
        let mut valid_keys: Vec<&'static str> = Vec::new();
        for key in commands.iter().flat_map(CommandSpec::config_keys) {
            if !valid_keys.contains(&key) {
                valid_keys.push(key);
            }
        }
        Self {
            kind,
            index,
            commands,
            quantizers,
            valid_keys,
            cache: CachedConfiguration::new(),
            link: None,
            errors: Vec::new(),
        }
    }

    /// Create instance `index` of a model's component table
    pub fn from_table(table: &ComponentTable, index: u32) -> Self {
        let index = (table.kind != ComponentKind::Radio).then_some(index);
        Self::new(
            table.kind,
            index,
            table.commands.clone(),
            table.quantizers.clone(),
        )
    }

    /// Reach the radio through `link`
    pub fn with_link(mut self, link: SharedLink) -> Self {
        self.link = Some(link);
        self
    }

    pub fn set_link(&mut self, link: Option<SharedLink>) {
        self.link = link;
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn index(&self) -> Option<u32> {
        self.index
    }

    pub fn commands(&self) -> &[CommandSpec] {
        &self.commands
    }

    /// Keys this component accepts and reports, in declaration order
    pub fn valid_keys(&self) -> &[&'static str] {
        &self.valid_keys
    }

    pub fn is_valid_key(&self, key: &str) -> bool {
        self.valid_keys.contains(&key)
    }

    pub fn state(&self) -> CacheState {
        if self.cache.is_empty() {
            CacheState::Unqueried
        } else {
            CacheState::Queried
        }
    }

    /// Cached configuration, without touching the radio
    pub fn cached_configuration(&self) -> &CachedConfiguration {
        &self.cache
    }

    /// Errors from the most recent query or set
    pub fn get_last_command_error_info(&self) -> &[String] {
        &self.errors
    }

    /// Forget everything known about the hardware
    pub fn invalidate(&mut self) {
        self.cache.clear();
    }

    /// Query every queryable command and merge the replies into the cache
    ///
    /// A failed command does not stop the others; the fields it reports
    /// become unknown. Returns the whole cache.
    pub fn query_configuration(&mut self) -> CachedConfiguration {
        self.errors.clear();
        let Some(link) = self.link.clone() else {
            self.errors.push("not connected".to_string());
            return self.cache.clone();
        };

        let mut any_success = false;
        for spec in self.commands.iter().filter(|s| s.queryable) {
            let index = bound_index(&spec.query_params, self.index);
            let mut tx = CommandTransaction::query(spec, index);
            if !tx.send(&link) {
                self.errors.extend_from_slice(tx.error_info());
                for field in &spec.response_fields {
                    if let Some(slot) = self.cache.get_mut(field.key) {
                        *slot = None;
                    }
                }
                continue;
            }
            any_success = true;
            populate(&mut self.cache, &self.valid_keys);
            for (key, value) in tx.into_response() {
                if let Some(valid) = self.valid_keys.iter().find(|k| **k == key) {
                    let value = value.map(|v| from_wire(&self.quantizers, valid, v));
                    self.cache.insert(key, value);
                }
            }
        }

        if any_success {
            debug!("{} {:?} queried", self.kind.name(), self.index);
        }
        self.cache.clone()
    }

    /// The cache, queried from the radio only while it is empty
    pub fn get_configuration(&mut self) -> CachedConfiguration {
        if self.cache.is_empty() {
            return self.query_configuration();
        }
        self.errors.clear();
        self.cache.clone()
    }

    /// Apply a partial configuration change
    ///
    /// Keys the component does not know are ignored. Each command carrying
    /// at least one proposed key is sent, in declaration order, with its
    /// other parameters filled from the cache and then from the command's
    /// defaults. Returns `true` only if every command sent succeeded;
    /// commands that did succeed keep their cache updates either way.
    pub fn set_configuration(&mut self, proposed: &Configuration) -> bool {
        self.errors.clear();
        let proposed: Configuration = proposed
            .iter()
            .filter(|(key, _)| self.is_valid_key(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        if proposed.is_empty() {
            return true;
        }
        let Some(link) = self.link.clone() else {
            self.errors.push("not connected".to_string());
            return false;
        };

        let mut all_success = true;
        for spec in self.commands.iter().filter(|s| s.settable) {
            let touched = spec
                .set_params
                .iter()
                .any(|p| p.key != INDEX && proposed.contains_key(p.key));
            if !touched {
                continue;
            }

            let mut carried = Configuration::new();
            let mut wire = Configuration::new();
            for param in spec.set_params.iter().filter(|p| p.key != INDEX) {
                let Some(value) = proposed
                    .get(param.key)
                    .cloned()
                    .or_else(|| self.cache.get(param.key).cloned().flatten())
                    .or_else(|| param.default.clone())
                else {
                    continue;
                };
                let quantizer = find_quantizer(&self.quantizers, param.key);
                let value = coerce(param, quantize(quantizer, value));
                wire.insert(param.key.to_string(), to_wire(quantizer, param, &value));
                carried.insert(param.key.to_string(), value);
            }

            let index = bound_index(&spec.set_params, self.index);
            let mut tx = CommandTransaction::set(spec, wire, index);
            if tx.send(&link) {
                populate(&mut self.cache, &self.valid_keys);
                for (key, value) in carried {
                    self.cache.insert(key, Some(value));
                }
            } else {
                all_success = false;
                self.errors.extend_from_slice(tx.error_info());
            }
        }

        if all_success {
            info!("{} {:?} configured", self.kind.name(), self.index);
        }
        all_success
    }
}

/// Index to bind, if the parameter list takes one
fn bound_index(params: &[ParamSpec], index: Option<u32>) -> Option<u32> {
    if params.iter().any(|p| p.key == INDEX) {
        index
    } else {
        None
    }
}

/// Give every valid key a slot the first time the cache is filled
fn populate(cache: &mut CachedConfiguration, valid_keys: &[&'static str]) {
    if cache.is_empty() {
        cache.extend(valid_keys.iter().map(|k| (k.to_string(), None)));
    }
}

fn find_quantizer(quantizers: &[(&'static str, Quantizer)], key: &str) -> Option<Quantizer> {
    quantizers.iter().find(|(k, _)| *k == key).map(|(_, q)| *q)
}

fn quantize(quantizer: Option<Quantizer>, value: ConfigValue) -> ConfigValue {
    match (quantizer, value.as_f64()) {
        (Some(q), Some(v)) if !matches!(value, ConfigValue::Bool(_)) => {
            ConfigValue::Float(q.quantize(v))
        }
        _ => value,
    }
}

/// Convert to the parameter's declared kind, rounding floats bound for integers
fn coerce(param: &ParamSpec, value: ConfigValue) -> ConfigValue {
    match (param.kind, &value) {
        (ValueKind::Int | ValueKind::HexInt, ConfigValue::Float(f)) => {
            ConfigValue::Int(f.round() as i64)
        }
        // Left as-is so the encoder reports it
        _ => param.kind.coerce(&value).unwrap_or(value),
    }
}

fn to_wire(quantizer: Option<Quantizer>, param: &ParamSpec, value: &ConfigValue) -> ConfigValue {
    match (quantizer, value.as_f64()) {
        (Some(q), Some(v)) if q.units != 0.0 && q.units != 1.0 => {
            let wire = q.to_wire(v);
            match param.kind {
                ValueKind::Int | ValueKind::HexInt => ConfigValue::Int(wire.round() as i64),
                _ => ConfigValue::Float(wire),
            }
        }
        _ => value.clone(),
    }
}

fn from_wire(quantizers: &[(&'static str, Quantizer)], key: &str, value: ConfigValue) -> ConfigValue {
    let Some(q) = find_quantizer(quantizers, key) else {
        return value;
    };
    match value {
        ConfigValue::Float(f) => ConfigValue::Float(q.from_wire(f)),
        ConfigValue::Int(i) => ConfigValue::Int(q.from_wire(i as f64).round() as i64),
        other => other,
    }
}
