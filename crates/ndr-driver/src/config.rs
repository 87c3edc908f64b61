//! Nested radio configuration
//!
//! The device-wide configuration is a tree keyed by component type, then
//! band, then index:
//!
//! ```json
//! {
//!   "tunerConfiguration": {"1": {"frequency": 2450000000.0}},
//!   "ddcConfiguration": {"wideband": {"1": {"rateIndex": 2}}, "narrowband": {}},
//!   "referenceMode": 1
//! }
//! ```
//!
//! The same shape is used for requested changes (plain values) and for
//! reported state (values that may be unknown).

use std::collections::BTreeMap;

use ndr_protocol::keys::{BYPASS_MODE, REFERENCE_MODE, TIME_SOURCE};
use ndr_protocol::models::ComponentKind;
use ndr_protocol::ConfigValue;
use serde::{Deserialize, Serialize};

/// Per-index configuration dictionaries for one component type
pub type IndexedConfiguration<V> = BTreeMap<u32, BTreeMap<String, V>>;

/// Wideband and narrowband halves of a component type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandConfiguration<V> {
    #[serde(default = "BTreeMap::new", skip_serializing_if = "BTreeMap::is_empty")]
    pub wideband: IndexedConfiguration<V>,
    #[serde(default = "BTreeMap::new", skip_serializing_if = "BTreeMap::is_empty")]
    pub narrowband: IndexedConfiguration<V>,
}

impl<V> Default for BandConfiguration<V> {
    fn default() -> Self {
        Self {
            wideband: BTreeMap::new(),
            narrowband: BTreeMap::new(),
        }
    }
}

impl<V> BandConfiguration<V> {
    pub fn is_empty(&self) -> bool {
        self.wideband.is_empty() && self.narrowband.is_empty()
    }
}

/// Device-wide configuration tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "V: Deserialize<'de>"))]
pub struct RadioConfiguration<V = ConfigValue> {
    #[serde(
        rename = "tunerConfiguration",
        default = "BTreeMap::new",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub tuners: IndexedConfiguration<V>,

    #[serde(
        rename = "ddcConfiguration",
        default = "BandConfiguration::default",
        skip_serializing_if = "BandConfiguration::is_empty"
    )]
    pub ddcs: BandConfiguration<V>,

    #[serde(
        rename = "ducConfiguration",
        default = "BandConfiguration::default",
        skip_serializing_if = "BandConfiguration::is_empty"
    )]
    pub ducs: BandConfiguration<V>,

    #[serde(
        rename = "ddcGroupConfiguration",
        default = "BandConfiguration::default",
        skip_serializing_if = "BandConfiguration::is_empty"
    )]
    pub ddc_groups: BandConfiguration<V>,

    #[serde(
        rename = "ipConfiguration",
        default = "BTreeMap::new",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub ip: IndexedConfiguration<V>,

    #[serde(rename = "referenceMode", default, skip_serializing_if = "Option::is_none")]
    pub reference_mode: Option<V>,

    #[serde(rename = "bypassMode", default, skip_serializing_if = "Option::is_none")]
    pub bypass_mode: Option<V>,

    #[serde(rename = "timeSource", default, skip_serializing_if = "Option::is_none")]
    pub time_source: Option<V>,
}

/// Requested changes
pub type ConfigurationTree = RadioConfiguration<ConfigValue>;

/// Reported state; `None` where the radio has not told us
pub type CachedConfigurationTree = RadioConfiguration<Option<ConfigValue>>;

impl<V> Default for RadioConfiguration<V> {
    fn default() -> Self {
        Self {
            tuners: BTreeMap::new(),
            ddcs: BandConfiguration::default(),
            ducs: BandConfiguration::default(),
            ddc_groups: BandConfiguration::default(),
            ip: BTreeMap::new(),
            reference_mode: None,
            bypass_mode: None,
            time_source: None,
        }
    }
}

impl<V> RadioConfiguration<V> {
    pub fn is_empty(&self) -> bool {
        self.tuners.is_empty()
            && self.ddcs.is_empty()
            && self.ducs.is_empty()
            && self.ddc_groups.is_empty()
            && self.ip.is_empty()
            && self.reference_mode.is_none()
            && self.bypass_mode.is_none()
            && self.time_source.is_none()
    }

    /// Branch holding a component kind; `None` for radio-level settings
    pub fn branch(&self, kind: ComponentKind) -> Option<&IndexedConfiguration<V>> {
        match kind {
            ComponentKind::Radio => None,
            ComponentKind::Tuner => Some(&self.tuners),
            ComponentKind::Wbddc => Some(&self.ddcs.wideband),
            ComponentKind::Nbddc => Some(&self.ddcs.narrowband),
            ComponentKind::Wbduc => Some(&self.ducs.wideband),
            ComponentKind::WbddcGroup => Some(&self.ddc_groups.wideband),
            ComponentKind::NbddcGroup => Some(&self.ddc_groups.narrowband),
            ComponentKind::GigePort => Some(&self.ip),
        }
    }

    pub fn branch_mut(&mut self, kind: ComponentKind) -> Option<&mut IndexedConfiguration<V>> {
        match kind {
            ComponentKind::Radio => None,
            ComponentKind::Tuner => Some(&mut self.tuners),
            ComponentKind::Wbddc => Some(&mut self.ddcs.wideband),
            ComponentKind::Nbddc => Some(&mut self.ddcs.narrowband),
            ComponentKind::Wbduc => Some(&mut self.ducs.wideband),
            ComponentKind::WbddcGroup => Some(&mut self.ddc_groups.wideband),
            ComponentKind::NbddcGroup => Some(&mut self.ddc_groups.narrowband),
            ComponentKind::GigePort => Some(&mut self.ip),
        }
    }

    fn radio_slot(&mut self, key: &str) -> Option<&mut Option<V>> {
        match key {
            REFERENCE_MODE => Some(&mut self.reference_mode),
            BYPASS_MODE => Some(&mut self.bypass_mode),
            TIME_SOURCE => Some(&mut self.time_source),
            _ => None,
        }
    }
}

impl<V: Clone> RadioConfiguration<V> {
    /// Radio-level settings present in the tree
    pub fn radio_settings(&self) -> BTreeMap<String, V> {
        [
            (REFERENCE_MODE, &self.reference_mode),
            (BYPASS_MODE, &self.bypass_mode),
            (TIME_SOURCE, &self.time_source),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.clone().map(|v| (key.to_string(), v)))
        .collect()
    }

    /// Store a radio-level setting; returns false for keys that are not radio-level
    pub fn set_radio_setting(&mut self, key: &str, value: V) -> bool {
        match self.radio_slot(key) {
            Some(slot) => {
                *slot = Some(value);
                true
            }
            None => false,
        }
    }
}
