//! Radio model database
//!
//! Each NDR model is described by data: how many of each component it has,
//! where their indices start, the numeric ranges its hardware supports, its
//! rate tables, its status bits, and the command set that covers every
//! component. Models of the same family share a command set builder and
//! differ only in these values.

use crate::keys::*;
use crate::spec::{CommandSpec, FieldSpec, ParamSpec};
use crate::value::ValueKind;
use crate::{Protocol, Quantizer};

/// Kinds of configurable component a radio can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentKind {
    /// Radio-wide settings (reference, bypass, time source)
    Radio,
    Tuner,
    Wbddc,
    Nbddc,
    Wbduc,
    WbddcGroup,
    NbddcGroup,
    /// Gigabit/10-Gigabit Ethernet data port
    GigePort,
}

impl ComponentKind {
    /// Returns a human-readable name for the component kind
    pub fn name(&self) -> &'static str {
        match self {
            ComponentKind::Radio => "radio",
            ComponentKind::Tuner => "tuner",
            ComponentKind::Wbddc => "WBDDC",
            ComponentKind::Nbddc => "NBDDC",
            ComponentKind::Wbduc => "WBDUC",
            ComponentKind::WbddcGroup => "WBDDC group",
            ComponentKind::NbddcGroup => "NBDDC group",
            ComponentKind::GigePort => "Ethernet port",
        }
    }
}

/// How many components of one kind a model has and how to talk to them
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentTable {
    /// Component kind
    pub kind: ComponentKind,
    /// Number of instances
    pub count: u32,
    /// Index of the first instance (0 or 1 depending on the model)
    pub index_base: u32,
    /// Commands covering the component, in the order they must be issued
    pub commands: Vec<CommandSpec>,
    /// Per-key quantization rules
    pub quantizers: Vec<(&'static str, Quantizer)>,
}

impl ComponentTable {
    fn new(kind: ComponentKind, count: u32, index_base: u32, commands: Vec<CommandSpec>) -> Self {
        Self {
            kind,
            count,
            index_base,
            commands,
            quantizers: Vec::new(),
        }
    }

    fn quantize(mut self, key: &'static str, quantizer: Quantizer) -> Self {
        self.quantizers.push((key, quantizer));
        self
    }

    /// Indices of every instance, in order
    pub fn indices(&self) -> impl Iterator<Item = u32> {
        self.index_base..self.index_base + self.count
    }
}

/// One row of a DDC/DUC rate table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateEntry {
    /// Value of the `rateIndex` key
    pub index: i64,
    /// Output sample rate in samples per second
    pub sample_rate: f64,
    /// Usable bandwidth in Hz
    pub bandwidth: f64,
}

/// How a model reports its health
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusStyle {
    /// A single integer whose bits are faults
    Bitmask,
    /// One boolean field per fault
    Fields,
}

/// One fault a radio can report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusBit {
    /// Bit in the status code
    pub mask: u32,
    /// Reply field carrying the fault (JSON radios)
    pub field: &'static str,
    /// Human-readable description
    pub description: &'static str,
}

/// Status command plus its fault table
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSpec {
    pub command: CommandSpec,
    pub style: StatusStyle,
    /// Fault table, in declaration order
    ///
    /// Entries may repeat a mask; the later entry wins when a mask is
    /// described. This mirrors the vendor tables as shipped.
    pub bits: Vec<StatusBit>,
}

impl StatusSpec {
    /// Description for a mask, later table entries overriding earlier ones
    pub fn describe(&self, mask: u32) -> Option<&'static str> {
        self.bits
            .iter()
            .rev()
            .find(|b| b.mask == mask)
            .map(|b| b.description)
    }

    /// Distinct masks in first-declared order
    pub fn masks(&self) -> Vec<u32> {
        let mut masks: Vec<u32> = Vec::new();
        for bit in &self.bits {
            if !masks.contains(&bit.mask) {
                masks.push(bit.mask);
            }
        }
        masks
    }
}

/// Preferred link for a model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultLink {
    /// TCP on the given port
    Tcp(u16),
    /// UDP on the given port
    Udp(u16),
    /// Serial at the given baud rate
    Serial(u32),
}

/// Everything the driver needs to know about one radio model
#[derive(Debug, Clone, PartialEq)]
pub struct RadioModel {
    /// Model name (e.g. "NDR308")
    pub name: &'static str,
    /// Wire flavor
    pub protocol: Protocol,
    /// Link used when the caller does not pick one
    pub default_link: DefaultLink,
    /// Command used as a connectivity self-test
    pub identify: CommandSpec,
    /// Commands reporting version fields
    pub version_commands: Vec<CommandSpec>,
    /// Status command and fault table
    pub status: StatusSpec,
    /// Reset command
    pub reset: CommandSpec,
    /// Component tables, radio-level table first
    pub components: Vec<ComponentTable>,
    /// WBDDC rate table
    pub wbddc_rates: Vec<RateEntry>,
    /// NBDDC rate table
    pub nbddc_rates: Vec<RateEntry>,
    /// WBDUC rate table
    pub wbduc_rates: Vec<RateEntry>,
}

impl RadioModel {
    /// Table for a component kind, if the model has any
    pub fn table(&self, kind: ComponentKind) -> Option<&ComponentTable> {
        self.components
            .iter()
            .find(|t| t.kind == kind && t.count > 0)
    }

    /// Number of components of a kind
    pub fn count(&self, kind: ComponentKind) -> u32 {
        self.table(kind).map(|t| t.count).unwrap_or(0)
    }

    /// Index range of a kind, or `None` if the model has none
    pub fn index_range(&self, kind: ComponentKind) -> Option<std::ops::Range<u32>> {
        self.table(kind)
            .map(|t| t.index_base..t.index_base + t.count)
    }

    /// Quantization rule for a key on a component kind
    pub fn quantizer(&self, kind: ComponentKind, key: &str) -> Option<Quantizer> {
        self.table(kind)?
            .quantizers
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, q)| *q)
    }

    pub fn has_tuners(&self) -> bool {
        self.count(ComponentKind::Tuner) > 0
    }

    pub fn has_wbddcs(&self) -> bool {
        self.count(ComponentKind::Wbddc) > 0
    }

    pub fn has_nbddcs(&self) -> bool {
        self.count(ComponentKind::Nbddc) > 0
    }

    pub fn has_wbducs(&self) -> bool {
        self.count(ComponentKind::Wbduc) > 0
    }

    pub fn has_wbddc_groups(&self) -> bool {
        self.count(ComponentKind::WbddcGroup) > 0
    }

    pub fn has_nbddc_groups(&self) -> bool {
        self.count(ComponentKind::NbddcGroup) > 0
    }

    pub fn has_gige_ports(&self) -> bool {
        self.count(ComponentKind::GigePort) > 0
    }
}

/// Database of known radio models
pub struct RadioDatabase;

impl RadioDatabase {
    /// Look up a model by name (case-insensitive)
    pub fn by_name(name: &str) -> Option<RadioModel> {
        MODELS
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name.trim()))
            .map(|(_, build)| build())
    }

    /// Names of every known model
    pub fn names() -> impl Iterator<Item = &'static str> {
        MODELS.iter().map(|(n, _)| *n)
    }

    /// Every known model
    pub fn all() -> impl Iterator<Item = RadioModel> {
        MODELS.iter().map(|(_, build)| build())
    }

    /// Every model speaking a given protocol
    pub fn models_for_protocol(protocol: Protocol) -> Vec<RadioModel> {
        Self::all().filter(|m| m.protocol == protocol).collect()
    }
}

static MODELS: &[(&str, fn() -> RadioModel)] = &[
    ("NDR301", ndr301),
    ("NDR308", ndr308),
    ("NDR651", ndr651),
    ("NDR358", ndr358),
    ("NDR551", ndr551),
];

// ============================================================================
// Positional family
// ============================================================================

fn indexed(mnemonic: &'static str) -> CommandSpec {
    CommandSpec::new(mnemonic)
        .set_param(ParamSpec::required(INDEX, ValueKind::Int))
        .query_param(ParamSpec::required(INDEX, ValueKind::Int))
}

/// Indexed command carrying one value
fn indexed_value(mnemonic: &'static str, key: &'static str, kind: ValueKind) -> CommandSpec {
    indexed(mnemonic)
        .set_param(ParamSpec::required(key, kind))
        .field(FieldSpec::new(key, kind))
}

fn positional_tuner(with_filter: bool) -> Vec<CommandSpec> {
    let mut commands = vec![
        indexed_value("FRQ", FREQUENCY, ValueKind::Float),
        indexed_value("ATT", ATTENUATION, ValueKind::Float),
        indexed_value("TPWR", ENABLE, ValueKind::Bool),
    ];
    if with_filter {
        commands.push(indexed_value("FIF", FILTER, ValueKind::Int));
    }
    commands
}

fn positional_ddc(mnemonic: &'static str) -> CommandSpec {
    indexed(mnemonic)
        .set_param(ParamSpec::required(RATE_INDEX, ValueKind::Int).with_default(0))
        .set_param(ParamSpec::required(UDP_DESTINATION, ValueKind::Int).with_default(0))
        .set_param(ParamSpec::required(ENABLE, ValueKind::Bool).with_default(false))
        .set_param(ParamSpec::optional(VITA_ENABLE, ValueKind::Int).with_default(0))
        .set_param(ParamSpec::optional(STREAM_ID, ValueKind::Int))
        .field(FieldSpec::new(RATE_INDEX, ValueKind::Int))
        .field(FieldSpec::new(UDP_DESTINATION, ValueKind::Int))
        .field(FieldSpec::new(ENABLE, ValueKind::Bool))
        .field(FieldSpec::nullable(VITA_ENABLE, ValueKind::Int))
        .field(FieldSpec::nullable(STREAM_ID, ValueKind::Int))
}

fn positional_nbddc() -> Vec<CommandSpec> {
    // Rate must be programmed before the offset frequency
    vec![
        positional_ddc("NBDDC"),
        indexed_value("NBFRQ", FREQUENCY, ValueKind::Float),
        indexed_value("NBSS", TUNER_SOURCE, ValueKind::Int),
    ]
}

fn positional_group(group: &'static str, members: &'static str) -> Vec<CommandSpec> {
    vec![
        indexed_value(group, GROUP_ENABLE, ValueKind::Bool),
        indexed_value(members, MEMBERS, ValueKind::Str),
    ]
}

fn positional_gige() -> Vec<CommandSpec> {
    vec![
        indexed_value("SIP", SOURCE_IP, ValueKind::Str),
        CommandSpec::new("SMAC")
            .query_param(ParamSpec::required(INDEX, ValueKind::Int))
            .field(FieldSpec::new(SOURCE_MAC, ValueKind::Str))
            .read_only(),
        indexed("DIP")
            .set_param(ParamSpec::required(DEST_IP, ValueKind::Str))
            .set_param(ParamSpec::required(DEST_MAC, ValueKind::Str))
            .set_param(ParamSpec::required(SOURCE_PORT, ValueKind::Int).with_default(4991))
            .set_param(ParamSpec::required(DEST_PORT, ValueKind::Int).with_default(4991))
            .field(FieldSpec::new(DEST_IP, ValueKind::Str))
            .field(FieldSpec::new(DEST_MAC, ValueKind::Str))
            .field(FieldSpec::new(SOURCE_PORT, ValueKind::Int))
            .field(FieldSpec::new(DEST_PORT, ValueKind::Int)),
    ]
}

fn positional_duc() -> Vec<CommandSpec> {
    vec![indexed("DUC")
        .set_param(ParamSpec::required(DATA_PORT, ValueKind::Int).with_default(0))
        .set_param(ParamSpec::required(FREQUENCY, ValueKind::Float).with_default(0.0))
        .set_param(ParamSpec::required(ATTENUATION, ValueKind::Float).with_default(0.0))
        .set_param(ParamSpec::required(RATE_INDEX, ValueKind::Int).with_default(0))
        .set_param(ParamSpec::optional(STREAM_ID, ValueKind::Int))
        .field(FieldSpec::new(DATA_PORT, ValueKind::Int))
        .field(FieldSpec::new(FREQUENCY, ValueKind::Float))
        .field(FieldSpec::new(ATTENUATION, ValueKind::Float))
        .field(FieldSpec::new(RATE_INDEX, ValueKind::Int))
        .field(FieldSpec::nullable(STREAM_ID, ValueKind::Int))]
}

/// Radio-level command carrying one value and no index
fn radio_value(mnemonic: &'static str, key: &'static str) -> CommandSpec {
    CommandSpec::new(mnemonic)
        .set_param(ParamSpec::required(key, ValueKind::Int))
        .field(FieldSpec::new(key, ValueKind::Int))
}

fn positional_identify() -> CommandSpec {
    CommandSpec::new("*IDN")
        .query_as("*IDN?")
        .field(FieldSpec::new(MODEL, ValueKind::Str))
        .field(FieldSpec::nullable(SERIAL_NUMBER, ValueKind::Str))
        .read_only()
}

fn positional_versions() -> Vec<CommandSpec> {
    vec![
        positional_identify(),
        CommandSpec::new("VER")
            .field(FieldSpec::nullable(SOFTWARE_VERSION, ValueKind::Str))
            .field(FieldSpec::nullable(FIRMWARE_VERSION, ValueKind::Str))
            .field(FieldSpec::nullable(REFERENCE_VERSION, ValueKind::Str))
            .read_only(),
        CommandSpec::new("HREV")
            .field(FieldSpec::nullable(HARDWARE_VERSION, ValueKind::Str))
            .field(FieldSpec::nullable(UNIT_REVISION, ValueKind::Str))
            .read_only(),
    ]
}

fn positional_status(bits: Vec<StatusBit>) -> StatusSpec {
    StatusSpec {
        command: CommandSpec::new("STAT")
            .field(FieldSpec::new(STATUS_CODE, ValueKind::HexInt))
            .read_only(),
        style: StatusStyle::Bitmask,
        bits,
    }
}

fn positional_reset() -> CommandSpec {
    CommandSpec::new("*RST")
        .set_param(ParamSpec::optional(RESET_TYPE, ValueKind::Int))
        .write_only()
        .no_reply()
}

const fn bit(mask: u32, field: &'static str, description: &'static str) -> StatusBit {
    StatusBit {
        mask,
        field,
        description,
    }
}

fn positional_status_bits() -> Vec<StatusBit> {
    vec![
        bit(0x0001, "rfPll", "RF synthesizer PLL unlocked"),
        bit(0x0002, "ifPll", "IF synthesizer PLL unlocked"),
        bit(0x0004, "refLock", "Reference not locked"),
        bit(0x0008, "temp", "Over temperature"),
        bit(0x0010, "fan", "Fan failure"),
        bit(0x0020, "gps", "GPS not locked"),
        bit(0x0040, "adc", "ADC overload"),
        bit(0x0080, "link", "10GigE link down"),
    ]
}

fn ddc_rates(top_rate: f64, entries: i64) -> Vec<RateEntry> {
    (0..entries)
        .map(|i| {
            let sample_rate = top_rate / f64::powi(2.0, i as i32);
            RateEntry {
                index: i,
                sample_rate,
                bandwidth: sample_rate * 0.8,
            }
        })
        .collect()
}

fn ndr301() -> RadioModel {
    RadioModel {
        name: "NDR301",
        protocol: Protocol::Positional,
        default_link: DefaultLink::Tcp(8617),
        identify: positional_identify(),
        version_commands: positional_versions(),
        status: positional_status(positional_status_bits()),
        reset: positional_reset(),
        components: vec![
            ComponentTable::new(
                ComponentKind::Radio,
                1,
                0,
                vec![radio_value("REF", REFERENCE_MODE)],
            ),
            ComponentTable::new(ComponentKind::Tuner, 1, 1, positional_tuner(false))
                .quantize(
                    FREQUENCY,
                    Quantizer::new(20e6, 3000e6, 1e5).with_units(1e6),
                )
                .quantize(ATTENUATION, Quantizer::new(0.0, 30.0, 1.0)),
            ComponentTable::new(ComponentKind::Wbddc, 1, 1, vec![positional_ddc("WBDDC")]),
            ComponentTable::new(ComponentKind::Nbddc, 4, 1, positional_nbddc())
                .quantize(FREQUENCY, Quantizer::new(-20e6, 20e6, 1.0)),
        ],
        wbddc_rates: ddc_rates(51.2e6, 3),
        nbddc_rates: ddc_rates(1.6e6, 8),
        wbduc_rates: Vec::new(),
    }
}

fn ndr308() -> RadioModel {
    RadioModel {
        name: "NDR308",
        protocol: Protocol::Positional,
        default_link: DefaultLink::Tcp(8617),
        identify: positional_identify(),
        version_commands: positional_versions(),
        status: positional_status(positional_status_bits()),
        reset: positional_reset(),
        components: vec![
            ComponentTable::new(
                ComponentKind::Radio,
                1,
                0,
                vec![
                    radio_value("REF", REFERENCE_MODE),
                    radio_value("RFBYP", BYPASS_MODE),
                    radio_value("TSRC", TIME_SOURCE),
                ],
            ),
            ComponentTable::new(ComponentKind::Tuner, 8, 1, positional_tuner(true))
                .quantize(
                    FREQUENCY,
                    Quantizer::new(20e6, 6000e6, 1e6).with_units(1e6),
                )
                .quantize(ATTENUATION, Quantizer::new(0.0, 30.0, 1.0)),
            ComponentTable::new(ComponentKind::Wbddc, 8, 1, vec![positional_ddc("WBDDC")]),
            ComponentTable::new(ComponentKind::Nbddc, 16, 1, positional_nbddc())
                .quantize(FREQUENCY, Quantizer::new(-25.6e6, 25.6e6, 1.0)),
            ComponentTable::new(
                ComponentKind::WbddcGroup,
                4,
                1,
                positional_group("WBG", "WBGM"),
            ),
            ComponentTable::new(
                ComponentKind::NbddcGroup,
                8,
                1,
                positional_group("NBG", "NBGM"),
            ),
            ComponentTable::new(ComponentKind::GigePort, 2, 1, positional_gige()),
        ],
        wbddc_rates: ddc_rates(102.4e6, 4),
        nbddc_rates: ddc_rates(1.6e6, 10),
        wbduc_rates: Vec::new(),
    }
}

fn ndr651() -> RadioModel {
    let mut bits = positional_status_bits();
    // Shipped table describes 0x0040 twice; the later text is the one reported
    bits.push(bit(0x0040, "txAdc", "Transmit DAC underflow"));
    bits.push(bit(0x0100, "txPower", "Transmit power fault"));

    RadioModel {
        name: "NDR651",
        protocol: Protocol::Positional,
        default_link: DefaultLink::Tcp(8617),
        identify: positional_identify(),
        version_commands: positional_versions(),
        status: positional_status(bits),
        reset: positional_reset(),
        components: vec![
            ComponentTable::new(
                ComponentKind::Radio,
                1,
                0,
                vec![
                    radio_value("REF", REFERENCE_MODE),
                    radio_value("TSRC", TIME_SOURCE),
                ],
            ),
            ComponentTable::new(ComponentKind::Tuner, 2, 1, positional_tuner(false))
                .quantize(
                    FREQUENCY,
                    Quantizer::new(2e6, 6000e6, 1e5).with_units(1e6),
                )
                .quantize(ATTENUATION, Quantizer::new(0.0, 30.0, 1.0)),
            ComponentTable::new(ComponentKind::Wbddc, 2, 1, vec![positional_ddc("WBDDC")]),
            ComponentTable::new(ComponentKind::Nbddc, 16, 1, positional_nbddc())
                .quantize(FREQUENCY, Quantizer::new(-40e6, 40e6, 1.0)),
            ComponentTable::new(ComponentKind::Wbduc, 2, 1, positional_duc())
                .quantize(
                    FREQUENCY,
                    Quantizer::new(2e6, 6000e6, 1e5).with_units(1e6),
                )
                .quantize(ATTENUATION, Quantizer::new(0.0, 40.0, 0.25)),
            ComponentTable::new(ComponentKind::GigePort, 2, 1, positional_gige()),
        ],
        wbddc_rates: ddc_rates(128e6, 4),
        nbddc_rates: ddc_rates(2e6, 10),
        wbduc_rates: ddc_rates(128e6, 6),
    }
}

// ============================================================================
// JSON family
// ============================================================================

fn json_indexed(mnemonic: &'static str) -> CommandSpec {
    CommandSpec::new(mnemonic)
        .set_param(ParamSpec::required(INDEX, ValueKind::Int))
        .query_param(ParamSpec::required(INDEX, ValueKind::Int))
        .map(INDEX, "id")
}

fn json_tuner() -> Vec<CommandSpec> {
    vec![json_indexed("tuner")
        .set_param(ParamSpec::optional(FREQUENCY, ValueKind::Float))
        .set_param(ParamSpec::optional(ATTENUATION, ValueKind::Float))
        .set_param(ParamSpec::optional(ENABLE, ValueKind::Bool))
        .set_param(ParamSpec::optional(FILTER, ValueKind::Int))
        .field(FieldSpec::new(FREQUENCY, ValueKind::Float))
        .field(FieldSpec::new(ATTENUATION, ValueKind::Float))
        .field(FieldSpec::new(ENABLE, ValueKind::Bool))
        .field(FieldSpec::nullable(FILTER, ValueKind::Int))
        .map(FREQUENCY, "freq")
        .map(ATTENUATION, "atten")
        .map(ENABLE, "enable")
        .map(FILTER, "filter")]
}

fn json_ddc(mnemonic: &'static str, with_offset: bool) -> CommandSpec {
    let mut spec = json_indexed(mnemonic)
        .set_param(ParamSpec::optional(RATE_INDEX, ValueKind::Int))
        .set_param(ParamSpec::optional(UDP_DESTINATION, ValueKind::Int))
        .set_param(ParamSpec::optional(ENABLE, ValueKind::Bool))
        .set_param(ParamSpec::optional(VITA_ENABLE, ValueKind::Int))
        .set_param(ParamSpec::optional(STREAM_ID, ValueKind::Int))
        .field(FieldSpec::new(RATE_INDEX, ValueKind::Int))
        .field(FieldSpec::new(UDP_DESTINATION, ValueKind::Int))
        .field(FieldSpec::new(ENABLE, ValueKind::Bool))
        .field(FieldSpec::nullable(VITA_ENABLE, ValueKind::Int))
        .field(FieldSpec::nullable(STREAM_ID, ValueKind::Int))
        .map(RATE_INDEX, "rate")
        .map(UDP_DESTINATION, "dest")
        .map(ENABLE, "enable")
        .map(VITA_ENABLE, "vita")
        .map(STREAM_ID, "sid");
    if with_offset {
        spec = spec
            .set_param(ParamSpec::optional(FREQUENCY, ValueKind::Float))
            .set_param(ParamSpec::optional(TUNER_SOURCE, ValueKind::Int))
            .field(FieldSpec::new(FREQUENCY, ValueKind::Float))
            .field(FieldSpec::nullable(TUNER_SOURCE, ValueKind::Int))
            .map(FREQUENCY, "offset")
            .map(TUNER_SOURCE, "rfch");
    }
    spec
}

fn json_gige() -> Vec<CommandSpec> {
    vec![
        json_indexed("e10g")
            .set_param(ParamSpec::optional(SOURCE_IP, ValueKind::Str))
            .set_param(ParamSpec::optional(SOURCE_PORT, ValueKind::Int))
            .field(FieldSpec::new(SOURCE_IP, ValueKind::Str))
            .field(FieldSpec::nullable(SOURCE_PORT, ValueKind::Int))
            .map(SOURCE_IP, "ip")
            .map(SOURCE_PORT, "port"),
        CommandSpec::new("mac")
            .query_param(ParamSpec::required(INDEX, ValueKind::Int))
            .field(FieldSpec::new(SOURCE_MAC, ValueKind::Str))
            .map(INDEX, "id")
            .read_only(),
    ]
}

fn json_radio() -> Vec<CommandSpec> {
    vec![
        CommandSpec::new("ref")
            .set_param(ParamSpec::required(REFERENCE_MODE, ValueKind::Int))
            .field(FieldSpec::new(REFERENCE_MODE, ValueKind::Int))
            .map(REFERENCE_MODE, "mode"),
        CommandSpec::new("pps")
            .set_param(ParamSpec::required(TIME_SOURCE, ValueKind::Int))
            .field(FieldSpec::new(TIME_SOURCE, ValueKind::Int))
            .map(TIME_SOURCE, "src"),
    ]
}

fn json_identify() -> CommandSpec {
    CommandSpec::new("idn")
        .field(FieldSpec::new(MODEL, ValueKind::Str))
        .field(FieldSpec::nullable(SERIAL_NUMBER, ValueKind::Str))
        .map(SERIAL_NUMBER, "sn")
        .read_only()
}

fn json_versions() -> Vec<CommandSpec> {
    vec![
        json_identify(),
        CommandSpec::new("ver")
            .field(FieldSpec::nullable(SOFTWARE_VERSION, ValueKind::Str))
            .field(FieldSpec::nullable(FIRMWARE_VERSION, ValueKind::Str))
            .field(FieldSpec::nullable(HARDWARE_VERSION, ValueKind::Str))
            .field(FieldSpec::nullable(UNIT_REVISION, ValueKind::Str))
            .map(SOFTWARE_VERSION, "sw")
            .map(FIRMWARE_VERSION, "fw")
            .map(HARDWARE_VERSION, "hw")
            .map(UNIT_REVISION, "unit")
            .read_only(),
    ]
}

fn json_status() -> StatusSpec {
    let bits = vec![
        bit(0x0001, "pll", "Synthesizer PLL unlocked"),
        bit(0x0002, "ref", "Reference not locked"),
        bit(0x0004, "temp", "Over temperature"),
        bit(0x0008, "gps", "GPS not locked"),
        bit(0x0010, "link", "10GigE link down"),
        bit(0x0020, "cal", "Calibration data missing"),
    ];
    let command = bits.iter().fold(
        CommandSpec::new("status").read_only(),
        |spec, b| spec.field(FieldSpec::nullable(b.field, ValueKind::Bool)),
    );
    StatusSpec {
        command,
        style: StatusStyle::Fields,
        bits,
    }
}

fn json_reset() -> CommandSpec {
    CommandSpec::new("reset")
        .set_param(ParamSpec::optional(RESET_TYPE, ValueKind::Int))
        .map(RESET_TYPE, "type")
        .write_only()
        .no_reply()
}

fn ndr358() -> RadioModel {
    RadioModel {
        name: "NDR358",
        protocol: Protocol::Json,
        default_link: DefaultLink::Udp(19091),
        identify: json_identify(),
        version_commands: json_versions(),
        status: json_status(),
        reset: json_reset(),
        components: vec![
            ComponentTable::new(ComponentKind::Radio, 1, 0, json_radio()),
            ComponentTable::new(ComponentKind::Tuner, 8, 0, json_tuner())
                .quantize(
                    FREQUENCY,
                    Quantizer::new(20e6, 6000e6, 1e6).with_units(1e6),
                )
                .quantize(ATTENUATION, Quantizer::new(0.0, 40.0, 1.0)),
            ComponentTable::new(ComponentKind::Wbddc, 8, 0, vec![json_ddc("wbddc", false)]),
            ComponentTable::new(ComponentKind::Nbddc, 32, 0, vec![json_ddc("nbddc", true)])
                .quantize(FREQUENCY, Quantizer::new(-64e6, 64e6, 1.0)),
            ComponentTable::new(ComponentKind::GigePort, 4, 0, json_gige()),
        ],
        wbddc_rates: ddc_rates(128e6, 8),
        nbddc_rates: ddc_rates(4e6, 12),
        wbduc_rates: Vec::new(),
    }
}

fn ndr551() -> RadioModel {
    RadioModel {
        name: "NDR551",
        protocol: Protocol::Json,
        default_link: DefaultLink::Udp(19091),
        identify: json_identify(),
        version_commands: json_versions(),
        status: json_status(),
        reset: json_reset(),
        components: vec![
            ComponentTable::new(ComponentKind::Radio, 1, 0, json_radio()),
            ComponentTable::new(ComponentKind::Tuner, 4, 0, json_tuner())
                .quantize(
                    FREQUENCY,
                    Quantizer::new(2e6, 18000e6, 1e6).with_units(1e6),
                )
                .quantize(ATTENUATION, Quantizer::new(0.0, 40.0, 1.0)),
            ComponentTable::new(ComponentKind::Wbddc, 4, 0, vec![json_ddc("wbddc", false)]),
            ComponentTable::new(ComponentKind::GigePort, 2, 0, json_gige()),
        ],
        wbddc_rates: ddc_rates(256e6, 6),
        nbddc_rates: Vec::new(),
        wbduc_rates: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let model = RadioDatabase::by_name("ndr308").unwrap();
        assert_eq!(model.name, "NDR308");
        assert!(RadioDatabase::by_name("NDR999").is_none());
    }

    #[test]
    fn test_capabilities_follow_counts() {
        let ndr301 = RadioDatabase::by_name("NDR301").unwrap();
        assert!(ndr301.has_tuners());
        assert!(!ndr301.has_wbddc_groups());
        assert!(!ndr301.has_wbducs());

        let ndr651 = RadioDatabase::by_name("NDR651").unwrap();
        assert!(ndr651.has_wbducs());
        assert_eq!(ndr651.index_range(ComponentKind::Wbduc), Some(1..3));
    }

    #[test]
    fn test_index_bases_differ_by_family() {
        let ndr308 = RadioDatabase::by_name("NDR308").unwrap();
        let ndr358 = RadioDatabase::by_name("NDR358").unwrap();
        assert_eq!(ndr308.index_range(ComponentKind::Tuner), Some(1..9));
        assert_eq!(ndr358.index_range(ComponentKind::Tuner), Some(0..8));
    }

    #[test]
    fn test_every_model_has_radio_table_first() {
        for model in RadioDatabase::all() {
            assert_eq!(model.components[0].kind, ComponentKind::Radio, "{}", model.name);
        }
    }

    #[test]
    fn test_duplicate_status_mask_later_entry_wins() {
        let ndr651 = RadioDatabase::by_name("NDR651").unwrap();
        assert_eq!(
            ndr651.status.describe(0x0040),
            Some("Transmit DAC underflow")
        );
        let masks = ndr651.status.masks();
        assert_eq!(masks.iter().filter(|m| **m == 0x0040).count(), 1);
    }

    #[test]
    fn test_rate_tables_halve() {
        let ndr308 = RadioDatabase::by_name("NDR308").unwrap();
        assert_eq!(ndr308.wbddc_rates[0].sample_rate, 102.4e6);
        assert_eq!(ndr308.wbddc_rates[1].sample_rate, 51.2e6);
    }

    #[test]
    fn test_quantizer_lookup() {
        let ndr308 = RadioDatabase::by_name("NDR308").unwrap();
        let q = ndr308
            .quantizer(ComponentKind::Tuner, FREQUENCY)
            .unwrap();
        assert_eq!(q.units, 1e6);
        assert!(ndr308.quantizer(ComponentKind::Wbddc, FREQUENCY).is_none());
    }
}
