//! Canonical configuration keys
//!
//! These names are the stable vocabulary shared by every layer. Wire field
//! names differ per radio; these do not.

/// Component index (never a caller-settable key)
pub const INDEX: &str = "index";

// Tuner
pub const FREQUENCY: &str = "frequency";
pub const ATTENUATION: &str = "attenuation";
pub const ENABLE: &str = "enable";
pub const FILTER: &str = "filter";

// DDC / DUC
pub const RATE_INDEX: &str = "rateIndex";
pub const UDP_DESTINATION: &str = "udpDestination";
pub const VITA_ENABLE: &str = "vitaEnable";
pub const STREAM_ID: &str = "streamId";
pub const DATA_PORT: &str = "dataPort";
pub const TUNER_SOURCE: &str = "tunerSource";

// Groups
pub const GROUP_ENABLE: &str = "groupEnable";
pub const MEMBERS: &str = "members";

// Ethernet ports
pub const SOURCE_IP: &str = "sourceIP";
pub const SOURCE_MAC: &str = "sourceMAC";
pub const SOURCE_PORT: &str = "sourcePort";
pub const DEST_IP: &str = "destIP";
pub const DEST_MAC: &str = "destMAC";
pub const DEST_PORT: &str = "destPort";

// Radio-level
pub const REFERENCE_MODE: &str = "referenceMode";
pub const BYPASS_MODE: &str = "bypassMode";
pub const TIME_SOURCE: &str = "timeSource";

// Version information
pub const MODEL: &str = "model";
pub const SERIAL_NUMBER: &str = "serialNumber";
pub const UNIT_REVISION: &str = "unitRevision";
pub const SOFTWARE_VERSION: &str = "softwareVersion";
pub const FIRMWARE_VERSION: &str = "firmwareVersion";
pub const REFERENCE_VERSION: &str = "referenceVersion";
pub const HARDWARE_VERSION: &str = "hardwareVersion";

/// Version keys, in the order they are reported
pub const VERSION_KEYS: &[&str] = &[
    MODEL,
    SERIAL_NUMBER,
    UNIT_REVISION,
    SOFTWARE_VERSION,
    FIRMWARE_VERSION,
    REFERENCE_VERSION,
    HARDWARE_VERSION,
];

// Status
pub const STATUS_CODE: &str = "statusCode";

// Reset
pub const RESET_TYPE: &str = "resetType";

/// Sentinel reported for version fields the radio does not provide
pub const NOT_APPLICABLE: &str = "N/A";

/// Names of the branches of the nested configuration tree
pub mod tree {
    pub const TUNER: &str = "tunerConfiguration";
    pub const DDC: &str = "ddcConfiguration";
    pub const DUC: &str = "ducConfiguration";
    pub const DDC_GROUP: &str = "ddcGroupConfiguration";
    pub const IP: &str = "ipConfiguration";
    pub const WIDEBAND: &str = "wideband";
    pub const NARROWBAND: &str = "narrowband";
}
