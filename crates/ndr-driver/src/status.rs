//! Radio status and version reporting
//!
//! Positional radios report health as one hex bitmask; JSON radios report
//! one boolean per fault. Both are folded into [`RadioStatus`].

use ndr_protocol::keys::{self, NOT_APPLICABLE, STATUS_CODE};
use ndr_protocol::models::{StatusSpec, StatusStyle};
use ndr_protocol::{CachedConfiguration, ConfigValue};
use serde::Serialize;

/// Normalized radio health
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RadioStatus {
    /// Raw fault bitmask
    pub code: u32,
    /// Set fault bits, one mask per fault
    pub fault_codes: Vec<u32>,
    /// Description of each entry in `fault_codes`
    pub fault_descriptions: Vec<String>,
}

impl RadioStatus {
    /// Interpret a status reply according to the model's fault table
    ///
    /// Returns `None` when the reply carries nothing usable.
    pub fn from_reply(spec: &StatusSpec, reply: &CachedConfiguration) -> Option<Self> {
        match spec.style {
            StatusStyle::Bitmask => {
                let code = reply.get(STATUS_CODE)?.as_ref()?.as_i64()?;
                Some(Self::from_code(spec, u32::try_from(code).ok()?))
            }
            StatusStyle::Fields => {
                let mut seen = false;
                let mut code = 0u32;
                for bit in &spec.bits {
                    if let Some(Some(value)) = reply.get(bit.field) {
                        seen = true;
                        if value.as_bool().unwrap_or(false) {
                            code |= bit.mask;
                        }
                    }
                }
                seen.then(|| Self::from_code(spec, code))
            }
        }
    }

    /// Decompose a fault bitmask
    pub fn from_code(spec: &StatusSpec, code: u32) -> Self {
        let mut status = Self {
            code,
            ..Self::default()
        };
        let mut remaining = code;
        for mask in spec.masks() {
            if code & mask != 0 {
                status.fault_codes.push(mask);
                status
                    .fault_descriptions
                    .push(spec.describe(mask).unwrap_or_default().to_string());
                remaining &= !mask;
            }
        }
        // Bits the table does not know about are still faults
        for shift in 0..u32::BITS {
            let mask = 1u32 << shift;
            if remaining & mask != 0 {
                status.fault_codes.push(mask);
                status
                    .fault_descriptions
                    .push(format!("Unknown fault 0x{:04X}", mask));
            }
        }
        status
    }

    pub fn is_healthy(&self) -> bool {
        self.code == 0
    }
}

/// Identification and version strings
///
/// Fields the radio does not report read `"N/A"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub model: String,
    pub serial_number: String,
    pub unit_revision: String,
    pub software_version: String,
    pub firmware_version: String,
    pub reference_version: String,
    pub hardware_version: String,
}

impl Default for VersionInfo {
    fn default() -> Self {
        Self {
            model: NOT_APPLICABLE.to_string(),
            serial_number: NOT_APPLICABLE.to_string(),
            unit_revision: NOT_APPLICABLE.to_string(),
            software_version: NOT_APPLICABLE.to_string(),
            firmware_version: NOT_APPLICABLE.to_string(),
            reference_version: NOT_APPLICABLE.to_string(),
            hardware_version: NOT_APPLICABLE.to_string(),
        }
    }
}

impl VersionInfo {
    /// Build from merged version replies
    pub fn from_replies(replies: &CachedConfiguration) -> Self {
        let text = |key: &str| -> String {
            match replies.get(key) {
                Some(Some(ConfigValue::Str(s))) if !s.is_empty() => s.clone(),
                Some(Some(ConfigValue::Str(_))) | Some(None) | None => NOT_APPLICABLE.to_string(),
                Some(Some(other)) => other.to_string(),
            }
        };
        Self {
            model: text(keys::MODEL),
            serial_number: text(keys::SERIAL_NUMBER),
            unit_revision: text(keys::UNIT_REVISION),
            software_version: text(keys::SOFTWARE_VERSION),
            firmware_version: text(keys::FIRMWARE_VERSION),
            reference_version: text(keys::REFERENCE_VERSION),
            hardware_version: text(keys::HARDWARE_VERSION),
        }
    }

    /// Value for one of the version keys
    pub fn get(&self, key: &str) -> Option<&str> {
        let value = match key {
            keys::MODEL => &self.model,
            keys::SERIAL_NUMBER => &self.serial_number,
            keys::UNIT_REVISION => &self.unit_revision,
            keys::SOFTWARE_VERSION => &self.software_version,
            keys::FIRMWARE_VERSION => &self.firmware_version,
            keys::REFERENCE_VERSION => &self.reference_version,
            keys::HARDWARE_VERSION => &self.hardware_version,
            _ => return None,
        };
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndr_protocol::RadioDatabase;

    #[test]
    fn test_bitmask_decomposition() {
        let model = RadioDatabase::by_name("NDR308").unwrap();
        let status = RadioStatus::from_code(&model.status, 0x0005);
        assert_eq!(status.fault_codes, vec![0x0001, 0x0004]);
        assert_eq!(status.fault_descriptions.len(), 2);
        assert!(!status.is_healthy());
    }

    #[test]
    fn test_duplicate_mask_uses_later_description() {
        let model = RadioDatabase::by_name("NDR651").unwrap();
        let status = RadioStatus::from_code(&model.status, 0x0040);
        assert_eq!(status.fault_codes, vec![0x0040]);
        assert_eq!(status.fault_descriptions, vec!["Transmit DAC underflow".to_string()]);
    }

    #[test]
    fn test_unknown_bits_reported() {
        let model = RadioDatabase::by_name("NDR308").unwrap();
        let status = RadioStatus::from_code(&model.status, 0x8000);
        assert_eq!(status.fault_codes, vec![0x8000]);
        assert!(status.fault_descriptions[0].starts_with("Unknown fault"));
    }

    #[test]
    fn test_bitmask_reply() {
        let model = RadioDatabase::by_name("NDR308").unwrap();
        let mut reply = CachedConfiguration::new();
        reply.insert(STATUS_CODE.into(), Some(ConfigValue::Int(0)));
        let status = RadioStatus::from_reply(&model.status, &reply).unwrap();
        assert!(status.is_healthy());
        assert!(status.fault_codes.is_empty());

        assert!(RadioStatus::from_reply(&model.status, &CachedConfiguration::new()).is_none());
    }

    #[test]
    fn test_out_of_range_code_rejected() {
        let model = RadioDatabase::by_name("NDR308").unwrap();
        for code in [-1, 0x1_0000_0001] {
            let mut reply = CachedConfiguration::new();
            reply.insert(STATUS_CODE.into(), Some(ConfigValue::Int(code)));
            assert!(RadioStatus::from_reply(&model.status, &reply).is_none());
        }
    }

    #[test]
    fn test_field_reply() {
        let model = RadioDatabase::by_name("NDR358").unwrap();
        let mut reply = CachedConfiguration::new();
        reply.insert("pll".into(), Some(ConfigValue::Bool(false)));
        reply.insert("gps".into(), Some(ConfigValue::Bool(true)));
        reply.insert("temp".into(), None);
        let status = RadioStatus::from_reply(&model.status, &reply).unwrap();
        assert_eq!(status.code, 0x0008);
        assert_eq!(status.fault_descriptions, vec!["GPS not locked".to_string()]);
    }

    #[test]
    fn test_missing_versions_are_not_applicable() {
        let mut replies = CachedConfiguration::new();
        replies.insert(keys::MODEL.into(), Some(ConfigValue::Str("NDR308".into())));
        replies.insert(keys::REFERENCE_VERSION.into(), None);
        let info = VersionInfo::from_replies(&replies);
        assert_eq!(info.model, "NDR308");
        assert_eq!(info.reference_version, NOT_APPLICABLE);
        assert_eq!(info.get(keys::HARDWARE_VERSION), Some(NOT_APPLICABLE));
        assert_eq!(info.get("bogus"), None);
    }
}
