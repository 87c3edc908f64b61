//! Configuration values and their declared wire types

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// A single configuration value
///
/// Serialized untagged so the JSON form is the bare value (`true`, `3`,
/// `900.0`, `"10.0.0.1"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ConfigValue {
    /// Numeric view of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Str(s) => s.trim().parse().ok(),
        }
    }

    /// Integer view of the value; floats must be integral
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            Self::Float(_) => None,
            Self::Bool(b) => Some(i64::from(*b)),
            Self::Str(s) => parse_int(s.trim(), true),
        }
    }

    /// Boolean view of the value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(i) => Some(*i != 0),
            Self::Float(f) => Some(*f != 0.0),
            Self::Str(s) => parse_bool(s),
        }
    }

    /// String view of the value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{:?}", v),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ConfigValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ConfigValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for ConfigValue {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for ConfigValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ConfigValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// A proposed configuration: key to value
pub type Configuration = BTreeMap<String, ConfigValue>;

/// A cached or parsed configuration where a field may be unknown
pub type CachedConfiguration = BTreeMap<String, Option<ConfigValue>>;

/// Declared wire type of a parameter or response field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    /// Decimal integer
    Int,
    /// Integer that may be written as `0x...` on the wire
    HexInt,
    /// Floating point
    Float,
    /// Boolean (`1`/`0` on the positional wire)
    Bool,
    /// Free text
    Str,
}

impl ValueKind {
    /// Human-readable type name used in error messages
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Int => "int",
            ValueKind::HexInt => "hex int",
            ValueKind::Float => "float",
            ValueKind::Bool => "bool",
            ValueKind::Str => "string",
        }
    }

    /// Coerce a value to this kind, if the conversion is lossless
    pub fn coerce(&self, value: &ConfigValue) -> Option<ConfigValue> {
        match self {
            ValueKind::Int | ValueKind::HexInt => value.as_i64().map(ConfigValue::Int),
            ValueKind::Float => value.as_f64().map(ConfigValue::Float),
            ValueKind::Bool => value.as_bool().map(ConfigValue::Bool),
            ValueKind::Str => Some(match value {
                ConfigValue::Str(s) => ConfigValue::Str(s.clone()),
                other => ConfigValue::Str(other.to_string()),
            }),
        }
    }

    /// Render a value as a positional wire token
    pub fn format_token(&self, value: &ConfigValue) -> Option<String> {
        match (self, self.coerce(value)?) {
            (ValueKind::HexInt, ConfigValue::Int(i)) if i < 0 => None,
            (ValueKind::HexInt, ConfigValue::Int(i)) => Some(format!("0x{:X}", i)),
            (ValueKind::Bool, ConfigValue::Bool(b)) => Some(if b { "1" } else { "0" }.to_string()),
            (_, ConfigValue::Float(f)) => Some(format!("{:?}", f)),
            (_, coerced) => Some(coerced.to_string()),
        }
    }

    /// Parse a positional wire token into a value of this kind
    pub fn parse_token(&self, key: &str, token: &str) -> Result<ConfigValue, ParseError> {
        let invalid = || ParseError::InvalidValue {
            key: key.to_string(),
            kind: self.name(),
            token: token.to_string(),
        };
        let token = token.trim();
        match self {
            ValueKind::Int => parse_int(token, false).map(ConfigValue::Int).ok_or_else(invalid),
            ValueKind::HexInt => parse_int(token, true).map(ConfigValue::Int).ok_or_else(invalid),
            ValueKind::Float => token
                .parse::<f64>()
                .map(ConfigValue::Float)
                .map_err(|_| invalid()),
            ValueKind::Bool => parse_bool(token).map(ConfigValue::Bool).ok_or_else(invalid),
            ValueKind::Str => Ok(ConfigValue::Str(token.to_string())),
        }
    }

    /// Convert a JSON value into a value of this kind
    pub fn from_json(&self, key: &str, value: &serde_json::Value) -> Result<ConfigValue, ParseError> {
        let invalid = || ParseError::InvalidValue {
            key: key.to_string(),
            kind: self.name(),
            token: value.to_string(),
        };
        match value {
            serde_json::Value::String(s) => self.parse_token(key, s),
            serde_json::Value::Bool(b) => self.coerce(&ConfigValue::Bool(*b)).ok_or_else(invalid),
            serde_json::Value::Number(n) => {
                let raw = match n.as_i64() {
                    Some(i) => ConfigValue::Int(i),
                    None => ConfigValue::Float(n.as_f64().ok_or_else(invalid)?),
                };
                self.coerce(&raw).ok_or_else(invalid)
            }
            _ => Err(invalid()),
        }
    }

    /// Convert a value of this kind into a JSON value
    pub fn to_json(&self, value: &ConfigValue) -> Option<serde_json::Value> {
        match self.coerce(value)? {
            ConfigValue::Bool(b) => Some(serde_json::Value::Bool(b)),
            ConfigValue::Int(i) => Some(serde_json::Value::from(i)),
            ConfigValue::Float(f) => serde_json::Number::from_f64(f).map(serde_json::Value::Number),
            ConfigValue::Str(s) => Some(serde_json::Value::String(s)),
        }
    }
}

fn parse_int(token: &str, allow_hex: bool) -> Option<i64> {
    if allow_hex {
        if let Some(hex) = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
        {
            return i64::from_str_radix(hex, 16).ok();
        }
    }
    token.parse::<i64>().ok()
}

fn parse_bool(token: &str) -> Option<bool> {
    match token.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// Returns true if a positional token stands for "no value"
pub fn is_null_token(token: &str) -> bool {
    matches!(
        token.trim().to_ascii_lowercase().as_str(),
        "" | "n/a" | "na" | "-" | "none"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_tolerant_int() {
        assert_eq!(
            ValueKind::HexInt.parse_token("statusCode", "0x1F").unwrap(),
            ConfigValue::Int(31)
        );
        assert_eq!(
            ValueKind::HexInt.parse_token("statusCode", "12").unwrap(),
            ConfigValue::Int(12)
        );
        assert!(ValueKind::Int.parse_token("index", "0x1F").is_err());
    }

    #[test]
    fn test_negative_hex_int_not_encodable() {
        assert_eq!(ValueKind::HexInt.format_token(&ConfigValue::Int(-1)), None);
        assert_eq!(
            ValueKind::HexInt.format_token(&ConfigValue::Int(0x1F)).as_deref(),
            Some("0x1F")
        );
    }

    #[test]
    fn test_bool_tokens() {
        assert_eq!(
            ValueKind::Bool.parse_token("enable", "ON").unwrap(),
            ConfigValue::Bool(true)
        );
        assert_eq!(ValueKind::Bool.format_token(&ConfigValue::Bool(false)).unwrap(), "0");
        assert!(ValueKind::Bool.parse_token("enable", "maybe").is_err());
    }

    #[test]
    fn test_float_token_keeps_decimal_point() {
        assert_eq!(
            ValueKind::Float.format_token(&ConfigValue::Int(2450)).unwrap(),
            "2450.0"
        );
    }

    #[test]
    fn test_int_rejects_fractional_float() {
        assert_eq!(ValueKind::Int.coerce(&ConfigValue::Float(2.5)), None);
        assert_eq!(
            ValueKind::Int.coerce(&ConfigValue::Float(2.0)),
            Some(ConfigValue::Int(2))
        );
    }

    #[test]
    fn test_untagged_json_shape() {
        let v: ConfigValue = serde_json::from_str("900.0").unwrap();
        assert_eq!(v, ConfigValue::Float(900.0));
        let v: ConfigValue = serde_json::from_str("3").unwrap();
        assert_eq!(v, ConfigValue::Int(3));
        let v: ConfigValue = serde_json::from_str("true").unwrap();
        assert_eq!(v, ConfigValue::Bool(true));
    }

    #[test]
    fn test_null_tokens() {
        assert!(is_null_token("N/A"));
        assert!(is_null_token(" "));
        assert!(!is_null_token("0"));
    }
}
