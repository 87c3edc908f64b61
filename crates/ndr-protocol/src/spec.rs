//! Declarative command specifications
//!
//! A [`CommandSpec`] describes one wire command: its mnemonic, the ordered
//! parameters sent when setting, the ordered parameters sent when querying,
//! and the ordered fields expected in the reply. Specs are plain data built
//! once per radio model and shared between components.

use crate::value::{ConfigValue, ValueKind};

/// One parameter of a set or query command
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    /// Configuration key the value is bound from
    pub key: &'static str,
    /// Declared wire type
    pub kind: ValueKind,
    /// Whether the command cannot be sent without this parameter
    pub required: bool,
    /// Value used when neither the caller nor the cache supplies one
    pub default: Option<ConfigValue>,
}

impl ParamSpec {
    /// A required parameter with no default
    pub fn required(key: &'static str, kind: ValueKind) -> Self {
        Self {
            key,
            kind,
            required: true,
            default: None,
        }
    }

    /// An optional parameter
    pub fn optional(key: &'static str, kind: ValueKind) -> Self {
        Self {
            key,
            kind,
            required: false,
            default: None,
        }
    }

    /// Attach a default value
    pub fn with_default(mut self, value: impl Into<ConfigValue>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// One field of a reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Configuration key the parsed value is stored under
    pub key: &'static str,
    /// Declared wire type
    pub kind: ValueKind,
    /// Whether a missing or sentinel value is tolerated
    pub nullable: bool,
}

impl FieldSpec {
    /// A field that must be present
    pub fn new(key: &'static str, kind: ValueKind) -> Self {
        Self {
            key,
            kind,
            nullable: false,
        }
    }

    /// A field that may be missing
    pub fn nullable(key: &'static str, kind: ValueKind) -> Self {
        Self {
            key,
            kind,
            nullable: true,
        }
    }
}

/// Static description of one wire command
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    /// Command word (positional) or `cmd` value (JSON) for sets
    pub mnemonic: &'static str,
    /// Overrides the derived query command word
    pub query_mnemonic: Option<&'static str>,
    /// Parameters sent with a set, in wire order
    pub set_params: Vec<ParamSpec>,
    /// Parameters sent with a query, in wire order
    pub query_params: Vec<ParamSpec>,
    /// Fields parsed from a query reply, in wire order
    pub response_fields: Vec<FieldSpec>,
    /// Configuration key to JSON field name
    pub field_map: Vec<(&'static str, &'static str)>,
    /// Whether the command can be issued as a query
    pub queryable: bool,
    /// Whether the command can be issued as a set
    pub settable: bool,
    /// Whether the radio answers a set (fire-and-forget otherwise)
    pub awaits_reply: bool,
}

impl CommandSpec {
    /// Start a spec for the given mnemonic; queryable, settable, awaiting replies
    pub fn new(mnemonic: &'static str) -> Self {
        Self {
            mnemonic,
            query_mnemonic: None,
            set_params: Vec::new(),
            query_params: Vec::new(),
            response_fields: Vec::new(),
            field_map: Vec::new(),
            queryable: true,
            settable: true,
            awaits_reply: true,
        }
    }

    /// Append a set parameter
    pub fn set_param(mut self, param: ParamSpec) -> Self {
        self.set_params.push(param);
        self
    }

    /// Append a query parameter
    pub fn query_param(mut self, param: ParamSpec) -> Self {
        self.query_params.push(param);
        self
    }

    /// Append a response field
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.response_fields.push(field);
        self
    }

    /// Map a configuration key to a JSON field name
    pub fn map(mut self, key: &'static str, wire: &'static str) -> Self {
        self.field_map.push((key, wire));
        self
    }

    /// Use an explicit query command word
    pub fn query_as(mut self, mnemonic: &'static str) -> Self {
        self.query_mnemonic = Some(mnemonic);
        self
    }

    /// Mark the command as query-only
    pub fn read_only(mut self) -> Self {
        self.settable = false;
        self
    }

    /// Mark the command as set-only
    pub fn write_only(mut self) -> Self {
        self.queryable = false;
        self
    }

    /// Mark the command as fire-and-forget
    pub fn no_reply(mut self) -> Self {
        self.awaits_reply = false;
        self
    }

    /// JSON field name for a key; the key itself when unmapped
    pub fn wire_name(&self, key: &str) -> String {
        self.field_map
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, w)| (*w).to_string())
            .unwrap_or_else(|| key.to_string())
    }

    /// Whether a set of this command carries the given key
    pub fn sets_key(&self, key: &str) -> bool {
        self.set_params.iter().any(|p| p.key == key)
    }

    /// Keys this command contributes to a component's configuration
    pub fn config_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        let set = self
            .set_params
            .iter()
            .filter(|_| self.settable)
            .map(|p| p.key);
        let reply = self
            .response_fields
            .iter()
            .filter(|_| self.queryable)
            .map(|f| f.key);
        set.chain(reply).filter(|k| *k != crate::keys::INDEX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{ENABLE, FREQUENCY, INDEX};

    fn frq() -> CommandSpec {
        CommandSpec::new("FRQ")
            .set_param(ParamSpec::required(INDEX, ValueKind::Int))
            .set_param(ParamSpec::required(FREQUENCY, ValueKind::Float).with_default(0.0))
            .query_param(ParamSpec::required(INDEX, ValueKind::Int))
            .field(FieldSpec::new(FREQUENCY, ValueKind::Float))
            .map(FREQUENCY, "freq")
    }

    #[test]
    fn test_wire_name_falls_back_to_key() {
        let spec = frq();
        assert_eq!(spec.wire_name(FREQUENCY), "freq");
        assert_eq!(spec.wire_name(ENABLE), "enable");
    }

    #[test]
    fn test_config_keys_exclude_index() {
        let keys: Vec<_> = frq().config_keys().collect();
        assert_eq!(keys, vec![FREQUENCY, FREQUENCY]);
    }

    #[test]
    fn test_read_only_contributes_reply_keys_only() {
        let spec = CommandSpec::new("SMAC")
            .set_param(ParamSpec::required("x", ValueKind::Int))
            .field(FieldSpec::new("y", ValueKind::Str))
            .read_only();
        let keys: Vec<_> = spec.config_keys().collect();
        assert_eq!(keys, vec!["y"]);
    }
}
