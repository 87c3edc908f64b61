//! Virtual radio simulation
//!
//! Answers commands the way a real NDR unit does, in either wire flavor,
//! using the command tables of the model it impersonates. Settings written
//! by set commands are remembered and reported back by later queries.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::ops::Range;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use ndr_protocol::json::JsonCodec;
use ndr_protocol::keys::*;
use ndr_protocol::models::{ComponentKind, StatusStyle};
use ndr_protocol::positional::PositionalCodec;
use ndr_protocol::value::is_null_token;
use ndr_protocol::{
    CommandSpec, ConfigValue, Configuration, Direction, Protocol, RadioDatabase, RadioModel,
    ValueKind,
};
use ndr_transport::{ConnectionMode, Transport, TransportError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, trace};

use crate::error::SimError;

/// Configuration for creating a virtual radio
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VirtualRadioConfig {
    /// Model to impersonate
    pub model: String,
    /// Link the radio pretends to be reached over
    pub mode: ConnectionMode,
    /// Serial number reported by identification
    pub serial_number: String,
    /// Initial fault bits
    pub status_code: u32,
}

impl Default for VirtualRadioConfig {
    fn default() -> Self {
        Self {
            model: "NDR308".to_string(),
            mode: ConnectionMode::Tcp,
            serial_number: "SIM0001".to_string(),
            status_code: 0,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    spec: CommandSpec,
    component: Option<ComponentKind>,
    indices: Option<Range<u32>>,
    status: bool,
}

type Bucket = (Option<ComponentKind>, i64);

/// Shared handle to a virtual radio's state
pub type SimHandle = Arc<Mutex<SimState>>;

/// Everything a virtual radio remembers
#[derive(Debug)]
pub struct SimState {
    model: RadioModel,
    entries: Vec<Entry>,
    values: BTreeMap<Bucket, Configuration>,
    serial_number: String,
    status_code: u32,
    failing: BTreeSet<String>,
    silent: BTreeSet<String>,
    unresponsive: bool,
    requests: Vec<String>,
    resets: u32,
}

impl SimState {
    fn new(model: RadioModel, serial_number: String, status_code: u32) -> Self {
        let mut entries = Vec::new();
        for table in &model.components {
            let indexed = table.kind != ComponentKind::Radio;
            for spec in &table.commands {
                entries.push(Entry {
                    spec: spec.clone(),
                    component: Some(table.kind),
                    indices: indexed.then(|| table.index_base..table.index_base + table.count),
                    status: false,
                });
            }
        }
        let system = model
            .version_commands
            .iter()
            .chain([&model.identify, &model.reset])
            .cloned()
            .map(|spec| Entry {
                spec,
                component: None,
                indices: None,
                status: false,
            });
        entries.extend(system);
        entries.push(Entry {
            spec: model.status.command.clone(),
            component: None,
            indices: None,
            status: true,
        });

        Self {
            model,
            entries,
            values: BTreeMap::new(),
            serial_number,
            status_code,
            failing: BTreeSet::new(),
            silent: BTreeSet::new(),
            unresponsive: false,
            requests: Vec::new(),
            resets: 0,
        }
    }

    /// Model being simulated
    pub fn model(&self) -> &RadioModel {
        &self.model
    }

    /// Stored value of a component key
    pub fn value(&self, kind: ComponentKind, index: u32, key: &str) -> Option<ConfigValue> {
        let bucket = self.bucket(Some(kind), index as i64);
        self.values.get(&bucket)?.get(key).cloned()
    }

    /// Preload a component key
    pub fn set_value(&mut self, kind: ComponentKind, index: u32, key: &str, value: ConfigValue) {
        let bucket = self.bucket(Some(kind), index as i64);
        self.values
            .entry(bucket)
            .or_default()
            .insert(key.to_string(), value);
    }

    /// Every command line received, in order
    pub fn requests(&self) -> &[String] {
        &self.requests
    }

    pub fn clear_requests(&mut self) {
        self.requests.clear();
    }

    /// Number of resets received
    pub fn resets(&self) -> u32 {
        self.resets
    }

    pub fn set_status_code(&mut self, code: u32) {
        self.status_code = code;
    }

    /// Make a command answer with an error
    pub fn fail_command(&mut self, mnemonic: &str) {
        self.failing.insert(mnemonic.to_ascii_lowercase());
    }

    /// Make a command go unanswered
    pub fn silence_command(&mut self, mnemonic: &str) {
        self.silent.insert(mnemonic.to_ascii_lowercase());
    }

    /// Stop answering anything
    pub fn set_unresponsive(&mut self, unresponsive: bool) {
        self.unresponsive = unresponsive;
    }

    // Radio-level settings share one bucket regardless of index
    fn bucket(&self, kind: Option<ComponentKind>, index: i64) -> Bucket {
        match kind {
            Some(ComponentKind::Radio) | None => (kind, 0),
            _ => (kind, index),
        }
    }

    /// Handle one command, returning the reply bytes if the radio answers
    pub fn handle(&mut self, data: &[u8], echo: bool) -> Option<Vec<u8>> {
        let text = String::from_utf8_lossy(data).trim().to_string();
        trace!("Virtual {} received {:?}", self.model.name, text);
        self.requests.push(text.clone());
        if self.unresponsive {
            return None;
        }
        match self.model.protocol {
            Protocol::Positional => self.handle_positional(&text, echo),
            Protocol::Json => self.handle_json(&text),
        }
    }

    fn handle_positional(&mut self, line: &str, echo: bool) -> Option<Vec<u8>> {
        let mut out = String::new();
        if echo {
            out.push_str(line);
            out.push_str("\r\n");
        }

        let (word, rest) = match line.find(char::is_whitespace) {
            Some(pos) => (&line[..pos], &line[pos..]),
            None => (line, ""),
        };
        let direction = if word.ends_with('?') {
            Direction::Query
        } else {
            Direction::Set
        };

        let Some(entry) = self.find_positional(word, direction) else {
            out.push_str(&format!("ERROR: unknown command {}\r\n>", word));
            return Some(out.into_bytes());
        };
        if self.silent.contains(&entry.spec.mnemonic.to_ascii_lowercase()) {
            return None;
        }

        let params = match direction {
            Direction::Query => &entry.spec.query_params,
            Direction::Set => &entry.spec.set_params,
        };
        let tokens = PositionalCodec::tokens(rest);
        let mut args = Configuration::new();
        for (i, param) in params.iter().enumerate() {
            match tokens.get(i).filter(|t| !is_null_token(t)) {
                Some(token) => match param.kind.parse_token(param.key, token) {
                    Ok(value) => {
                        args.insert(param.key.to_string(), value);
                    }
                    Err(e) => {
                        out.push_str(&format!("ERROR: {}\r\n>", e));
                        return Some(out.into_bytes());
                    }
                },
                None if param.required => {
                    out.push_str(&format!("ERROR: missing parameter {}\r\n>", param.key));
                    return Some(out.into_bytes());
                }
                None => {}
            }
        }

        let result = self.execute(&entry, direction, &args);
        if direction == Direction::Set && !entry.spec.awaits_reply {
            return None;
        }
        match result {
            Ok(fields) if direction == Direction::Query => {
                let mut reply: Vec<String> = entry
                    .spec
                    .query_params
                    .iter()
                    .filter_map(|p| args.get(p.key).and_then(|v| p.kind.format_token(v)))
                    .collect();
                for (kind, value) in fields {
                    let token = value.and_then(|v| kind.format_token(&v));
                    reply.push(token.unwrap_or_else(|| NOT_APPLICABLE.to_string()));
                }
                out.push_str(entry.spec.mnemonic);
                if !reply.is_empty() {
                    out.push(' ');
                    out.push_str(&reply.join(", "));
                }
                out.push_str("\r\n>");
            }
            Ok(_) => out.push_str("\r\n>"),
            Err(reason) => out.push_str(&format!("ERROR: {}\r\n>", reason)),
        }
        Some(out.into_bytes())
    }

    fn find_positional(&self, word: &str, direction: Direction) -> Option<Entry> {
        let base = word.trim_end_matches('?');
        self.entries
            .iter()
            .find(|e| match direction {
                Direction::Query => match e.spec.query_mnemonic {
                    Some(q) => q.eq_ignore_ascii_case(word),
                    None => e.spec.mnemonic.eq_ignore_ascii_case(base),
                },
                Direction::Set => e.spec.mnemonic.eq_ignore_ascii_case(word),
            })
            .cloned()
    }

    fn handle_json(&mut self, text: &str) -> Option<Vec<u8>> {
        let request: Map<String, Value> = match serde_json::from_str(text) {
            Ok(Value::Object(obj)) => obj,
            _ => return Some(json_reply(json!({"success": false, "error": "malformed request"}))),
        };
        let msg = request.get("msg").cloned().unwrap_or(Value::Null);
        let cmd = request.get("cmd").and_then(Value::as_str).unwrap_or_default();
        let empty = Map::new();
        let params = match request.get("params") {
            Some(Value::Object(p)) => p,
            _ => &empty,
        };

        let Some((entry, direction)) = self.find_json(cmd) else {
            return Some(json_reply(json!({
                "success": false,
                "msg": msg,
                "error": format!("unknown command {}", cmd),
            })));
        };
        if self.silent.contains(&entry.spec.mnemonic.to_ascii_lowercase()) {
            return None;
        }

        let specs = match direction {
            Direction::Query => &entry.spec.query_params,
            Direction::Set => &entry.spec.set_params,
        };
        let mut args = Configuration::new();
        for param in specs {
            let wire = entry.spec.wire_name(param.key);
            if let Some(value) = params.get(&wire).filter(|v| !v.is_null()) {
                match param.kind.from_json(param.key, value) {
                    Ok(v) => {
                        args.insert(param.key.to_string(), v);
                    }
                    Err(e) => {
                        return Some(json_reply(json!({
                            "success": false,
                            "msg": msg,
                            "error": e.to_string(),
                        })))
                    }
                }
            } else if param.required {
                return Some(json_reply(json!({
                    "success": false,
                    "msg": msg,
                    "error": format!("missing parameter {}", wire),
                })));
            }
        }

        let result = self.execute(&entry, direction, &args);
        if direction == Direction::Set && !entry.spec.awaits_reply {
            return None;
        }
        let reply = match result {
            Ok(fields) if direction == Direction::Query => {
                let mut out = Map::new();
                for (field, (kind, value)) in entry.spec.response_fields.iter().zip(fields) {
                    let json = value.and_then(|v| kind.to_json(&v)).unwrap_or(Value::Null);
                    out.insert(entry.spec.wire_name(field.key), json);
                }
                json!({"success": true, "msg": msg, "result": out})
            }
            Ok(_) => json!({"success": true, "msg": msg}),
            Err(reason) => json!({"success": false, "msg": msg, "error": reason}),
        };
        Some(json_reply(reply))
    }

    fn find_json(&self, cmd: &str) -> Option<(Entry, Direction)> {
        let set = self
            .entries
            .iter()
            .find(|e| e.spec.settable && e.spec.mnemonic == cmd)
            .map(|e| (e.clone(), Direction::Set));
        set.or_else(|| {
            self.entries
                .iter()
                .find(|e| {
                    e.spec.queryable
                        && match e.spec.query_mnemonic {
                            Some(q) => q == cmd,
                            None => cmd.strip_prefix('q') == Some(e.spec.mnemonic),
                        }
                })
                .map(|e| (e.clone(), Direction::Query))
        })
    }

    /// Apply a decoded command to the stored state
    fn execute(
        &mut self,
        entry: &Entry,
        direction: Direction,
        args: &Configuration,
    ) -> Result<Vec<(ValueKind, Option<ConfigValue>)>, String> {
        let spec = &entry.spec;
        if self.failing.contains(&spec.mnemonic.to_ascii_lowercase()) {
            return Err(format!("{} failed", spec.mnemonic));
        }

        let index = match &entry.indices {
            Some(range) => {
                let index = args.get(INDEX).and_then(ConfigValue::as_i64).unwrap_or(-1);
                if index < range.start as i64 || index >= range.end as i64 {
                    return Err(format!("invalid index {}", index));
                }
                index
            }
            None => 0,
        };
        let bucket = self.bucket(entry.component, index);

        match direction {
            Direction::Set => {
                if !spec.settable {
                    return Err(format!("{} is read-only", spec.mnemonic));
                }
                if spec.mnemonic == self.model.reset.mnemonic {
                    debug!("Virtual {} reset", self.model.name);
                    self.values.clear();
                    self.resets += 1;
                    return Ok(Vec::new());
                }
                let stored = self.values.entry(bucket).or_default();
                for param in spec.set_params.iter().filter(|p| p.key != INDEX) {
                    if let Some(value) = args.get(param.key) {
                        stored.insert(param.key.to_string(), value.clone());
                    }
                }
                Ok(Vec::new())
            }
            Direction::Query => {
                if !spec.queryable {
                    return Err(format!("{} cannot be queried", spec.mnemonic));
                }
                Ok(spec
                    .response_fields
                    .iter()
                    .map(|f| (f.kind, self.field_value(entry, bucket, f.key, f.kind)))
                    .collect())
            }
        }
    }

    fn field_value(
        &self,
        entry: &Entry,
        bucket: Bucket,
        key: &str,
        kind: ValueKind,
    ) -> Option<ConfigValue> {
        if entry.status {
            if key == STATUS_CODE {
                return Some(ConfigValue::Int(self.status_code as i64));
            }
            if self.model.status.style == StatusStyle::Fields {
                let mask: u32 = self
                    .model
                    .status
                    .bits
                    .iter()
                    .filter(|b| b.field == key)
                    .map(|b| b.mask)
                    .fold(0, |acc, m| acc | m);
                return Some(ConfigValue::Bool(self.status_code & mask != 0));
            }
        }
        if let Some(value) = self.values.get(&bucket).and_then(|v| v.get(key)) {
            return Some(value.clone());
        }
        self.seed(key, kind)
    }

    /// Power-on value of a key
    fn seed(&self, key: &str, kind: ValueKind) -> Option<ConfigValue> {
        let text = match key {
            MODEL => self.model.name,
            SERIAL_NUMBER => self.serial_number.as_str(),
            SOFTWARE_VERSION => "2.4.1",
            FIRMWARE_VERSION => "1.9.0",
            HARDWARE_VERSION => "B",
            UNIT_REVISION => "3",
            REFERENCE_VERSION => return None,
            SOURCE_IP => "10.1.0.2",
            DEST_IP => "10.1.0.1",
            SOURCE_MAC | DEST_MAC => "00:50:c2:4f:10:01",
            MEMBERS => "1",
            _ => {
                return Some(match kind {
                    ValueKind::Int | ValueKind::HexInt => ConfigValue::Int(0),
                    ValueKind::Float => ConfigValue::Float(0.0),
                    ValueKind::Bool => ConfigValue::Bool(false),
                    ValueKind::Str => ConfigValue::Str("unset".to_string()),
                })
            }
        };
        Some(ConfigValue::Str(text.to_string()))
    }
}

fn json_reply(value: Value) -> Vec<u8> {
    let mut bytes = value.to_string().into_bytes();
    bytes.push(b'\n');
    bytes
}

fn lock(state: &SimHandle) -> MutexGuard<'_, SimState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A simulated radio reachable through the [`Transport`] trait
#[derive(Debug)]
pub struct VirtualRadio {
    state: SimHandle,
    mode: ConnectionMode,
    connected: bool,
    pending: VecDeque<Vec<u8>>,
}

impl VirtualRadio {
    /// Simulate `model` over its preferred link kind
    pub fn new(model: RadioModel) -> Self {
        let mode = match model.protocol {
            Protocol::Positional => ConnectionMode::Tcp,
            Protocol::Json => ConnectionMode::Udp,
        };
        Self {
            state: Arc::new(Mutex::new(SimState::new(model, "SIM0001".to_string(), 0))),
            mode,
            connected: true,
            pending: VecDeque::new(),
        }
    }

    /// Simulate a model by name
    pub fn for_model(name: &str) -> Result<Self, SimError> {
        RadioDatabase::by_name(name)
            .map(Self::new)
            .ok_or_else(|| SimError::UnknownModel(name.to_string()))
    }

    /// Create a virtual radio from configuration
    pub fn from_config(config: &VirtualRadioConfig) -> Result<Self, SimError> {
        let model = RadioDatabase::by_name(&config.model)
            .ok_or_else(|| SimError::UnknownModel(config.model.clone()))?;
        Ok(Self {
            state: Arc::new(Mutex::new(SimState::new(
                model,
                config.serial_number.clone(),
                config.status_code,
            ))),
            mode: config.mode,
            connected: true,
            pending: VecDeque::new(),
        })
    }

    /// Pretend to be reached over a different link kind
    ///
    /// Serial links echo every command line before the reply.
    pub fn with_mode(mut self, mode: ConnectionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Handle for inspecting and steering the radio after it has been boxed
    pub fn handle(&self) -> SimHandle {
        Arc::clone(&self.state)
    }
}

impl Transport for VirtualRadio {
    fn mode(&self) -> ConnectionMode {
        self.mode
    }

    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.pending.clear();
        let echo = self.mode == ConnectionMode::Serial;
        if let Some(reply) = lock(&self.state).handle(data, echo) {
            self.pending.push_back(reply);
        }
        Ok(())
    }

    fn receive(&mut self, _terminator: &[u8], _timeout: Duration) -> Result<Vec<u8>, TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.pending.pop_front().ok_or(TransportError::Timeout)
    }

    fn disconnect(&mut self) {
        self.connected = false;
        self.pending.clear();
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
