//! JSON NDR protocol
//!
//! Newer radios take one JSON object per command and answer with one JSON
//! object per reply.
//!
//! # Format
//! - Request: `{"cmd":"tuner","msg":7,"params":{"id":0,"freq":900.0}}`
//! - Query: same shape, `cmd` defaults to `q` + mnemonic (`qtuner`)
//! - Reply: `{"success":true,"msg":7,"result":{"freq":900.0}}`, or a bare
//!   object of fields
//! - Terminator: newline
//!
//! Field names on the wire come from each command's field map; the same map
//! read backwards turns reply fields into configuration keys.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ParseError, ProtocolError};
use crate::value::CachedConfiguration;
use crate::{Direction, Protocol, ProtocolCodec, Request};

/// JSON protocol codec
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new JSON codec
    pub fn new() -> Self {
        Self
    }

    /// `cmd` value for a request
    pub fn command_word(request: &Request<'_>) -> String {
        match request.direction {
            Direction::Set => request.spec.mnemonic.to_string(),
            Direction::Query => match request.spec.query_mnemonic {
                Some(q) => q.to_string(),
                None => format!("q{}", request.spec.mnemonic),
            },
        }
    }

    /// Parse the first JSON object found in a reply
    pub fn reply_object(reply: &[u8]) -> Result<Map<String, Value>, ParseError> {
        let text = String::from_utf8_lossy(reply);
        let mut last_err = None;
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            match serde_json::from_str::<Value>(line) {
                Ok(Value::Object(obj)) => return Ok(obj),
                Ok(other) => last_err = Some(format!("expected object, got {}", other)),
                Err(e) => last_err = Some(e.to_string()),
            }
        }
        Err(ParseError::Malformed(
            last_err.unwrap_or_else(|| "empty reply".to_string()),
        ))
    }
}

impl ProtocolCodec for JsonCodec {
    fn protocol(&self) -> Protocol {
        Protocol::Json
    }

    fn encode(&self, request: &Request<'_>) -> Result<Vec<u8>, ProtocolError> {
        let mut params = Map::new();
        for param in request.param_specs() {
            match request.params.get(param.key) {
                Some(value) => {
                    let json = param.kind.to_json(value).ok_or_else(|| {
                        ProtocolError::Unencodable {
                            key: param.key.to_string(),
                            kind: param.kind.name(),
                        }
                    })?;
                    params.insert(request.spec.wire_name(param.key), json);
                }
                None if param.required => {
                    return Err(ProtocolError::MissingParameter(param.key.to_string()))
                }
                None => {}
            }
        }

        let mut envelope = Map::new();
        envelope.insert("cmd".into(), Value::String(Self::command_word(request)));
        envelope.insert("msg".into(), Value::from(request.sequence));
        envelope.insert("params".into(), Value::Object(params));

        let mut bytes = Value::Object(envelope).to_string().into_bytes();
        bytes.push(b'\n');
        Ok(bytes)
    }

    fn decode(
        &self,
        request: &Request<'_>,
        reply: &[u8],
    ) -> Result<CachedConfiguration, ProtocolError> {
        let obj = Self::reply_object(reply)?;

        if let Some(got) = obj.get("msg").and_then(Value::as_u64) {
            if got != u64::from(request.sequence) {
                debug!("{} stale reply to message {}", request.spec.mnemonic, got);
                return Err(ProtocolError::SequenceMismatch {
                    expected: request.sequence,
                    got,
                });
            }
        }

        if obj.get("success").and_then(Value::as_bool) == Some(false) {
            let reason = obj
                .get("error")
                .map(|e| match e {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_else(|| "command rejected".to_string());
            debug!("{} rejected: {}", request.spec.mnemonic, reason);
            return Err(ProtocolError::RadioError(reason));
        }

        if request.direction == Direction::Set {
            return Ok(CachedConfiguration::new());
        }

        let fields = match obj.get("result") {
            Some(Value::Object(result)) => result,
            _ => &obj,
        };

        let mut parsed = CachedConfiguration::new();
        for field in &request.spec.response_fields {
            let wire = request.spec.wire_name(field.key);
            let value = match fields.get(&wire) {
                Some(v) if !v.is_null() => Some(field.kind.from_json(field.key, v)?),
                _ if field.nullable => None,
                _ => return Err(ParseError::MissingField(field.key.to_string()).into()),
            };
            parsed.insert(field.key.to_string(), value);
        }
        Ok(parsed)
    }

    fn reply_terminator(&self) -> &'static [u8] {
        b"\n"
    }
}

#[cfg(test)]
mod tests {
    use super::JsonCodec;
    use crate::keys::{ENABLE, FREQUENCY, INDEX};
    use crate::{
        CommandSpec, ConfigValue, Configuration, Direction, FieldSpec, ParamSpec, ProtocolCodec,
        ProtocolError, Request, ValueKind,
    };
    use serde_json::{json, Value};

    fn tuner() -> CommandSpec {
        CommandSpec::new("tuner")
            .set_param(ParamSpec::required(INDEX, ValueKind::Int))
            .set_param(ParamSpec::optional(FREQUENCY, ValueKind::Float))
            .set_param(ParamSpec::optional(ENABLE, ValueKind::Bool))
            .query_param(ParamSpec::required(INDEX, ValueKind::Int))
            .field(FieldSpec::new(FREQUENCY, ValueKind::Float))
            .field(FieldSpec::nullable(ENABLE, ValueKind::Bool))
            .map(INDEX, "id")
            .map(FREQUENCY, "freq")
            .map(ENABLE, "enable")
    }

    fn request<'a>(spec: &'a CommandSpec, direction: Direction, p: &'a Configuration) -> Request<'a> {
        Request {
            spec,
            direction,
            params: p,
            sequence: 7,
        }
    }

    #[test]
    fn test_encode_set_uses_field_map() {
        let spec = tuner();
        let mut p = Configuration::new();
        p.insert(INDEX.into(), 0.into());
        p.insert(FREQUENCY.into(), 900.0.into());
        p.insert(ENABLE.into(), true.into());

        let bytes = JsonCodec::new()
            .encode(&request(&spec, Direction::Set, &p))
            .unwrap();
        let v: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["cmd"], "tuner");
        assert_eq!(v["msg"], 7);
        assert_eq!(v["params"], json!({"id": 0, "freq": 900.0, "enable": true}));
        assert_eq!(*bytes.last().unwrap(), b'\n');
    }

    #[test]
    fn test_encode_query_prefix() {
        let spec = tuner();
        let mut p = Configuration::new();
        p.insert(INDEX.into(), 2.into());
        let bytes = JsonCodec::new()
            .encode(&request(&spec, Direction::Query, &p))
            .unwrap();
        let v: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["cmd"], "qtuner");
        assert_eq!(v["params"], json!({"id": 2}));
    }

    #[test]
    fn test_decode_bare_object() {
        let spec = tuner();
        let p = Configuration::new();
        let parsed = JsonCodec::new()
            .decode(
                &request(&spec, Direction::Query, &p),
                br#"{"freq": 900.0, "enable": true}"#,
            )
            .unwrap();
        assert_eq!(parsed.get(FREQUENCY), Some(&Some(ConfigValue::Float(900.0))));
        assert_eq!(parsed.get(ENABLE), Some(&Some(ConfigValue::Bool(true))));
    }

    #[test]
    fn test_decode_envelope_with_null() {
        let spec = tuner();
        let p = Configuration::new();
        let parsed = JsonCodec::new()
            .decode(
                &request(&spec, Direction::Query, &p),
                br#"{"success": true, "msg": 7, "result": {"freq": 1200, "enable": null}}"#,
            )
            .unwrap();
        assert_eq!(parsed.get(FREQUENCY), Some(&Some(ConfigValue::Float(1200.0))));
        assert_eq!(parsed.get(ENABLE), Some(&None));
    }

    #[test]
    fn test_decode_stale_reply() {
        let spec = tuner();
        let p = Configuration::new();
        let err = JsonCodec::new()
            .decode(
                &request(&spec, Direction::Query, &p),
                br#"{"success": true, "msg": 41, "result": {"freq": 123.0}}"#,
            )
            .unwrap_err();
        assert_eq!(
            err,
            ProtocolError::SequenceMismatch {
                expected: 7,
                got: 41
            }
        );
    }

    #[test]
    fn test_decode_rejection() {
        let spec = tuner();
        let p = Configuration::new();
        let err = JsonCodec::new()
            .decode(
                &request(&spec, Direction::Set, &p),
                br#"{"success": false, "error": "bad id"}"#,
            )
            .unwrap_err();
        assert_eq!(err, ProtocolError::RadioError("bad id".into()));
    }

    #[test]
    fn test_decode_missing_field() {
        let spec = tuner();
        let p = Configuration::new();
        let err = JsonCodec::new()
            .decode(&request(&spec, Direction::Query, &p), br#"{"enable": false}"#)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Parse(_)));
    }

    #[test]
    fn test_decode_garbage() {
        let spec = tuner();
        let p = Configuration::new();
        let err = JsonCodec::new()
            .decode(&request(&spec, Direction::Query, &p), b"not json")
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Parse(crate::ParseError::Malformed(_))));
    }
}
