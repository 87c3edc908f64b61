//! Positional (mnemonic) NDR protocol
//!
//! The older radios speak an ASCII command line protocol.
//!
//! # Format
//! - Set: `FRQ 3, 2450.0` (mnemonic, then parameters in declared order)
//! - Query: `FRQ? 3` (query parameters only)
//! - Reply: `FRQ 3, 2450.0` echoing the mnemonic and the query parameters,
//!   followed by the response fields in declared order
//! - Errors: a line starting with `ERROR`
//! - End of reply: the `>` prompt
//!
//! Tokens are separated by commas; replies without commas are split on
//! whitespace instead.

use tracing::debug;

use crate::error::{ParseError, ProtocolError};
use crate::value::{is_null_token, CachedConfiguration};
use crate::{Direction, Protocol, ProtocolCodec, Request};

/// Prompt the radio prints once it has finished answering
pub const PROMPT: u8 = b'>';

/// Positional protocol codec
#[derive(Debug, Default, Clone, Copy)]
pub struct PositionalCodec;

impl PositionalCodec {
    /// Create a new positional codec
    pub fn new() -> Self {
        Self
    }

    /// Command word for a request
    pub fn command_word(request: &Request<'_>) -> String {
        match request.direction {
            Direction::Set => request.spec.mnemonic.to_string(),
            Direction::Query => match request.spec.query_mnemonic {
                Some(q) => q.to_string(),
                None => format!("{}?", request.spec.mnemonic),
            },
        }
    }

    /// Split a reply into meaningful lines, dropping prompts and blanks
    pub fn reply_lines(reply: &[u8]) -> Vec<String> {
        String::from_utf8_lossy(reply)
            .split(['\r', '\n'])
            .map(|line| line.trim().trim_start_matches(PROMPT as char).trim())
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Split the part of a reply line after the mnemonic into tokens
    pub fn tokens(rest: &str) -> Vec<String> {
        let rest = rest.trim();
        if rest.is_empty() {
            Vec::new()
        } else if rest.contains(',') {
            rest.split(',').map(|t| t.trim().to_string()).collect()
        } else {
            rest.split_whitespace().map(str::to_string).collect()
        }
    }

    /// Find the data line answering `request` and return what follows the mnemonic
    fn data_line<'l>(request: &Request<'_>, lines: &'l [String]) -> Option<&'l str> {
        let expected: Vec<String> = [
            Some(request.spec.mnemonic),
            request.spec.query_mnemonic,
        ]
        .into_iter()
        .flatten()
        .map(|m| m.trim_end_matches('?').to_ascii_uppercase())
        .collect();

        lines.iter().find_map(|line| {
            let (word, rest) = match line.find(|c: char| c.is_whitespace()) {
                Some(pos) => (&line[..pos], &line[pos..]),
                None => (line.as_str(), ""),
            };
            // Serial links echo the query line back; skip it
            if word.ends_with('?') {
                return None;
            }
            let word = word.to_ascii_uppercase();
            expected.contains(&word).then_some(rest)
        })
    }
}

impl ProtocolCodec for PositionalCodec {
    fn protocol(&self) -> Protocol {
        Protocol::Positional
    }

    fn encode(&self, request: &Request<'_>) -> Result<Vec<u8>, ProtocolError> {
        let mut tokens = Vec::new();
        let mut skipped: Option<&str> = None;

        for param in request.param_specs() {
            match request.params.get(param.key) {
                Some(value) => {
                    if let Some(gap) = skipped {
                        return Err(ProtocolError::PositionalGap(gap.to_string()));
                    }
                    let token = param.kind.format_token(value).ok_or_else(|| {
                        ProtocolError::Unencodable {
                            key: param.key.to_string(),
                            kind: param.kind.name(),
                        }
                    })?;
                    tokens.push(token);
                }
                None if param.required => {
                    return Err(ProtocolError::MissingParameter(param.key.to_string()))
                }
                None => {
                    skipped.get_or_insert(param.key);
                }
            }
        }

        let mut line = Self::command_word(request);
        if !tokens.is_empty() {
            line.push(' ');
            line.push_str(&tokens.join(", "));
        }
        line.push('\n');
        Ok(line.into_bytes())
    }

    fn decode(
        &self,
        request: &Request<'_>,
        reply: &[u8],
    ) -> Result<CachedConfiguration, ProtocolError> {
        let lines = Self::reply_lines(reply);

        if let Some(err) = lines
            .iter()
            .find(|l| l.to_ascii_uppercase().starts_with("ERROR"))
        {
            debug!("{} rejected: {}", request.spec.mnemonic, err);
            return Err(ProtocolError::RadioError(err.clone()));
        }

        if request.direction == Direction::Set {
            return Ok(CachedConfiguration::new());
        }

        let rest = Self::data_line(request, &lines)
            .ok_or_else(|| ParseError::MissingReply(request.spec.mnemonic.to_string()))?;
        let tokens = Self::tokens(rest);

        // Replies echo the query parameters before the data
        let echoed = request.spec.query_params.len().min(tokens.len());
        let data = &tokens[echoed..];

        let mut parsed = CachedConfiguration::new();
        for (i, field) in request.spec.response_fields.iter().enumerate() {
            let value = match data.get(i) {
                Some(token) if !is_null_token(token) => {
                    Some(field.kind.parse_token(field.key, token)?)
                }
                _ if field.nullable => None,
                _ => return Err(ParseError::MissingField(field.key.to_string()).into()),
            };
            parsed.insert(field.key.to_string(), value);
        }
        Ok(parsed)
    }

    fn reply_terminator(&self) -> &'static [u8] {
        b">"
    }
}

#[cfg(test)]
mod tests {
    use super::PositionalCodec;
    use crate::keys::{ENABLE, FREQUENCY, INDEX, MODEL, SERIAL_NUMBER};
    use crate::{
        CommandSpec, ConfigValue, Configuration, Direction, FieldSpec, ParamSpec, ProtocolCodec,
        ProtocolError, Request, ValueKind,
    };

    fn frq() -> CommandSpec {
        CommandSpec::new("FRQ")
            .set_param(ParamSpec::required(INDEX, ValueKind::Int))
            .set_param(ParamSpec::required(FREQUENCY, ValueKind::Float).with_default(0.0))
            .query_param(ParamSpec::required(INDEX, ValueKind::Int))
            .field(FieldSpec::new(FREQUENCY, ValueKind::Float))
    }

    fn params(pairs: &[(&str, ConfigValue)]) -> Configuration {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn request<'a>(spec: &'a CommandSpec, direction: Direction, p: &'a Configuration) -> Request<'a> {
        Request {
            spec,
            direction,
            params: p,
            sequence: 0,
        }
    }

    #[test]
    fn test_encode_set() {
        let spec = frq();
        let p = params(&[(INDEX, 3.into()), (FREQUENCY, 2450.0.into())]);
        let bytes = PositionalCodec::new()
            .encode(&request(&spec, Direction::Set, &p))
            .unwrap();
        assert_eq!(bytes, b"FRQ 3, 2450.0\n");
    }

    #[test]
    fn test_encode_query() {
        let spec = frq();
        let p = params(&[(INDEX, 3.into())]);
        let bytes = PositionalCodec::new()
            .encode(&request(&spec, Direction::Query, &p))
            .unwrap();
        assert_eq!(bytes, b"FRQ? 3\n");
    }

    #[test]
    fn test_encode_missing_required() {
        let spec = frq();
        let p = params(&[(INDEX, 3.into())]);
        let err = PositionalCodec::new()
            .encode(&request(&spec, Direction::Set, &p))
            .unwrap_err();
        assert_eq!(err, ProtocolError::MissingParameter(FREQUENCY.into()));
    }

    #[test]
    fn test_encode_trailing_optional_omitted() {
        let spec = CommandSpec::new("WBDDC")
            .set_param(ParamSpec::required(INDEX, ValueKind::Int))
            .set_param(ParamSpec::optional(ENABLE, ValueKind::Bool));
        let p = params(&[(INDEX, 1.into())]);
        let bytes = PositionalCodec::new()
            .encode(&request(&spec, Direction::Set, &p))
            .unwrap();
        assert_eq!(bytes, b"WBDDC 1\n");
    }

    #[test]
    fn test_encode_gap_rejected() {
        let spec = CommandSpec::new("WBDDC")
            .set_param(ParamSpec::required(INDEX, ValueKind::Int))
            .set_param(ParamSpec::optional(ENABLE, ValueKind::Bool))
            .set_param(ParamSpec::optional(FREQUENCY, ValueKind::Float));
        let p = params(&[(INDEX, 1.into()), (FREQUENCY, 1.0.into())]);
        let err = PositionalCodec::new()
            .encode(&request(&spec, Direction::Set, &p))
            .unwrap_err();
        assert_eq!(err, ProtocolError::PositionalGap(ENABLE.into()));
    }

    #[test]
    fn test_decode_space_delimited_reply() {
        let spec = frq();
        let p = params(&[(INDEX, 3.into())]);
        let parsed = PositionalCodec::new()
            .decode(&request(&spec, Direction::Query, &p), b"FRQ 3 2450.0\r\n>")
            .unwrap();
        assert_eq!(parsed.get(FREQUENCY), Some(&Some(ConfigValue::Float(2450.0))));
    }

    #[test]
    fn test_decode_comma_delimited_reply_after_echo() {
        let spec = frq();
        let p = params(&[(INDEX, 3.into())]);
        let parsed = PositionalCodec::new()
            .decode(
                &request(&spec, Direction::Query, &p),
                b"FRQ? 3\r\nFRQ 3, 2450.0\r\n>",
            )
            .unwrap();
        assert_eq!(parsed.get(FREQUENCY), Some(&Some(ConfigValue::Float(2450.0))));
    }

    #[test]
    fn test_decode_radio_error() {
        let spec = frq();
        let p = params(&[(INDEX, 9.into())]);
        let err = PositionalCodec::new()
            .decode(
                &request(&spec, Direction::Query, &p),
                b"ERROR: index out of range\r\n>",
            )
            .unwrap_err();
        assert!(matches!(err, ProtocolError::RadioError(msg) if msg.contains("index")));
    }

    #[test]
    fn test_decode_conversion_failure_is_error() {
        let spec = frq();
        let p = params(&[(INDEX, 3.into())]);
        let err = PositionalCodec::new()
            .decode(&request(&spec, Direction::Query, &p), b"FRQ 3, abc\r\n>")
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Parse(_)));
    }

    #[test]
    fn test_decode_nullable_fields() {
        let spec = CommandSpec::new("*IDN")
            .query_as("*IDN?")
            .field(FieldSpec::new(MODEL, ValueKind::Str))
            .field(FieldSpec::nullable(SERIAL_NUMBER, ValueKind::Str))
            .read_only();
        let p = Configuration::new();
        let parsed = PositionalCodec::new()
            .decode(&request(&spec, Direction::Query, &p), b"*IDN NDR308, N/A\r\n>")
            .unwrap();
        assert_eq!(parsed.get(MODEL), Some(&Some(ConfigValue::Str("NDR308".into()))));
        assert_eq!(parsed.get(SERIAL_NUMBER), Some(&None));
    }

    #[test]
    fn test_decode_missing_required_field() {
        let spec = frq();
        let p = params(&[(INDEX, 3.into())]);
        let err = PositionalCodec::new()
            .decode(&request(&spec, Direction::Query, &p), b"FRQ 3\r\n>")
            .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Parse(crate::ParseError::MissingField(_))
        ));
    }
}
