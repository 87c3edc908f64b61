//! Command link
//!
//! Pairs a transport with the codec of the radio on the other end. One
//! command is written and its reply read while the link is held, so
//! transactions never overlap.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use ndr_protocol::{
    create_codec, CachedConfiguration, CommandSpec, Configuration, Direction, Protocol,
    ProtocolCodec, ProtocolError, Request,
};
use ndr_transport::{ConnectionMode, Transport};
use tracing::{debug, info, trace};

use crate::error::DriverError;

/// Default time to wait for a reply
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Handle through which components reach the link
pub type SharedLink = Arc<Mutex<CommandLink>>;

/// Lock a shared link, recovering from a poisoned lock
pub fn lock_link(link: &SharedLink) -> MutexGuard<'_, CommandLink> {
    link.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A transport plus the wire flavor spoken over it
pub struct CommandLink {
    transport: Option<Box<dyn Transport>>,
    codec: Box<dyn ProtocolCodec>,
    timeout: Duration,
    sequence: u32,
}

impl CommandLink {
    /// Create a link with no transport attached
    pub fn new(protocol: Protocol, timeout: Duration) -> Self {
        Self {
            transport: None,
            codec: create_codec(protocol),
            timeout,
            sequence: 0,
        }
    }

    /// Create a link already attached to `transport`
    pub fn with_transport(protocol: Protocol, transport: Box<dyn Transport>, timeout: Duration) -> Self {
        let mut link = Self::new(protocol, timeout);
        link.attach(transport);
        link
    }

    /// Wrap the link for sharing between components
    pub fn shared(self) -> SharedLink {
        Arc::new(Mutex::new(self))
    }

    /// Attach a transport, closing any previous one
    pub fn attach(&mut self, transport: Box<dyn Transport>) {
        self.detach();
        self.transport = Some(transport);
    }

    /// Close and drop the transport
    pub fn detach(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.disconnect();
            info!("Detached {} transport", transport.mode());
        }
    }

    pub fn is_connected(&self) -> bool {
        self.transport.as_ref().is_some_and(|t| t.is_connected())
    }

    pub fn mode(&self) -> Option<ConnectionMode> {
        self.transport.as_ref().map(|t| t.mode())
    }

    pub fn protocol(&self) -> Protocol {
        self.codec.protocol()
    }

    /// Default reply timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    fn transport(&mut self) -> Result<&mut Box<dyn Transport>, DriverError> {
        self.transport
            .as_mut()
            .filter(|t| t.is_connected())
            .ok_or(DriverError::NotConnected)
    }

    /// Issue one command and parse its reply
    ///
    /// Fire-and-forget sets return an empty result as soon as the command
    /// is written.
    pub fn execute(
        &mut self,
        spec: &CommandSpec,
        direction: Direction,
        params: &Configuration,
        timeout: Option<Duration>,
    ) -> Result<CachedConfiguration, DriverError> {
        let allowed = match direction {
            Direction::Query => spec.queryable,
            Direction::Set => spec.settable,
        };
        if !allowed {
            return Err(ProtocolError::UnsupportedDirection {
                mnemonic: spec.mnemonic.to_string(),
                direction: direction.name(),
            }
            .into());
        }

        self.sequence = self.sequence.wrapping_add(1);
        let request = Request {
            spec,
            direction,
            params,
            sequence: self.sequence,
        };
        let bytes = self.codec.encode(&request)?;
        let timeout = timeout.unwrap_or(self.timeout);
        let terminator = self.codec.reply_terminator();

        debug!(
            mnemonic = spec.mnemonic,
            direction = direction.name(),
            "-> {}",
            String::from_utf8_lossy(&bytes).trim_end()
        );
        let transport = self.transport()?;
        transport.send(&bytes)?;
        if direction == Direction::Set && !spec.awaits_reply {
            return Ok(CachedConfiguration::new());
        }

        let reply = transport.receive(terminator, timeout)?;
        trace!(mnemonic = spec.mnemonic, "<- {:?}", String::from_utf8_lossy(&reply));
        Ok(self.codec.decode(&request, &reply)?)
    }

    /// Send a free-form command line and return the reply lines
    pub fn send_raw(&mut self, command: &str, timeout: Option<Duration>) -> Result<Vec<String>, DriverError> {
        let bytes = self.codec.encode_raw(command);
        let timeout = timeout.unwrap_or(self.timeout);
        let terminator = self.codec.reply_terminator();

        debug!("-> {}", command.trim_end());
        let transport = self.transport()?;
        transport.send(&bytes)?;
        let reply = transport.receive(terminator, timeout)?;

        Ok(String::from_utf8_lossy(&reply)
            .split(['\r', '\n'])
            .map(|line| line.trim().trim_start_matches('>').trim())
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}

impl std::fmt::Debug for CommandLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandLink")
            .field("protocol", &self.codec.protocol())
            .field("mode", &self.mode())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndr_protocol::keys::{FREQUENCY, INDEX};
    use ndr_protocol::{ConfigValue, FieldSpec, ParamSpec, ValueKind};
    use ndr_sim::ScriptedTransport;

    fn frq() -> CommandSpec {
        CommandSpec::new("FRQ")
            .set_param(ParamSpec::required(INDEX, ValueKind::Int))
            .set_param(ParamSpec::required(FREQUENCY, ValueKind::Float))
            .query_param(ParamSpec::required(INDEX, ValueKind::Int))
            .field(FieldSpec::new(FREQUENCY, ValueKind::Float))
    }

    #[test]
    fn test_execute_query() {
        let transport = ScriptedTransport::new(ConnectionMode::Tcp);
        let script = transport.handle();
        script.push_reply("FRQ 1, 100.0\r\n>");
        let mut link = CommandLink::with_transport(Protocol::Positional, Box::new(transport), DEFAULT_TIMEOUT);

        let mut params = Configuration::new();
        params.insert(INDEX.into(), 1.into());
        let reply = link
            .execute(&frq(), Direction::Query, &params, None)
            .unwrap();
        assert_eq!(reply.get(FREQUENCY), Some(&Some(ConfigValue::Float(100.0))));
        assert_eq!(script.sent(), vec!["FRQ? 1\n".to_string()]);
    }

    #[test]
    fn test_execute_without_transport() {
        let mut link = CommandLink::new(Protocol::Json, DEFAULT_TIMEOUT);
        let mut params = Configuration::new();
        params.insert(INDEX.into(), 0.into());
        let err = link
            .execute(&frq(), Direction::Query, &params, None)
            .unwrap_err();
        assert!(matches!(err, DriverError::NotConnected));
    }

    #[test]
    fn test_fire_and_forget_does_not_wait() {
        let transport = ScriptedTransport::new(ConnectionMode::Tcp);
        let script = transport.handle();
        let mut link = CommandLink::with_transport(Protocol::Positional, Box::new(transport), DEFAULT_TIMEOUT);
        let spec = CommandSpec::new("*RST").write_only().no_reply();
        let reply = link
            .execute(&spec, Direction::Set, &Configuration::new(), None)
            .unwrap();
        assert!(reply.is_empty());
        assert_eq!(script.sent(), vec!["*RST\n".to_string()]);
    }

    #[test]
    fn test_send_raw_strips_prompt() {
        let transport = ScriptedTransport::new(ConnectionMode::Tcp);
        transport.handle().push_reply("STAT 0x0\r\n>");
        let mut link = CommandLink::with_transport(Protocol::Positional, Box::new(transport), DEFAULT_TIMEOUT);
        let lines = link.send_raw("STAT?", None).unwrap();
        assert_eq!(lines, vec!["STAT 0x0".to_string()]);
    }
}
