//! Scripted transport
//!
//! Plays back canned replies in order and records every command written,
//! for tests that need exact control over what the radio says.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use ndr_transport::{ConnectionMode, Transport, TransportError};

#[derive(Debug)]
enum Step {
    Reply(Vec<u8>),
    Timeout,
}

#[derive(Debug, Default)]
struct Script {
    steps: VecDeque<Step>,
    sent: Vec<String>,
    fail_sends: usize,
}

/// Handle for feeding a [`ScriptedTransport`] after it has been boxed
#[derive(Debug, Clone, Default)]
pub struct ScriptHandle(Arc<Mutex<Script>>);

impl ScriptHandle {
    fn lock(&self) -> MutexGuard<'_, Script> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue a reply for the next receive
    pub fn push_reply(&self, reply: impl AsRef<[u8]>) -> &Self {
        self.lock()
            .steps
            .push_back(Step::Reply(reply.as_ref().to_vec()));
        self
    }

    /// Queue a receive that times out
    pub fn push_timeout(&self) -> &Self {
        self.lock().steps.push_back(Step::Timeout);
        self
    }

    /// Make the next `count` sends fail with an I/O error
    pub fn fail_sends(&self, count: usize) -> &Self {
        self.lock().fail_sends = count;
        self
    }

    /// Every command written so far, as text
    pub fn sent(&self) -> Vec<String> {
        self.lock().sent.clone()
    }

    /// Replies not yet consumed
    pub fn remaining(&self) -> usize {
        self.lock().steps.len()
    }
}

/// A transport answering from a script
#[derive(Debug)]
pub struct ScriptedTransport {
    script: ScriptHandle,
    mode: ConnectionMode,
    connected: bool,
}

impl ScriptedTransport {
    pub fn new(mode: ConnectionMode) -> Self {
        Self {
            script: ScriptHandle::default(),
            mode,
            connected: true,
        }
    }

    pub fn handle(&self) -> ScriptHandle {
        self.script.clone()
    }
}

impl Transport for ScriptedTransport {
    fn mode(&self) -> ConnectionMode {
        self.mode
    }

    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        let mut script = self.script.lock();
        if script.fail_sends > 0 {
            script.fail_sends -= 1;
            return Err(TransportError::Io(std::io::Error::other("scripted send failure")));
        }
        script.sent.push(String::from_utf8_lossy(data).into_owned());
        Ok(())
    }

    fn receive(&mut self, _terminator: &[u8], _timeout: Duration) -> Result<Vec<u8>, TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        match self.script.lock().steps.pop_front() {
            Some(Step::Reply(bytes)) => Ok(bytes),
            Some(Step::Timeout) | None => Err(TransportError::Timeout),
        }
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plays_back_in_order() {
        let mut transport = ScriptedTransport::new(ConnectionMode::Tcp);
        transport
            .handle()
            .push_reply("FRQ 1, 100.0\r\n>")
            .push_timeout();

        transport.send(b"FRQ? 1\n").unwrap();
        assert_eq!(
            transport.receive(b">", Duration::ZERO).unwrap(),
            b"FRQ 1, 100.0\r\n>"
        );
        assert!(transport
            .receive(b">", Duration::ZERO)
            .unwrap_err()
            .is_timeout());
        assert_eq!(transport.handle().sent(), vec!["FRQ? 1\n".to_string()]);
    }

    #[test]
    fn test_scripted_send_failure() {
        let mut transport = ScriptedTransport::new(ConnectionMode::Udp);
        transport.handle().fail_sends(1);
        assert!(transport.send(b"x").is_err());
        assert!(transport.send(b"y").is_ok());
        assert_eq!(transport.handle().sent(), vec!["y".to_string()]);
    }
}
