//! UDP command link
//!
//! JSON radios accept one command per datagram and answer with one
//! datagram. There is no stream to frame, so the reply terminator is
//! ignored.

use std::net::UdpSocket;
use std::time::Duration;

use tracing::{debug, info, trace};

use crate::error::TransportError;
use crate::tcp::resolve;
use crate::{ConnectionMode, Transport};

/// Largest datagram a radio sends
const MAX_DATAGRAM: usize = 65_507;

/// Blocking UDP transport bound to one radio
#[derive(Debug)]
pub struct UdpTransport {
    socket: Option<UdpSocket>,
    addr: String,
}

impl UdpTransport {
    /// Bind an ephemeral local port and associate it with `host:port`
    pub fn connect(host: &str, port: u16) -> Result<Self, TransportError> {
        let addr = format!("{}:{}", host, port);
        let target = resolve(&addr)?;
        let local = if target.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };

        let socket = UdpSocket::bind(local)?;
        socket
            .connect(target)
            .map_err(|e| TransportError::ConnectFailed {
                address: addr.clone(),
                reason: e.to_string(),
            })?;
        debug!("UDP socket {:?} associated with {}", socket.local_addr().ok(), addr);
        info!("Connected to {} (UDP)", addr);

        Ok(Self {
            socket: Some(socket),
            addr,
        })
    }

    /// Address this transport sends to
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

impl Transport for UdpTransport {
    fn mode(&self) -> ConnectionMode {
        ConnectionMode::Udp
    }

    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let socket = self.socket.as_ref().ok_or(TransportError::NotConnected)?;
        socket.send(data).map_err(TransportError::from_io)?;
        Ok(())
    }

    fn receive(&mut self, _terminator: &[u8], timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let socket = self.socket.as_ref().ok_or(TransportError::NotConnected)?;
        if timeout.is_zero() {
            return Err(TransportError::Timeout);
        }
        socket.set_read_timeout(Some(timeout))?;

        let mut buf = vec![0u8; MAX_DATAGRAM];
        let n = socket.recv(&mut buf).map_err(TransportError::from_io)?;
        buf.truncate(n);
        trace!("Received {} byte datagram from {}", n, self.addr);
        Ok(buf)
    }

    fn disconnect(&mut self) {
        if self.socket.take().is_some() {
            info!("Closed UDP link to {}", self.addr);
        }
    }

    fn is_connected(&self) -> bool {
        self.socket.is_some()
    }
}
