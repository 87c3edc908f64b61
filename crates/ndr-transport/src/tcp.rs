//! TCP command link
//!
//! The positional radios listen for commands on a TCP port and answer each
//! one with reply lines followed by a `>` prompt.

use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::framing::{read_frame, FrameBuffer};
use crate::{ConnectionMode, Transport};

/// Blocking TCP transport
#[derive(Debug)]
pub struct TcpTransport {
    stream: Option<TcpStream>,
    addr: String,
    frames: FrameBuffer,
}

impl TcpTransport {
    /// Connect to `host:port`, giving up after `timeout`
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, TransportError> {
        let addr = format!("{}:{}", host, port);
        let target = resolve(&addr)?;
        debug!("Connecting to {} (timeout {:?})", addr, timeout);

        let stream = TcpStream::connect_timeout(&target, timeout).map_err(|e| {
            TransportError::ConnectFailed {
                address: addr.clone(),
                reason: e.to_string(),
            }
        })?;
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY on {}: {}", addr, e);
        }
        stream.set_write_timeout(Some(timeout))?;

        info!("Connected to {}", addr);
        Ok(Self::from_stream(stream, addr))
    }

    /// Wrap an already-connected stream
    pub fn from_stream(stream: TcpStream, addr: String) -> Self {
        Self {
            stream: Some(stream),
            addr,
            frames: FrameBuffer::new(),
        }
    }

    /// Address this transport was connected to
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

pub(crate) fn resolve(addr: &str) -> Result<SocketAddr, TransportError> {
    addr.to_socket_addrs()
        .map_err(|e| TransportError::InvalidAddress(format!("{}: {}", addr, e)))?
        .next()
        .ok_or_else(|| TransportError::InvalidAddress(addr.to_string()))
}

impl Transport for TcpTransport {
    fn mode(&self) -> ConnectionMode {
        ConnectionMode::Tcp
    }

    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        // Replies to an abandoned command must not be read as ours
        self.frames.clear();
        stream.write_all(data).map_err(TransportError::from_io)?;
        stream.flush().map_err(TransportError::from_io)?;
        Ok(())
    }

    fn receive(&mut self, terminator: &[u8], timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        let result = read_frame(stream, &mut self.frames, terminator, timeout, |s, t| {
            s.set_read_timeout(Some(t)).map_err(TransportError::Io)
        });
        if matches!(result, Err(TransportError::Closed)) {
            warn!("{} closed the connection", self.addr);
            self.stream = None;
        }
        result
    }

    fn disconnect(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.shutdown(Shutdown::Both) {
                debug!("Shutdown of {} failed: {}", self.addr, e);
            }
            info!("Disconnected from {}", self.addr);
        }
        self.frames.clear();
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;
    use std::thread;

    fn listener() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    #[test]
    fn test_send_and_receive_prompted_reply() {
        let (listener, port) = listener();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            assert_eq!(line, "FRQ? 3\n");
            let mut stream = stream;
            stream.write_all(b"FRQ 3, 2450\r\n").unwrap();
            stream.write_all(b">").unwrap();
        });

        let mut transport =
            TcpTransport::connect("127.0.0.1", port, Duration::from_secs(2)).unwrap();
        transport.send(b"FRQ? 3\n").unwrap();
        let reply = transport.receive(b">", Duration::from_secs(2)).unwrap();
        assert_eq!(reply, b"FRQ 3, 2450\r\n>");
        server.join().unwrap();
    }

    #[test]
    fn test_receive_times_out() {
        let (listener, port) = listener();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_millis(300));
            drop(stream);
        });

        let mut transport =
            TcpTransport::connect("127.0.0.1", port, Duration::from_secs(2)).unwrap();
        let err = transport
            .receive(b">", Duration::from_millis(50))
            .unwrap_err();
        assert!(err.is_timeout());
        server.join().unwrap();
    }

    #[test]
    fn test_disconnect_then_send_fails() {
        let (listener, port) = listener();
        let server = thread::spawn(move || {
            let _ = listener.accept().unwrap();
        });
        let mut transport =
            TcpTransport::connect("127.0.0.1", port, Duration::from_secs(2)).unwrap();
        transport.disconnect();
        assert!(!transport.is_connected());
        assert!(matches!(
            transport.send(b"STAT?\n"),
            Err(TransportError::NotConnected)
        ));
        server.join().unwrap();
    }

    #[test]
    fn test_connect_refused() {
        let (listener, port) = listener();
        drop(listener);
        let err = TcpTransport::connect("127.0.0.1", port, Duration::from_millis(500)).unwrap_err();
        assert!(matches!(err, TransportError::ConnectFailed { .. }));
    }
}
