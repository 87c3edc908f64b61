//! Reply framing for stream links
//!
//! TCP and serial links deliver bytes in arbitrary chunks. Replies are
//! delimited by a terminator (the `>` prompt or a newline), so bytes are
//! accumulated until one appears. Anything after the terminator belongs to
//! the next reply and stays buffered.

use std::io::Read;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::error::TransportError;

/// Accumulates stream bytes and splits off complete replies
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: Vec<u8>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Remove and return everything up to and including `terminator`
    ///
    /// An empty terminator returns whatever is buffered, if anything.
    pub fn take_frame(&mut self, terminator: &[u8]) -> Option<Vec<u8>> {
        if terminator.is_empty() {
            if self.buf.is_empty() {
                return None;
            }
            return Some(std::mem::take(&mut self.buf));
        }
        let end = find(&self.buf, terminator)? + terminator.len();
        let rest = self.buf.split_off(end);
        Some(std::mem::replace(&mut self.buf, rest))
    }

    /// Drop buffered bytes
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Read from `reader` until a frame is complete or `timeout` elapses
///
/// `set_timeout` is called before every read with the time remaining, so
/// the overall wait never exceeds `timeout`.
pub fn read_frame<R, F>(
    reader: &mut R,
    frames: &mut FrameBuffer,
    terminator: &[u8],
    timeout: Duration,
    mut set_timeout: F,
) -> Result<Vec<u8>, TransportError>
where
    R: Read + ?Sized,
    F: FnMut(&mut R, Duration) -> Result<(), TransportError>,
{
    if let Some(frame) = frames.take_frame(terminator) {
        return Ok(frame);
    }

    let deadline = Instant::now() + timeout;
    let mut chunk = [0u8; 1024];
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            trace!("Timed out with {} byte(s) buffered", frames.len());
            return Err(TransportError::Timeout);
        }
        set_timeout(reader, remaining)?;

        match reader.read(&mut chunk) {
            Ok(0) => return Err(TransportError::Closed),
            Ok(n) => {
                trace!("Received {} byte(s): {:?}", n, String::from_utf8_lossy(&chunk[..n]));
                frames.push(&chunk[..n]);
                if let Some(frame) = frames.take_frame(terminator) {
                    return Ok(frame);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(TransportError::from_io(e)),
        }
    }
}
