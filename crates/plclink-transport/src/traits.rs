use std::fmt;
use std::time::Duration;

use bytes::Bytes;

use crate::error::Result;

/// Receive error flagged by the serial interrupt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineError {
    /// The receive FIFO overflowed and bytes were lost.
    Overrun,
    /// A byte failed its parity check.
    Parity,
    /// A stop bit was missing.
    Framing,
    /// The line was held low for longer than a character time.
    Break,
}

impl LineError {
    /// Short lowercase name used in logs and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            LineError::Overrun => "overrun",
            LineError::Parity => "parity",
            LineError::Framing => "framing",
            LineError::Break => "break",
        }
    }
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A run of received bytes, as handed over by one receive call.
///
/// Bytes inside a chunk are in arrival order. A chunk carrying a
/// `line_error` came from a receive that the UART flagged; its bytes
/// should not be trusted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteChunk {
    pub bytes: Bytes,
    pub line_error: Option<LineError>,
}

impl ByteChunk {
    /// A clean chunk.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            line_error: None,
        }
    }

    /// A chunk flagged with a receive error.
    pub fn with_error(bytes: impl Into<Bytes>, error: LineError) -> Self {
        Self {
            bytes: bytes.into(),
            line_error: Some(error),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Receive side of a serial channel.
pub trait Receiver {
    /// Block until a chunk arrives or `timeout` elapses.
    ///
    /// Expiry is reported as [`TransportError::Timeout`](crate::TransportError::Timeout).
    fn receive(&mut self, timeout: Duration) -> Result<ByteChunk>;
}

/// Send side of a serial channel.
///
/// Capacity is counted in queue slots: one slot holds one formatted frame.
pub trait Sender {
    /// Number of frames that can be enqueued right now without blocking.
    fn send_capacity(&self) -> usize;

    /// Queue one formatted frame for transmission. Never blocks.
    fn enqueue(&mut self, bytes: &[u8]) -> Result<()>;

    /// Push queued frames onto the wire, where the transport buffers them.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<R: Receiver + ?Sized> Receiver for &mut R {
    fn receive(&mut self, timeout: Duration) -> Result<ByteChunk> {
        (**self).receive(timeout)
    }
}

impl<S: Sender + ?Sized> Sender for &mut S {
    fn send_capacity(&self) -> usize {
        (**self).send_capacity()
    }

    fn enqueue(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).enqueue(bytes)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}
