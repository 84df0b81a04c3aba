use bytes::{Bytes, BytesMut};
use plclink_transport::{Sender, TransportError};
use tracing::{debug, trace};

use crate::codec::{encode_frame, Frame, FrameConfig};
use crate::error::Result;

const INITIAL_BUFFER_CAPACITY: usize = 32;

/// What happened to an outgoing frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The frame is in the transmit queue.
    Queued,
    /// The transmit queue had no free slot; the frame was dropped.
    Skipped,
}

/// Formats frames and hands them to a [`Sender`], fire-and-forget.
///
/// Nothing is retried. A full transmit queue drops the frame and reports
/// [`SendOutcome::Skipped`]; the caller's own timeout covers the loss.
#[derive(Debug, Clone)]
pub struct Formatter {
    buf: BytesMut,
    config: FrameConfig,
}

impl Formatter {
    pub fn new(config: FrameConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Wire bytes for `frame`. Oversized payloads fail before anything is produced.
    pub fn format(&mut self, frame: &Frame) -> Result<Bytes> {
        self.buf.clear();
        encode_frame(frame, self.config.payload_len, &mut self.buf)?;
        Ok(self.buf.split().freeze())
    }

    /// Format `frame` and enqueue it on `sender` if a slot is free.
    pub fn send<S: Sender + ?Sized>(
        &mut self,
        sender: &mut S,
        frame: &Frame,
    ) -> Result<SendOutcome> {
        let bytes = self.format(frame)?;

        if sender.send_capacity() == 0 {
            debug!(kind = frame.kind(), "transmit queue full, frame skipped");
            return Ok(SendOutcome::Skipped);
        }

        match sender.enqueue(&bytes) {
            Ok(()) => {
                trace!(kind = frame.kind(), len = bytes.len(), "frame queued");
                Ok(SendOutcome::Queued)
            }
            // Capacity can vanish between the check and the push.
            Err(TransportError::BufferFull { .. }) => {
                debug!(kind = frame.kind(), "transmit queue full, frame skipped");
                Ok(SendOutcome::Skipped)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(FrameConfig::default())
    }
}

/// Writes frames to a [`Sender`].
pub struct FrameWriter<S> {
    inner: S,
    formatter: Formatter,
}

impl<S: Sender> FrameWriter<S> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: S) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: S, config: FrameConfig) -> Self {
        Self {
            inner,
            formatter: Formatter::new(config),
        }
    }

    /// Format and enqueue one frame.
    pub fn send(&mut self, frame: &Frame) -> Result<SendOutcome> {
        self.formatter.send(&mut self.inner, frame)
    }

    /// Enqueue an ACK.
    pub fn send_ack(&mut self) -> Result<SendOutcome> {
        self.send(&Frame::Ack)
    }

    /// Enqueue a NAK. `code` is recorded locally only; the wire carries a bare NAK.
    pub fn send_nak(&mut self, code: Option<u8>) -> Result<SendOutcome> {
        self.send(&Frame::nak(code))
    }

    /// Enqueue a data frame.
    pub fn send_data(&mut self, msg_type: u8, payload: &[u8]) -> Result<SendOutcome> {
        self.send(&Frame::data(msg_type, Bytes::copy_from_slice(payload)))
    }

    /// Flush the underlying sender.
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush().map_err(Into::into)
    }

    /// Borrow the underlying sender.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Mutably borrow the underlying sender.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consume the writer and return the inner sender.
    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        self.formatter.config()
    }
}

impl<S> std::fmt::Debug for FrameWriter<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameWriter")
            .field("formatter", &self.formatter)
            .finish()
    }
}
