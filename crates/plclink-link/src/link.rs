use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use plclink_fault::{codes, FaultRegister};
use plclink_frame::{Formatter, Frame, FrameConfig, FrameReader, ProtocolError, SendOutcome};
use plclink_transport::{LineError, Receiver, Sender, TransportError};
use tracing::{debug, info, warn};

use crate::dispatcher::{dispatch, Delivery, Mailbox};
use crate::error::{LinkError, Result};

/// Behaviour of one link.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    pub frame: FrameConfig,
    /// Dispatch an `Inbound::Error` when the receive window expires.
    /// The `RECEIVE_TIMEOUT` fault is raised either way. Default: true.
    pub dispatch_timeouts: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            dispatch_timeouts: true,
        }
    }
}

/// Counters kept by a link over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub frames: u64,
    pub errors: u64,
    pub dropped: u64,
    pub sent: u64,
    pub skipped: u64,
}

/// Fault code raised for a receive-side error.
pub fn fault_for_error(err: &ProtocolError) -> u8 {
    match err {
        ProtocolError::ChecksumMismatch { .. } => codes::CHECKSUM_MISMATCH,
        ProtocolError::UnknownFrameType(_) => codes::UNKNOWN_MESSAGE,
        ProtocolError::PayloadTooLong { .. } => codes::PAYLOAD_TOO_LONG,
        ProtocolError::Timeout(_) => codes::RECEIVE_TIMEOUT,
        ProtocolError::Line(LineError::Overrun) => codes::SERIAL_OVERRUN,
        ProtocolError::Line(LineError::Parity) => codes::SERIAL_PARITY,
        ProtocolError::Line(LineError::Framing) => codes::SERIAL_FRAMING,
        ProtocolError::Line(LineError::Break) => codes::SERIAL_BREAK,
        ProtocolError::Transport(_) => codes::LINK_CLOSED,
    }
}

/// One serial channel to the PLC.
///
/// Frames read from the transport are dispatched to a [`Mailbox`]; every
/// error, drop and skipped send is recorded in the shared fault register.
pub struct Link<T> {
    name: String,
    reader: FrameReader<T>,
    formatter: Formatter,
    faults: Arc<FaultRegister>,
    dispatch_timeouts: bool,
    stats: LinkStats,
}

impl<T: Receiver + Sender> Link<T> {
    pub fn new(name: impl Into<String>, transport: T, faults: Arc<FaultRegister>) -> Self {
        Self::with_config(name, transport, faults, LinkConfig::default())
    }

    pub fn with_config(
        name: impl Into<String>,
        transport: T,
        faults: Arc<FaultRegister>,
        config: LinkConfig,
    ) -> Self {
        Self {
            name: name.into(),
            reader: FrameReader::with_config(transport, config.frame.clone()),
            formatter: Formatter::new(config.frame),
            faults,
            dispatch_timeouts: config.dispatch_timeouts,
            stats: LinkStats::default(),
        }
    }

    /// Read one frame or error and hand it to `mailbox`.
    ///
    /// Protocol errors are dispatched as `Inbound::Error` and return `Ok`.
    /// Returns `Ok(None)` when nothing was dispatched (an expired receive
    /// window with `dispatch_timeouts` off). Only transport failure ends in
    /// `Err`, after raising `LINK_CLOSED`.
    pub fn receive_into<M: Mailbox + ?Sized>(
        &mut self,
        mailbox: &M,
    ) -> Result<Option<Delivery>> {
        let event = match self.reader.read_frame() {
            Err(ProtocolError::Transport(err)) => {
                self.stats.errors += 1;
                self.faults.set(codes::LINK_CLOSED)?;
                warn!(link = %self.name, %err, "transport failed");
                return Err(err.into());
            }
            event => event,
        };

        match &event {
            Ok(_) => self.stats.frames += 1,
            Err(err) => {
                self.stats.errors += 1;
                self.faults.set(fault_for_error(err))?;
                match err {
                    ProtocolError::Timeout(_) if !self.dispatch_timeouts => {
                        debug!(link = %self.name, "receive window expired");
                        return Ok(None);
                    }
                    ProtocolError::ChecksumMismatch { .. } => {
                        warn!(link = %self.name, %err, "frame rejected");
                    }
                    _ => debug!(link = %self.name, %err, "receive error"),
                }
            }
        }

        let delivery = dispatch(event, mailbox);
        if delivery == Delivery::Dropped {
            self.stats.dropped += 1;
            self.faults.set(codes::MAILBOX_FULL)?;
        }
        Ok(Some(delivery))
    }

    /// Format and queue one frame, then push it toward the wire.
    ///
    /// A full transmit queue raises `SEND_SKIPPED` and reports
    /// [`SendOutcome::Skipped`]. An oversized payload raises
    /// `PAYLOAD_TOO_LONG` and fails.
    pub fn send(&mut self, frame: &Frame) -> Result<SendOutcome> {
        let transport = self.reader.get_mut();
        let outcome = match self.formatter.send(transport, frame) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.faults.set(fault_for_error(&err))?;
                return Err(err.into());
            }
        };

        match outcome {
            SendOutcome::Queued => {
                self.stats.sent += 1;
                if let Err(err) = self.reader.get_mut().flush() {
                    self.faults.set(codes::LINK_CLOSED)?;
                    return Err(err.into());
                }
            }
            SendOutcome::Skipped => {
                self.stats.skipped += 1;
                self.faults.set(codes::SEND_SKIPPED)?;
            }
        }
        Ok(outcome)
    }

    pub fn send_ack(&mut self) -> Result<SendOutcome> {
        self.send(&Frame::Ack)
    }

    /// `code` is local bookkeeping; the wire carries a bare NAK.
    pub fn send_nak(&mut self, code: Option<u8>) -> Result<SendOutcome> {
        self.send(&Frame::nak(code))
    }

    pub fn send_data(&mut self, msg_type: u8, payload: &[u8]) -> Result<SendOutcome> {
        self.send(&Frame::data(msg_type, Bytes::copy_from_slice(payload)))
    }

    /// Receive until `running` is cleared or the transport closes.
    ///
    /// Returns the link counters. A closed transport is a normal end;
    /// other transport failures are returned.
    pub fn run<M: Mailbox + ?Sized>(
        &mut self,
        mailbox: &M,
        running: &AtomicBool,
    ) -> Result<LinkStats> {
        info!(link = %self.name, payload_len = self.config().payload_len, "link started");

        while running.load(Ordering::Relaxed) {
            match self.receive_into(mailbox) {
                Ok(_) => {}
                Err(LinkError::Transport(TransportError::Closed)) => break,
                Err(err) => {
                    info!(link = %self.name, %err, "link stopped");
                    return Err(err);
                }
            }
        }

        info!(
            link = %self.name,
            frames = self.stats.frames,
            errors = self.stats.errors,
            "link stopped"
        );
        Ok(self.stats)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    pub fn faults(&self) -> &Arc<FaultRegister> {
        &self.faults
    }

    pub fn config(&self) -> &FrameConfig {
        self.reader.config()
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        self.reader.get_ref()
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        self.reader.get_mut()
    }

    /// Consume the link and return the transport.
    pub fn into_inner(self) -> T {
        self.reader.into_inner()
    }
}

impl<T> std::fmt::Debug for Link<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link")
            .field("name", &self.name)
            .field("reader", &self.reader)
            .field("stats", &self.stats)
            .finish()
    }
}
