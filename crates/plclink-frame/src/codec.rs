use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};

use crate::checksum::{self, CHECKSUM_DIGITS};
use crate::control::{ACK, NAK, STX};
use crate::error::{ProtocolError, Result};

/// Payload length of data frames in the deployed PLC configuration.
pub const DEFAULT_PAYLOAD_LEN: usize = 7;

/// Default time allowed for a complete frame to arrive.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(1);

/// A logical application message: a type byte and its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub msg_type: u8,
    pub payload: Bytes,
}

impl Message {
    /// Create a new message.
    pub fn new(msg_type: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            msg_type,
            payload: payload.into(),
        }
    }
}

/// One protocol unit exchanged over the serial link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Positive acknowledgement.
    Ack,
    /// Negative acknowledgement, with the application error code if the
    /// peer sent one. The code is never transmitted by this side.
    Nak { code: Option<u8> },
    /// Checksummed data frame.
    Data {
        msg_type: u8,
        payload: Bytes,
        checksum: u8,
    },
}

impl Frame {
    /// Build a data frame, computing its checksum.
    pub fn data(msg_type: u8, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        let checksum = checksum::compute(msg_type, &payload);
        Frame::Data {
            msg_type,
            payload,
            checksum,
        }
    }

    /// Build a NAK frame.
    pub fn nak(code: Option<u8>) -> Self {
        Frame::Nak { code }
    }

    /// Short lowercase name of the frame variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Ack => "ack",
            Frame::Nak { .. } => "nak",
            Frame::Data { .. } => "data",
        }
    }

    /// Strip framing and checksum, leaving the logical message of a data frame.
    pub fn into_message(self) -> Option<Message> {
        match self {
            Frame::Data {
                msg_type, payload, ..
            } => Some(Message { msg_type, payload }),
            Frame::Ack | Frame::Nak { .. } => None,
        }
    }

    /// Bytes this frame occupies when sent.
    pub fn wire_size(&self) -> usize {
        match self {
            Frame::Ack | Frame::Nak { .. } => 1,
            Frame::Data { payload, .. } => 2 + payload.len() + CHECKSUM_DIGITS,
        }
    }
}

/// Configuration for framing and reassembly.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Data payload length. A data frame completes after the type byte,
    /// this many payload bytes and the checksum digits. Default: 7.
    pub payload_len: usize,
    /// Time allowed for one complete frame to arrive. Default: 1 s.
    pub receive_timeout: Duration,
}

impl FrameConfig {
    /// Default configuration with a different payload length.
    pub fn with_payload_len(payload_len: usize) -> Self {
        Self {
            payload_len,
            ..Self::default()
        }
    }

    /// Bytes following STX in a complete data frame.
    pub fn frame_len(&self) -> usize {
        1 + self.payload_len + CHECKSUM_DIGITS
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            payload_len: DEFAULT_PAYLOAD_LEN,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
        }
    }
}

/// Encode a frame into its wire bytes.
///
/// Wire format:
/// ```text
/// ACK:  0x06
/// NAK:  0x15
/// Data: ┌─────┬──────┬───────────────┬─────────────────────┐
///       │ STX │ TYPE │ PAYLOAD       │ CHECKSUM            │
///       │0x02 │ (1B) │ (payload_len) │ 2 ASCII hex (HI LO) │
///       └─────┴──────┴───────────────┴─────────────────────┘
/// ```
///
/// The checksum is recomputed from the type and payload; the one stored in
/// a `Frame::Data` is not trusted.
pub fn encode_frame(frame: &Frame, max_payload: usize, dst: &mut BytesMut) -> Result<()> {
    match frame {
        Frame::Ack => dst.put_u8(ACK),
        Frame::Nak { .. } => dst.put_u8(NAK),
        Frame::Data {
            msg_type, payload, ..
        } => {
            if payload.len() > max_payload {
                return Err(ProtocolError::PayloadTooLong {
                    len: payload.len(),
                    max: max_payload,
                });
            }
            dst.reserve(frame.wire_size());
            dst.put_u8(STX);
            dst.put_u8(*msg_type);
            dst.put_slice(payload);
            dst.put_slice(&checksum::render(checksum::compute(*msg_type, payload)));
        }
    }
    Ok(())
}

/// Format an outgoing frame as a standalone buffer.
pub fn format_outgoing(frame: &Frame, config: &FrameConfig) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(frame.wire_size());
    encode_frame(frame, config.payload_len, &mut buf)?;
    Ok(buf.freeze())
}
