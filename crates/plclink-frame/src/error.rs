use std::time::Duration;

use plclink_transport::{LineError, TransportError};

/// Errors produced while framing or reassembling PLC messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The checksum digits do not match the frame contents.
    #[error("checksum mismatch (computed {computed:02X}, frame claims {claimed:?})")]
    ChecksumMismatch { computed: u8, claimed: String },

    /// A byte outside any frame is neither ACK, NAK nor STX.
    #[error("unknown frame type byte 0x{0:02X}")]
    UnknownFrameType(u8),

    /// A data payload exceeds the configured bound.
    #[error("payload too long ({len} bytes, max {max})")]
    PayloadTooLong { len: usize, max: usize },

    /// No complete frame arrived before the receive deadline.
    #[error("no complete frame within {0:?}")]
    Timeout(Duration),

    /// The UART flagged the received bytes.
    #[error("serial line error: {0}")]
    Line(LineError),

    /// The transport failed or closed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
