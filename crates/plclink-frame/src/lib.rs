//! Checksummed framing for the PLC serial link.
//!
//! The protocol engine of plclink. Three frame shapes share the line:
//! - `ACK` (0x06) and `NAK` (0x15), one byte each
//! - data frames: `STX`, a type byte, a fixed-length payload and two
//!   uppercase hex digits holding the sum of type and payload modulo 256
//!
//! Data frames carry no end delimiter. The [`Reassembler`] counts bytes
//! after STX and verifies the checksum when the configured length is reached.

pub mod checksum;
pub mod codec;
pub mod control;
pub mod error;
pub mod reader;
pub mod reassembler;
pub mod writer;

pub use codec::{
    encode_frame, format_outgoing, Frame, FrameConfig, Message, DEFAULT_PAYLOAD_LEN,
    DEFAULT_RECEIVE_TIMEOUT,
};
pub use control::{ACK, NAK, STX};
pub use error::{ProtocolError, Result};
pub use reader::FrameReader;
pub use reassembler::{Event, Reassembler};
pub use writer::{FrameWriter, Formatter, SendOutcome};
