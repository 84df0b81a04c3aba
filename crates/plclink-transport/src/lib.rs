//! Serial transport collaborators for plclink.
//!
//! The protocol engine never touches a UART directly. It consumes:
//! - a [`Receiver`] that hands over received byte chunks, with a timeout
//! - a [`Sender`] that reports free queue slots and accepts formatted frames
//!
//! This crate provides those traits plus two implementations: an in-memory
//! [`QueueLink`] pair and a [`StreamPort`] over any byte stream (a Unix
//! socket bridged to a serial tty on a host).

pub mod error;
pub mod queue;
pub mod stream;
pub mod traits;

pub use error::{Result, TransportError};
pub use queue::{BoundedQueue, QueueLink};
pub use stream::{ReadTimeout, StreamConfig, StreamPort};
pub use traits::{ByteChunk, LineError, Receiver, Sender};
