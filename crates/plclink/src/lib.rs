//! Serial link between a host controller and a PLC.
//!
//! Checksummed framing, arrival-ordered dispatch to the application and a
//! latched fault register that supervisory clients poll.
//!
//! # Crate Structure
//!
//! - [`transport`]: receive/send collaborators, bounded queues, stream ports
//! - [`frame`]: control bytes, checksum codec, reassembler, reader and writer
//! - [`fault`]: the 64-code fault register
//! - [`link`]: dispatcher, mailbox and the per-channel `Link`

/// Re-export transport types.
pub mod transport {
    pub use plclink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use plclink_frame::*;
}

/// Re-export fault register types.
pub mod fault {
    pub use plclink_fault::*;
}

/// Re-export link types.
pub mod link {
    pub use plclink_link::*;
}
