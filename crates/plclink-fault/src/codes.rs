//! Fault code catalogue.
//!
//! Codes 1-12 are raised by the serial link itself. Codes 13-64 belong to
//! the surrounding control system (drives, encoders, limits) and are
//! reported as `"SYSTEM"` here.

/// A fault call named a code outside 1..=64.
pub const INVALID_CODE: u8 = 1;

/// A data frame failed its checksum.
pub const CHECKSUM_MISMATCH: u8 = 2;

/// A byte outside any frame was not ACK, NAK or STX.
pub const UNKNOWN_MESSAGE: u8 = 3;

/// The PLC did not complete a frame in time.
pub const RECEIVE_TIMEOUT: u8 = 4;

/// An outgoing payload exceeded the configured bound.
pub const PAYLOAD_TOO_LONG: u8 = 5;

/// A decoded message was dropped because the consumer's mailbox was full.
pub const MAILBOX_FULL: u8 = 6;

/// An outgoing frame was dropped because the transmit queue was full.
pub const SEND_SKIPPED: u8 = 7;

/// UART receive overrun.
pub const SERIAL_OVERRUN: u8 = 8;

/// UART parity error.
pub const SERIAL_PARITY: u8 = 9;

/// UART framing error.
pub const SERIAL_FRAMING: u8 = 10;

/// Break condition on the line.
pub const SERIAL_BREAK: u8 = 11;

/// The serial transport closed or failed.
pub const LINK_CLOSED: u8 = 12;

/// First code available to the surrounding control system.
pub const SYSTEM_CODE_START: u8 = 13;

/// Returns a human-readable name for a fault code.
pub fn fault_name(code: u8) -> &'static str {
    match code {
        INVALID_CODE => "INVALID_CODE",
        CHECKSUM_MISMATCH => "CHECKSUM_MISMATCH",
        UNKNOWN_MESSAGE => "UNKNOWN_MESSAGE",
        RECEIVE_TIMEOUT => "RECEIVE_TIMEOUT",
        PAYLOAD_TOO_LONG => "PAYLOAD_TOO_LONG",
        MAILBOX_FULL => "MAILBOX_FULL",
        SEND_SKIPPED => "SEND_SKIPPED",
        SERIAL_OVERRUN => "SERIAL_OVERRUN",
        SERIAL_PARITY => "SERIAL_PARITY",
        SERIAL_FRAMING => "SERIAL_FRAMING",
        SERIAL_BREAK => "SERIAL_BREAK",
        LINK_CLOSED => "LINK_CLOSED",
        13..=64 => "SYSTEM",
        _ => "INVALID",
    }
}

/// Returns true if the code is raised by the serial link layer.
pub fn is_link_fault(code: u8) -> bool {
    (INVALID_CODE..SYSTEM_CODE_START).contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_cover_link_and_system_codes() {
        assert_eq!(fault_name(CHECKSUM_MISMATCH), "CHECKSUM_MISMATCH");
        assert_eq!(fault_name(LINK_CLOSED), "LINK_CLOSED");
        assert_eq!(fault_name(SYSTEM_CODE_START), "SYSTEM");
        assert_eq!(fault_name(64), "SYSTEM");
        assert_eq!(fault_name(0), "INVALID");
        assert_eq!(fault_name(65), "INVALID");
    }

    #[test]
    fn link_fault_range() {
        assert!(is_link_fault(INVALID_CODE));
        assert!(is_link_fault(LINK_CLOSED));
        assert!(!is_link_fault(SYSTEM_CODE_START));
        assert!(!is_link_fault(0));
    }
}
