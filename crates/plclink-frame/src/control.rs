//! Control bytes of the PLC serial protocol.
//!
//! ACK and NAK travel alone. STX opens a data frame; there is no end
//! delimiter, the receiver counts bytes instead.

/// Start of a data frame.
pub const STX: u8 = 0x02;

/// Positive acknowledgement.
pub const ACK: u8 = 0x06;

/// Negative acknowledgement.
pub const NAK: u8 = 0x15;

/// Returns a human-readable name for a control byte.
pub fn control_name(byte: u8) -> Option<&'static str> {
    match byte {
        STX => Some("STX"),
        ACK => Some("ACK"),
        NAK => Some("NAK"),
        _ => None,
    }
}

/// Returns true if the byte has protocol meaning outside a payload.
pub fn is_control(byte: u8) -> bool {
    matches!(byte, STX | ACK | NAK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_bytes_are_named() {
        assert_eq!(control_name(0x02), Some("STX"));
        assert_eq!(control_name(0x06), Some("ACK"));
        assert_eq!(control_name(0x15), Some("NAK"));
        assert_eq!(control_name(b'A'), None);
        assert!(is_control(NAK) && !is_control(0x03));
    }
}
