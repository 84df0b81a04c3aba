//! Sum-mod-256 checksum carried as two uppercase ASCII hex digits.
//!
//! The sum covers the type byte and the payload, never STX or the digits
//! themselves.

/// Number of ASCII digits the checksum occupies on the wire.
pub const CHECKSUM_DIGITS: usize = 2;

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// Low 8 bits of the sum of `msg_type` and every payload byte.
pub fn compute(msg_type: u8, payload: &[u8]) -> u8 {
    payload
        .iter()
        .fold(msg_type, |sum, &byte| sum.wrapping_add(byte))
}

/// Render a checksum as two zero-padded uppercase hex digits.
pub fn render(checksum: u8) -> [u8; CHECKSUM_DIGITS] {
    [
        HEX_UPPER[usize::from(checksum >> 4)],
        HEX_UPPER[usize::from(checksum & 0x0F)],
    ]
}

/// Parse two uppercase hex digits.
///
/// Lowercase is refused: the sender always renders uppercase, and a
/// single flipped case bit must not turn a corrupt frame into a valid one.
pub fn parse(digits: &[u8]) -> Option<u8> {
    match digits {
        [hi, lo] => Some((hex_value(*hi)? << 4) | hex_value(*lo)?),
        _ => None,
    }
}

/// True if `claimed` is exactly two hex digits equal to `compute(msg_type, payload)`.
pub fn verify(msg_type: u8, payload: &[u8], claimed: &[u8]) -> bool {
    parse(claimed) == Some(compute(msg_type, payload))
}

fn hex_value(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn compute_wraps_modulo_256() {
        assert_eq!(compute(0x31, &[]), 0x31);
        assert_eq!(compute(0xFF, &[0x01]), 0x00);
        assert_eq!(compute(0x80, &[0x80, 0x80]), 0x80);
    }

    #[test]
    fn render_is_uppercase_and_zero_padded() {
        assert_eq!(&render(0x00), b"00");
        assert_eq!(&render(0x0A), b"0A");
        assert_eq!(&render(0xAB), b"AB");
        assert_eq!(&render(0xFF), b"FF");
    }

    #[test]
    fn known_deployed_frame() {
        // '1' + "ABCDEFG" = 0x31 + 0x1DC = 0x20D
        let payload = b"ABCDEFG";
        assert_eq!(compute(b'1', payload), 0x0D);
        assert!(verify(b'1', payload, b"0D"));
    }

    #[test]
    fn parse_rejects_wrong_length_and_non_hex() {
        assert_eq!(parse(b"0"), None);
        assert_eq!(parse(b"000"), None);
        assert_eq!(parse(b"G0"), None);
        assert_eq!(parse(b" 1"), None);
        assert_eq!(parse(b"7F"), Some(0x7F));
    }

    #[test]
    fn parse_rejects_lowercase() {
        assert_eq!(parse(b"ab"), None);
        assert!(!verify(0xAB, &[], b"ab"));
        assert!(verify(0xAB, &[], b"AB"));
    }

    proptest! {
        #[test]
        fn rendered_checksum_verifies(
            msg_type in any::<u8>(),
            payload in proptest::collection::vec(any::<u8>(), 0..=16),
        ) {
            let digits = render(compute(msg_type, &payload));
            prop_assert!(verify(msg_type, &payload, &digits));
        }

        #[test]
        fn single_bit_corruption_of_digits_fails(
            msg_type in any::<u8>(),
            payload in proptest::collection::vec(any::<u8>(), 0..=7),
            digit in 0usize..CHECKSUM_DIGITS,
            bit in 0u8..8,
        ) {
            let mut digits = render(compute(msg_type, &payload));
            digits[digit] ^= 1 << bit;
            prop_assert!(!verify(msg_type, &payload, &digits));
        }
    }
}
