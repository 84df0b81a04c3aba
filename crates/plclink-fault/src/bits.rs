use std::fmt;

/// Number of 16-bit words in the register.
pub const FAULT_WORDS: usize = 4;

/// Bits per register word.
pub const WORD_BITS: usize = 16;

/// Highest valid fault code. Codes are 1-based.
pub const MAX_FAULT_CODE: u8 = (FAULT_WORDS * WORD_BITS) as u8;

/// Returns true if `code` names a bit in the register.
pub fn is_valid_code(code: u8) -> bool {
    (1..=MAX_FAULT_CODE).contains(&code)
}

/// A set of fault codes, stored as four 16-bit words.
///
/// Code `c` lives in word `(c - 1) / 16`, bit `(c - 1) % 16`. Out-of-range
/// codes are never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FaultBits([u16; FAULT_WORDS]);

impl FaultBits {
    /// No faults.
    pub const EMPTY: Self = Self([0; FAULT_WORDS]);

    pub fn from_words(words: [u16; FAULT_WORDS]) -> Self {
        Self(words)
    }

    /// The four words, lowest codes first.
    pub fn words(&self) -> [u16; FAULT_WORDS] {
        self.0
    }

    /// Pack into one integer; code `c` is bit `c - 1`.
    pub fn as_u64(&self) -> u64 {
        self.0
            .iter()
            .enumerate()
            .fold(0u64, |acc, (i, &word)| {
                acc | (u64::from(word) << (i * WORD_BITS))
            })
    }

    pub fn from_u64(value: u64) -> Self {
        let mut words = [0u16; FAULT_WORDS];
        for (i, word) in words.iter_mut().enumerate() {
            *word = (value >> (i * WORD_BITS)) as u16;
        }
        Self(words)
    }

    /// Set `code`. Returns false, changing nothing, if the code is out of range.
    pub fn set_bit(&mut self, code: u8) -> bool {
        match locate(code) {
            Some((word, mask)) => {
                self.0[word] |= mask;
                true
            }
            None => false,
        }
    }

    /// Clear `code`. Returns false, changing nothing, if the code is out of range.
    pub fn clear_bit(&mut self, code: u8) -> bool {
        match locate(code) {
            Some((word, mask)) => {
                self.0[word] &= !mask;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, code: u8) -> bool {
        locate(code).is_some_and(|(word, mask)| self.0[word] & mask != 0)
    }

    /// Keep only the codes also present in `mask`.
    pub fn mask_and(&mut self, mask: &FaultBits) {
        for (word, keep) in self.0.iter_mut().zip(mask.0) {
            *word &= keep;
        }
    }

    /// Add every code present in `other`.
    pub fn merge(&mut self, other: &FaultBits) {
        for (word, add) in self.0.iter_mut().zip(other.0) {
            *word |= add;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&word| word == 0)
    }

    /// Number of codes set.
    pub fn count(&self) -> u32 {
        self.0.iter().map(|word| word.count_ones()).sum()
    }

    /// Set codes in ascending order.
    pub fn codes(&self) -> impl Iterator<Item = u8> + '_ {
        (1..=MAX_FAULT_CODE).filter(move |&code| self.contains(code))
    }
}

impl fmt::Display for FaultBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016X}", self.as_u64())
    }
}

fn locate(code: u8) -> Option<(usize, u16)> {
    if !is_valid_code(code) {
        return None;
    }
    let index = usize::from(code - 1);
    Some((index / WORD_BITS, 1u16 << (index % WORD_BITS)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_to_word_and_bit() {
        let mut bits = FaultBits::EMPTY;
        bits.set_bit(1);
        bits.set_bit(16);
        bits.set_bit(17);
        bits.set_bit(64);
        assert_eq!(bits.words(), [0x8001, 0x0001, 0x0000, 0x8000]);
    }

    #[test]
    fn out_of_range_codes_ignored() {
        let mut bits = FaultBits::EMPTY;
        assert!(!bits.set_bit(0));
        assert!(!bits.set_bit(65));
        assert!(!bits.clear_bit(0));
        assert!(!bits.contains(0));
        assert!(!bits.contains(65));
        assert!(bits.is_empty());
    }

    #[test]
    fn u64_packing_matches_code_order() {
        let mut bits = FaultBits::EMPTY;
        bits.set_bit(1);
        bits.set_bit(33);
        assert_eq!(bits.as_u64(), 1u64 | (1u64 << 32));
        assert_eq!(FaultBits::from_u64(bits.as_u64()), bits);
    }

    #[test]
    fn mask_and_keeps_common_codes() {
        let mut bits = FaultBits::from_u64(0b1111);
        bits.mask_and(&FaultBits::from_u64(0b1010));
        assert_eq!(bits.codes().collect::<Vec<_>>(), vec![2, 4]);
    }

    #[test]
    fn merge_and_clear() {
        let mut bits = FaultBits::from_u64(0b0001);
        bits.merge(&FaultBits::from_u64(0b0100));
        assert_eq!(bits.count(), 2);
        bits.clear_bit(1);
        assert_eq!(bits.codes().collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn display_is_fixed_width_hex() {
        let mut bits = FaultBits::EMPTY;
        bits.set_bit(5);
        assert_eq!(bits.to_string(), "0000000000000010");
    }
}
