//! Immediate width classes.
//!
//! Width classes drive format selection: the emitter classifies a register
//! index or a branch distance into the smallest class that holds it, then
//! picks the opcode variant whose field is at least that wide.

use std::fmt;

/// Bit width class of an operand field.
///
/// Ordered from narrowest to widest so classes compare with `<`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BitImmSize {
    Bitsize4,
    Bitsize8,
    Bitsize16,
    Bitsize32,
    Bitsize64,
}

impl BitImmSize {
    /// Number of bits in this class.
    pub const fn bits(self) -> u32 {
        match self {
            BitImmSize::Bitsize4 => 4,
            BitImmSize::Bitsize8 => 8,
            BitImmSize::Bitsize16 => 16,
            BitImmSize::Bitsize32 => 32,
            BitImmSize::Bitsize64 => 64,
        }
    }

    /// Class for a field of `bits` width, if one exists.
    pub const fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            4 => Some(BitImmSize::Bitsize4),
            8 => Some(BitImmSize::Bitsize8),
            16 => Some(BitImmSize::Bitsize16),
            32 => Some(BitImmSize::Bitsize32),
            64 => Some(BitImmSize::Bitsize64),
            _ => None,
        }
    }
}

impl fmt::Display for BitImmSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}

/// Smallest signed class holding `value`.
///
/// Values outside the `i32` range classify as [`BitImmSize::Bitsize64`];
/// no branch encoding can reach them.
pub fn get_bit_length_signed(value: i64) -> BitImmSize {
    if (-8..=7).contains(&value) {
        BitImmSize::Bitsize4
    } else if (i8::MIN as i64..=i8::MAX as i64).contains(&value) {
        BitImmSize::Bitsize8
    } else if (i16::MIN as i64..=i16::MAX as i64).contains(&value) {
        BitImmSize::Bitsize16
    } else if (i32::MIN as i64..=i32::MAX as i64).contains(&value) {
        BitImmSize::Bitsize32
    } else {
        BitImmSize::Bitsize64
    }
}

/// Smallest unsigned class holding `value`.
///
/// Register indices are at most 16 bits wide, so the result is one of
/// 4, 8 or 16.
pub fn get_bit_length_unsigned(value: u16) -> BitImmSize {
    match u16::BITS - value.leading_zeros() {
        0..=4 => BitImmSize::Bitsize4,
        5..=8 => BitImmSize::Bitsize8,
        _ => BitImmSize::Bitsize16,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_boundaries() {
        assert_eq!(get_bit_length_signed(0), BitImmSize::Bitsize4);
        assert_eq!(get_bit_length_signed(7), BitImmSize::Bitsize4);
        assert_eq!(get_bit_length_signed(-8), BitImmSize::Bitsize4);
        assert_eq!(get_bit_length_signed(8), BitImmSize::Bitsize8);
        assert_eq!(get_bit_length_signed(-9), BitImmSize::Bitsize8);
        assert_eq!(get_bit_length_signed(127), BitImmSize::Bitsize8);
        assert_eq!(get_bit_length_signed(-128), BitImmSize::Bitsize8);
        assert_eq!(get_bit_length_signed(128), BitImmSize::Bitsize16);
        assert_eq!(get_bit_length_signed(-129), BitImmSize::Bitsize16);
        assert_eq!(get_bit_length_signed(32767), BitImmSize::Bitsize16);
        assert_eq!(get_bit_length_signed(32768), BitImmSize::Bitsize32);
        assert_eq!(get_bit_length_signed(i32::MIN as i64), BitImmSize::Bitsize32);
        assert_eq!(
            get_bit_length_signed(i32::MAX as i64 + 1),
            BitImmSize::Bitsize64
        );
    }

    #[test]
    fn unsigned_boundaries() {
        assert_eq!(get_bit_length_unsigned(0), BitImmSize::Bitsize4);
        assert_eq!(get_bit_length_unsigned(15), BitImmSize::Bitsize4);
        assert_eq!(get_bit_length_unsigned(16), BitImmSize::Bitsize8);
        assert_eq!(get_bit_length_unsigned(255), BitImmSize::Bitsize8);
        assert_eq!(get_bit_length_unsigned(256), BitImmSize::Bitsize16);
        assert_eq!(get_bit_length_unsigned(u16::MAX), BitImmSize::Bitsize16);
    }

    #[test]
    fn classes_are_ordered() {
        assert!(BitImmSize::Bitsize4 < BitImmSize::Bitsize8);
        assert!(BitImmSize::Bitsize16 < BitImmSize::Bitsize32);
        assert_eq!(BitImmSize::from_bits(16), Some(BitImmSize::Bitsize16));
        assert_eq!(BitImmSize::from_bits(12), None);
    }
}
