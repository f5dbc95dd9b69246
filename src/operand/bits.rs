//! Bit-field codec for the 16-bit operand word.
//!
//! Every operand argument and every computed arity owns an inclusive
//! `[start, end]` slice of the word. `pack` writes into one slice and leaves
//! the rest of the word untouched; `unpack` reads a slice back out.

use std::fmt;

use crate::error::{OperandError, OperandResult};

/// Width of the operand word in bits
pub const WORD_BITS: u8 = 16;

/// Inclusive bit range `[start, end]` within the operand word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitRange {
    start: u8,
    end: u8,
}

impl BitRange {
    /// Create a bit range, rejecting reversed ranges and positions past bit 15
    pub fn new(start: u8, end: u8) -> OperandResult<Self> {
        if start > end {
            return Err(OperandError::Range(format!(
                "bit range [{}, {}] has start after end",
                start, end
            )));
        }
        if end >= WORD_BITS {
            return Err(OperandError::Range(format!(
                "bit range [{}, {}] exceeds the {}-bit operand word",
                start, end, WORD_BITS
            )));
        }
        Ok(BitRange { start, end })
    }

    pub fn start(&self) -> u8 {
        self.start
    }

    pub fn end(&self) -> u8 {
        self.end
    }

    /// Number of bits in the range (1..=16)
    pub fn width(&self) -> u8 {
        self.end - self.start + 1
    }

    /// Largest value the range can hold
    pub fn max_value(&self) -> u16 {
        (((1u32 << self.width()) - 1) & 0xFFFF) as u16
    }

    /// Mask selecting the range's bits in place
    pub fn mask(&self) -> u16 {
        self.max_value() << self.start
    }

    /// Whether the two ranges share at least one bit position
    pub fn overlaps(&self, other: &BitRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

impl fmt::Display for BitRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Write `value` into `bits` of `word`, preserving all other bits
pub fn pack(word: u16, bits: BitRange, value: i64) -> OperandResult<u16> {
    let max = bits.max_value();
    if value < 0 || value > max as i64 {
        return Err(OperandError::Range(format!(
            "value {} does not fit in bits {} (max {})",
            value, bits, max
        )));
    }
    let mask = bits.mask();
    Ok((word & !mask) | (((value as u16) << bits.start) & mask))
}

/// Extract the unsigned value stored in `bits` of `word`
#[inline]
pub fn unpack(word: u16, bits: BitRange) -> u16 {
    (word & bits.mask()) >> bits.start
}
