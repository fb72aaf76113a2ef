//! Error types for instruction encoding and decoding.

use thiserror::Error;

use crate::Opcode;

/// Errors raised while writing an instruction into a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// The operand list does not match the opcode's format.
    #[error("{opcode} expects {expected} operands, got {actual}")]
    OperandCount {
        opcode: Opcode,
        expected: usize,
        actual: usize,
    },

    /// An operand value does not fit its field.
    #[error("operand {index} of {opcode} ({value}) does not fit in {bits} bits")]
    OperandOutOfRange {
        opcode: Opcode,
        index: usize,
        value: i64,
        bits: u32,
    },

    /// The destination slice is shorter than the instruction.
    #[error("{opcode} needs {needed} bytes, destination has {available}")]
    BufferTooShort {
        opcode: Opcode,
        needed: usize,
        available: usize,
    },

    /// The opcode has no immediate field to patch.
    #[error("{opcode} has no immediate operand")]
    NoImmediate { opcode: Opcode },
}

/// Errors raised while reading an instruction from a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// `offset` is past the end of the buffer.
    #[error("offset {offset} is outside a {len}-byte buffer")]
    OutOfBounds { offset: usize, len: usize },

    /// The byte at `offset` is not a known opcode.
    #[error("invalid opcode 0x{byte:02x} at offset {offset}")]
    InvalidOpcode { byte: u8, offset: usize },

    /// The instruction runs past the end of the buffer.
    #[error("truncated {opcode} at offset {offset}: needs {needed} bytes, {available} left")]
    Truncated {
        opcode: Opcode,
        offset: usize,
        needed: usize,
        available: usize,
    },
}
