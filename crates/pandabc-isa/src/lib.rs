//! pandabc instruction set
//!
//! Read-only tables describing the bytecode machine, plus the per-field
//! encoder and a decoder view used by tests and the disassembler.
//!
//! ## Modules
//!
//! - [`width`]: Immediate width classes and value classification
//! - [`format`]: Instruction formats and operand fields
//! - [`opcode`]: The opcode table
//! - [`jump`]: Jump families, widening and condition inversion
//! - [`instruction`]: Encoder, decoder view and disassembler

mod error;
pub mod format;
pub mod instruction;
pub mod jump;
pub mod opcode;
pub mod width;

pub use error::{DecodeError, EncodeError};
pub use format::{Field, FieldKind, Format};
pub use instruction::{Instruction, InstructionIter, disassemble, encode, patch_imm};
pub use jump::{
    JumpFamily, get_longest_jump, get_suitable_jump, max_footprint, revert_condition_code,
};
pub use opcode::{Opcode, OpcodeFlags};
pub use width::{BitImmSize, get_bit_length_signed, get_bit_length_unsigned};
