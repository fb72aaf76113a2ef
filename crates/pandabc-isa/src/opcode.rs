//! Bytecode operation codes.
//!
//! Every opcode is one byte followed by the operand fields of its
//! [`Format`]. The table here is the single source of truth for sizes,
//! mnemonics and control-flow properties; the emitter and decoder never
//! hard-code either.

use std::fmt;

use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::format::Format;
use crate::width::BitImmSize;

bitflags! {
    /// Control-flow properties of an opcode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpcodeFlags: u8 {
        /// Transfers control to a relative offset.
        const JUMP = 1 << 0;
        /// Falls through when its condition does not hold.
        const CONDITIONAL = 1 << 1;
        /// Leaves the function.
        const RETURN = 1 << 2;
    }
}

/// Bytecode operation codes.
///
/// Accumulator-based machine: most instructions read or write the implicit
/// accumulator, registers are named `vN`. Jump offsets are relative to the
/// first byte of the jump instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Opcode {
    // =========================================================================
    // Loads, stores, moves
    // =========================================================================
    /// No operation. Also used as filler in tests.
    Nop = 0x00,
    /// acc = imm32
    Ldai = 0x01,
    /// acc = imm64 (raw f64 bits)
    Fldai = 0x02,
    /// acc = vA
    Lda = 0x03,
    /// vA = acc
    Sta = 0x04,
    /// vA = vB, 4-bit registers
    MovV4V4 = 0x05,
    /// vA = vB, 8-bit registers
    MovV8V8 = 0x06,
    /// vA = vB, 16-bit registers
    MovV16V16 = 0x07,
    /// acc = vA + acc
    Add2 = 0x08,

    // =========================================================================
    // Returns
    // =========================================================================
    /// Return the accumulator.
    Return = 0x09,
    /// Return `undefined`.
    ReturnUndefined = 0x0a,

    // =========================================================================
    // Unconditional jumps
    // =========================================================================
    JmpImm8 = 0x0b,
    JmpImm16 = 0x0c,
    JmpImm32 = 0x0d,

    // =========================================================================
    // Jumps on accumulator
    // =========================================================================
    /// Jump if acc == 0.
    JeqzImm8 = 0x0e,
    JeqzImm16 = 0x0f,
    JeqzImm32 = 0x10,
    /// Jump if acc != 0.
    JnezImm8 = 0x11,
    JnezImm16 = 0x12,
    JnezImm32 = 0x13,

    // =========================================================================
    // Jumps comparing accumulator with a register (no 32-bit forms)
    // =========================================================================
    /// Jump if acc == vA.
    JeqV8Imm8 = 0x14,
    JeqV8Imm16 = 0x15,
    /// Jump if acc != vA.
    JneV8Imm8 = 0x16,
    JneV8Imm16 = 0x17,
    /// Jump if acc < vA.
    JltV8Imm8 = 0x18,
    JltV8Imm16 = 0x19,
    /// Jump if acc >= vA.
    JgeV8Imm8 = 0x1a,
    JgeV8Imm16 = 0x1b,
    /// Jump if acc > vA.
    JgtV8Imm8 = 0x1c,
    JgtV8Imm16 = 0x1d,
    /// Jump if acc <= vA.
    JleV8Imm8 = 0x1e,
    JleV8Imm16 = 0x1f,
}

impl Opcode {
    /// Every opcode, in byte order.
    pub const ALL: [Opcode; 32] = [
        Opcode::Nop,
        Opcode::Ldai,
        Opcode::Fldai,
        Opcode::Lda,
        Opcode::Sta,
        Opcode::MovV4V4,
        Opcode::MovV8V8,
        Opcode::MovV16V16,
        Opcode::Add2,
        Opcode::Return,
        Opcode::ReturnUndefined,
        Opcode::JmpImm8,
        Opcode::JmpImm16,
        Opcode::JmpImm32,
        Opcode::JeqzImm8,
        Opcode::JeqzImm16,
        Opcode::JeqzImm32,
        Opcode::JnezImm8,
        Opcode::JnezImm16,
        Opcode::JnezImm32,
        Opcode::JeqV8Imm8,
        Opcode::JeqV8Imm16,
        Opcode::JneV8Imm8,
        Opcode::JneV8Imm16,
        Opcode::JltV8Imm8,
        Opcode::JltV8Imm16,
        Opcode::JgeV8Imm8,
        Opcode::JgeV8Imm16,
        Opcode::JgtV8Imm8,
        Opcode::JgtV8Imm16,
        Opcode::JleV8Imm8,
        Opcode::JleV8Imm16,
    ];

    /// Convert from a raw byte.
    pub fn from_u8(byte: u8) -> Option<Self> {
        Self::try_from(byte).ok()
    }

    /// Operand layout of this opcode.
    pub const fn format(self) -> Format {
        match self {
            Opcode::Nop | Opcode::Return | Opcode::ReturnUndefined => Format::Op,
            Opcode::Ldai => Format::Imm32,
            Opcode::Fldai => Format::Imm64,
            Opcode::Lda | Opcode::Sta | Opcode::Add2 => Format::V8,
            Opcode::MovV4V4 => Format::V4V4,
            Opcode::MovV8V8 => Format::V8V8,
            Opcode::MovV16V16 => Format::V16V16,
            Opcode::JmpImm8 | Opcode::JeqzImm8 | Opcode::JnezImm8 => Format::Imm8,
            Opcode::JmpImm16 | Opcode::JeqzImm16 | Opcode::JnezImm16 => Format::Imm16,
            Opcode::JmpImm32 | Opcode::JeqzImm32 | Opcode::JnezImm32 => Format::Imm32,
            Opcode::JeqV8Imm8
            | Opcode::JneV8Imm8
            | Opcode::JltV8Imm8
            | Opcode::JgeV8Imm8
            | Opcode::JgtV8Imm8
            | Opcode::JleV8Imm8 => Format::V8Imm8,
            Opcode::JeqV8Imm16
            | Opcode::JneV8Imm16
            | Opcode::JltV8Imm16
            | Opcode::JgeV8Imm16
            | Opcode::JgtV8Imm16
            | Opcode::JleV8Imm16 => Format::V8Imm16,
        }
    }

    /// Instruction size in bytes, opcode included.
    pub const fn size(self) -> usize {
        self.format().size()
    }

    /// Control-flow properties.
    pub fn flags(self) -> OpcodeFlags {
        match self {
            Opcode::Return | Opcode::ReturnUndefined => OpcodeFlags::RETURN,
            Opcode::JmpImm8 | Opcode::JmpImm16 | Opcode::JmpImm32 => OpcodeFlags::JUMP,
            op if op.family().is_some() => OpcodeFlags::JUMP | OpcodeFlags::CONDITIONAL,
            _ => OpcodeFlags::empty(),
        }
    }

    /// Whether this opcode is a (conditional or unconditional) jump.
    pub fn is_jump(self) -> bool {
        self.flags().contains(OpcodeFlags::JUMP)
    }

    /// Whether this opcode is a conditional jump.
    pub fn is_conditional_jump(self) -> bool {
        self.flags().contains(OpcodeFlags::CONDITIONAL)
    }

    /// Width class of the immediate operand, if any.
    pub fn imm_size(self) -> Option<BitImmSize> {
        self.format()
            .imm_field()
            .and_then(|(_, field)| BitImmSize::from_bits(field.width))
    }

    /// Assembly mnemonic (shared by all widths of an instruction).
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Nop => "nop",
            Opcode::Ldai => "ldai",
            Opcode::Fldai => "fldai",
            Opcode::Lda => "lda",
            Opcode::Sta => "sta",
            Opcode::MovV4V4 | Opcode::MovV8V8 | Opcode::MovV16V16 => "mov",
            Opcode::Add2 => "add2",
            Opcode::Return => "return",
            Opcode::ReturnUndefined => "returnundefined",
            Opcode::JmpImm8 | Opcode::JmpImm16 | Opcode::JmpImm32 => "jmp",
            Opcode::JeqzImm8 | Opcode::JeqzImm16 | Opcode::JeqzImm32 => "jeqz",
            Opcode::JnezImm8 | Opcode::JnezImm16 | Opcode::JnezImm32 => "jnez",
            Opcode::JeqV8Imm8 | Opcode::JeqV8Imm16 => "jeq",
            Opcode::JneV8Imm8 | Opcode::JneV8Imm16 => "jne",
            Opcode::JltV8Imm8 | Opcode::JltV8Imm16 => "jlt",
            Opcode::JgeV8Imm8 | Opcode::JgeV8Imm16 => "jge",
            Opcode::JgtV8Imm8 | Opcode::JgtV8Imm16 => "jgt",
            Opcode::JleV8Imm8 | Opcode::JleV8Imm16 => "jle",
        }
    }

    /// Canonical table name, e.g. `JEQ_V8_IMM16`.
    pub const fn name(self) -> &'static str {
        match self {
            Opcode::Nop => "NOP",
            Opcode::Ldai => "LDAI_IMM32",
            Opcode::Fldai => "FLDAI_IMM64",
            Opcode::Lda => "LDA_V8",
            Opcode::Sta => "STA_V8",
            Opcode::MovV4V4 => "MOV_V4_V4",
            Opcode::MovV8V8 => "MOV_V8_V8",
            Opcode::MovV16V16 => "MOV_V16_V16",
            Opcode::Add2 => "ADD2_V8",
            Opcode::Return => "RETURN",
            Opcode::ReturnUndefined => "RETURNUNDEFINED",
            Opcode::JmpImm8 => "JMP_IMM8",
            Opcode::JmpImm16 => "JMP_IMM16",
            Opcode::JmpImm32 => "JMP_IMM32",
            Opcode::JeqzImm8 => "JEQZ_IMM8",
            Opcode::JeqzImm16 => "JEQZ_IMM16",
            Opcode::JeqzImm32 => "JEQZ_IMM32",
            Opcode::JnezImm8 => "JNEZ_IMM8",
            Opcode::JnezImm16 => "JNEZ_IMM16",
            Opcode::JnezImm32 => "JNEZ_IMM32",
            Opcode::JeqV8Imm8 => "JEQ_V8_IMM8",
            Opcode::JeqV8Imm16 => "JEQ_V8_IMM16",
            Opcode::JneV8Imm8 => "JNE_V8_IMM8",
            Opcode::JneV8Imm16 => "JNE_V8_IMM16",
            Opcode::JltV8Imm8 => "JLT_V8_IMM8",
            Opcode::JltV8Imm16 => "JLT_V8_IMM16",
            Opcode::JgeV8Imm8 => "JGE_V8_IMM8",
            Opcode::JgeV8Imm16 => "JGE_V8_IMM16",
            Opcode::JgtV8Imm8 => "JGT_V8_IMM8",
            Opcode::JgtV8Imm16 => "JGT_V8_IMM16",
            Opcode::JleV8Imm8 => "JLE_V8_IMM8",
            Opcode::JleV8Imm16 => "JLE_V8_IMM16",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
