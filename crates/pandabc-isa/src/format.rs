//! Instruction formats and the per-field encoder.
//!
//! A format is an ordered list of operand fields. Every field is a
//! `(bit offset, bit width)` pair measured from the first bit of the
//! instruction; the opcode itself occupies bits `0..8`. Multi-byte fields are
//! byte aligned and little-endian. Two 4-bit fields share a byte, low nibble
//! first.
//!
//! Encoding walks the field list in order and performs one masked store per
//! field, so writing one field never disturbs its neighbours.

use std::fmt;

/// How a field's raw bits are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Unsigned register index.
    Reg,
    /// Signed immediate (also used for jump offsets).
    Imm,
}

/// One operand field of a format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Bit offset from the start of the instruction.
    pub offset: u32,
    /// Width in bits (4, 8, 16, 32 or 64).
    pub width: u32,
    pub kind: FieldKind,
}

impl Field {
    const fn reg(offset: u32, width: u32) -> Self {
        Self {
            offset,
            width,
            kind: FieldKind::Reg,
        }
    }

    const fn imm(offset: u32, width: u32) -> Self {
        Self {
            offset,
            width,
            kind: FieldKind::Imm,
        }
    }

    /// Whether `value` is representable in this field.
    pub fn fits(&self, value: i64) -> bool {
        match (self.kind, self.width) {
            (FieldKind::Imm, 64) => true,
            (FieldKind::Imm, w) => {
                let min = -(1i64 << (w - 1));
                let max = (1i64 << (w - 1)) - 1;
                (min..=max).contains(&value)
            }
            (FieldKind::Reg, 64) => value >= 0,
            (FieldKind::Reg, w) => (0..(1i64 << w)).contains(&value),
        }
    }

    /// Store `value` into this field of `insn`.
    ///
    /// The caller has checked [`Field::fits`] and the slice length.
    pub(crate) fn write(&self, insn: &mut [u8], value: i64) {
        let byte = (self.offset / 8) as usize;
        let shift = self.offset % 8;
        if self.width < 8 {
            let mask = ((1u16 << self.width) - 1) as u8;
            insn[byte] = (insn[byte] & !(mask << shift)) | (((value as u8) & mask) << shift);
        } else {
            debug_assert_eq!(shift, 0, "wide fields are byte aligned");
            let len = (self.width / 8) as usize;
            insn[byte..byte + len].copy_from_slice(&value.to_le_bytes()[..len]);
        }
    }

    /// Load this field from `insn`, sign-extending immediates.
    pub(crate) fn read(&self, insn: &[u8]) -> i64 {
        let byte = (self.offset / 8) as usize;
        let shift = self.offset % 8;
        let raw = if self.width < 8 {
            let mask = ((1u16 << self.width) - 1) as u8;
            ((insn[byte] >> shift) & mask) as u64
        } else {
            let len = (self.width / 8) as usize;
            let mut le = [0u8; 8];
            le[..len].copy_from_slice(&insn[byte..byte + len]);
            u64::from_le_bytes(le)
        };
        match self.kind {
            FieldKind::Reg => raw as i64,
            FieldKind::Imm if self.width == 64 => raw as i64,
            FieldKind::Imm => {
                let unused = 64 - self.width;
                ((raw << unused) as i64) >> unused
            }
        }
    }
}

/// Instruction formats, named after their operand fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Opcode only.
    Op,
    V4V4,
    V8,
    V8V8,
    V16V16,
    Imm8,
    Imm16,
    Imm32,
    Imm64,
    V8Imm8,
    V8Imm16,
}

const OP: &[Field] = &[];
const V4_V4: &[Field] = &[Field::reg(8, 4), Field::reg(12, 4)];
const V8: &[Field] = &[Field::reg(8, 8)];
const V8_V8: &[Field] = &[Field::reg(8, 8), Field::reg(16, 8)];
const V16_V16: &[Field] = &[Field::reg(8, 16), Field::reg(24, 16)];
const IMM8: &[Field] = &[Field::imm(8, 8)];
const IMM16: &[Field] = &[Field::imm(8, 16)];
const IMM32: &[Field] = &[Field::imm(8, 32)];
const IMM64: &[Field] = &[Field::imm(8, 64)];
const V8_IMM8: &[Field] = &[Field::reg(8, 8), Field::imm(16, 8)];
const V8_IMM16: &[Field] = &[Field::reg(8, 8), Field::imm(16, 16)];

impl Format {
    /// Operand fields in encoding order.
    pub const fn fields(self) -> &'static [Field] {
        match self {
            Format::Op => OP,
            Format::V4V4 => V4_V4,
            Format::V8 => V8,
            Format::V8V8 => V8_V8,
            Format::V16V16 => V16_V16,
            Format::Imm8 => IMM8,
            Format::Imm16 => IMM16,
            Format::Imm32 => IMM32,
            Format::Imm64 => IMM64,
            Format::V8Imm8 => V8_IMM8,
            Format::V8Imm16 => V8_IMM16,
        }
    }

    /// Total instruction size in bytes, opcode included.
    pub const fn size(self) -> usize {
        match self {
            Format::Op => 1,
            Format::V4V4 | Format::V8 | Format::Imm8 => 2,
            Format::V8V8 | Format::Imm16 | Format::V8Imm8 => 3,
            Format::V8Imm16 => 4,
            Format::V16V16 | Format::Imm32 => 5,
            Format::Imm64 => 9,
        }
    }

    /// Index and description of the immediate field, if the format has one.
    pub fn imm_field(self) -> Option<(usize, Field)> {
        self.fields()
            .iter()
            .copied()
            .enumerate()
            .find(|(_, field)| field.kind == FieldKind::Imm)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Op => "OP",
            Format::V4V4 => "OP_V4_V4",
            Format::V8 => "OP_V8",
            Format::V8V8 => "OP_V8_V8",
            Format::V16V16 => "OP_V16_V16",
            Format::Imm8 => "OP_IMM8",
            Format::Imm16 => "OP_IMM16",
            Format::Imm32 => "OP_IMM32",
            Format::Imm64 => "OP_IMM64",
            Format::V8Imm8 => "OP_V8_IMM8",
            Format::V8Imm16 => "OP_V8_IMM16",
        };
        f.write_str(name)
    }
}
