//! Instruction encoder, decoder view and disassembler.

use std::fmt::{self, Write as _};

use crate::error::{DecodeError, EncodeError};
use crate::format::FieldKind;
use crate::Opcode;

/// Encode `opcode` with `operands` into the front of `insn`.
///
/// Operands pair positionally with the opcode's format fields. Each field is
/// an independent masked store, so bytes outside the instruction are left
/// untouched and re-encoding over an existing instruction is safe.
pub fn encode(insn: &mut [u8], opcode: Opcode, operands: &[i64]) -> Result<(), EncodeError> {
    let format = opcode.format();
    let fields = format.fields();
    if fields.len() != operands.len() {
        return Err(EncodeError::OperandCount {
            opcode,
            expected: fields.len(),
            actual: operands.len(),
        });
    }
    if insn.len() < format.size() {
        return Err(EncodeError::BufferTooShort {
            opcode,
            needed: format.size(),
            available: insn.len(),
        });
    }
    for (index, (field, &value)) in fields.iter().zip(operands).enumerate() {
        if !field.fits(value) {
            return Err(EncodeError::OperandOutOfRange {
                opcode,
                index,
                value,
                bits: field.width,
            });
        }
    }

    insn[0] = opcode.into();
    for (field, &value) in fields.iter().zip(operands) {
        field.write(insn, value);
    }
    Ok(())
}

/// Overwrite the immediate operand of the `opcode` instruction at the front
/// of `insn`.
pub fn patch_imm(insn: &mut [u8], opcode: Opcode, value: i64) -> Result<(), EncodeError> {
    let (index, field) = opcode
        .format()
        .imm_field()
        .ok_or(EncodeError::NoImmediate { opcode })?;
    if insn.len() < opcode.size() {
        return Err(EncodeError::BufferTooShort {
            opcode,
            needed: opcode.size(),
            available: insn.len(),
        });
    }
    if !field.fits(value) {
        return Err(EncodeError::OperandOutOfRange {
            opcode,
            index,
            value,
            bits: field.width,
        });
    }
    field.write(insn, value);
    Ok(())
}

/// Read-only view of one encoded instruction.
#[derive(Debug, Clone, Copy)]
pub struct Instruction<'a> {
    opcode: Opcode,
    bytes: &'a [u8],
}

impl<'a> Instruction<'a> {
    /// Decode the instruction starting at `offset` in `code`.
    pub fn decode(code: &'a [u8], offset: usize) -> Result<Self, DecodeError> {
        let byte = *code.get(offset).ok_or(DecodeError::OutOfBounds {
            offset,
            len: code.len(),
        })?;
        let opcode = Opcode::from_u8(byte).ok_or(DecodeError::InvalidOpcode { byte, offset })?;
        let available = code.len() - offset;
        if available < opcode.size() {
            return Err(DecodeError::Truncated {
                opcode,
                offset,
                needed: opcode.size(),
                available,
            });
        }
        Ok(Self {
            opcode,
            bytes: &code[offset..offset + opcode.size()],
        })
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Raw encoded bytes.
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Operand `index`, sign-extended for immediates.
    pub fn operand(&self, index: usize) -> Option<i64> {
        self.opcode
            .format()
            .fields()
            .get(index)
            .map(|field| field.read(self.bytes))
    }

    /// All operands in format order.
    pub fn operands(&self) -> Vec<i64> {
        self.opcode
            .format()
            .fields()
            .iter()
            .map(|field| field.read(self.bytes))
            .collect()
    }

    /// The immediate operand, if the format has one.
    pub fn imm(&self) -> Option<i64> {
        let (_, field) = self.opcode.format().imm_field()?;
        Some(field.read(self.bytes))
    }

    /// Relative jump offset for branch instructions.
    pub fn jump_offset(&self) -> Option<i64> {
        if self.opcode.is_jump() {
            self.imm()
        } else {
            None
        }
    }
}

impl fmt::Display for Instruction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.opcode.mnemonic())?;
        let fields = self.opcode.format().fields();
        for (i, field) in fields.iter().enumerate() {
            f.write_str(if i == 0 { " " } else { ", " })?;
            let value = field.read(self.bytes);
            match field.kind {
                FieldKind::Reg => write!(f, "v{value}")?,
                FieldKind::Imm if self.opcode.is_jump() => write!(f, "{value:+}")?,
                FieldKind::Imm if self.opcode == Opcode::Fldai => {
                    write!(f, "{}", f64::from_bits(value as u64))?
                }
                FieldKind::Imm => write!(f, "{value}")?,
            }
        }
        Ok(())
    }
}

/// Iterator over `(offset, instruction)` pairs of a buffer.
///
/// Yields a decode error once and then stops.
pub struct InstructionIter<'a> {
    code: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> InstructionIter<'a> {
    pub fn new(code: &'a [u8]) -> Self {
        Self {
            code,
            offset: 0,
            failed: false,
        }
    }
}

impl<'a> Iterator for InstructionIter<'a> {
    type Item = Result<(usize, Instruction<'a>), DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.code.len() {
            return None;
        }
        match Instruction::decode(self.code, self.offset) {
            Ok(insn) => {
                let offset = self.offset;
                self.offset += insn.size();
                Some(Ok((offset, insn)))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

/// Render `code` as one `offset: instruction` line per instruction.
///
/// Jump lines carry their absolute target in a trailing comment.
pub fn disassemble(code: &[u8]) -> Result<String, DecodeError> {
    let mut out = String::new();
    for item in InstructionIter::new(code) {
        let (offset, insn) = item?;
        // Writing into a String cannot fail.
        let _ = write!(out, "{offset:04x}: {insn}");
        if let Some(rel) = insn.jump_offset() {
            let _ = write!(out, "  # -> {:04x}", offset as i64 + rel);
        }
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_and_decode_registers() {
        let mut buf = [0u8; 5];
        encode(&mut buf, Opcode::MovV16V16, &[0x1234, 7]).unwrap();
        assert_eq!(buf, [0x07, 0x34, 0x12, 0x07, 0x00]);

        let insn = Instruction::decode(&buf, 0).unwrap();
        assert_eq!(insn.opcode(), Opcode::MovV16V16);
        assert_eq!(insn.operands(), vec![0x1234, 7]);
        assert_eq!(insn.imm(), None);
    }

    #[test]
    fn encode_nibbles() {
        let mut buf = [0u8; 2];
        encode(&mut buf, Opcode::MovV4V4, &[1, 15]).unwrap();
        assert_eq!(buf, [0x05, 0xf1]);
    }

    #[test]
    fn encode_rejects_wrong_arity() {
        let mut buf = [0u8; 2];
        let err = encode(&mut buf, Opcode::Lda, &[]).unwrap_err();
        assert_eq!(
            err,
            EncodeError::OperandCount {
                opcode: Opcode::Lda,
                expected: 1,
                actual: 0
            }
        );
    }

    #[test]
    fn encode_rejects_out_of_range() {
        let mut buf = [0u8; 2];
        let err = encode(&mut buf, Opcode::JmpImm8, &[200]).unwrap_err();
        assert!(matches!(err, EncodeError::OperandOutOfRange { bits: 8, .. }));
        // Nothing written on failure.
        assert_eq!(buf, [0, 0]);
    }

    #[test]
    fn encode_rejects_short_buffer() {
        let mut buf = [0u8; 2];
        let err = encode(&mut buf, Opcode::JmpImm32, &[0]).unwrap_err();
        assert!(matches!(err, EncodeError::BufferTooShort { needed: 5, .. }));
    }

    #[test]
    fn patch_jump_offset() {
        let mut buf = [0u8; 4];
        encode(&mut buf, Opcode::JltV8Imm16, &[9, 0]).unwrap();
        patch_imm(&mut buf, Opcode::JltV8Imm16, -300).unwrap();
        let insn = Instruction::decode(&buf, 0).unwrap();
        assert_eq!(insn.operand(0), Some(9));
        assert_eq!(insn.jump_offset(), Some(-300));
    }

    #[test]
    fn patch_requires_immediate() {
        let mut buf = [0u8; 3];
        let err = patch_imm(&mut buf, Opcode::MovV8V8, 1).unwrap_err();
        assert_eq!(err, EncodeError::NoImmediate { opcode: Opcode::MovV8V8 });
    }

    #[test]
    fn decode_errors() {
        assert_eq!(
            Instruction::decode(&[0xee], 0).unwrap_err(),
            DecodeError::InvalidOpcode { byte: 0xee, offset: 0 }
        );
        assert!(matches!(
            Instruction::decode(&[0x0d, 0x00], 0).unwrap_err(),
            DecodeError::Truncated { opcode: Opcode::JmpImm32, .. }
        ));
    }

    #[test]
    fn iterate_and_disassemble() {
        let mut code = vec![0u8; 2 + 1 + 3];
        encode(&mut code[0..2], Opcode::JmpImm8, &[3]).unwrap();
        encode(&mut code[2..3], Opcode::Nop, &[]).unwrap();
        encode(&mut code[3..6], Opcode::JeqV8Imm8, &[4, -3]).unwrap();

        let offsets: Vec<_> = InstructionIter::new(&code)
            .map(|item| item.map(|(off, insn)| (off, insn.opcode())))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            offsets,
            vec![(0, Opcode::JmpImm8), (2, Opcode::Nop), (3, Opcode::JeqV8Imm8)]
        );

        let text = disassemble(&code).unwrap();
        assert_eq!(
            text,
            "0000: jmp +3  # -> 0003\n0002: nop\n0003: jeq v4, -3  # -> 0000\n"
        );
    }

    #[test]
    fn iterator_stops_after_error() {
        let code = [0x00, 0xee, 0x00];
        let items: Vec<_> = InstructionIter::new(&code).collect();
        assert_eq!(items.len(), 2);
        assert!(items[1].is_err());
    }
}
