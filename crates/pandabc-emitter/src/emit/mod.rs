//! Bytecode emitter for one function.
//!
//! The [`BytecodeEmitter`] appends fixed-size instructions to a byte buffer.
//! Branches are emitted in their narrowest form against a [`Label`] and are
//! resolved by [`BytecodeEmitter::build`], which relaxes every branch to an
//! encoding that reaches its target.
//!
//! # Example
//!
//! ```
//! use pandabc_emitter::BytecodeEmitter;
//!
//! let mut emitter = BytecodeEmitter::new();
//! let done = emitter.create_label();
//!
//! emitter.lda(1)?;
//! emitter.jeqz(done)?;
//! emitter.ldai(42)?;
//! emitter.bind(done)?;
//! emitter.return_value()?;
//!
//! let code = emitter.build()?;
//! assert_eq!(code.len(), 2 + 2 + 5 + 1);
//! # Ok::<(), pandabc_emitter::EmitError>(())
//! ```

mod relax;

use pandabc_isa::{BitImmSize, JumpFamily, Opcode, encode, get_bit_length_unsigned};

use crate::branch::BranchTable;
use crate::error::EmitError;
use crate::label::{Label, LabelTable};

/// Size of the largest instruction (`fldai`).
const MAX_INSN_SIZE: usize = 9;

/// Emits bytecode instructions and resolves branches.
///
/// Each emitter owns its buffer, labels and branches; one emitter produces
/// the bytecode of a single function.
#[derive(Debug, Default, Clone)]
pub struct BytecodeEmitter {
    /// Encoded instructions.
    code: Vec<u8>,

    /// Label arena and bound targets.
    labels: LabelTable,

    /// Branches awaiting offset resolution, keyed by instruction offset.
    branches: BranchTable,
}

impl BytecodeEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents of the buffer.
    ///
    /// Offsets of branches are only meaningful after a successful
    /// [`build`](Self::build).
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Number of labels created so far.
    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    /// Resolved pc of `label`, `None` while unbound.
    pub fn label_pc(&self, label: Label) -> Option<u32> {
        self.labels.pc(label)
    }

    /// Recorded branches as `(instruction offset, label)` in offset order.
    pub fn branches(&self) -> impl Iterator<Item = (u32, Label)> + '_ {
        self.branches.iter()
    }

    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    fn pc(&self) -> Result<u32, EmitError> {
        u32::try_from(self.code.len()).map_err(|_| EmitError::CodeTooLarge)
    }

    // ==========================================================================
    // Labels
    // ==========================================================================

    /// Allocate a new, unbound label.
    pub fn create_label(&mut self) -> Label {
        self.labels.create()
    }

    /// Bind `label` to the current end of the buffer.
    ///
    /// A label is bound at most once; a second bind is rejected and leaves
    /// the first binding in place.
    pub fn bind(&mut self, label: Label) -> Result<(), EmitError> {
        let pc = self.pc()?;
        self.labels.bind(label, pc)
    }

    // ==========================================================================
    // Basic Emission
    // ==========================================================================

    /// Append `opcode` with `operands` in format order.
    ///
    /// The buffer is unchanged if the operands do not fit the format.
    pub fn emit(&mut self, opcode: Opcode, operands: &[i64]) -> Result<(), EmitError> {
        let size = opcode.size();
        let mut insn = [0u8; MAX_INSN_SIZE];
        encode(&mut insn[..size], opcode, operands)?;
        self.code.extend_from_slice(&insn[..size]);
        Ok(())
    }

    /// Append a branch to `label` and record it for relaxation.
    ///
    /// `registers` are the operands preceding the offset; the offset itself
    /// is written as zero and patched by [`build`](Self::build).
    pub fn emit_jump(
        &mut self,
        opcode: Opcode,
        registers: &[i64],
        label: Label,
    ) -> Result<(), EmitError> {
        if !opcode.is_jump() {
            return Err(EmitError::NotABranch { opcode });
        }
        if !self.labels.contains(label) {
            return Err(EmitError::UnknownLabel(label));
        }
        let pc = self.pc()?;
        let mut operands = registers.to_vec();
        operands.push(0);
        self.emit(opcode, &operands)?;
        self.branches.insert(pc, label);
        Ok(())
    }

    fn emit_family(
        &mut self,
        family: JumpFamily,
        registers: &[i64],
        label: Label,
    ) -> Result<(), EmitError> {
        self.emit_jump(family.shortest(), registers, label)
    }

    // ==========================================================================
    // Loads, stores, moves
    // ==========================================================================

    pub fn nop(&mut self) -> Result<(), EmitError> {
        self.emit(Opcode::Nop, &[])
    }

    pub fn ldai(&mut self, value: i32) -> Result<(), EmitError> {
        self.emit(Opcode::Ldai, &[value.into()])
    }

    /// Load a double; the immediate carries its raw bits.
    pub fn fldai(&mut self, value: f64) -> Result<(), EmitError> {
        self.emit(Opcode::Fldai, &[value.to_bits() as i64])
    }

    pub fn lda(&mut self, reg: u8) -> Result<(), EmitError> {
        self.emit(Opcode::Lda, &[reg.into()])
    }

    pub fn sta(&mut self, reg: u8) -> Result<(), EmitError> {
        self.emit(Opcode::Sta, &[reg.into()])
    }

    /// Register move in the narrowest format holding both registers.
    pub fn mov(&mut self, dst: u16, src: u16) -> Result<(), EmitError> {
        let width = get_bit_length_unsigned(dst).max(get_bit_length_unsigned(src));
        let opcode = match width {
            BitImmSize::Bitsize4 => Opcode::MovV4V4,
            BitImmSize::Bitsize8 => Opcode::MovV8V8,
            _ => Opcode::MovV16V16,
        };
        self.emit(opcode, &[dst.into(), src.into()])
    }

    pub fn add2(&mut self, reg: u8) -> Result<(), EmitError> {
        self.emit(Opcode::Add2, &[reg.into()])
    }

    pub fn return_value(&mut self) -> Result<(), EmitError> {
        self.emit(Opcode::Return, &[])
    }

    pub fn return_undefined(&mut self) -> Result<(), EmitError> {
        self.emit(Opcode::ReturnUndefined, &[])
    }

    // ==========================================================================
    // Branches
    // ==========================================================================

    pub fn jmp(&mut self, label: Label) -> Result<(), EmitError> {
        self.emit_family(JumpFamily::Jmp, &[], label)
    }

    /// Jump if the accumulator is zero.
    pub fn jeqz(&mut self, label: Label) -> Result<(), EmitError> {
        self.emit_family(JumpFamily::Jeqz, &[], label)
    }

    /// Jump if the accumulator is not zero.
    pub fn jnez(&mut self, label: Label) -> Result<(), EmitError> {
        self.emit_family(JumpFamily::Jnez, &[], label)
    }

    pub fn jeq(&mut self, reg: u8, label: Label) -> Result<(), EmitError> {
        self.emit_family(JumpFamily::Jeq, &[reg.into()], label)
    }

    pub fn jne(&mut self, reg: u8, label: Label) -> Result<(), EmitError> {
        self.emit_family(JumpFamily::Jne, &[reg.into()], label)
    }

    pub fn jlt(&mut self, reg: u8, label: Label) -> Result<(), EmitError> {
        self.emit_family(JumpFamily::Jlt, &[reg.into()], label)
    }

    pub fn jge(&mut self, reg: u8, label: Label) -> Result<(), EmitError> {
        self.emit_family(JumpFamily::Jge, &[reg.into()], label)
    }

    pub fn jgt(&mut self, reg: u8, label: Label) -> Result<(), EmitError> {
        self.emit_family(JumpFamily::Jgt, &[reg.into()], label)
    }

    pub fn jle(&mut self, reg: u8, label: Label) -> Result<(), EmitError> {
        self.emit_family(JumpFamily::Jle, &[reg.into()], label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pandabc_isa::Instruction;

    #[test]
    fn emit_appends_encoded_bytes() {
        let mut emitter = BytecodeEmitter::new();
        emitter.lda(3).unwrap();
        emitter.ldai(-1).unwrap();
        emitter.return_value().unwrap();
        assert_eq!(
            emitter.code(),
            &[0x03, 0x03, 0x01, 0xff, 0xff, 0xff, 0xff, 0x09]
        );
    }

    #[test]
    fn emit_rejects_bad_operands_without_writing() {
        let mut emitter = BytecodeEmitter::new();
        emitter.nop().unwrap();
        assert!(emitter.emit(Opcode::Lda, &[300]).is_err());
        assert!(emitter.emit(Opcode::Lda, &[]).is_err());
        assert_eq!(emitter.code(), &[0x00]);
    }

    #[test]
    fn mov_picks_narrowest_format() {
        let mut emitter = BytecodeEmitter::new();
        emitter.mov(1, 15).unwrap();
        emitter.mov(16, 2).unwrap();
        emitter.mov(3, 256).unwrap();

        let code = emitter.code();
        assert_eq!(Instruction::decode(code, 0).unwrap().opcode(), Opcode::MovV4V4);
        assert_eq!(Instruction::decode(code, 2).unwrap().opcode(), Opcode::MovV8V8);
        let wide = Instruction::decode(code, 5).unwrap();
        assert_eq!(wide.opcode(), Opcode::MovV16V16);
        assert_eq!(wide.operands(), vec![3, 256]);
    }

    #[test]
    fn fldai_stores_raw_bits() {
        let mut emitter = BytecodeEmitter::new();
        emitter.fldai(1.5).unwrap();
        let insn = Instruction::decode(emitter.code(), 0).unwrap();
        assert_eq!(insn.imm(), Some(1.5f64.to_bits() as i64));
    }

    #[test]
    fn branches_are_recorded_in_minimal_form() {
        let mut emitter = BytecodeEmitter::new();
        let label = emitter.create_label();
        emitter.jmp(label).unwrap();
        emitter.jle(7, label).unwrap();

        assert_eq!(emitter.len(), 2 + 3);
        assert_eq!(emitter.branches().collect::<Vec<_>>(), vec![(0, label), (2, label)]);
        let jle = Instruction::decode(emitter.code(), 2).unwrap();
        assert_eq!(jle.opcode(), Opcode::JleV8Imm8);
        assert_eq!(jle.operands(), vec![7, 0]);
    }

    #[test]
    fn emit_jump_validates() {
        let mut emitter = BytecodeEmitter::new();
        let label = emitter.create_label();
        assert_eq!(
            emitter.emit_jump(Opcode::Lda, &[1], label),
            Err(EmitError::NotABranch { opcode: Opcode::Lda })
        );

        let mut other = BytecodeEmitter::new();
        other.create_label();
        let foreign = other.create_label();
        assert_eq!(emitter.jmp(foreign), Err(EmitError::UnknownLabel(foreign)));
        assert!(emitter.is_empty());
        assert_eq!(emitter.branch_count(), 0);
    }

    #[test]
    fn bind_records_current_offset() {
        let mut emitter = BytecodeEmitter::new();
        let start = emitter.create_label();
        let end = emitter.create_label();
        emitter.bind(start).unwrap();
        emitter.nop().unwrap();
        emitter.nop().unwrap();
        emitter.bind(end).unwrap();

        assert_eq!(emitter.label_pc(start), Some(0));
        assert_eq!(emitter.label_pc(end), Some(2));
        assert_eq!(emitter.label_count(), 2);
    }

    #[test]
    fn double_bind_is_rejected() {
        let mut emitter = BytecodeEmitter::new();
        let label = emitter.create_label();
        emitter.bind(label).unwrap();
        emitter.nop().unwrap();

        let err = emitter.bind(label).unwrap_err();
        assert_eq!(err, EmitError::LabelAlreadyBound(label));
        assert_eq!(err.code(), crate::ErrorCode::InternalError);
        assert_eq!(emitter.label_pc(label), Some(0));
    }
}
