//! Branch relaxation.
//!
//! Branches start in their narrowest encoding. [`BytecodeEmitter::build`]
//! walks them once in offset order, carrying the growth applied so far as a
//! bias, and widens any branch whose worst-case distance no longer fits.
//! Forward distances assume every later, not yet visited branch in between
//! grows to its largest footprint, so a decision made early is never
//! invalidated by growth found later in the same pass.
//!
//! A branch with no wide enough encoding in its family is rewritten into the
//! far-jump idiom: the condition is inverted to skip over a new
//! `jmp.imm32`, and the branch entry moves onto that jump.

use pandabc_isa::{
    BitImmSize, Instruction, Opcode, encode, get_bit_length_signed, get_suitable_jump,
    max_footprint, patch_imm, revert_condition_code,
};
use tracing::{debug, trace};

use super::BytecodeEmitter;
use crate::branch::BranchTable;
use crate::error::EmitError;

/// Bytes a branch may still grow by.
fn slack(opcode: Opcode) -> i64 {
    let size = opcode.size();
    (max_footprint(opcode).unwrap_or(size) - size) as i64
}

impl BytecodeEmitter {
    /// Resolve every branch and return the finished bytecode.
    ///
    /// Runs [`check_labels`](Self::check_labels),
    /// [`reserve_space_for_offsets`](Self::reserve_space_for_offsets) and
    /// [`update_branches`](Self::update_branches), stopping at the first
    /// error. An unbound label is reported before anything is modified;
    /// after any other error the buffer must not be used.
    ///
    /// Building an already built emitter yields identical bytes.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn build(&mut self) -> Result<Vec<u8>, EmitError> {
        self.check_labels()?;
        let before = self.code.len();
        self.reserve_space_for_offsets()?;
        self.update_branches()?;
        debug!(
            bytes = self.code.len(),
            grown = self.code.len() - before,
            branches = self.branches.len(),
            "bytecode built"
        );
        Ok(self.code.clone())
    }

    /// Fail with [`EmitError::UnboundLabels`] if any branch targets an
    /// unbound label. Never modifies the emitter.
    pub fn check_labels(&self) -> Result<(), EmitError> {
        let count = self
            .branches
            .iter()
            .filter(|&(_, label)| self.labels.pc(label).is_none())
            .count();
        if count > 0 {
            return Err(EmitError::UnboundLabels { count });
        }
        Ok(())
    }

    /// Grow every branch whose target may be out of range of its encoding.
    ///
    /// Single forward pass; the branch table is rebuilt keyed by the final
    /// offsets.
    pub fn reserve_space_for_offsets(&mut self) -> Result<(), EmitError> {
        let mut pending = std::mem::take(&mut self.branches);
        let mut bias: u32 = 0;

        while let Some((original, label)) = pending.pop_first() {
            let insn_pc = original + bias;
            let opcode = self.branch_at(insn_pc)?;
            let target_pc = self
                .labels
                .pc(label)
                .ok_or(EmitError::UnboundLabels { count: 1 })?;
            let distance = self.estimate_max_distance(&pending, opcode, insn_pc, target_pc, bias)?;
            let width = get_bit_length_signed(distance);
            let current = opcode
                .imm_size()
                .ok_or(EmitError::NotABranch { opcode })?;

            let mut branch_pc = insn_pc;
            if width > current {
                let extra = if let Some(wider) = get_suitable_jump(opcode, width) {
                    trace!(pc = insn_pc, %opcode, %wider, distance, "widening branch");
                    self.widen(insn_pc, opcode, wider)?
                } else if let Some(inverted) =
                    revert_condition_code(opcode).filter(|_| width <= BitImmSize::Bitsize32)
                {
                    trace!(pc = insn_pc, %opcode, %inverted, distance, "inserting far jump");
                    branch_pc = self.insert_far_jump(insn_pc, opcode, inverted)?;
                    Opcode::JmpImm32.size() as u32
                } else {
                    return Err(EmitError::BranchOutOfRange {
                        opcode,
                        pc: insn_pc,
                        distance,
                    });
                };
                self.update_label_targets(insn_pc, extra);
                bias = bias.checked_add(extra).ok_or(EmitError::CodeTooLarge)?;
            }
            self.branches.insert(branch_pc, label);
        }
        Ok(())
    }

    /// Upper bound on the offset the branch at `insn_pc` will need.
    ///
    /// `pending` holds the branches not yet visited, keyed by their offsets
    /// before this pass; `bias` converts those to current offsets. Backward
    /// targets are exact because everything before `insn_pc` is final.
    pub(crate) fn estimate_max_distance(
        &self,
        pending: &BranchTable,
        opcode: Opcode,
        insn_pc: u32,
        target_pc: u32,
        bias: u32,
    ) -> Result<i64, EmitError> {
        let distance = i64::from(target_pc) - i64::from(insn_pc);
        if target_pc <= insn_pc {
            return Ok(distance);
        }

        let mut growth = slack(opcode);
        for (original, _) in pending.range(insn_pc - bias + 1..target_pc - bias) {
            growth += slack(self.branch_at(original + bias)?);
        }
        Ok(distance + growth)
    }

    /// Account for `extra` bytes inserted inside the instruction at `insn_pc`.
    pub(crate) fn update_label_targets(&mut self, insn_pc: u32, extra: u32) {
        self.labels.shift_after(insn_pc, extra);
    }

    /// Patch `target - pc` into every recorded branch.
    pub fn update_branches(&mut self) -> Result<(), EmitError> {
        for (pc, label) in self.branches.iter() {
            let target = self
                .labels
                .pc(label)
                .ok_or(EmitError::UnboundLabels { count: 1 })?;
            let opcode = Instruction::decode(&self.code, pc as usize)?.opcode();
            let offset = i64::from(target) - i64::from(pc);
            patch_imm(&mut self.code[pc as usize..], opcode, offset)?;
        }
        Ok(())
    }

    fn branch_at(&self, pc: u32) -> Result<Opcode, EmitError> {
        let opcode = Instruction::decode(&self.code, pc as usize)?.opcode();
        if !opcode.is_jump() {
            return Err(EmitError::NotABranch { opcode });
        }
        Ok(opcode)
    }

    /// Insert `extra` zero bytes at `at`.
    fn grow(&mut self, at: usize, extra: usize) -> Result<(), EmitError> {
        if self.code.len() + extra > u32::MAX as usize {
            return Err(EmitError::CodeTooLarge);
        }
        self.code.splice(at..at, std::iter::repeat_n(0, extra));
        Ok(())
    }

    /// Re-encode the branch at `insn_pc` as `wider`, returning the growth.
    fn widen(&mut self, insn_pc: u32, from: Opcode, wider: Opcode) -> Result<u32, EmitError> {
        let start = insn_pc as usize;
        let operands = Instruction::decode(&self.code, start)?.operands();
        let extra = wider.size() - from.size();
        self.grow(start + from.size(), extra)?;
        encode(&mut self.code[start..], wider, &operands)?;
        Ok(extra as u32)
    }

    /// Rewrite the branch at `insn_pc` into the far-jump idiom and return the
    /// offset of the inserted `jmp.imm32`.
    fn insert_far_jump(
        &mut self,
        insn_pc: u32,
        opcode: Opcode,
        inverted: Opcode,
    ) -> Result<u32, EmitError> {
        let start = insn_pc as usize;
        let size = opcode.size();
        let far = Opcode::JmpImm32;

        let mut operands = Instruction::decode(&self.code, start)?.operands();
        if let Some(offset) = operands.last_mut() {
            *offset = (size + far.size()) as i64;
        }
        encode(&mut self.code[start..], inverted, &operands)?;
        self.grow(start + size, far.size())?;
        encode(&mut self.code[start + size..], far, &[0])?;
        Ok(insn_pc + size as u32)
    }
}
