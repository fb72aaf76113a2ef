//! Jump families and the widening table.
//!
//! A family groups the encodings of one branch that differ only in the width
//! of their offset immediate. Relaxation moves a branch to a wider member of
//! its family; families that stop at 16 bits instead fall back to the
//! far-jump idiom (inverted short branch over an unconditional `jmp.imm32`),
//! which needs the family's logical inverse.

use crate::Opcode;
use crate::width::BitImmSize;

/// Branch families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JumpFamily {
    Jmp,
    Jeqz,
    Jnez,
    Jeq,
    Jne,
    Jlt,
    Jge,
    Jgt,
    Jle,
}

impl JumpFamily {
    /// Members of the family, narrowest first.
    pub const fn variants(self) -> &'static [Opcode] {
        match self {
            JumpFamily::Jmp => &[Opcode::JmpImm8, Opcode::JmpImm16, Opcode::JmpImm32],
            JumpFamily::Jeqz => &[Opcode::JeqzImm8, Opcode::JeqzImm16, Opcode::JeqzImm32],
            JumpFamily::Jnez => &[Opcode::JnezImm8, Opcode::JnezImm16, Opcode::JnezImm32],
            JumpFamily::Jeq => &[Opcode::JeqV8Imm8, Opcode::JeqV8Imm16],
            JumpFamily::Jne => &[Opcode::JneV8Imm8, Opcode::JneV8Imm16],
            JumpFamily::Jlt => &[Opcode::JltV8Imm8, Opcode::JltV8Imm16],
            JumpFamily::Jge => &[Opcode::JgeV8Imm8, Opcode::JgeV8Imm16],
            JumpFamily::Jgt => &[Opcode::JgtV8Imm8, Opcode::JgtV8Imm16],
            JumpFamily::Jle => &[Opcode::JleV8Imm8, Opcode::JleV8Imm16],
        }
    }

    /// The family taking the branch exactly when `self` falls through.
    pub const fn inverse(self) -> Option<JumpFamily> {
        match self {
            JumpFamily::Jmp => None,
            JumpFamily::Jeqz => Some(JumpFamily::Jnez),
            JumpFamily::Jnez => Some(JumpFamily::Jeqz),
            JumpFamily::Jeq => Some(JumpFamily::Jne),
            JumpFamily::Jne => Some(JumpFamily::Jeq),
            JumpFamily::Jlt => Some(JumpFamily::Jge),
            JumpFamily::Jge => Some(JumpFamily::Jlt),
            JumpFamily::Jgt => Some(JumpFamily::Jle),
            JumpFamily::Jle => Some(JumpFamily::Jgt),
        }
    }

    /// Narrowest member.
    pub fn shortest(self) -> Opcode {
        self.variants()[0]
    }

    /// Widest member.
    pub fn longest(self) -> Opcode {
        let variants = self.variants();
        variants[variants.len() - 1]
    }

    /// Member whose immediate is exactly `width` bits, if any.
    pub fn variant(self, width: BitImmSize) -> Option<Opcode> {
        self.variants()
            .iter()
            .copied()
            .find(|op| op.imm_size() == Some(width))
    }

    /// Whether the family needs the far-jump idiom to reach 32-bit offsets.
    pub fn needs_far_jump(self) -> bool {
        self.longest().imm_size() < Some(BitImmSize::Bitsize32)
    }
}

impl Opcode {
    /// Jump family of this opcode, `None` for non-branches.
    pub const fn family(self) -> Option<JumpFamily> {
        match self {
            Opcode::JmpImm8 | Opcode::JmpImm16 | Opcode::JmpImm32 => Some(JumpFamily::Jmp),
            Opcode::JeqzImm8 | Opcode::JeqzImm16 | Opcode::JeqzImm32 => Some(JumpFamily::Jeqz),
            Opcode::JnezImm8 | Opcode::JnezImm16 | Opcode::JnezImm32 => Some(JumpFamily::Jnez),
            Opcode::JeqV8Imm8 | Opcode::JeqV8Imm16 => Some(JumpFamily::Jeq),
            Opcode::JneV8Imm8 | Opcode::JneV8Imm16 => Some(JumpFamily::Jne),
            Opcode::JltV8Imm8 | Opcode::JltV8Imm16 => Some(JumpFamily::Jlt),
            Opcode::JgeV8Imm8 | Opcode::JgeV8Imm16 => Some(JumpFamily::Jge),
            Opcode::JgtV8Imm8 | Opcode::JgtV8Imm16 => Some(JumpFamily::Jgt),
            Opcode::JleV8Imm8 | Opcode::JleV8Imm16 => Some(JumpFamily::Jle),
            _ => None,
        }
    }
}

/// Smallest same-family jump whose immediate holds a `width` offset.
///
/// `None` when `opcode` is not a jump or its family tops out below `width`.
pub fn get_suitable_jump(opcode: Opcode, width: BitImmSize) -> Option<Opcode> {
    opcode
        .family()?
        .variants()
        .iter()
        .copied()
        .find(|op| op.imm_size().is_some_and(|size| size >= width))
}

/// Widest same-family jump, `None` for non-branches.
pub fn get_longest_jump(opcode: Opcode) -> Option<Opcode> {
    opcode.family().map(JumpFamily::longest)
}

/// Same-width jump with the inverted condition.
///
/// `None` for unconditional jumps and non-branches.
pub fn revert_condition_code(opcode: Opcode) -> Option<Opcode> {
    let width = opcode.imm_size()?;
    opcode.family()?.inverse()?.variant(width)
}

/// Upper bound on the bytes a branch can occupy once relaxed.
///
/// For families that reach 32 bits this is the widest encoding. Families
/// that stop short may keep their widest encoding and gain a trailing
/// `jmp.imm32`, so the bound covers both. The bound is the same for every
/// member of a family, which keeps repeated relaxation passes monotone.
pub fn max_footprint(opcode: Opcode) -> Option<usize> {
    let family = opcode.family()?;
    let mut footprint = family.longest().size();
    if family.needs_far_jump() {
        footprint += Opcode::JmpImm32.size();
    }
    Some(footprint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn families_cover_every_jump() {
        for op in Opcode::ALL {
            assert_eq!(op.family().is_some(), op.is_jump(), "{op}");
            if let Some(family) = op.family() {
                assert!(family.variants().contains(&op));
            }
        }
    }

    #[test]
    fn variants_are_ordered_by_width() {
        for op in Opcode::ALL.into_iter().filter(|op| op.is_jump()) {
            let family = op.family().unwrap();
            let widths: Vec<_> = family.variants().iter().map(|v| v.imm_size()).collect();
            let mut sorted = widths.clone();
            sorted.sort();
            assert_eq!(widths, sorted, "{family:?}");
        }
    }

    #[test]
    fn suitable_jump_picks_smallest_fit() {
        assert_eq!(
            get_suitable_jump(Opcode::JmpImm8, BitImmSize::Bitsize4),
            Some(Opcode::JmpImm8)
        );
        assert_eq!(
            get_suitable_jump(Opcode::JmpImm8, BitImmSize::Bitsize16),
            Some(Opcode::JmpImm16)
        );
        assert_eq!(
            get_suitable_jump(Opcode::JeqzImm16, BitImmSize::Bitsize32),
            Some(Opcode::JeqzImm32)
        );
        assert_eq!(
            get_suitable_jump(Opcode::JeqV8Imm8, BitImmSize::Bitsize16),
            Some(Opcode::JeqV8Imm16)
        );
        assert_eq!(get_suitable_jump(Opcode::JeqV8Imm8, BitImmSize::Bitsize32), None);
        assert_eq!(get_suitable_jump(Opcode::Lda, BitImmSize::Bitsize8), None);
    }

    #[test]
    fn longest_jump() {
        assert_eq!(get_longest_jump(Opcode::JnezImm8), Some(Opcode::JnezImm32));
        assert_eq!(get_longest_jump(Opcode::JltV8Imm8), Some(Opcode::JltV8Imm16));
        assert_eq!(get_longest_jump(Opcode::Nop), None);
    }

    #[test]
    fn revert_keeps_width() {
        assert_eq!(revert_condition_code(Opcode::JeqV8Imm8), Some(Opcode::JneV8Imm8));
        assert_eq!(revert_condition_code(Opcode::JltV8Imm16), Some(Opcode::JgeV8Imm16));
        assert_eq!(revert_condition_code(Opcode::JgtV8Imm8), Some(Opcode::JleV8Imm8));
        assert_eq!(revert_condition_code(Opcode::JeqzImm32), Some(Opcode::JnezImm32));
        assert_eq!(revert_condition_code(Opcode::JmpImm8), None);
    }

    #[test]
    fn inverse_is_involution() {
        for op in Opcode::ALL.into_iter().filter(|op| op.is_conditional_jump()) {
            let family = op.family().unwrap();
            assert_eq!(family.inverse().and_then(JumpFamily::inverse), Some(family));
        }
    }

    #[test]
    fn footprints() {
        assert_eq!(max_footprint(Opcode::JmpImm8), Some(5));
        assert_eq!(max_footprint(Opcode::JmpImm32), Some(5));
        assert_eq!(max_footprint(Opcode::JeqzImm16), Some(5));
        // jeq.v8.imm16 (4 bytes) + jmp.imm32 (5 bytes)
        assert_eq!(max_footprint(Opcode::JeqV8Imm8), Some(9));
        assert_eq!(max_footprint(Opcode::JeqV8Imm16), Some(9));
        assert_eq!(max_footprint(Opcode::Return), None);
    }
}
