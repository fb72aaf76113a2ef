//! Integration tests for branch relaxation through the public emitter API.
//!
//! Every test decodes the finished bytecode and checks each branch against
//! the final position of its label.

use pandabc::isa::{Instruction, InstructionIter, Opcode, disassemble};
use pandabc::{BytecodeEmitter, EmitError, ErrorCode, Label};

fn filler(emitter: &mut BytecodeEmitter, bytes: usize) {
    for _ in 0..bytes / 5 {
        emitter.ldai(0).unwrap();
    }
    for _ in 0..bytes % 5 {
        emitter.nop().unwrap();
    }
}

fn insn_at(code: &[u8], pc: u32) -> Instruction<'_> {
    Instruction::decode(code, pc as usize).unwrap()
}

/// Follow every jump in `code` and collect `(pc, opcode, target)`.
fn jumps(code: &[u8]) -> Vec<(u32, Opcode, i64)> {
    InstructionIter::new(code)
        .map(|item| item.unwrap())
        .filter_map(|(pc, insn)| {
            insn.jump_offset()
                .map(|offset| (pc as u32, insn.opcode(), pc as i64 + offset))
        })
        .collect()
}

fn assert_lands_on(emitter: &BytecodeEmitter, label: Label, pc: u32) {
    let code = emitter.code();
    let target = emitter.label_pc(label).unwrap();
    let offset = insn_at(code, pc).jump_offset().unwrap();
    assert_eq!(pc as i64 + offset, target as i64, "jump at {pc} to {label}");
}

// =============================================================================
// Minimal encodings
// =============================================================================

#[test]
fn test_short_forward_branch() {
    let mut emitter = BytecodeEmitter::new();
    let label = emitter.create_label();
    emitter.lda(0).unwrap();
    emitter.jnez(label).unwrap();
    emitter.nop().unwrap();
    emitter.bind(label).unwrap();
    emitter.return_undefined().unwrap();

    let before = emitter.len();
    let code = emitter.build().unwrap();
    assert_eq!(code.len(), before);
    assert_eq!(jumps(&code), vec![(2, Opcode::JnezImm8, 5)]);
}

#[test]
fn test_loop_with_backward_branch() {
    let mut emitter = BytecodeEmitter::new();
    let head = emitter.create_label();
    let exit = emitter.create_label();
    emitter.bind(head).unwrap();
    emitter.lda(1).unwrap();
    emitter.jge(2, exit).unwrap();
    emitter.add2(3).unwrap();
    emitter.sta(1).unwrap();
    emitter.jmp(head).unwrap();
    emitter.bind(exit).unwrap();
    emitter.return_value().unwrap();

    let code = emitter.build().unwrap();
    assert_eq!(
        disassemble(&code).unwrap(),
        "0000: lda v1\n\
         0002: jge v2, +9  # -> 000b\n\
         0005: add2 v3\n\
         0007: sta v1\n\
         0009: jmp -9  # -> 0000\n\
         000b: return\n"
    );
}

// =============================================================================
// Widening
// =============================================================================

#[test]
fn test_forced_widening_each_family() {
    let wide = [
        (Opcode::JmpImm8, Opcode::JmpImm16),
        (Opcode::JeqzImm8, Opcode::JeqzImm16),
        (Opcode::JnezImm8, Opcode::JnezImm16),
        (Opcode::JeqV8Imm8, Opcode::JeqV8Imm16),
        (Opcode::JltV8Imm8, Opcode::JltV8Imm16),
    ];
    for (narrow, widened) in wide {
        let mut emitter = BytecodeEmitter::new();
        let label = emitter.create_label();
        let registers: &[i64] = if narrow.format().fields().len() == 2 { &[4] } else { &[] };
        emitter.emit_jump(narrow, registers, label).unwrap();
        filler(&mut emitter, 1 << 7);
        emitter.bind(label).unwrap();

        let code = emitter.build().unwrap();
        let insn = insn_at(&code, 0);
        assert_eq!(insn.opcode(), widened, "{narrow}");
        assert_eq!(
            insn.jump_offset(),
            Some(emitter.label_pc(label).unwrap() as i64)
        );
    }
}

#[test]
fn test_widening_to_32_bits() {
    let mut emitter = BytecodeEmitter::new();
    let label = emitter.create_label();
    emitter.jmp(label).unwrap();
    filler(&mut emitter, 40_000);
    emitter.bind(label).unwrap();

    let code = emitter.build().unwrap();
    assert_eq!(insn_at(&code, 0).opcode(), Opcode::JmpImm32);
    assert_lands_on(&emitter, label, 0);
    assert_eq!(emitter.label_pc(label), Some(40_005));
}

#[test]
fn test_labels_before_growth_do_not_move() {
    let mut emitter = BytecodeEmitter::new();
    let early = emitter.create_label();
    let late = emitter.create_label();
    emitter.nop().unwrap();
    emitter.bind(early).unwrap();
    emitter.jmp(late).unwrap();
    filler(&mut emitter, 300);
    emitter.bind(late).unwrap();
    emitter.jmp(early).unwrap();

    emitter.build().unwrap();
    assert_eq!(emitter.label_pc(early), Some(1));
    assert_eq!(emitter.label_pc(late), Some(1 + 3 + 300));
    for (pc, label) in emitter.branches().collect::<Vec<_>>() {
        assert_lands_on(&emitter, label, pc);
    }
}

#[test]
fn test_cascading_chain() {
    // Each branch jumps just past the next one; every widening pushes the
    // previous branch's distance further.
    let mut emitter = BytecodeEmitter::new();
    let labels: Vec<Label> = (0..6).map(|_| emitter.create_label()).collect();
    emitter.jmp(labels[0]).unwrap();
    for i in 0..labels.len() {
        filler(&mut emitter, 62);
        if i + 1 < labels.len() {
            emitter.jmp(labels[i + 1]).unwrap();
        }
        emitter.bind(labels[i]).unwrap();
    }

    let first = emitter.build().unwrap();
    for (pc, label) in emitter.branches().collect::<Vec<_>>() {
        assert_lands_on(&emitter, label, pc);
    }
    assert_eq!(emitter.build().unwrap(), first);
}

// =============================================================================
// Far jumps
// =============================================================================

#[test]
fn test_far_jump_for_every_compare_family() {
    let families = [
        (Opcode::JeqV8Imm8, Opcode::JneV8Imm8),
        (Opcode::JneV8Imm8, Opcode::JeqV8Imm8),
        (Opcode::JltV8Imm8, Opcode::JgeV8Imm8),
        (Opcode::JgeV8Imm8, Opcode::JltV8Imm8),
        (Opcode::JgtV8Imm8, Opcode::JleV8Imm8),
        (Opcode::JleV8Imm8, Opcode::JgtV8Imm8),
    ];
    for (original, inverted) in families {
        let mut emitter = BytecodeEmitter::new();
        let label = emitter.create_label();
        emitter.emit_jump(original, &[9], label).unwrap();
        filler(&mut emitter, 1 << 16);
        emitter.bind(label).unwrap();

        let code = emitter.build().unwrap();
        let cond = insn_at(&code, 0);
        assert_eq!(cond.opcode(), inverted, "{original}");
        assert_eq!(cond.operand(0), Some(9));

        let far_pc = cond.size() as u32;
        let far = insn_at(&code, far_pc);
        assert_eq!(far.opcode(), Opcode::JmpImm32);
        assert_eq!(
            cond.jump_offset(),
            Some((cond.size() + far.size()) as i64)
        );
        assert_lands_on(&emitter, label, far_pc);
    }
}

#[test]
fn test_far_jump_keeps_widened_compare() {
    // A 16-bit compare that still cannot reach keeps its width.
    let mut emitter = BytecodeEmitter::new();
    let label = emitter.create_label();
    emitter.emit_jump(Opcode::JeqV8Imm16, &[1], label).unwrap();
    filler(&mut emitter, 50_000);
    emitter.bind(label).unwrap();

    let code = emitter.build().unwrap();
    let cond = insn_at(&code, 0);
    assert_eq!(cond.opcode(), Opcode::JneV8Imm16);
    assert_eq!(cond.jump_offset(), Some(9));
    assert_lands_on(&emitter, label, 4);
}

// =============================================================================
// Failure modes
// =============================================================================

#[test]
fn test_unbound_label_leaves_buffer_untouched() {
    let mut emitter = BytecodeEmitter::new();
    let missing = emitter.create_label();
    let other = emitter.create_label();
    emitter.jmp(missing).unwrap();
    emitter.jmp(other).unwrap();
    emitter.jeq(0, missing).unwrap();
    filler(&mut emitter, 500);
    emitter.bind(other).unwrap();

    let snapshot = emitter.code().to_vec();
    let result = emitter.build();
    assert_eq!(result, Err(EmitError::UnboundLabels { count: 2 }));
    assert_eq!(ErrorCode::of(&result), ErrorCode::UnboundLabels);
    assert_eq!(emitter.code(), snapshot.as_slice());

    // Binding the label afterwards makes the same emitter buildable.
    emitter.bind(missing).unwrap();
    assert_eq!(ErrorCode::of(&emitter.build()), ErrorCode::Success);
}

#[test]
fn test_double_bind_is_an_internal_error() {
    let mut emitter = BytecodeEmitter::new();
    let label = emitter.create_label();
    emitter.bind(label).unwrap();
    let result = emitter.bind(label);
    assert_eq!(result, Err(EmitError::LabelAlreadyBound(label)));
    assert_eq!(ErrorCode::of(&result), ErrorCode::InternalError);
}

// =============================================================================
// Idempotence
// =============================================================================

#[test]
fn test_build_twice_is_identical() {
    let mut emitter = BytecodeEmitter::new();
    let labels: Vec<Label> = (0..5).map(|_| emitter.create_label()).collect();
    emitter.bind(labels[0]).unwrap();
    emitter.jeqz(labels[3]).unwrap();
    emitter.jgt(1, labels[4]).unwrap();
    filler(&mut emitter, 120);
    emitter.bind(labels[1]).unwrap();
    emitter.jmp(labels[2]).unwrap();
    filler(&mut emitter, 33_000);
    emitter.bind(labels[2]).unwrap();
    emitter.jle(1, labels[1]).unwrap();
    emitter.jnez(labels[0]).unwrap();
    emitter.bind(labels[3]).unwrap();
    filler(&mut emitter, 7);
    emitter.bind(labels[4]).unwrap();
    emitter.return_value().unwrap();

    let first = emitter.build().unwrap();
    let second = emitter.build().unwrap();
    assert_eq!(first, second);
    for (pc, label) in emitter.branches().collect::<Vec<_>>() {
        assert_lands_on(&emitter, label, pc);
    }
}
