//! End-to-end evaluation through the full cryptographic envelope.

use sealvm::builder::{input_producer, LlmiSpec, Operand, ProgramBuilder, SnippetBuilder};
use sealvm::params::{LLMI_MAX_OUTPUTS, REGISTER_COUNT, SHAREDKEY_BYTES};
use sealvm::vm::Op;
use sealvm::{driver, Error, SeKeys, Word};

/// First output register.
const OUT: u32 = (REGISTER_COUNT - LLMI_MAX_OUTPUTS) as u32;

fn setup() -> (SeKeys, [u8; SHAREDKEY_BYTES]) {
    (SeKeys::generate(), [0x42; SHAREDKEY_BYTES])
}

#[test]
fn mov_immediate_reveals_constant() {
    let (keys, ks) = setup();
    let mut prog = ProgramBuilder::new(2, ks);
    let widths = prog.widths();

    let mut asm = SnippetBuilder::new(&widths);
    asm.op(Op::Mov, OUT, &[Operand::Imm(0xDEAD_BEEF)]);
    prog.inputs(&[1]).outputs(&[0]).llmi(LlmiSpec {
        mem_inputs: vec![],
        mem_outputs: vec![0],
        instr_id: 1000,
        reveal: true,
        input_ids: vec![],
        code: asm.finish(),
    });

    let bytecode = prog.build(keys.public()).unwrap();
    let out = driver::run(&bytecode, &[0], 1, &keys).unwrap();
    assert_eq!(out, vec![3735928559]);
}

#[test]
fn add_wraps_around() {
    let (keys, ks) = setup();
    let mut prog = ProgramBuilder::new(3, ks);
    let widths = prog.widths();

    let mut asm = SnippetBuilder::new(&widths);
    asm.op(Op::Add, OUT, &[Operand::Reg(0), Operand::Reg(1)]);
    prog.inputs(&[0, 1]).outputs(&[2]).llmi(LlmiSpec {
        mem_inputs: vec![0, 1],
        mem_outputs: vec![2],
        instr_id: 1000,
        reveal: true,
        input_ids: vec![input_producer(0), input_producer(1)],
        code: asm.finish(),
    });

    let bytecode = prog.build(keys.public()).unwrap();
    let out = driver::run(&bytecode, &[4294967295, 1], 1, &keys).unwrap();
    assert_eq!(out, vec![0]);
}

/// High word of the 32x32 product out of 16-bit partial products,
/// mirroring the reference multiply-high routine.
fn msb32_snippet(widths: &sealvm::container::Widths) -> Vec<u8> {
    use Operand::{Imm, Reg};
    let lo = Imm(0xFFFF);
    let sh = Imm(16);
    let mut asm = SnippetBuilder::new(widths);
    // x in r0, y in r1
    asm.op(Op::And, 2, &[Reg(0), lo]) // x_lo
        .op(Op::And, 3, &[Reg(1), lo]) // y_lo
        .op(Op::Mul, 4, &[Reg(2), Reg(3)]) // t = x_lo * y_lo
        .op(Op::Lsr, 5, &[Reg(0), sh]) // x_hi
        .op(Op::Mul, 6, &[Reg(5), Reg(3)])
        .op(Op::Lsr, 7, &[Reg(4), sh])
        .op(Op::Add, 4, &[Reg(6), Reg(7)]) // t = x_hi*y_lo + t>>16
        .op(Op::And, 8, &[Reg(4), lo]) // z1
        .op(Op::Lsr, 9, &[Reg(4), sh]) // z2
        .op(Op::Lsr, 10, &[Reg(1), sh]) // y_hi
        .op(Op::Mul, 11, &[Reg(2), Reg(10)])
        .op(Op::Add, 4, &[Reg(8), Reg(11)]) // t = z1 + x_lo*y_hi
        .op(Op::Mul, 12, &[Reg(5), Reg(10)])
        .op(Op::Lsr, 13, &[Reg(4), sh])
        .op(Op::Add, 14, &[Reg(9), Reg(12)])
        .op(Op::Add, 4, &[Reg(14), Reg(13)]) // t = z2 + x_hi*y_hi + t>>16
        .op(Op::And, 9, &[Reg(4), lo]) // z2
        .op(Op::Lsr, 15, &[Reg(4), sh]) // z3
        .op(Op::Lsl, 16, &[Reg(15), sh])
        .op(Op::Or, OUT, &[Reg(16), Reg(9)]);
    asm.finish()
}

fn run_msb32(keys: &SeKeys, ks: [u8; SHAREDKEY_BYTES], x: Word, y: Word) -> Word {
    let mut prog = ProgramBuilder::new(3, ks);
    let widths = prog.widths();
    prog.inputs(&[0, 1]).outputs(&[2]).llmi(LlmiSpec {
        mem_inputs: vec![0, 1],
        mem_outputs: vec![2],
        instr_id: 1000,
        reveal: true,
        input_ids: vec![input_producer(0), input_producer(1)],
        code: msb32_snippet(&widths),
    });
    let bytecode = prog.build(keys.public()).unwrap();
    driver::run(&bytecode, &[x, y], 1, keys).unwrap()[0]
}

#[test]
fn multiply_high_reference_values() {
    let (keys, ks) = setup();
    assert_eq!(run_msb32(&keys, ks, 2863311530, 1431655765), 954437176);
}

#[test]
fn multiply_high_matches_wide_product() {
    let (keys, ks) = setup();
    for &(x, y) in &[
        (0u32, 0u32),
        (1, u32::MAX),
        (u32::MAX, u32::MAX),
        (0x1234_5678, 0x9ABC_DEF0),
        (65537, 65521),
    ] {
        let expect = ((u64::from(x) * u64::from(y)) >> 32) as Word;
        assert_eq!(run_msb32(&keys, ks, x, y), expect, "{x} * {y}");
    }
}

/// Identity program: one LLMI moving input `k` to a revealed output.
fn identity_program(
    keys: &SeKeys,
    ks: [u8; SHAREDKEY_BYTES],
    n: usize,
    k: usize,
) -> Vec<u8> {
    let mut prog = ProgramBuilder::new(n as u32 + 1, ks);
    let widths = prog.widths();

    let input_cells: Vec<u32> = (1..=n as u32).collect();
    let mut asm = SnippetBuilder::new(&widths);
    asm.op(Op::Mov, OUT, &[Operand::Reg(0)]);
    prog.inputs(&input_cells).outputs(&[0]).llmi(LlmiSpec {
        mem_inputs: vec![input_cells[k]],
        mem_outputs: vec![0],
        instr_id: 1000,
        reveal: true,
        input_ids: vec![input_producer(k)],
        code: asm.finish(),
    });
    prog.build(keys.public()).unwrap()
}

#[test]
fn single_input_single_batch() {
    let (keys, ks) = setup();
    let bytecode = identity_program(&keys, ks, 1, 0);
    assert_eq!(driver::run(&bytecode, &[77], 1, &keys).unwrap(), vec![77]);
}

#[test]
fn input_count_exactly_one_batch() {
    let (keys, ks) = setup();
    let bytecode = identity_program(&keys, ks, 16, 15);
    let inputs: Vec<Word> = (100..116).collect();
    assert_eq!(
        driver::run(&bytecode, &inputs, 1, &keys).unwrap(),
        vec![115]
    );
}

#[test]
fn inputs_spanning_batches() {
    let (keys, ks) = setup();
    // 20 inputs: two batches, second one zero-padded. Input 17 has
    // producer (batch 2, position 1).
    let bytecode = identity_program(&keys, ks, 20, 17);
    let inputs: Vec<Word> = (200..220).collect();
    assert_eq!(
        driver::run(&bytecode, &inputs, 1, &keys).unwrap(),
        vec![217]
    );
}

#[test]
fn sealed_intermediate_then_reveal() {
    let (keys, ks) = setup();
    let mut prog = ProgramBuilder::new(4, ks);
    let widths = prog.widths();

    // First stage sums the inputs and re-seals its output.
    let mut sum = SnippetBuilder::new(&widths);
    sum.op(Op::Add, OUT, &[Operand::Reg(0), Operand::Reg(1)]);
    // Second stage consumes the sealed word and reveals it.
    let mut reveal = SnippetBuilder::new(&widths);
    reveal.op(Op::Mov, OUT, &[Operand::Reg(0)]);

    prog.inputs(&[0, 1])
        .outputs(&[3])
        .llmi(LlmiSpec {
            mem_inputs: vec![0, 1],
            mem_outputs: vec![2],
            instr_id: 100,
            reveal: false,
            input_ids: vec![input_producer(0), input_producer(1)],
            code: sum.finish(),
        })
        .llmi(LlmiSpec {
            mem_inputs: vec![2],
            mem_outputs: vec![3],
            instr_id: 101,
            reveal: true,
            input_ids: vec![sealvm::container::ProducerId {
                instr_id: 100,
                output_id: 0,
            }],
            code: reveal.finish(),
        });

    let bytecode = prog.build(keys.public()).unwrap();
    assert_eq!(driver::run(&bytecode, &[5, 6], 1, &keys).unwrap(), vec![11]);
}

#[test]
fn zero_llmi_program_runs() {
    let (keys, ks) = setup();
    let mut prog = ProgramBuilder::new(1, ks);
    prog.inputs(&[0]).outputs(&[0]);
    let bytecode = prog.build(keys.public()).unwrap();

    // The output cell holds the sealed input ciphertext; its word
    // prefix is meaningless but deterministic.
    let a = driver::run(&bytecode, &[9], 1, &keys).unwrap();
    let b = driver::run(&bytecode, &[9], 1, &keys).unwrap();
    assert_eq!(a.len(), 1);
    assert_eq!(a, b);
}

#[test]
fn empty_snippet_is_valid() {
    let (keys, ks) = setup();
    let mut prog = ProgramBuilder::new(2, ks);
    prog.inputs(&[1]).outputs(&[0]).llmi(LlmiSpec {
        mem_inputs: vec![],
        mem_outputs: vec![0],
        instr_id: 1000,
        reveal: true,
        input_ids: vec![],
        code: Vec::new(),
    });
    let bytecode = prog.build(keys.public()).unwrap();
    // Zero instructions: the output register still holds zero.
    assert_eq!(driver::run(&bytecode, &[3], 1, &keys).unwrap(), vec![0]);
}

#[test]
fn input_count_mismatch_rejected() {
    let (keys, ks) = setup();
    let bytecode = identity_program(&keys, ks, 2, 0);
    assert_eq!(
        driver::run(&bytecode, &[1], 1, &keys),
        Err(Error::InputCountMismatch {
            provided: 1,
            required: 2,
        })
    );
}

#[test]
fn output_count_mismatch_rejected() {
    let (keys, ks) = setup();
    let bytecode = identity_program(&keys, ks, 1, 0);
    assert_eq!(
        driver::run(&bytecode, &[1], 3, &keys),
        Err(Error::OutputCountMismatch {
            provided: 3,
            required: 1,
        })
    );
}
