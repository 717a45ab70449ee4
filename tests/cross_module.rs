//! Cross-module interaction tests
//!
//! Properties that span the encoder in the assembler and the decoder in the
//! disassembler: round-trips, backward compatibility of the res table and
//! tag recovery.

use casm_assembler::{encode, encode_with, lower};
use casm_disassembler::{decode, decode_with, recover_symbolic_tag};
use casm_spec::encoding::{FLAGS_SHIFT, RES_MASK, RES_SHIFT};
use casm_spec::{
    short_string, ApUpdate, EncodingVersion, Felt252, FieldError, Instruction, Op1Addr, Opcode,
    PcUpdate, Register, Res, OFFSET_MAX, OFFSET_MIN,
};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn felt() -> impl Strategy<Value = Felt252> {
    prop_oneof![
        any::<u64>().prop_map(Felt252::from_u64),
        any::<i64>().prop_map(Felt252::from_i64),
        any::<[u8; 32]>().prop_map(|mut bytes| {
            // Below 2^251, always canonical
            bytes[0] &= 0x07;
            Felt252::from_bytes_be(&bytes).unwrap()
        }),
    ]
}

fn register() -> impl Strategy<Value = Register> {
    prop_oneof![Just(Register::Ap), Just(Register::Fp)]
}

fn offset() -> impl Strategy<Value = i32> {
    OFFSET_MIN..=OFFSET_MAX
}

/// Any instruction that passes `validate` for the current encoding
fn legal_instruction() -> impl Strategy<Value = Instruction> {
    let opcode = prop_oneof![
        Just(Opcode::Nop),
        Just(Opcode::AssertEq),
        Just(Opcode::Call),
        Just(Opcode::Ret)
    ];
    let op1_addr = prop_oneof![
        Just(Op1Addr::Imm),
        Just(Op1Addr::Ap),
        Just(Op1Addr::Fp),
        Just(Op1Addr::Op0)
    ];
    let pc_update = prop_oneof![
        Just(PcUpdate::Regular),
        Just(PcUpdate::Jump),
        Just(PcUpdate::JumpRel),
        Just(PcUpdate::Jnz)
    ];
    let res = prop_oneof![Just(Res::Op1), Just(Res::Add), Just(Res::Mul), Just(Res::Symbolic)];
    let ap_update = prop_oneof![Just(ApUpdate::Regular), Just(ApUpdate::Add), Just(ApUpdate::Add1)];

    (
        (offset(), offset(), offset()),
        (register(), register()),
        (op1_addr, res, pc_update, ap_update, opcode),
        felt(),
    )
        .prop_map(|((off0, off1, off2), (dst, op0), (op1_addr, res, pc_update, ap_update, opcode), imm)| {
            let (res, opcode, op1_addr) = match (res, pc_update) {
                (_, PcUpdate::Jnz) => (Res::Unconstrained, opcode, op1_addr),
                (Res::Symbolic, _) => (Res::Symbolic, Opcode::AssertEq, Op1Addr::Imm),
                (res, _) => (res, opcode, op1_addr),
            };
            let ap_update = if opcode == Opcode::Call {
                ApUpdate::Add2
            } else {
                ap_update
            };
            Instruction {
                off0,
                off1,
                off2,
                imm: (op1_addr == Op1Addr::Imm).then_some(imm),
                dst_register: dst,
                op0_register: op0,
                op1_addr,
                res,
                pc_update,
                ap_update,
                fp_update: opcode.implied_fp_update(),
                opcode,
            }
        })
}

fn deref() -> impl Strategy<Value = String> {
    (prop_oneof![Just("ap"), Just("fp")], -100i32..100).prop_map(|(reg, off)| match off {
        0 => format!("[{}]", reg),
        o if o < 0 => format!("[{} - {}]", reg, -o),
        o => format!("[{} + {}]", reg, o),
    })
}

fn operand() -> impl Strategy<Value = String> {
    prop_oneof![
        deref(),
        (0u32..1000).prop_map(|v| v.to_string()),
        "[a-z]{1,4}".prop_map(|s| format!("'{}'", s)),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_decode_inverts_encode(instr in legal_instruction()) {
        let encoded = encode(&instr).unwrap();
        let decoded = decode(encoded.word, encoded.imm).unwrap();
        prop_assert_eq!(decoded, instr);
    }

    #[test]
    fn prop_reencoding_is_idempotent(instr in legal_instruction()) {
        let first = encode(&instr).unwrap();
        let decoded = decode(first.word, first.imm).unwrap();
        let second = encode(&decoded).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_legacy_instructions_encode_identically(instr in legal_instruction()) {
        prop_assume!(instr.res != Res::Symbolic);
        let legacy = encode_with(&instr, EncodingVersion::Legacy).unwrap();
        let current = encode_with(&instr, EncodingVersion::Symbolic).unwrap();
        prop_assert_eq!(legacy, current);
        prop_assert_eq!(decode_with(legacy.word, legacy.imm, EncodingVersion::Legacy).unwrap(), instr);
    }

    #[test]
    fn prop_tag_recovered_after_assembly(tag in "[ -&(-~]{0,31}") {
        let source = format!("[ap] = symbolic(felt, '{}'); ap++", tag);
        let program = casm_assembler::assemble(&source).unwrap();
        let word = program.data[0].to_u64().unwrap();
        let instr = decode(word, program.data.get(1).copied()).unwrap();
        prop_assert_eq!(instr.res, Res::Symbolic);
        prop_assert_eq!(recover_symbolic_tag(&instr).unwrap(), Some(tag.clone()));
        prop_assert_eq!(short_string::decode(short_string::encode(&tag).unwrap()).unwrap(), tag);
    }

    #[test]
    fn prop_verify_is_assert(lhs in deref(), rhs in operand(), not_equal in any::<bool>()) {
        let op = if not_equal { "!=" } else { "==" };
        let verify = lower(&format!("verify {} {} {}", lhs, op, rhs)).unwrap();
        let assert = lower(&format!("assert {} {} {}", lhs, op, rhs)).unwrap();
        let verify: Vec<_> = verify.iter().map(|l| l.instruction).collect();
        let assert: Vec<_> = assert.iter().map(|l| l.instruction).collect();
        prop_assert_eq!(verify, assert);
    }
}

// ============================================================================
// Exhaustive Backward Compatibility
// ============================================================================

/// Every flags value with the reserved bit clear, fixed offsets
fn all_words() -> impl Iterator<Item = u64> {
    (0u64..1 << 15).map(|flags| (flags << FLAGS_SHIFT) | 0x8001_7fff_8000)
}

fn res_bits(word: u64) -> u64 {
    (word >> (FLAGS_SHIFT + RES_SHIFT)) & RES_MASK
}

#[test]
fn test_new_decoder_agrees_with_legacy_decoder() {
    let imm = Some(Felt252::from_u64(7));
    let mut legacy_valid = 0;
    for word in all_words() {
        let legacy = decode_with(word, imm, EncodingVersion::Legacy);
        let current = decode_with(word, imm, EncodingVersion::Symbolic);

        if res_bits(word) == 0b11 {
            assert!(legacy.is_err(), "{:#018x} decoded under the legacy table", word);
            if let Ok(instr) = current {
                assert_eq!(instr.res, Res::Symbolic);
            }
            continue;
        }

        assert_eq!(legacy, current, "{:#018x}", word);
        if let Ok(instr) = legacy {
            legacy_valid += 1;
            assert_ne!(instr.res, Res::Symbolic);
            // Old and new encoders write the word back bit for bit
            assert_eq!(encode_with(&instr, EncodingVersion::Legacy).unwrap().word, word);
            assert_eq!(encode_with(&instr, EncodingVersion::Symbolic).unwrap().word, word);
        }
    }
    assert!(legacy_valid > 0);
}

#[test]
fn test_exactly_one_new_pattern_decodes_to_symbolic() {
    let imm = Some(Felt252::from_u64(7));
    let mut symbolic = 0;
    for word in all_words() {
        if let Ok(instr) = decode_with(word, imm, EncodingVersion::Symbolic) {
            if instr.res == Res::Symbolic {
                assert_eq!(res_bits(word), 0b11);
                assert_eq!(instr.opcode, Opcode::AssertEq);
                assert_eq!(instr.op1_addr, Op1Addr::Imm);
                symbolic += 1;
            }
        }
    }
    // Two register bits, three pc updates, three ap updates
    assert_eq!(symbolic, 4 * 3 * 3);
}

#[test]
fn test_pre_existing_res_values_bit_for_bit() {
    let template = Instruction {
        off0: 0,
        off1: -1,
        off2: 1,
        imm: Some(Felt252::from_u64(1000)),
        dst_register: Register::Ap,
        op0_register: Register::Fp,
        op1_addr: Op1Addr::Imm,
        res: Res::Op1,
        pc_update: PcUpdate::Regular,
        ap_update: ApUpdate::Add1,
        fp_update: Opcode::AssertEq.implied_fp_update(),
        opcode: Opcode::AssertEq,
    };
    let cases = [
        (Res::Op1, PcUpdate::Regular, 0x4806_8001_7fff_8000u64),
        (Res::Add, PcUpdate::Regular, 0x4826_8001_7fff_8000),
        (Res::Mul, PcUpdate::Regular, 0x4846_8001_7fff_8000),
        (Res::Unconstrained, PcUpdate::Jnz, 0x4a06_8001_7fff_8000),
    ];
    for (res, pc_update, expected) in cases {
        let instr = Instruction { res, pc_update, ..template };
        let legacy = encode_with(&instr, EncodingVersion::Legacy).unwrap();
        let current = encode_with(&instr, EncodingVersion::Symbolic).unwrap();
        assert_eq!(legacy.word, expected, "{:?}", res);
        assert_eq!(current.word, expected, "{:?}", res);
    }

    let symbolic = Instruction { res: Res::Symbolic, ..template };
    let word = encode(&symbolic).unwrap().word;
    assert_eq!(word, 0x4866_8001_7fff_8000);
    assert_eq!(word ^ 0x4806_8001_7fff_8000, 0b11 << (FLAGS_SHIFT + RES_SHIFT));
    assert_eq!(
        encode_with(&symbolic, EncodingVersion::Legacy),
        Err(FieldError::UnsupportedRes {
            res: Res::Symbolic,
            version: EncodingVersion::Legacy
        })
    );
}
