//! End-to-end tests: source text to words, artifact and listing

use casm_assembler::{assemble, assemble_with, lower, Assembler, AssemblerError, TypeTable};
use casm_disassembler::{decode_program, disassemble, recover_symbolic_tag};
use casm_spec::{
    short_string, ApUpdate, CasmError, Config, EncodingVersion, Felt252, FpUpdate, Op1Addr,
    Opcode, PcUpdate, Program, Register, Res,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn words(values: &[u64]) -> Vec<Felt252> {
    values.iter().map(|&v| Felt252::from_u64(v)).collect()
}

// ============================================================================
// Concrete Scenarios
// ============================================================================

#[test]
fn test_verify_program_matches_assert_program() {
    init_tracing();
    let with_verify = r#"
        [ap] = 1000; ap++
        verify [ap-1] != 0
        ret
    "#;
    let with_assert = r#"
        [ap] = 1000; ap++
        assert [ap-1] != 0
        ret
    "#;

    let verify = assemble(with_verify).unwrap();
    let assert = assemble(with_assert).unwrap();
    assert_eq!(verify.data, assert.data);
    assert_eq!(
        verify.data,
        words(&[
            0x4806_8001_7fff_8000,
            1000,
            0x0206_8001_7fff_7fff,
            4,
            0x4006_8001_7fff_7fff,
            1,
            0x208b_7fff_7fff_7ffe,
        ])
    );

    let lowered: Vec<_> = lower(with_verify).unwrap().iter().map(|l| l.instruction).collect();
    let expected: Vec<_> = lower(with_assert).unwrap().iter().map(|l| l.instruction).collect();
    assert_eq!(lowered, expected);
}

#[test]
fn test_symbolic_load_scenario() {
    init_tracing();
    let program = assemble("[ap] = symbolic(felt, 'sym0'); ap++").unwrap();
    let decoded = decode_program(&program.data).unwrap();
    assert_eq!(decoded.len(), 1);
    let instr = decoded[0].instruction;

    assert_eq!(instr.res, Res::Symbolic);
    assert_eq!(short_string::decode(instr.imm.unwrap()).unwrap(), "sym0");
    assert_eq!(recover_symbolic_tag(&instr).unwrap().as_deref(), Some("sym0"));

    assert_eq!((instr.off0, instr.off1, instr.off2), (0, -1, 1));
    assert_eq!(instr.dst_register, Register::Ap);
    assert_eq!(instr.op0_register, Register::Fp);
    assert_eq!(instr.op1_addr, Op1Addr::Imm);
    assert_eq!(instr.pc_update, PcUpdate::Regular);
    assert_eq!(instr.ap_update, ApUpdate::Add1);
    assert_eq!(instr.fp_update, FpUpdate::Regular);
    assert_eq!(instr.opcode, Opcode::AssertEq);

    let literal = decode_program(&assemble("[ap] = 'sym0'; ap++").unwrap().data).unwrap();
    assert_eq!(literal[0].instruction.res, Res::Op1);
    assert_eq!(
        casm_spec::Instruction {
            res: Res::Op1,
            ..instr
        },
        literal[0].instruction
    );
}

// ============================================================================
// Full Pipeline
// ============================================================================

#[test]
fn test_artifact_roundtrip_and_listing() {
    init_tracing();
    let source = r#"
        # Inputs are symbolic, the loop bound is not
        main:
        [ap] = symbolic(felt, 'x'); ap++
        [ap] = symbolic(felt*, 'ptr'); ap++
        verify [ap - 2] != 0
        [ap] = 3; ap++
        loop:
        [ap] = [ap - 1] - 1; ap++
        jmp loop if [ap - 1] != 0
        ret
    "#;
    let program = assemble(source).unwrap();
    let bytes = program.to_bytes().unwrap();
    let loaded = Program::from_bytes(&bytes).unwrap();
    assert_eq!(loaded, program);
    assert_eq!(loaded.checksum(), program.checksum());

    let tags: Vec<_> = decode_program(&loaded.data)
        .unwrap()
        .iter()
        .filter_map(|d| recover_symbolic_tag(&d.instruction).unwrap())
        .collect();
    assert_eq!(tags, vec!["x".to_string(), "ptr".to_string()]);

    let listing = disassemble(&loaded);
    assert!(listing.contains("main:"));
    assert!(listing.contains("loop:"));
    assert!(listing.contains("# tag: 'ptr'"));
}

#[test]
fn test_tampered_artifact_rejected() {
    let program = assemble("[ap] = symbolic(felt, 'x'); ap++\nret").unwrap();
    let mut bytes = program.to_bytes().unwrap();
    // First byte of the stored checksum
    bytes[8] ^= 1;
    assert!(matches!(
        Program::from_bytes(&bytes),
        Err(CasmError::ChecksumMismatch)
    ));
}

#[test]
fn test_word_stream_roundtrip() {
    let program = assemble("[ap] = -1; ap++\nret").unwrap();
    let stream = program.to_word_bytes();
    assert_eq!(stream.len(), 3 * 32);
    assert_eq!(Program::words_from_bytes(&stream).unwrap(), program.data);
}

#[test]
fn test_user_types_and_custom_config() {
    init_tracing();
    let mut types = TypeTable::new();
    types.register_struct("Point");
    let config = Config::new(8, EncodingVersion::CURRENT, false).unwrap();
    let assembler = Assembler::new(&config, &types);

    let program = assembler
        .assemble("[ap] = symbolic(Point*, 'origin'); ap++")
        .unwrap();
    assert!(program.debug_info.is_empty());
    assert_eq!(program.data[0], Felt252::from_u64(0x4866_8001_7fff_8000));

    let err = assembler
        .assemble("[ap] = symbolic(Point*, 'too_long_tag'); ap++")
        .unwrap_err();
    assert!(matches!(err, AssemblerError::Codegen(_)));

    // Without the registration the same source fails
    assert!(assemble("[ap] = symbolic(Point*, 'origin'); ap++").is_err());
}

#[test]
fn test_legacy_toolchain_rejects_symbolic_but_not_verify() {
    let types = TypeTable::new();
    assert!(assemble_with("verify [fp] != 3", &Config::LEGACY, &types).is_ok());
    assert!(assemble_with("[ap] = symbolic(felt, 'x')", &Config::LEGACY, &types).is_err());
}
