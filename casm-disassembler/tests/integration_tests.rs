//! Integration tests for the CASM disassembler
//!
//! Tests the complete disassembly workflow including:
//! - Decoding assembler output
//! - Output formatting that assembles back to the same words
//! - Error handling for invalid encodings

use casm_assembler::{assemble, assemble_with, encode, TypeTable};
use casm_disassembler::{
    decode, decode_program, decode_program_with, decode_with, disassemble, format,
    recover_symbolic_tag, DisassemblerError,
};
use casm_spec::{
    encoding::{FLAGS_SHIFT, OPCODE_SHIFT, PC_UPDATE_SHIFT, RES_SHIFT},
    Config, EncodingVersion, Felt252, Res,
};

const SAMPLE: &str = r#"
main:
    [ap] = 1000; ap++
    [ap] = [fp - 3] + 5; ap++
    [ap] = [fp - 3] * [fp - 4]; ap++
    [ap] = [[fp - 3] + 2]; ap++
    [ap] = [ap - 1] - 1; ap++
    [ap] = symbolic(felt, 'sym0'); ap++
    verify [ap - 1] != 0
    verify [fp - 3] != 7
    call helper
    jmp main if [ap - 1] != 0
    ap += 3
    jmp abs 0
    ret
helper:
    ret
"#;

// ============================================================================
// Decoding Assembler Output
// ============================================================================

#[test]
fn test_decode_every_assembled_instruction() {
    let program = assemble(SAMPLE).unwrap();
    let decoded = decode_program(&program.data).unwrap();
    let expected = casm_assembler::lower(SAMPLE).unwrap();

    assert_eq!(decoded.len(), expected.len());
    for (d, e) in decoded.iter().zip(&expected) {
        assert_eq!(d.pc, e.pc);
        assert_eq!(d.instruction, e.instruction);
        assert_eq!(d.word, encode(&e.instruction).unwrap().word);
    }
}

#[test]
fn test_decode_is_independent_of_labels_and_debug_info() {
    let config = Config::DEFAULT.with_debug_info(false);
    let program = assemble_with(SAMPLE, &config, &TypeTable::new()).unwrap();
    assert!(program.debug_info.is_empty());
    assert_eq!(decode_program(&program.data).unwrap().len(), 16);
}

#[test]
fn test_recover_tags_from_assembled_program() {
    let program = assemble(SAMPLE).unwrap();
    let tags: Vec<String> = decode_program(&program.data)
        .unwrap()
        .iter()
        .filter_map(|d| recover_symbolic_tag(&d.instruction).unwrap())
        .collect();
    assert_eq!(tags, vec!["sym0".to_string()]);
}

// ============================================================================
// Formatting
// ============================================================================

#[test]
fn test_formatted_program_reassembles_identically() {
    let program = assemble(SAMPLE).unwrap();
    let text: Vec<String> = decode_program(&program.data)
        .unwrap()
        .iter()
        .map(|d| format(&d.instruction))
        .collect();
    let reassembled = assemble(&text.join("\n")).unwrap();
    assert_eq!(reassembled.data, program.data);
}

#[test]
fn test_format_sugar() {
    let program = assemble("verify [ap - 1] != 0").unwrap();
    let text: Vec<String> = decode_program(&program.data)
        .unwrap()
        .iter()
        .map(|d| format(&d.instruction))
        .collect();
    assert_eq!(text, vec!["jmp rel 4 if [ap - 1] != 0", "[ap - 1] = 1"]);
}

#[test]
fn test_format_label_targets_as_offsets() {
    let program = assemble("start:\nret\njmp start").unwrap();
    let decoded = decode_program(&program.data).unwrap();
    assert_eq!(format(&decoded[1].instruction), "jmp rel -1");
}

// ============================================================================
// Listing
// ============================================================================

#[test]
fn test_listing() {
    let program = assemble(SAMPLE).unwrap();
    let listing = disassemble(&program);

    assert!(listing.contains("main:"));
    assert!(listing.contains("helper:"));
    assert!(listing.contains("[ap] = symbolic(felt, 'sym0'); ap++  # tag: 'sym0'"));
    assert!(listing.contains("call rel"));
    assert!(!listing.contains("ERROR"));
    assert_eq!(listing.lines().filter(|l| l.starts_with("00")).count(), 16);
}

#[test]
fn test_listing_of_legacy_program() {
    let source = "[ap] = 1000; ap++\nverify [ap - 1] != 0\nret";
    let program = assemble_with(source, &Config::LEGACY, &TypeTable::new()).unwrap();
    let listing = disassemble(&program);
    assert!(listing.contains("Legacy"));
    assert!(!listing.contains("ERROR"));
}

// ============================================================================
// Invalid Encodings
// ============================================================================

#[test]
fn test_symbolic_word_rejected_by_legacy_decoder() {
    let program = assemble("[ap] = symbolic(felt, 'x'); ap++").unwrap();
    assert!(matches!(
        decode_program_with(&program.data, EncodingVersion::Legacy),
        Err(DisassemblerError::UndefinedPattern { field: "res", bits: 0b11, .. })
    ));
    assert!(decode_program_with(&program.data, EncodingVersion::Symbolic).is_ok());
}

#[test]
fn test_every_undefined_res_pattern_rejected() {
    let base = 0x4806_8001_7fff_8000u64;
    let cleared = base & !(0b11 << (FLAGS_SHIFT + RES_SHIFT));
    for bits in 0..4u64 {
        let word = cleared | (bits << (FLAGS_SHIFT + RES_SHIFT));
        let legacy = decode_with(word, Some(Felt252::ONE), EncodingVersion::Legacy);
        let current = decode_with(word, Some(Felt252::ONE), EncodingVersion::Symbolic);
        if bits == 0b11 {
            assert!(legacy.is_err());
            assert_eq!(current.unwrap().res, Res::Symbolic);
        } else {
            assert_eq!(legacy, current);
        }
    }
}

#[test]
fn test_undefined_pc_update_rejected() {
    let word = 0x4806_8001_7fff_8000u64 | (0b011 << (FLAGS_SHIFT + PC_UPDATE_SHIFT));
    assert!(matches!(
        decode(word, Some(Felt252::ONE)),
        Err(DisassemblerError::UndefinedPattern { field: "pc_update", .. })
    ));
}

#[test]
fn test_undefined_opcode_rejected() {
    let word = 0x4806_8001_7fff_8000u64 | (0b011 << (FLAGS_SHIFT + OPCODE_SHIFT));
    assert!(matches!(
        decode(word, Some(Felt252::ONE)),
        Err(DisassemblerError::UndefinedPattern { field: "opcode", .. })
    ));
}

#[test]
fn test_word_wider_than_63_bits() {
    let words = [Felt252::from_u64(u64::MAX)];
    assert!(matches!(
        decode_program(&words),
        Err(DisassemblerError::WordOutOfRange(_))
    ));
    let listing = disassemble(&{
        let mut program = casm_spec::Program::new(EncodingVersion::CURRENT);
        program.data = words.to_vec();
        program
    });
    assert!(listing.contains("does not fit in 63 bits"));
}
