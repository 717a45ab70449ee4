//! Tests for malformed input handling in the assembler
//!
//! Every error that comes from source text must carry its line and column.

use casm_assembler::parser::MAX_EXPR_DEPTH;
use casm_assembler::{
    assemble, assemble_with, AssemblerError, CodegenError, ParseError, TypeError, TypeTable,
};
use casm_spec::{Config, EncodingVersion, ShortStringError};

fn parse_error(source: &str) -> ParseError {
    match assemble(source) {
        Err(AssemblerError::Parse(err)) => err,
        other => panic!("expected parse error for {:?}, got {:?}", source, other),
    }
}

fn codegen_error(source: &str) -> CodegenError {
    match assemble(source) {
        Err(AssemblerError::Codegen(err)) => err,
        other => panic!("expected codegen error for {:?}, got {:?}", source, other),
    }
}

// ============================================================================
// verify
// ============================================================================

#[test]
fn test_verify_malformed_relop() {
    let err = parse_error("ret\nverify [ap] = 1");
    assert!(matches!(err, ParseError::UnexpectedToken { .. }));
    assert_eq!(err.span().line, 2);
    assert_eq!(err.span().column, 13);
}

#[test]
fn test_verify_unknown_operator() {
    let err = parse_error("verify [ap] < 1");
    assert!(matches!(err, ParseError::InvalidToken { ref text, .. } if text == "<"));
}

#[test]
fn test_verify_missing_rhs() {
    let err = parse_error("verify [ap] !=");
    assert!(matches!(err, ParseError::UnexpectedEof { .. }));
}

#[test]
fn test_verify_not_terminated() {
    let err = parse_error("verify [ap] != 0 verify [ap] != 1");
    assert!(matches!(err, ParseError::UnexpectedToken { ref expected, .. } if expected == "end of line"));
    assert_eq!(err.span().column, 18);
}

#[test]
fn test_verify_without_memory_operand() {
    let err = codegen_error("verify 1 != 2");
    assert!(matches!(err, CodegenError::InvalidOperand { .. }));
    assert_eq!(err.span().line, 1);
}

// ============================================================================
// symbolic
// ============================================================================

#[test]
fn test_symbolic_missing_comma() {
    let err = parse_error("[ap] = symbolic(felt 'x')");
    assert!(matches!(err, ParseError::UnexpectedToken { ref expected, .. } if expected == "','"));
}

#[test]
fn test_symbolic_missing_paren() {
    assert!(matches!(
        parse_error("[ap] = symbolic(felt, 'x'"),
        ParseError::UnexpectedEof { .. }
    ));
}

#[test]
fn test_symbolic_tag_too_long() {
    let source = format!("[ap] = symbolic(felt, '{}')", "t".repeat(32));
    let err = parse_error(&source);
    assert!(matches!(
        err,
        ParseError::ShortString {
            source: ShortStringError::TooLong { len: 32, max: 31, .. },
            ..
        }
    ));
    // Reported at `symbolic(`, the same place as the configured bound
    assert_eq!(err.span().column, 8);
}

#[test]
fn test_symbolic_tag_non_ascii() {
    let err = parse_error("[ap] = symbolic(felt, 'é')");
    assert!(matches!(
        err,
        ParseError::ShortString {
            source: ShortStringError::NonAscii('é'),
            ..
        }
    ));
}

#[test]
fn test_symbolic_tag_longer_than_configured_bound() {
    let config = Config::new(3, EncodingVersion::CURRENT, true).unwrap();
    let err = assemble_with("[ap] = symbolic(felt, 'abcd')", &config, &TypeTable::new()).unwrap_err();
    assert!(matches!(
        err,
        AssemblerError::Codegen(CodegenError::ShortString {
            source: ShortStringError::TooLong { max: 3, .. },
            ..
        })
    ));
    assert_eq!(err.span().map(|s| s.column), Some(8));
}

#[test]
fn test_symbolic_unknown_type_is_passed_through() {
    let err = codegen_error("ret\n[ap] = symbolic(Missing*, 'm')");
    assert_eq!(
        err.clone(),
        CodegenError::Type(TypeError::UnknownType {
            name: "Missing".to_string(),
            span: err.span(),
        })
    );
    assert_eq!(err.span().line, 2);
    assert_eq!(err.span().column, 17);
    assert_eq!(err.to_string(), "unknown type 'Missing' at 2:17");
}

#[test]
fn test_symbolic_with_legacy_encoding() {
    let err = assemble_with("[ap] = symbolic(felt, 's')", &Config::LEGACY, &TypeTable::new())
        .unwrap_err();
    assert!(matches!(
        err,
        AssemblerError::Codegen(CodegenError::SymbolicUnsupported { .. })
    ));
}

// ============================================================================
// Other statements
// ============================================================================

#[test]
fn test_undefined_label() {
    let err = codegen_error("jmp done");
    assert!(matches!(err, CodegenError::UndefinedLabel { ref name, .. } if name == "done"));
    assert_eq!(err.span().column, 5);
}

#[test]
fn test_duplicate_label() {
    let err = codegen_error("start:\nret\nstart:\nret");
    assert!(matches!(err, CodegenError::DuplicateLabel { .. }));
    assert_eq!(err.span().line, 3);
}

#[test]
fn test_ap_pp_not_allowed() {
    assert!(matches!(parse_error("call rel 2; ap++"), ParseError::InvalidSyntax { .. }));
    assert!(matches!(parse_error("ap += 1; ap++"), ParseError::InvalidSyntax { .. }));
}

#[test]
fn test_conditional_absolute_jump() {
    assert!(matches!(
        parse_error("jmp abs 3 if [ap] != 0"),
        ParseError::InvalidSyntax { .. }
    ));
}

#[test]
fn test_condition_must_compare_to_zero() {
    assert!(matches!(
        parse_error("jmp rel 3 if [ap] != 1"),
        ParseError::InvalidSyntax { .. }
    ));
}

#[test]
fn test_destination_must_be_memory() {
    assert!(matches!(
        codegen_error("5 = [ap]"),
        CodegenError::InvalidOperand { .. }
    ));
    assert!(matches!(
        codegen_error("[[ap]] = 5"),
        CodegenError::InvalidOperand { .. }
    ));
}

#[test]
fn test_offset_out_of_range() {
    let err = codegen_error("[fp + 40000] = 1");
    assert!(matches!(err, CodegenError::OffsetOutOfRange { ref value, .. } if value == "40000"));
}

#[test]
fn test_invalid_character() {
    let err = parse_error("[ap] = 1 $ 2");
    assert!(matches!(err, ParseError::InvalidToken { ref text, .. } if text == "$"));
    assert_eq!(err.span().column, 10);
}

#[test]
fn test_literal_too_large() {
    let source = "[ap] = 0x800000000000011000000000000000000000000000000000000000000000001";
    assert!(matches!(parse_error(source), ParseError::InvalidLiteral { .. }));
}

#[test]
fn test_deeply_nested_parentheses() {
    let source = format!("[ap] = {}1{}", "(".repeat(2000), ")".repeat(2000));
    let err = parse_error(&source);
    assert!(matches!(err, ParseError::InvalidSyntax { .. }));
    // The first parenthesis past the limit
    assert_eq!(err.span().column, 8 + MAX_EXPR_DEPTH);
}

#[test]
fn test_long_unary_minus_chain() {
    let source = format!("[ap] = {}1", "-".repeat(200_000));
    let err = parse_error(&source);
    assert!(matches!(err, ParseError::InvalidSyntax { .. }));
    assert_eq!(err.span().column, 8 + MAX_EXPR_DEPTH);
}

#[test]
fn test_long_operator_chain() {
    let source = format!("[ap] = 1{}", " + 1".repeat(100_000));
    assert!(matches!(parse_error(&source), ParseError::InvalidSyntax { .. }));
}

#[test]
fn test_nesting_within_limit() {
    let source = format!("[ap] = {}7{}; ap++", "(".repeat(200), ")".repeat(200));
    let program = assemble(&source).unwrap();
    assert_eq!(program.data[1], casm_spec::Felt252::from_u64(7));

    let sum = format!("[ap] = 1{}; ap++", " + 1".repeat(199));
    assert_eq!(assemble(&sum).unwrap().data[1], casm_spec::Felt252::from_u64(200));
}

#[test]
fn test_error_display_has_position() {
    let err = assemble("ret\n  jmp").unwrap_err();
    assert!(err.to_string().contains("2:"), "{}", err);
}
