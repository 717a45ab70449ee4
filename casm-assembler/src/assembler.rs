//! Main assembler logic

use crate::codegen::{self, LoweredInstruction};
use crate::encoder::encode_with;
use crate::error::{AssemblerError, Result};
use crate::parser::parse;
use crate::types::TypeTable;
use casm_spec::{Config, InstructionLocation, Program};
use tracing::debug;

/// Source to [`Program`] pipeline with a fixed configuration and type table
#[derive(Debug, Clone)]
pub struct Assembler<'a> {
    config: Config,
    types: &'a TypeTable,
}

impl<'a> Assembler<'a> {
    pub fn new(config: &Config, types: &'a TypeTable) -> Self {
        Self {
            config: *config,
            types,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Parse and lower `source` without encoding it
    pub fn lower(&self, source: &str) -> Result<Vec<LoweredInstruction>> {
        self.config.validate()?;
        let file = parse(source)?;
        let output = codegen::generate(&file, &self.config, self.types)?;
        Ok(output.instructions)
    }

    /// Assemble `source` into a program
    pub fn assemble(&self, source: &str) -> Result<Program> {
        self.config.validate()?;
        let file = parse(source)?;
        let output = codegen::generate(&file, &self.config, self.types)?;

        let mut program = Program::new(self.config.encoding);
        program.labels = output.labels;

        for lowered in &output.instructions {
            let encoded = encode_with(&lowered.instruction, self.config.encoding).map_err(
                |source| AssemblerError::Field {
                    source,
                    span: lowered.span,
                },
            )?;
            program.data.extend(encoded.words());

            if self.config.debug_info {
                program.debug_info.push(InstructionLocation {
                    pc: lowered.pc,
                    line: lowered.span.line,
                    column: lowered.span.column,
                });
            }
        }

        debug!(
            words = program.data.len(),
            instructions = output.instructions.len(),
            encoding = ?self.config.encoding,
            "assembled program"
        );
        Ok(program)
    }
}

/// Assemble with the default configuration and only the built-in types
pub fn assemble(source: &str) -> Result<Program> {
    assemble_with(source, &Config::DEFAULT, &TypeTable::new())
}

pub fn assemble_with(source: &str, config: &Config, types: &TypeTable) -> Result<Program> {
    Assembler::new(config, types).assemble(source)
}

/// Lower with the default configuration; used to compare instruction sequences
pub fn lower(source: &str) -> Result<Vec<LoweredInstruction>> {
    let types = TypeTable::new();
    Assembler::new(&Config::DEFAULT, &types).lower(source)
}
