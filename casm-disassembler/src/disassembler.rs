//! Program listing

use crate::decoder::{decode_with, instruction_word, recover_symbolic_tag};
use crate::formatter::format;
use casm_spec::Program;
use std::collections::BTreeMap;
use tracing::debug;

/// Disassemble a program into a listing
///
/// One line per instruction: pc, instruction word, immediate (if any) and
/// casm text. Symbolic loads get their recovered tag as a trailing comment.
/// Words that do not decode are reported inline and skipped one at a time.
pub fn disassemble(program: &Program) -> String {
    let mut output = String::new();
    let mut labels: BTreeMap<u64, Vec<&str>> = BTreeMap::new();
    for (name, &pc) in &program.labels {
        labels.entry(pc).or_default().push(name);
    }

    output.push_str("# CASM disassembly\n");
    output.push_str(&format!(
        "# Encoding: {:?}, {} words\n\n",
        program.encoding,
        program.len()
    ));

    let mut pc = 0;
    let mut errors = 0;
    while pc < program.data.len() {
        for name in labels.get(&(pc as u64)).into_iter().flatten() {
            output.push_str(&format!("{}:\n", name));
        }

        let decoded = instruction_word(program.data[pc]).and_then(|word| {
            decode_with(word, program.data.get(pc + 1).copied(), program.encoding)
                .map(|instr| (word, instr))
        });

        match decoded {
            Ok((word, instr)) => {
                let imm = instr
                    .imm
                    .map(|value| format!("{:#x}", value))
                    .unwrap_or_default();
                output.push_str(&format!("{:04}:  {:#018x}  {:<24}  ", pc, word, imm));
                output.push_str(&format(&instr));

                match recover_symbolic_tag(&instr) {
                    Ok(Some(tag)) => output.push_str(&format!("  # tag: '{}'", tag)),
                    Ok(None) => {}
                    Err(e) => output.push_str(&format!("  # {}", e)),
                }
                pc += instr.size();
            }
            Err(e) => {
                output.push_str(&format!("{:04}:  {:#x}  # ERROR: {}", pc, program.data[pc], e));
                errors += 1;
                pc += 1;
            }
        }
        output.push('\n');
    }

    debug!(words = program.len(), errors, "disassembled program");
    output
}
