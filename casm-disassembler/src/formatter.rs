//! Instruction formatting to casm text
//!
//! Every instruction the assembler produces formats to a line that assembles
//! back to the same words. Operand slots an instruction does not read are not
//! shown. Field combinations with no source syntax are rendered as a comment.

use crate::decoder::recover_symbolic_tag;
use casm_spec::{ApUpdate, Felt252, Instruction, Op1Addr, Opcode, PcUpdate, Register, Res};

/// Format instruction as casm text
pub fn format(instr: &Instruction) -> String {
    let text = match (instr.opcode, instr.pc_update, instr.ap_update) {
        (Opcode::AssertEq, PcUpdate::Regular, ApUpdate::Regular | ApUpdate::Add1) => {
            format!("{} = {}", dst(instr), res(instr))
        }
        (Opcode::Nop, PcUpdate::Jump, ApUpdate::Regular | ApUpdate::Add1) => {
            format!("jmp abs {}", res(instr))
        }
        (Opcode::Nop, PcUpdate::JumpRel, ApUpdate::Regular | ApUpdate::Add1) => {
            format!("jmp rel {}", res(instr))
        }
        (Opcode::Nop, PcUpdate::Jnz, ApUpdate::Regular | ApUpdate::Add1) => {
            format!("jmp rel {} if {} != 0", op1(instr), dst(instr))
        }
        (Opcode::Nop, PcUpdate::Regular, ApUpdate::Add) => format!("ap += {}", res(instr)),
        (Opcode::Call, PcUpdate::Jump, _) => format!("call abs {}", res(instr)),
        (Opcode::Call, PcUpdate::JumpRel, _) => format!("call rel {}", res(instr)),
        (Opcode::Ret, PcUpdate::Jump, ApUpdate::Regular) => "ret".to_string(),
        _ => return format!("# no casm syntax for {:?}", instr),
    };

    if instr.ap_update == ApUpdate::Add1 {
        format!("{}; ap++", text)
    } else {
        text
    }
}

fn mem(register: Register, offset: i32) -> String {
    match offset {
        0 => format!("[{}]", register),
        o if o < 0 => format!("[{} - {}]", register, o.unsigned_abs()),
        o => format!("[{} + {}]", register, o),
    }
}

fn dst(instr: &Instruction) -> String {
    mem(instr.dst_register, instr.off0)
}

fn op0(instr: &Instruction) -> String {
    mem(instr.op0_register, instr.off1)
}

/// Small values print signed, everything else as hex
fn immediate(value: Felt252) -> String {
    match value.to_i64() {
        Some(v) => v.to_string(),
        None => format!("{:#x}", value),
    }
}

fn op1(instr: &Instruction) -> String {
    match (instr.op1_addr, instr.imm) {
        (Op1Addr::Imm, Some(value)) => immediate(value),
        (Op1Addr::Imm, None) => "?".to_string(),
        (Op1Addr::Ap, _) => mem(Register::Ap, instr.off2),
        (Op1Addr::Fp, _) => mem(Register::Fp, instr.off2),
        (Op1Addr::Op0, _) => {
            let inner = op0(instr);
            match instr.off2 {
                0 => format!("[{}]", inner),
                o if o < 0 => format!("[{} - {}]", inner, o.unsigned_abs()),
                o => format!("[{} + {}]", inner, o),
            }
        }
    }
}

fn res(instr: &Instruction) -> String {
    match instr.res {
        Res::Op1 | Res::Unconstrained => op1(instr),
        Res::Mul => format!("{} * {}", op0(instr), op1(instr)),
        Res::Add => match (instr.op1_addr, instr.imm.and_then(|v| v.to_i64())) {
            (Op1Addr::Imm, Some(v)) if v < 0 => {
                format!("{} - {}", op0(instr), v.unsigned_abs())
            }
            _ => format!("{} + {}", op0(instr), op1(instr)),
        },
        Res::Symbolic => match recover_symbolic_tag(instr) {
            // Short strings have no escapes, so a quote cannot be written back
            Ok(Some(tag)) if !tag.contains('\'') => format!("symbolic(felt, '{}')", tag),
            _ => format!("symbolic(felt, {})", op1(instr)),
        },
    }
}
