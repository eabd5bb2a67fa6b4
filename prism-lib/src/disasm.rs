//! Human readable listings of chunks

use std::fmt::Write;

use crate::core::*;

/// Renders the instruction at `offset`. Returns the text and the offset of the
/// next instruction.
pub fn instruction(chunk: &Chunk, offset: usize) -> (String, usize) {
    let line = chunk.line_at(offset);
    let same_line = offset > 0 && chunk.line_at(offset - 1) == line;
    let line_col = if same_line {
        "   |".to_owned()
    } else {
        format!("{:4}", line)
    };
    let prefix = format!("{:04} {} ", offset, line_col);

    let Some(&byte) = chunk.code.get(offset) else {
        return (format!("{}<end>", prefix), offset);
    };
    let Some(op) = OpCode::from_repr(byte) else {
        return (format!("{}<unknown {:#04x}>", prefix, byte), offset + 1);
    };
    if op.operand_len() == 0 {
        return (format!("{}{}", prefix, op), offset + 1);
    }
    let Some(operand) = chunk.read_u16(offset + 1) else {
        return (format!("{}{:<14} <truncated>", prefix, op.to_string()), chunk.len());
    };
    let next = offset + op.size();
    let detail = match op {
        OpCode::Constant => match chunk.constants.get(operand as usize) {
            Some(Value::Str(s)) => format!(" {:?}", s),
            Some(v) => format!(" {}", v),
            None => " <bad constant>".to_owned(),
        },
        OpCode::Jump | OpCode::JumpIfFalse => format!(" -> {:04}", next + operand as usize),
        _ => String::new(),
    };
    (
        format!("{}{:<14} {:5}{}", prefix, op.to_string(), operand, detail),
        next,
    )
}

/// lists every instruction of `chunk` under a header
pub fn chunk(chunk: &Chunk) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} (arity {}) ==", chunk.name, chunk.arity);
    let mut offset = 0;
    while offset < chunk.len() {
        let (text, next) = instruction(chunk, offset);
        let _ = writeln!(out, "{}", text);
        offset = next;
    }
    out
}

pub fn module(module: &Module) -> String {
    module
        .chunks
        .iter()
        .map(chunk)
        .collect::<Vec<_>>()
        .join("\n")
}
