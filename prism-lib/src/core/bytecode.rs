//! Chunks are the unit of emitted code: one for the top level and one per
//! function or prism declaration. A [`Module`] bundles them with the native table
//! for the VM.

use thiserror::Error;

use crate::core::{OpCode, Value};
use crate::vm::NativeTable;

/// the largest forward distance a jump operand can hold
pub const MAX_JUMP: usize = u16::MAX as usize;
/// constant indices are u16 operands
pub const MAX_CONSTANTS: usize = u16::MAX as usize + 1;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkError {
    #[error("Too many constants in one chunk")]
    TooManyConstants,

    #[error("Jump too large")]
    JumpTooLarge,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chunk {
    /// name shown in disassembly and runtime errors
    pub name: String,
    /// number of arguments a call must supply
    pub arity: usize,
    pub code: Vec<u8>,
    /// one entry per byte in `code`
    pub lines: Vec<u32>,
    pub constants: Vec<Value>,
    last_op: Option<OpCode>,
}

impl Chunk {
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Chunk {
            name: name.into(),
            arity,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// the opcode of the instruction emitted last, if any
    pub fn last_op(&self) -> Option<OpCode> {
        self.last_op
    }

    fn write_byte(&mut self, byte: u8, line: u32) {
        self.code.push(byte);
        self.lines.push(line);
    }

    fn write_u16(&mut self, x: u16, line: u32) {
        for byte in x.to_be_bytes() {
            self.write_byte(byte, line);
        }
    }

    /// emits an instruction without operand
    pub fn emit(&mut self, op: OpCode, line: u32) {
        debug_assert_eq!(op.operand_len(), 0, "{} takes an operand", op);
        self.write_byte(op.into(), line);
        self.last_op = Some(op);
    }

    /// emits an instruction with its u16 operand
    pub fn emit_with(&mut self, op: OpCode, operand: u16, line: u32) {
        debug_assert_eq!(op.operand_len(), 2, "{} takes no operand", op);
        self.write_byte(op.into(), line);
        self.write_u16(operand, line);
        self.last_op = Some(op);
    }

    /// appends to the constant pool without deduplication and returns the index
    pub fn add_constant(&mut self, v: Value) -> Result<u16, ChunkError> {
        if self.constants.len() >= MAX_CONSTANTS {
            return Err(ChunkError::TooManyConstants);
        }
        self.constants.push(v);
        Ok((self.constants.len() - 1) as u16)
    }

    pub fn emit_constant(&mut self, v: Value, line: u32) -> Result<(), ChunkError> {
        let idx = self.add_constant(v)?;
        self.emit_with(OpCode::Constant, idx, line);
        Ok(())
    }

    /// Emits a jump with a placeholder operand. Returns the offset of the
    /// placeholder, which is what [`Chunk::patch_jump`] expects.
    pub fn emit_jump(&mut self, op: OpCode, line: u32) -> usize {
        self.emit_with(op, u16::MAX, line);
        self.code.len() - 2
    }

    /// makes the jump whose placeholder sits at `at` land on the current end of
    /// the chunk
    pub fn patch_jump(&mut self, at: usize) -> Result<(), ChunkError> {
        let distance = self.code.len() - at - 2;
        if distance > MAX_JUMP {
            return Err(ChunkError::JumpTooLarge);
        }
        let [hi, lo] = (distance as u16).to_be_bytes();
        self.code[at] = hi;
        self.code[at + 1] = lo;
        Ok(())
    }

    /// reads the big-endian operand starting at `offset`
    pub fn read_u16(&self, offset: usize) -> Option<u16> {
        let hi = *self.code.get(offset)?;
        let lo = *self.code.get(offset + 1)?;
        Some(u16::from_be_bytes([hi, lo]))
    }

    /// source line of the byte at `offset`, 0 when out of range
    pub fn line_at(&self, offset: usize) -> u32 {
        self.lines.get(offset).copied().unwrap_or(0)
    }
}

/// A compiled unit. Chunk 0 is the entry point.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub chunks: Vec<Chunk>,
    pub natives: NativeTable,
    /// number of variable slots the program uses
    pub slot_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operands_are_big_endian() {
        let mut c = Chunk::new("<script>", 0);
        c.emit_with(OpCode::Load, 0x0102, 7);
        assert_eq!(c.code, vec![OpCode::Load as u8, 0x01, 0x02]);
        assert_eq!(c.lines, vec![7, 7, 7]);
        assert_eq!(c.read_u16(1), Some(0x0102));
        assert_eq!(c.read_u16(2), None);
    }

    #[test]
    fn jump_lands_after_skipped_code() {
        let mut c = Chunk::new("<script>", 0);
        let at = c.emit_jump(OpCode::JumpIfFalse, 1);
        c.emit(OpCode::Pop, 1);
        c.emit(OpCode::Nop, 1);
        c.patch_jump(at).unwrap();
        assert_eq!(c.read_u16(at), Some(2));
        assert_eq!(c.last_op(), Some(OpCode::Nop));
    }

    #[test]
    fn jump_too_large() {
        let mut c = Chunk::new("<script>", 0);
        let at = c.emit_jump(OpCode::Jump, 1);
        c.code.resize(c.code.len() + MAX_JUMP + 1, OpCode::Nop as u8);
        assert_eq!(c.patch_jump(at), Err(ChunkError::JumpTooLarge));
    }

    #[test]
    fn constant_pool_is_bounded() {
        let mut c = Chunk::new("<script>", 0);
        c.constants = vec![Value::None; MAX_CONSTANTS - 1];
        assert_eq!(c.add_constant(Value::Int(1)), Ok(u16::MAX));
        assert_eq!(
            c.add_constant(Value::Int(2)),
            Err(ChunkError::TooManyConstants)
        );
    }
}
