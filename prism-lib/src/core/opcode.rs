use strum_macros::{Display, FromRepr};

/// One byte instruction tag. Every operand that follows an opcode is an unsigned
/// 16-bit big-endian value.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromRepr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OpCode {
    Nop,
    /// pushes constant `idx`
    Constant,
    Add,
    Subtract,
    Multiply,
    Divide,
    Negate,
    Return,
    /// operand: argument count
    Call,
    /// operand: slot
    Load,
    /// operand: slot
    Store,
    /// operand: forward offset
    Jump,
    /// operand: forward offset
    JumpIfFalse,
    Pop,
}

impl OpCode {
    /// number of operand bytes that follow the opcode
    pub fn operand_len(self) -> usize {
        use OpCode::*;
        match self {
            Constant | Call | Load | Store | Jump | JumpIfFalse => 2,
            Nop | Add | Subtract | Multiply | Divide | Negate | Return | Pop => 0,
        }
    }

    /// total encoded size of the instruction
    pub fn size(self) -> usize {
        1 + self.operand_len()
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> u8 {
        op as u8
    }
}
