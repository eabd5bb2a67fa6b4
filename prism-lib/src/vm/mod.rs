//! The stack machine that executes a compiled [`Module`]
//!
//! Execution starts at ip 0 of chunk 0. [`Vm::step`] executes exactly one
//! instruction, [`Vm::run`] steps until the program returns from the top level or
//! an error occurs.

use log::trace;
use thiserror::Error;

use std::result::Result as StdResult;

use crate::core::*;
use crate::diagnostics::ErrorKind;

pub mod arithmetic;
pub mod built_ins;

pub mod memory;
pub use memory::*;

pub mod native;
pub use native::*;

pub mod stack;
pub use stack::*;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Stack overflow")]
    StackOverflow,

    #[error("Stack underflow")]
    StackUnderflow,

    #[error("Too many nested calls")]
    FrameOverflow,

    #[error("Unknown opcode {0:#04x}")]
    UnknownOpcode(u8),

    #[error("Truncated operand for {0}")]
    TruncatedOperand(OpCode),

    #[error("Invalid constant index {0}")]
    BadConstant(u16),

    #[error("Invalid slot {0}")]
    BadSlot(u16),

    #[error("Invalid chunk {0}")]
    BadChunk(usize),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Integer overflow in {0}")]
    IntegerOverflow(OpCode),

    #[error("Invalid operand types for {op}: {left} and {right}")]
    InvalidOperands {
        op: OpCode,
        left: DataType,
        right: DataType,
    },

    #[error("Can only negate numbers, got {0}")]
    CannotNegate(DataType),

    #[error("Can only call functions, prisms and natives, got {0}")]
    InvalidCallTarget(DataType),

    #[error("{name} expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("Unknown native {0}")]
    UnknownNative(usize),

    #[error("in native '{name}': {source}")]
    Native { name: String, source: NativeError },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidOperands { .. } | Error::CannotNegate(_) => ErrorKind::Type,
            _ => ErrorKind::Runtime,
        }
    }
}

/// A VM error together with where it happened
#[derive(Error, Debug, Clone, PartialEq)]
#[error("[line {line}] in {chunk}: {} error: {error}", .error.kind())]
pub struct RuntimeError {
    pub error: Error,
    pub chunk: String,
    pub line: u32,
}

impl RuntimeError {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

pub type Result<T> = StdResult<T, Error>;

/// returned by [`Vm::step`]
#[derive(Debug, Clone, PartialEq)]
pub enum ExecOutcome {
    /// there are more instructions to run
    Continue,
    /// the top level returned this value
    Done(Value),
}

macro_rules! bail {
    ($($err:tt)*) => {
        return Err($crate::vm::Error::$($err)*)
    };
}
pub(crate) use bail;

/// Bounds of the VM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmConfig {
    pub stack_max: usize,
    pub frames_max: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            stack_max: 256,
            frames_max: 256,
        }
    }
}

pub struct Vm<'m> {
    module: &'m Module,
    mem: Memory,
    chunk: usize,
    ip: usize,
    /// offset of the instruction being executed, for error lines
    op_start: usize,
    result: Option<Value>,
}

impl<'m> Vm<'m> {
    pub fn new(module: &'m Module, config: VmConfig) -> Self {
        Vm {
            module,
            mem: Memory::new(module.slot_count, &config),
            chunk: 0,
            ip: 0,
            op_start: 0,
            result: None,
        }
    }

    /// steps until the program finishes
    pub fn run(&mut self) -> StdResult<Value, RuntimeError> {
        loop {
            if let ExecOutcome::Done(v) = self.step()? {
                return Ok(v);
            }
        }
    }

    /// Executes one instruction. Once the program is done, further calls keep
    /// returning the final value.
    pub fn step(&mut self) -> StdResult<ExecOutcome, RuntimeError> {
        if let Some(v) = &self.result {
            return Ok(ExecOutcome::Done(v.clone()));
        }
        self.op_start = self.ip;
        let outcome = self.exec().map_err(|error| self.locate(error))?;
        if let ExecOutcome::Done(v) = &outcome {
            self.result = Some(v.clone());
        }
        Ok(outcome)
    }

    fn locate(&self, error: Error) -> RuntimeError {
        let chunk = self.module.chunks.get(self.chunk);
        RuntimeError {
            error,
            chunk: chunk.map(|c| c.name.clone()).unwrap_or_default(),
            line: chunk.map(|c| c.line_at(self.op_start)).unwrap_or(0),
        }
    }

    // ==============================================================================
    // Read-only views
    // ==============================================================================
    pub fn module(&self) -> &'m Module {
        self.module
    }

    pub fn stack(&self) -> &[Value] {
        &self.mem.stack
    }

    pub fn slots(&self) -> &[Value] {
        &self.mem.slots
    }

    pub fn frames(&self) -> &[Frame] {
        &self.mem.frames
    }

    /// (chunk index, ip) of the next instruction
    pub fn position(&self) -> (usize, usize) {
        (self.chunk, self.ip)
    }

    pub fn is_done(&self) -> bool {
        self.result.is_some()
    }

    // ==============================================================================
    // Execution
    // ==============================================================================
    fn current_chunk(&self) -> Result<&'m Chunk> {
        let module: &'m Module = self.module;
        module
            .chunks
            .get(self.chunk)
            .ok_or(Error::BadChunk(self.chunk))
    }

    fn read_operand(&mut self, chunk: &Chunk, op: OpCode) -> Result<u16> {
        let x = chunk
            .read_u16(self.ip)
            .ok_or(Error::TruncatedOperand(op))?;
        self.ip += 2;
        Ok(x)
    }

    fn exec(&mut self) -> Result<ExecOutcome> {
        let chunk = self.current_chunk()?;
        let Some(&byte) = chunk.code.get(self.ip) else {
            return self.return_from_chunk(Value::None);
        };
        let op = OpCode::from_repr(byte).ok_or(Error::UnknownOpcode(byte))?;
        self.ip += 1;
        trace!(
            "{}:{:04} {:<14} stack: {:?}",
            chunk.name,
            self.op_start,
            op.to_string(),
            *self.mem.stack
        );

        use OpCode::*;
        match op {
            Nop => {}
            Constant => {
                let idx = self.read_operand(chunk, op)?;
                let v = chunk
                    .constants
                    .get(idx as usize)
                    .cloned()
                    .ok_or(Error::BadConstant(idx))?;
                self.mem.stack.push(v)?;
            }
            Add | Subtract | Multiply | Divide => {
                let right = self.mem.stack.pop()?;
                let left = self.mem.stack.pop()?;
                let res = arithmetic::binary(op, left, right)?;
                self.mem.stack.push(res)?;
            }
            Negate => {
                let v = self.mem.stack.pop()?;
                self.mem.stack.push(arithmetic::negate(v)?)?;
            }
            Return => {
                let v = self.mem.stack.pop()?;
                return self.return_from_chunk(v);
            }
            Call => {
                let argc = self.read_operand(chunk, op)?;
                self.call(argc as usize)?;
            }
            Load => {
                let slot = self.read_operand(chunk, op)?;
                let v = self.mem.load(slot)?;
                self.mem.stack.push(v)?;
            }
            Store => {
                let slot = self.read_operand(chunk, op)?;
                let v = self.mem.stack.pop()?;
                self.mem.store(slot, v)?;
            }
            Jump => {
                let offset = self.read_operand(chunk, op)?;
                self.ip += offset as usize;
            }
            JumpIfFalse => {
                let offset = self.read_operand(chunk, op)?;
                if self.mem.stack.pop()?.is_falsy() {
                    self.ip += offset as usize;
                }
            }
            Pop => {
                self.mem.stack.pop()?;
            }
        }
        Ok(ExecOutcome::Continue)
    }

    /// the callee sits on top of the stack, its `argc` arguments below it
    fn call(&mut self, argc: usize) -> Result<()> {
        let callee = self.mem.stack.pop()?;
        match callee {
            Value::Function(target) | Value::Prism(target) => {
                let chunk = self
                    .module
                    .chunks
                    .get(target)
                    .ok_or(Error::BadChunk(target))?;
                if chunk.arity != argc {
                    bail!(Arity {
                        name: chunk.name.clone(),
                        expected: chunk.arity,
                        got: argc,
                    });
                }
                if self.mem.stack.len() < argc {
                    bail!(StackUnderflow);
                }
                self.mem.push_frame(Frame {
                    chunk: self.chunk,
                    ip: self.ip,
                    stack_base: self.mem.stack.len() - argc,
                })?;
                self.chunk = target;
                self.ip = 0;
            }
            Value::Native(idx) => {
                let native = self
                    .module
                    .natives
                    .get(idx)
                    .ok_or(Error::UnknownNative(idx))?;
                let args = self.mem.stack.pop_n(argc)?;
                let res = (native.function)(&args).map_err(|source| Error::Native {
                    name: native.name.clone(),
                    source,
                })?;
                self.mem.stack.push(res)?;
            }
            other => bail!(InvalidCallTarget(other.dtype())),
        }
        Ok(())
    }

    fn return_from_chunk(&mut self, v: Value) -> Result<ExecOutcome> {
        match self.mem.pop_frame() {
            Some(frame) => {
                self.mem.stack.truncate(frame.stack_base);
                self.mem.stack.push(v)?;
                self.chunk = frame.chunk;
                self.ip = frame.ip;
                Ok(ExecOutcome::Continue)
            }
            None => Ok(ExecOutcome::Done(v)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(chunks: Vec<Chunk>) -> Module {
        Module {
            chunks,
            natives: NativeTable::new(),
            slot_count: 4,
        }
    }

    fn run(m: &Module) -> StdResult<Value, RuntimeError> {
        Vm::new(m, VmConfig::default()).run()
    }

    #[test]
    fn constants_and_arithmetic() {
        let mut c = Chunk::new("<script>", 0);
        c.emit_constant(Value::Int(3), 1).unwrap();
        c.emit_constant(Value::float(2.5), 1).unwrap();
        c.emit(OpCode::Add, 1);
        c.emit(OpCode::Return, 1);
        assert_eq!(run(&module(vec![c])), Ok(Value::float(5.5)));
    }

    #[test]
    fn division_by_zero_pushes_nothing() {
        let mut c = Chunk::new("<script>", 0);
        c.emit_constant(Value::Int(5), 1).unwrap();
        c.emit_constant(Value::Int(0), 2).unwrap();
        c.emit(OpCode::Divide, 2);
        let m = module(vec![c]);
        let mut vm = Vm::new(&m, VmConfig::default());
        let err = vm.run().unwrap_err();
        assert_eq!(err.error, Error::DivisionByZero);
        assert_eq!(err.line, 2);
        assert_eq!(err.chunk, "<script>");
        assert!(vm.stack().is_empty());
    }

    #[test]
    fn running_off_the_end_returns_none() {
        let c = Chunk::new("<script>", 0);
        assert_eq!(run(&module(vec![c])), Ok(Value::None));
    }

    #[test]
    fn store_then_load() {
        let mut c = Chunk::new("<script>", 0);
        c.emit_constant(Value::from("hello"), 1).unwrap();
        c.emit_with(OpCode::Store, 3, 1);
        c.emit_with(OpCode::Load, 3, 2);
        c.emit(OpCode::Return, 2);
        assert_eq!(run(&module(vec![c])), Ok(Value::from("hello")));
    }

    #[test]
    fn jump_if_false_pops_and_skips() {
        let mut c = Chunk::new("<script>", 0);
        c.emit_constant(Value::Int(0), 1).unwrap();
        let at = c.emit_jump(OpCode::JumpIfFalse, 1);
        c.emit_constant(Value::from("taken"), 1).unwrap();
        c.emit(OpCode::Return, 1);
        c.patch_jump(at).unwrap();
        c.emit_constant(Value::from("skipped"), 1).unwrap();
        c.emit(OpCode::Return, 1);
        assert_eq!(run(&module(vec![c])), Ok(Value::from("skipped")));
    }

    #[test]
    fn unconditional_jump() {
        let mut c = Chunk::new("<script>", 0);
        let at = c.emit_jump(OpCode::Jump, 1);
        c.emit_constant(Value::Int(1), 1).unwrap();
        c.emit(OpCode::Return, 1);
        c.patch_jump(at).unwrap();
        c.emit_constant(Value::Int(2), 1).unwrap();
        c.emit(OpCode::Return, 1);
        assert_eq!(run(&module(vec![c])), Ok(Value::Int(2)));
    }

    #[test]
    fn call_and_return_restore_the_caller() {
        // chunk 1 adds its two arguments, which it stores into slots 0 and 1
        let mut f = Chunk::new("add", 2);
        f.emit_with(OpCode::Store, 1, 1);
        f.emit_with(OpCode::Store, 0, 1);
        f.emit_with(OpCode::Load, 0, 1);
        f.emit_with(OpCode::Load, 1, 1);
        f.emit(OpCode::Add, 1);
        f.emit(OpCode::Return, 1);

        let mut main = Chunk::new("<script>", 0);
        main.emit_constant(Value::from("below"), 2).unwrap();
        main.emit_constant(Value::Int(40), 2).unwrap();
        main.emit_constant(Value::Int(2), 2).unwrap();
        main.emit_constant(Value::Function(1), 2).unwrap();
        main.emit_with(OpCode::Call, 2, 2);
        main.emit_with(OpCode::Store, 2, 2);
        main.emit(OpCode::Return, 3);

        let m = module(vec![main, f]);
        let mut vm = Vm::new(&m, VmConfig::default());
        assert_eq!(vm.run(), Ok(Value::from("below")));
        assert_eq!(vm.slots()[2], Value::Int(42));
        assert!(vm.stack().is_empty());
        assert!(vm.frames().is_empty());
    }

    #[test]
    fn arity_is_checked() {
        let f = Chunk::new("f", 1);
        let mut main = Chunk::new("<script>", 0);
        main.emit_constant(Value::Function(1), 1).unwrap();
        main.emit_with(OpCode::Call, 0, 1);
        let err = run(&module(vec![main, f])).unwrap_err();
        assert_eq!(
            err.error,
            Error::Arity {
                name: "f".into(),
                expected: 1,
                got: 0
            }
        );
    }

    #[test]
    fn calling_a_non_function() {
        let mut main = Chunk::new("<script>", 0);
        main.emit_constant(Value::Int(3), 5).unwrap();
        main.emit_with(OpCode::Call, 0, 5);
        let err = run(&module(vec![main])).unwrap_err();
        assert_eq!(err.error, Error::InvalidCallTarget(DataType::Int));
        assert_eq!(
            err.to_string(),
            "[line 5] in <script>: Runtime error: Can only call functions, prisms and natives, got int"
        );
    }

    #[test]
    fn natives_receive_arguments_in_order() {
        fn join(args: &[Value]) -> StdResult<Value, NativeError> {
            let parts: Vec<_> = args.iter().map(|a| a.to_string()).collect();
            Ok(Value::from(parts.join("|")))
        }
        let mut m = module(vec![]);
        let idx = m.natives.push("join", join);
        let mut main = Chunk::new("<script>", 0);
        main.emit_constant(Value::Int(1), 1).unwrap();
        main.emit_constant(Value::from("b"), 1).unwrap();
        main.emit_constant(Value::Native(idx), 1).unwrap();
        main.emit_with(OpCode::Call, 2, 1);
        main.emit(OpCode::Return, 1);
        m.chunks.push(main);
        assert_eq!(run(&m), Ok(Value::from("1|b")));
    }

    #[test]
    fn native_errors_halt() {
        fn fail(_: &[Value]) -> StdResult<Value, NativeError> {
            Err(NativeError::Failed("nope".into()))
        }
        let mut m = module(vec![]);
        let idx = m.natives.push("fail", fail);
        let mut main = Chunk::new("<script>", 0);
        main.emit_constant(Value::Native(idx), 1).unwrap();
        main.emit_with(OpCode::Call, 0, 1);
        m.chunks.push(main);
        let err = run(&m).unwrap_err();
        assert_eq!(err.error.to_string(), "in native 'fail': nope");
    }

    #[test]
    fn bad_bytecode_is_an_error() {
        let mut unknown = Chunk::new("<script>", 0);
        unknown.code = vec![0xEE];
        unknown.lines = vec![1];
        assert_eq!(
            run(&module(vec![unknown])).unwrap_err().error,
            Error::UnknownOpcode(0xEE)
        );

        let mut truncated = Chunk::new("<script>", 0);
        truncated.code = vec![OpCode::Constant as u8, 0];
        truncated.lines = vec![1, 1];
        assert_eq!(
            run(&module(vec![truncated])).unwrap_err().error,
            Error::TruncatedOperand(OpCode::Constant)
        );

        let mut bad_slot = Chunk::new("<script>", 0);
        bad_slot.emit_with(OpCode::Load, 99, 1);
        assert_eq!(
            run(&module(vec![bad_slot])).unwrap_err().error,
            Error::BadSlot(99)
        );

        let mut underflow = Chunk::new("<script>", 0);
        underflow.emit(OpCode::Pop, 1);
        assert_eq!(
            run(&module(vec![underflow])).unwrap_err().error,
            Error::StackUnderflow
        );
    }

    #[test]
    fn stack_is_bounded() {
        let mut c = Chunk::new("<script>", 0);
        for _ in 0..3 {
            c.emit_constant(Value::None, 1).unwrap();
        }
        let m = module(vec![c]);
        let config = VmConfig {
            stack_max: 2,
            ..Default::default()
        };
        let err = Vm::new(&m, config).run().unwrap_err();
        assert_eq!(err.error, Error::StackOverflow);
    }

    #[test]
    fn runaway_recursion_hits_the_frame_bound() {
        let mut f = Chunk::new("f", 0);
        f.emit_constant(Value::Function(1), 1).unwrap();
        f.emit_with(OpCode::Call, 0, 1);
        let mut main = Chunk::new("<script>", 0);
        main.emit_constant(Value::Function(1), 1).unwrap();
        main.emit_with(OpCode::Call, 0, 1);
        let err = run(&module(vec![main, f])).unwrap_err();
        assert_eq!(err.error, Error::FrameOverflow);
        assert_eq!(err.chunk, "f");
    }

    #[test]
    fn step_reports_done_repeatedly() {
        let m = module(vec![Chunk::new("<script>", 0)]);
        let mut vm = Vm::new(&m, VmConfig::default());
        assert_eq!(vm.step(), Ok(ExecOutcome::Done(Value::None)));
        assert!(vm.is_done());
        assert_eq!(vm.step(), Ok(ExecOutcome::Done(Value::None)));
    }
}
