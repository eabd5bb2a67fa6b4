//! Turns the AST into bytecode. Every function and prism declaration gets its own
//! [`Chunk`], chunk 0 holds the top level statements.

use log::debug;
use thiserror::Error;

use crate::core::*;
use crate::diagnostics::{Diagnostic, ErrorKind};
use crate::vm::{built_ins, NativeFn, NativeTable};

/// name of chunk 0
pub const SCRIPT_CHUNK: &str = "<script>";

pub trait Compilable {
    /// emits the code for `self` into the current chunk of `em`. `line` is the
    /// source line of the enclosing statement.
    fn compile(&self, em: &mut Emitter, line: u32) -> CompilationResult;
}

pub type CompilationResult = Result<(), CompilationError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompilationError {
    #[error("Undefined variable '{name}'")]
    UndefinedSymbol { line: u32, name: String },

    #[error("{source}")]
    Chunk { line: u32, source: ChunkError },

    #[error("{source}")]
    Symbol { line: u32, source: SymbolError },

    #[error("Too many arguments, at most {} are allowed", u16::MAX)]
    TooManyArguments { line: u32 },
}

impl CompilationError {
    pub fn line(&self) -> u32 {
        use CompilationError::*;
        match self {
            UndefinedSymbol { line, .. }
            | Chunk { line, .. }
            | Symbol { line, .. }
            | TooManyArguments { line } => *line,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CompilationError::UndefinedSymbol { .. } => ErrorKind::Name,
            _ => ErrorKind::Runtime,
        }
    }

    /// code generation errors point at a statement, not a column
    pub fn into_diagnostic(self, file: &str) -> Diagnostic {
        Diagnostic::new(self.kind(), file, self.line(), 0, self.to_string())
    }
}

macro_rules! compilation_error {
    ($($err:tt)+) => {
        return Err(CompilationError::$($err)*)
    };
}

macro_rules! impl_compilable {
    ($t:ty: $self:ident, $em:ident, $line:ident => $code:tt) => {
        impl Compilable for $t {
            fn compile(&$self, $em: &mut Emitter, $line: u32) -> CompilationResult {
                $code
            }
        }
    };
}

/// Owns the global bindings and the native table of one compilation unit
#[derive(Debug, Clone, Default)]
pub struct CodeGenerator {
    symbols: SymbolTable,
    natives: NativeTable,
}

impl CodeGenerator {
    /// a generator without any natives
    pub fn new() -> Self {
        Default::default()
    }

    /// a generator with the std and io natives registered
    pub fn with_builtins() -> Self {
        let mut gen = CodeGenerator::new();
        for (name, function) in built_ins::all() {
            gen.add_native(name, function);
        }
        gen
    }

    /// Appends a native and binds its name globally. A later native with the
    /// same name shadows the earlier one.
    pub fn add_native(&mut self, name: &str, function: NativeFn) {
        let idx = self.natives.push(name, function);
        self.symbols.define(
            name,
            DataType::Function,
            true,
            false,
            Datum::Callable(CallTarget::native(idx)),
        );
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn natives(&self) -> &NativeTable {
        &self.natives
    }

    /// Compiles a program. Works on a copy of the symbol table, so calls are
    /// independent of each other. Stops at the first error.
    pub fn generate(&self, program: &Program, file: &str) -> Result<Module, Diagnostic> {
        let mut em = Emitter::new(self.symbols.clone());
        for stmt in &program.statements {
            stmt.compile(&mut em, stmt.line)
                .map_err(|e| e.into_diagnostic(file))?;
        }
        debug!(
            "compiled {}: {} chunk(s), {} slot(s)",
            file,
            em.chunks.len(),
            em.symbols.slot_count()
        );
        Ok(Module {
            slot_count: em.symbols.slot_count(),
            chunks: em.chunks,
            natives: self.natives.clone(),
        })
    }
}

/// The state of one [`CodeGenerator::generate`] call
#[derive(Debug)]
pub struct Emitter {
    symbols: SymbolTable,
    chunks: Vec<Chunk>,
    /// indices of the chunks being emitted, the last one is current
    open: Vec<usize>,
}

impl Emitter {
    fn new(symbols: SymbolTable) -> Self {
        Emitter {
            symbols,
            chunks: vec![Chunk::new(SCRIPT_CHUNK, 0)],
            open: vec![0],
        }
    }

    fn chunk(&mut self) -> &mut Chunk {
        let idx = self.open.last().copied().unwrap_or(0);
        &mut self.chunks[idx]
    }

    fn emit(&mut self, op: OpCode, line: u32) {
        self.chunk().emit(op, line);
    }

    fn emit_with(&mut self, op: OpCode, operand: u16, line: u32) {
        self.chunk().emit_with(op, operand, line);
    }

    fn emit_constant(&mut self, v: Value, line: u32) -> CompilationResult {
        self.chunk()
            .emit_constant(v, line)
            .map_err(|source| CompilationError::Chunk { line, source })
    }

    fn allocate_slot(&mut self, line: u32) -> Result<u16, CompilationError> {
        self.symbols
            .allocate_slot()
            .map_err(|source| CompilationError::Symbol { line, source })
    }

    /// Compiles a function or prism body into a new chunk. The name is bound in
    /// the enclosing scope before the body is compiled, so the body can refer to
    /// it.
    fn declare_chunk(
        &mut self,
        name: &str,
        dtype: DataType,
        params: &[Param],
        body: &[Stmt],
        line: u32,
    ) -> CompilationResult {
        let idx = self.chunks.len();
        self.chunks.push(Chunk::new(name, params.len()));
        self.symbols.define(
            name,
            dtype,
            false,
            false,
            Datum::Callable(CallTarget::chunk(idx)),
        );

        self.open.push(idx);
        self.symbols.enter_scope();

        let mut slots = Vec::with_capacity(params.len());
        for param in params {
            let slot = self.allocate_slot(line)?;
            self.symbols
                .define(&param.name, param.dtype, false, false, Datum::Slot(slot));
            slots.push(slot);
        }
        // the last argument is on top of the stack
        for slot in slots.into_iter().rev() {
            self.emit_with(OpCode::Store, slot, line);
        }

        for stmt in body {
            stmt.compile(self, stmt.line)?;
        }
        if self.chunk().last_op() != Some(OpCode::Return) {
            let end = body.last().map_or(line, |s| s.line);
            self.emit_constant(Value::None, end)?;
            self.emit(OpCode::Return, end);
        }

        self.symbols.exit_scope();
        self.open.pop();
        debug!(
            "compiled {} '{}' into chunk {} ({} bytes)",
            dtype,
            name,
            idx,
            self.chunks[idx].len()
        );
        Ok(())
    }
}

impl_compilable! { Stmt: self, em, _line => {
    let line = self.line;
    match &self.kind {
        StmtKind::Expr(e) => {
            e.compile(em, line)?;
            em.emit(OpCode::Pop, line);
        }
        StmtKind::Call(c) => {
            c.compile(em, line)?;
            em.emit(OpCode::Pop, line);
        }
        StmtKind::VarDecl(decl) => decl.compile(em, line)?,
        StmtKind::FuncDecl(f) => {
            em.declare_chunk(&f.name, DataType::Function, &f.params, &f.body, line)?
        }
        StmtKind::PrismDecl(p) => {
            em.declare_chunk(&p.name, DataType::Prism, &[], &p.body, line)?
        }
        StmtKind::Return(Return { value }) => {
            match value {
                Some(v) => v.compile(em, line)?,
                None => em.emit_constant(Value::None, line)?,
            }
            em.emit(OpCode::Return, line);
        }
    }
    Ok(())
}}

impl_compilable! { VarDecl: self, em, line => {
    match &self.initializer {
        Some(init) => init.compile(em, line)?,
        None => em.emit_constant(Value::None, line)?,
    }
    let slot = em.allocate_slot(line)?;
    em.symbols.define(&self.name, self.dtype, self.exposed, self.internal, Datum::Slot(slot));
    em.emit_with(OpCode::Store, slot, line);
    Ok(())
}}

impl_compilable! { Call: self, em, line => {
    if self.args.len() > u16::MAX as usize {
        compilation_error!(TooManyArguments { line });
    }
    for arg in &self.args {
        arg.compile(em, line)?;
    }
    self.callee.compile(em, line)?;
    em.emit_with(OpCode::Call, self.args.len() as u16, line);
    Ok(())
}}

impl_compilable! { Expr: self, em, line => {
    match self {
        Expr::Literal(v) => em.emit_constant(v.clone(), line)?,
        Expr::Variable(name) => {
            let Some(&SymbolEntry { datum, dtype, .. }) = em.symbols.lookup(name) else {
                compilation_error!(UndefinedSymbol { line, name: name.clone() });
            };
            match datum {
                Datum::Slot(slot) => em.emit_with(OpCode::Load, slot, line),
                Datum::Callable(target) => {
                    let reference = match target.decode() {
                        Target::Chunk(idx) if dtype == DataType::Prism => Value::Prism(idx),
                        Target::Chunk(idx) => Value::Function(idx),
                        Target::Native(idx) => Value::Native(idx),
                    };
                    em.emit_constant(reference, line)?;
                }
            }
        }
        Expr::Call(c) => c.compile(em, line)?,
        Expr::Binary(Binary { op, left, right }) => {
            left.compile(em, line)?;
            right.compile(em, line)?;
            let op = match op {
                BinaryOp::Add => OpCode::Add,
                BinaryOp::Subtract => OpCode::Subtract,
                BinaryOp::Multiply => OpCode::Multiply,
                BinaryOp::Divide => OpCode::Divide,
            };
            em.emit(op, line);
        }
        Expr::Unary(Unary { op: UnaryOp::Negate, operand }) => {
            operand.compile(em, line)?;
            em.emit(OpCode::Negate, line);
        }
    }
    Ok(())
}}
