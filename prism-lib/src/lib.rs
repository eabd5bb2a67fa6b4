//! To execute a script, the stages run in this order:
//! 1. scan the source into tokens with [`lexer::scan`]
//! 1. parse the tokens into a [`core::Program`] using [`parser::parse`]
//! 1. generate a [`core::Module`] with [`compiler::CodeGenerator::generate`]
//! 1. run chunk 0 of the module on a [`vm::Vm`]
//!
//! The lexer and parser record problems in a [`diagnostics::Diagnostics`] collector and
//! keep going, so the collector must be checked after each of them. [`compile`] and
//! [`Interpreter`] do all of that:
//!
//! ```
//! use prism_lib::{Interpreter, vm::VmConfig};
//!
//! let interpreter = Interpreter::new(VmConfig::default());
//! interpreter.interpret("exposed x -> 42", "example").unwrap();
//! ```

use thiserror::Error;

pub mod compiler;
pub mod core;
pub mod diagnostics;
pub mod disasm;
pub mod lexer;
pub mod parser;
pub mod vm;

use crate::compiler::CodeGenerator;
use crate::core::{Module, Value};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::vm::{NativeFn, RuntimeError, Vm, VmConfig};

/// exit status for scripts that do not compile
pub const EXIT_COMPILE_ERROR: i32 = 65;
/// exit status for scripts that fail while running
pub const EXIT_RUNTIME_ERROR: i32 = 70;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpretError {
    #[error("{}", join_lines(.0))]
    Compile(Vec<Diagnostic>),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

fn join_lines(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

impl InterpretError {
    pub fn exit_code(&self) -> i32 {
        match self {
            InterpretError::Compile(_) => EXIT_COMPILE_ERROR,
            InterpretError::Runtime(_) => EXIT_RUNTIME_ERROR,
        }
    }
}

/// Runs the lexer, parser and code generator. Each stage only runs if the
/// previous one recorded no error.
pub fn compile(
    source: &str,
    file: &str,
    generator: &CodeGenerator,
) -> Result<Module, Vec<Diagnostic>> {
    let mut diagnostics = Diagnostics::new();
    let tokens = lexer::scan(source, file, &mut diagnostics);
    if diagnostics.has_errors() {
        return Err(diagnostics.into_vec());
    }
    let program = parser::parse(&tokens, file, &mut diagnostics);
    if diagnostics.has_errors() {
        return Err(diagnostics.into_vec());
    }
    generator.generate(&program, file).map_err(|d| vec![d])
}

/// Compiles and runs sources. Every call is an independent compilation unit.
#[derive(Debug, Clone)]
pub struct Interpreter {
    generator: CodeGenerator,
    config: VmConfig,
}

impl Interpreter {
    /// an interpreter with the default natives
    pub fn new(config: VmConfig) -> Self {
        Interpreter {
            generator: CodeGenerator::with_builtins(),
            config,
        }
    }

    pub fn with_generator(generator: CodeGenerator, config: VmConfig) -> Self {
        Interpreter { generator, config }
    }

    /// makes `function` callable as `name` from scripts
    pub fn register_native(&mut self, name: &str, function: NativeFn) {
        self.generator.add_native(name, function);
    }

    pub fn config(&self) -> VmConfig {
        self.config
    }

    pub fn generator(&self) -> &CodeGenerator {
        &self.generator
    }

    pub fn compile(&self, source: &str, file: &str) -> Result<Module, InterpretError> {
        compile(source, file, &self.generator).map_err(InterpretError::Compile)
    }

    /// Compiles and runs `source`. Returns the value the top level returned,
    /// `None` when it ran off its end.
    pub fn interpret(&self, source: &str, file: &str) -> Result<Value, InterpretError> {
        let module = self.compile(source, file)?;
        Ok(Vm::new(&module, self.config).run()?)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new(VmConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorKind;

    #[test]
    fn lexer_errors_stop_before_parsing() {
        // the parser would complain about the stray '>' as well
        let errs = compile("\"open > ", "f", &CodeGenerator::new()).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].message, "Unterminated string");
    }

    #[test]
    fn all_parse_errors_are_reported() {
        let errs = compile(") ]", "f", &CodeGenerator::new()).unwrap_err();
        assert_eq!(errs.len(), 2);
    }

    #[test]
    fn deep_nesting_is_a_compile_error() {
        let src = format!("{}1{}", "render(".repeat(5_000), ")".repeat(5_000));
        let errs = compile(&src, "f", &CodeGenerator::with_builtins()).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].kind, ErrorKind::Syntax);
        assert_eq!(errs[0].message, "Expression nested too deeply");
    }

    #[test]
    fn exit_codes() {
        let i = Interpreter::default();
        let compile_err = i.interpret("undefined_name", "f").unwrap_err();
        assert_eq!(compile_err.exit_code(), 65);
        assert_eq!(
            compile_err.to_string(),
            "f:1:0: Name error: Undefined variable 'undefined_name'"
        );

        let runtime_err = i.interpret("int(1, 2)", "f").unwrap_err();
        assert_eq!(runtime_err.exit_code(), 70);
        let InterpretError::Runtime(e) = runtime_err else {
            panic!("expected a runtime error");
        };
        assert_eq!(e.kind(), ErrorKind::Runtime);
        assert_eq!(e.chunk, "<script>");
    }

    #[test]
    fn values_of_the_top_level() {
        let i = Interpreter::default();
        assert_eq!(i.interpret("type(1.5)", "f"), Ok(Value::None));
        assert_eq!(i.interpret("", "f"), Ok(Value::None));
    }
}
