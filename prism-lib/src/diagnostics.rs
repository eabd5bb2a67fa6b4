//! Compile time error reporting. The lexer and parser keep going after an error
//! and record it in a [`Diagnostics`] collector, the driver checks the collector
//! between stages.

use derive_more::Deref;
use strum_macros::Display;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ErrorKind {
    Syntax,
    Name,
    Type,
    Memory,
    Runtime,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{file}:{line}:{column}: {kind} error: {message}")]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        kind: ErrorKind,
        file: impl Into<String>,
        line: u32,
        column: u32,
        message: impl Into<String>,
    ) -> Self {
        Diagnostic {
            kind,
            file: file.into(),
            line,
            column,
            message: message.into(),
        }
    }
}

/// Collects the diagnostics of one compilation unit
#[derive(Debug, Clone, Default, Deref)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn push(&mut self, d: Diagnostic) {
        log::debug!("recorded: {}", d);
        self.0.push(d);
    }

    pub fn has_errors(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
