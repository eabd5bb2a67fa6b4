//! contains all important data structures

pub mod types;
pub use types::*;

pub mod data;
pub use data::*;

pub mod ast;
pub use ast::*;

pub mod scopes;
pub use scopes::*;

pub mod opcode;
pub use opcode::*;

pub mod bytecode;
pub use bytecode::*;
