//! Contains the AST types. Statements carry the line of their first token, expressions
//! inherit the line of the statement they belong to.

use derive_more::From;

use crate::core::{DataType, Value};

/// represents a whole source file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub line: u32,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq, From)]
pub enum StmtKind {
    /// an expression whose result is discarded
    Expr(Expr),
    VarDecl(VarDecl),
    FuncDecl(FuncDecl),
    PrismDecl(PrismDecl),
    Return(Return),
    /// a call whose result is discarded. The parser produces `Expr(Call)` instead,
    /// this form exists for code that builds programs directly.
    Call(Call),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: String,
    pub dtype: DataType,
    pub exposed: bool,
    pub internal: bool,
    pub initializer: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub dtype: DataType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    pub return_type: DataType,
}

/// A named block without parameters that compiles to its own chunk
#[derive(Debug, Clone, PartialEq)]
pub struct PrismDecl {
    pub name: String,
    pub body: Vec<Stmt>,
    pub return_type: DataType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Return {
    pub value: Option<Expr>,
}

/// represents an expression
#[derive(Debug, Clone, PartialEq, From)]
pub enum Expr {
    Literal(Value),
    /// a symbol, respectively its value
    Variable(String),
    Call(Call),
    Binary(Binary),
    Unary(Unary),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub callee: Box<Expr>,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binary {
    pub op: BinaryOp,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Unary {
    pub op: UnaryOp,
    pub operand: Box<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
}

// ==============================================================================
// Constructors
// ==============================================================================
impl Stmt {
    pub fn new(line: u32, kind: impl Into<StmtKind>) -> Self {
        Stmt {
            line,
            kind: kind.into(),
        }
    }
}

impl Expr {
    pub fn literal(v: impl Into<Value>) -> Self {
        Expr::Literal(v.into())
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Expr::Variable(name.into())
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> Self {
        Expr::Call(Call::new(callee, args))
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary(Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary(Unary {
            op,
            operand: Box::new(operand),
        })
    }
}

impl Call {
    pub fn new(callee: Expr, args: Vec<Expr>) -> Self {
        Call {
            callee: Box::new(callee),
            args,
        }
    }
}

impl Program {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Program { statements }
    }
}
