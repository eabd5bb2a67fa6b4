//! Recursive descent parser, turns the token sequence into a [`Program`].
//!
//! ```text
//! program   := statement*
//! statement := funcDecl | prismDecl | varDecl | exprStmt
//! funcDecl  := "function" IDENT "[" (IDENT ":" type ("," IDENT ":" type)*)? "]"
//!              "(" statement* ")" ">>" type
//! prismDecl := "prism" IDENT "(" statement* ")" ">>" type
//! varDecl   := "exposed"? "internal"? IDENT "->" expression
//! exprStmt  := expression
//! call      := primary ( "(" argList? ")" | "." IDENT )*
//! primary   := INTEGER | FLOAT | STRING | "None" | IDENT | "(" expression ")"
//! ```
//!
//! The parser never unwinds. A missing token is recorded in the [`Diagnostics`] and
//! parsing continues with a partial node, so the result is only meaningful if no
//! error was recorded.
//!
//! Bodies, groupings and calls together may nest at most [`MAX_NESTING`] levels deep.
//! Deeper input is reported and skipped up to the paren closing the last accepted level.

use crate::core::*;
use crate::diagnostics::{Diagnostic, Diagnostics, ErrorKind};
use crate::lexer::{Token, TokenKind};

/// levels of bodies, groupings and argument lists an input may nest
pub const MAX_NESTING: usize = 256;

const TOO_DEEP: &str = "Expression nested too deeply";

pub fn parse(tokens: &[Token], file: &str, diagnostics: &mut Diagnostics) -> Program {
    let mut parser = Parser::new(tokens, file, diagnostics);
    let mut program = Program::default();
    while !parser.is_at_end() {
        program.statements.push(parser.statement());
    }
    program
}

struct Parser<'a> {
    tokens: &'a [Token],
    current: usize,
    file: &'a str,
    diagnostics: &'a mut Diagnostics,
    /// returned by peek when the input lacks its EOF token
    eof: Token,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token], file: &'a str, diagnostics: &'a mut Diagnostics) -> Self {
        let eof = tokens
            .last()
            .map(|t| Token::eof(t.line, t.column))
            .unwrap_or_else(|| Token::eof(1, 1));
        Parser {
            tokens,
            current: 0,
            file,
            diagnostics,
            eof,
            depth: 0,
        }
    }

    // ==============================================================================
    // Token handling
    // ==============================================================================
    fn peek(&self) -> &Token {
        self.tokens.get(self.current).unwrap_or(&self.eof)
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.is_at_end() {
            self.current += 1;
        }
        token
    }

    /// gives back the token consumed last
    fn retreat(&mut self) {
        self.current = self.current.saturating_sub(1);
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// consumes a token of the given kind, or records an error at the current
    /// token without consuming it
    fn consume(&mut self, kind: TokenKind, msg: &str) -> Option<Token> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            let token = self.peek().clone();
            self.error_at(&token, msg);
            None
        }
    }

    fn error_at(&mut self, token: &Token, msg: &str) {
        self.diagnostics.push(Diagnostic::new(
            ErrorKind::Syntax,
            self.file,
            token.line,
            token.column,
            msg,
        ));
    }

    /// skips tokens up to the `)` closing the current group, which is left in place.
    /// With `stop_at_comma` a top level `,` ends the skip as well.
    fn skip_group(&mut self, stop_at_comma: bool) {
        let mut open = 0usize;
        while !self.is_at_end() {
            match self.peek().kind {
                TokenKind::LeftParen => open += 1,
                TokenKind::RightParen if open == 0 => return,
                TokenKind::RightParen => open -= 1,
                TokenKind::Comma if open == 0 && stop_at_comma => return,
                _ => {}
            }
            self.advance();
        }
    }

    fn name(&mut self, msg: &str) -> String {
        self.consume(TokenKind::Identifier, msg)
            .map(|t| t.lexeme)
            .unwrap_or_default()
    }

    // ==============================================================================
    // Statements
    // ==============================================================================
    fn statement(&mut self) -> Stmt {
        let line = self.peek().line;
        if self.matches(TokenKind::Function) {
            return Stmt::new(line, self.function_declaration());
        }
        if self.matches(TokenKind::Prism) {
            return Stmt::new(line, self.prism_declaration());
        }
        if self.matches(TokenKind::Internal) || self.matches(TokenKind::Exposed) {
            self.retreat();
            return Stmt::new(line, self.var_declaration());
        }
        Stmt::new(line, self.expression())
    }

    fn var_declaration(&mut self) -> VarDecl {
        let exposed = self.matches(TokenKind::Exposed);
        let internal = self.matches(TokenKind::Internal);
        let name = self.name("Expect variable name");
        self.consume(TokenKind::Arrow, "Expect '->' after variable name");
        let initializer = self.expression();
        VarDecl {
            name,
            dtype: DataType::None,
            exposed,
            internal,
            initializer: Some(initializer),
        }
    }

    fn function_declaration(&mut self) -> FuncDecl {
        let name = self.name("Expect function name");
        self.consume(TokenKind::LeftBracket, "Expect '[' after function name");

        let mut params = vec![];
        if !self.check(TokenKind::RightBracket) {
            loop {
                let name = self.name("Expect parameter name");
                self.consume(TokenKind::Colon, "Expect ':' after parameter name");
                let dtype = self.type_annotation();
                params.push(Param { name, dtype });
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightBracket, "Expect ']' after parameters");

        self.consume(TokenKind::LeftParen, "Expect '(' before function body");
        let body = self.block();
        self.consume(TokenKind::RightParen, "Expect ')' after function body");

        self.consume(TokenKind::ReturnType, "Expect '>>' after function body");
        let return_type = self.type_annotation();

        FuncDecl {
            name,
            params,
            body,
            return_type,
        }
    }

    fn prism_declaration(&mut self) -> PrismDecl {
        let name = self.name("Expect prism name");
        self.consume(TokenKind::LeftParen, "Expect '(' before prism body");
        let body = self.block();
        self.consume(TokenKind::RightParen, "Expect ')' after prism body");
        self.consume(TokenKind::ReturnType, "Expect '>>' after prism body");
        let return_type = self.type_annotation();
        PrismDecl {
            name,
            body,
            return_type,
        }
    }

    /// statements up to the closing paren, which is left in place
    fn block(&mut self) -> Vec<Stmt> {
        if self.depth >= MAX_NESTING {
            let token = self.peek().clone();
            self.error_at(&token, TOO_DEEP);
            self.skip_group(false);
            return vec![];
        }
        self.depth += 1;
        let mut body = vec![];
        while !self.check(TokenKind::RightParen) && !self.is_at_end() {
            body.push(self.statement());
        }
        self.depth -= 1;
        body
    }

    fn type_annotation(&mut self) -> DataType {
        let token = self.advance();
        match token.lexeme.parse() {
            Ok(dtype) => dtype,
            Err(_) => {
                self.error_at(&token, "Unknown type");
                DataType::None
            }
        }
    }

    // ==============================================================================
    // Expressions
    // ==============================================================================
    /// The additive, multiplicative and unary levels have no operators wired yet,
    /// an expression is a call chain.
    fn expression(&mut self) -> Expr {
        if self.depth >= MAX_NESTING {
            let token = self.peek().clone();
            self.error_at(&token, TOO_DEEP);
            self.skip_group(true);
            return Expr::Literal(Value::None);
        }
        self.depth += 1;
        let expr = self.call();
        self.depth -= 1;
        expr
    }

    /// every argument list of a chain counts as one nesting level
    fn call(&mut self) -> Expr {
        let outer = self.depth;
        let mut reported = false;
        let mut expr = self.primary();
        loop {
            let token = self.peek().clone();
            if self.matches(TokenKind::LeftParen) {
                if self.depth >= MAX_NESTING {
                    if !reported {
                        self.error_at(&token, TOO_DEEP);
                        reported = true;
                    }
                    self.skip_group(false);
                    self.consume(TokenKind::RightParen, "Expect ')' after arguments");
                    continue;
                }
                self.depth += 1;
                let mut args = vec![];
                if !self.check(TokenKind::RightParen) {
                    loop {
                        args.push(self.expression());
                        if !self.matches(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.consume(TokenKind::RightParen, "Expect ')' after arguments");
                expr = Expr::call(expr, args);
            } else if self.matches(TokenKind::Dot) {
                if let Some(name) =
                    self.consume(TokenKind::Identifier, "Expect property name after '.'")
                {
                    expr = Expr::Variable(name.lexeme);
                }
            } else {
                break;
            }
        }
        self.depth = outer;
        expr
    }

    fn primary(&mut self) -> Expr {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Integer => {
                self.advance();
                match token.lexeme.parse::<i64>() {
                    Ok(i) => Expr::literal(i),
                    Err(_) => {
                        self.error_at(&token, "Integer literal too large");
                        Expr::literal(0i64)
                    }
                }
            }
            TokenKind::Float => {
                self.advance();
                match token.lexeme.parse::<f64>() {
                    Ok(x) => Expr::literal(x),
                    Err(_) => {
                        self.error_at(&token, "Invalid float literal");
                        Expr::literal(0.0)
                    }
                }
            }
            TokenKind::String => {
                self.advance();
                Expr::literal(token.lexeme)
            }
            TokenKind::None => {
                self.advance();
                Expr::Literal(Value::None)
            }
            TokenKind::Identifier => {
                self.advance();
                Expr::Variable(token.lexeme)
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.expression();
                self.consume(TokenKind::RightParen, "Expect ')' after expression");
                expr
            }
            _ => {
                self.error_at(&token, "Expect expression");
                // skipping guarantees progress
                self.advance();
                Expr::Literal(Value::None)
            }
        }
    }
}
