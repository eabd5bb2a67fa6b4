//! Lexical analysis. [`scan`] turns source text into tokens in one left to right
//! pass. Errors are recorded, the offending input is skipped, and the returned
//! sequence always ends with an [`TokenKind::Eof`] token.

use once_cell::sync::Lazy;
use strum_macros::Display;

use std::collections::HashMap;
use std::fmt;

use crate::diagnostics::{Diagnostic, Diagnostics, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum TokenKind {
    #[strum(serialize = "end of file")]
    Eof,
    #[strum(serialize = "identifier")]
    Identifier,
    #[strum(serialize = "integer")]
    Integer,
    #[strum(serialize = "float")]
    Float,
    #[strum(serialize = "string")]
    String,
    #[strum(serialize = "->")]
    Arrow,
    #[strum(serialize = ">>")]
    ReturnType,
    #[strum(serialize = ":")]
    Colon,
    #[strum(serialize = ",")]
    Comma,
    #[strum(serialize = "(")]
    LeftParen,
    #[strum(serialize = ")")]
    RightParen,
    #[strum(serialize = "[")]
    LeftBracket,
    #[strum(serialize = "]")]
    RightBracket,
    #[strum(serialize = ".")]
    Dot,
    #[strum(serialize = "function")]
    Function,
    #[strum(serialize = "prism")]
    Prism,
    #[strum(serialize = "internal")]
    Internal,
    #[strum(serialize = "exposed")]
    Exposed,
    #[strum(serialize = "run")]
    Run,
    #[strum(serialize = "None")]
    None,
}

static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    HashMap::from([
        ("function", TokenKind::Function),
        ("prism", TokenKind::Prism),
        ("internal", TokenKind::Internal),
        ("exposed", TokenKind::Exposed),
        ("run", TokenKind::Run),
        ("None", TokenKind::None),
    ])
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// the source text of the token. For strings, the text between the quotes.
    pub lexeme: String,
    /// 1-based
    pub line: u32,
    /// 1-based
    pub column: u32,
}

impl Token {
    pub fn eof(line: u32, column: u32) -> Self {
        Token {
            kind: TokenKind::Eof,
            lexeme: String::new(),
            line,
            column,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>4}:{:<4} {:<12} {}",
            self.line,
            self.column,
            format!("{:?}", self.kind),
            self.lexeme
        )
    }
}

/// scans `source`, recording errors under the name `file`
pub fn scan(source: &str, file: &str, diagnostics: &mut Diagnostics) -> Vec<Token> {
    let mut lexer = Lexer::new(source, file, diagnostics);
    lexer.run();
    lexer.tokens
}

#[derive(Debug, Clone, Copy)]
struct SourcePos {
    offset: usize,
    line: u32,
    column: u32,
}

struct Lexer<'a> {
    source: &'a str,
    file: &'a str,
    diagnostics: &'a mut Diagnostics,
    tokens: Vec<Token>,
    current: SourcePos,
    token_start: SourcePos,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str, file: &'a str, diagnostics: &'a mut Diagnostics) -> Self {
        let start = SourcePos {
            offset: 0,
            line: 1,
            column: 1,
        };
        Lexer {
            source,
            file,
            diagnostics,
            tokens: vec![],
            current: start,
            token_start: start,
        }
    }

    #[rustfmt::skip]
    fn run(&mut self) {
        use TokenKind as T;

        loop {
            self.skip_trivia();
            self.token_start = self.current;
            let Some(c) = self.advance() else { break };

            match c {
                '(' => self.add_token(T::LeftParen),
                ')' => self.add_token(T::RightParen),
                '[' => self.add_token(T::LeftBracket),
                ']' => self.add_token(T::RightBracket),
                ':' => self.add_token(T::Colon),
                ',' => self.add_token(T::Comma),
                '.' => self.add_token(T::Dot),
                '-' if self.matches('>') => self.add_token(T::Arrow),
                '>' if self.matches('>') => self.add_token(T::ReturnType),
                '"'                      => self.string(),
                '0'..='9'                => self.number(),
                c if is_ident_start(c)   => self.identifier(),
                _                        => self.error_at(self.token_start, "Unexpected character"),
            }
        }

        self.tokens.push(Token::eof(self.current.line, self.current.column));
    }

    fn peek(&self) -> Option<char> {
        self.source[self.current.offset..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        self.source[self.current.offset..].chars().nth(1)
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.current.offset += c.len_utf8();
        if c == '\n' {
            self.current.line += 1;
            self.current.column = 1;
        } else {
            self.current.column += 1;
        }
        Some(c)
    }

    fn matches(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// whitespace and `!!` comments
    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance();
                }
                '!' if self.peek_next() == Some('!') => {
                    while self.peek().map_or(false, |c| c != '\n') {
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    fn fragment(&self) -> &'a str {
        &self.source[self.token_start.offset..self.current.offset]
    }

    fn add_token(&mut self, kind: TokenKind) {
        let lexeme = self.fragment().to_owned();
        self.push_token(kind, lexeme);
    }

    fn push_token(&mut self, kind: TokenKind, lexeme: String) {
        self.tokens.push(Token {
            kind,
            lexeme,
            line: self.token_start.line,
            column: self.token_start.column,
        });
    }

    fn error_at(&mut self, pos: SourcePos, msg: &str) {
        self.diagnostics.push(Diagnostic::new(
            ErrorKind::Syntax,
            self.file,
            pos.line,
            pos.column,
            msg,
        ));
    }

    fn identifier(&mut self) {
        while self.peek().map_or(false, is_ident_continue) {
            self.advance();
        }
        let kind = KEYWORDS
            .get(self.fragment())
            .copied()
            .unwrap_or(TokenKind::Identifier);
        self.add_token(kind);
    }

    fn number(&mut self) {
        self.digits();
        let fraction_follows = self.peek() == Some('.')
            && self.peek_next().map_or(false, |c| c.is_ascii_digit());
        if fraction_follows {
            self.advance();
            self.digits();
            self.add_token(TokenKind::Float);
        } else {
            self.add_token(TokenKind::Integer);
        }
    }

    fn digits(&mut self) {
        while self.peek().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    /// the opening quote is already consumed. Strings may span lines.
    fn string(&mut self) {
        let content_start = self.current.offset;
        while self.peek().map_or(false, |c| c != '"') {
            self.advance();
        }
        if self.peek().is_none() {
            self.error_at(self.token_start, "Unterminated string");
            return;
        }
        let content = self.source[content_start..self.current.offset].to_owned();
        self.advance();
        self.push_token(TokenKind::String, content);
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use TokenKind as T;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut ds = Diagnostics::new();
        let tokens = scan(src, "test", &mut ds);
        assert!(!ds.has_errors(), "{:?}", *ds);
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn punctuation_and_operators() {
        assert_eq!(
            kinds("( ) [ ] : , . -> >>"),
            vec![
                T::LeftParen,
                T::RightParen,
                T::LeftBracket,
                T::RightBracket,
                T::Colon,
                T::Comma,
                T::Dot,
                T::Arrow,
                T::ReturnType,
                T::Eof
            ]
        );
    }

    #[test]
    fn keywords_are_exact() {
        assert_eq!(
            kinds("function prism internal exposed run None functions _x none"),
            vec![
                T::Function,
                T::Prism,
                T::Internal,
                T::Exposed,
                T::Run,
                T::None,
                T::Identifier,
                T::Identifier,
                T::Identifier,
                T::Eof
            ]
        );
    }

    #[test]
    fn numbers() {
        let mut ds = Diagnostics::new();
        let tokens = scan("42 3.14 7.x", "test", &mut ds);
        let got: Vec<_> = tokens.iter().map(|t| (t.kind, t.lexeme.as_str())).collect();
        assert_eq!(
            got,
            vec![
                (T::Integer, "42"),
                (T::Float, "3.14"),
                (T::Integer, "7"),
                (T::Dot, "."),
                (T::Identifier, "x"),
                (T::Eof, "")
            ]
        );
    }

    #[test]
    fn strings_drop_quotes_and_span_lines() {
        let mut ds = Diagnostics::new();
        let tokens = scan("\"hello\" \"a\nb\" x", "test", &mut ds);
        assert!(!ds.has_errors());
        assert_eq!(tokens[0].lexeme, "hello");
        assert_eq!(tokens[1].lexeme, "a\nb");
        assert_eq!((tokens[2].line, tokens[2].column), (2, 4));
    }

    #[test]
    fn positions_are_one_based() {
        let mut ds = Diagnostics::new();
        let tokens = scan("x\n  y -> 1", "test", &mut ds);
        let pos: Vec<_> = tokens.iter().map(|t| (t.line, t.column)).collect();
        assert_eq!(pos, vec![(1, 1), (2, 3), (2, 5), (2, 8), (2, 9)]);
    }

    #[test]
    fn comments_run_to_end_of_line() {
        assert_eq!(
            kinds("a !! ignored ( ) \"\nb"),
            vec![T::Identifier, T::Identifier, T::Eof]
        );
    }

    #[test]
    fn unterminated_string() {
        let mut ds = Diagnostics::new();
        let tokens = scan("x \"abc", "main.prism", &mut ds);
        assert_eq!(ds.len(), 1);
        assert_eq!(
            ds[0].to_string(),
            "main.prism:1:3: Syntax error: Unterminated string"
        );
        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![T::Identifier, T::Eof]
        );
    }

    #[test]
    fn stray_characters_are_skipped() {
        let mut ds = Diagnostics::new();
        let tokens = scan("a - > ! @ b", "test", &mut ds);
        assert_eq!(ds.len(), 4);
        assert!(ds.iter().all(|d| d.kind == ErrorKind::Syntax));
        assert_eq!(ds[0].column, 3);
        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![T::Identifier, T::Identifier, T::Eof]
        );
    }
}
