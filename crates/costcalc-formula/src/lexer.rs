//! Formula tokenizer
//!
//! An explicit character scanner that turns formula text into a flat token
//! stream. Field references and function-call names are collected in the same
//! pass, so the token stream and the extracted sets can never disagree.
//!
//! Lexing never fails: malformed input is recorded as [`LexDiagnostic`]s and
//! the scanner keeps whatever tokens it could produce.
//!
//! All positions are character offsets, not byte offsets.

use std::collections::BTreeSet;
use std::fmt;

/// Operators recognised by the scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

impl Operator {
    /// Canonical symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Equal => "=",
            Operator::NotEqual => "<>",
            Operator::LessThan => "<",
            Operator::LessEqual => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterEqual => ">=",
        }
    }

    /// `+ - * /`
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Operator::Add | Operator::Subtract | Operator::Multiply | Operator::Divide
        )
    }

    /// Operators that may also appear in prefix position
    pub fn is_unary(&self) -> bool {
        matches!(self, Operator::Add | Operator::Subtract)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Token types
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// `{name}` with surrounding whitespace trimmed from the name
    FieldRef(String),
    /// Identifier immediately followed by `(`
    FunctionName(String),
    /// Bare identifier that is neither a boolean nor a function call
    Identifier(String),
    Operator(Operator),
    NumberLiteral(f64),
    StringLiteral(String),
    /// `TRUE` / `FALSE`, any case
    BooleanLiteral(bool),
    OpenParen,
    CloseParen,
    Comma,
}

/// A token with its character span `[start, end)`
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    /// The operator carried by this token, if any
    pub fn operator(&self) -> Option<Operator> {
        match self.kind {
            TokenKind::Operator(op) => Some(op),
            _ => None,
        }
    }
}

/// Kinds of malformed input found while scanning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexDiagnosticKind {
    /// `{` with no closing `}` before the end of the formula
    UnterminatedField,
    /// `}` outside a field reference
    UnmatchedCloseBrace,
    /// `"` with no closing quote before the end of the formula
    UnterminatedString,
    /// Character that starts no token
    UnexpectedChar(char),
}

/// Malformed input found while scanning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexDiagnostic {
    pub kind: LexDiagnosticKind,
    pub position: usize,
}

impl LexDiagnostic {
    /// Human-readable description, without the position
    pub fn message(&self) -> String {
        match self.kind {
            LexDiagnosticKind::UnterminatedField => "Unterminated field reference".to_string(),
            LexDiagnosticKind::UnmatchedCloseBrace => "Unexpected closing brace".to_string(),
            LexDiagnosticKind::UnterminatedString => "Unterminated string literal".to_string(),
            LexDiagnosticKind::UnexpectedChar(c) => format!("Unexpected character '{}'", c),
        }
    }
}

/// Output of a scan
#[derive(Debug, Clone, Default)]
pub struct Lexed {
    /// Tokens in source order
    pub tokens: Vec<Token>,
    /// Distinct non-empty field names, first-appearance order
    pub fields: Vec<String>,
    /// Distinct function-call names as written, first-appearance order
    pub functions: Vec<String>,
    /// Malformed input, in source order
    pub diagnostics: Vec<LexDiagnostic>,
    /// Scanning stopped early at an unterminated field or string
    pub truncated: bool,
    source: Vec<char>,
}

impl Lexed {
    /// Source text between two character offsets
    pub fn text(&self, start: usize, end: usize) -> String {
        let end = end.min(self.source.len());
        let start = start.min(end);
        self.source[start..end].iter().collect()
    }

    /// Length of the source in characters
    pub fn source_len(&self) -> usize {
        self.source.len()
    }

    /// Character offsets and characters that lie outside string literals
    pub fn structural_chars(&self) -> impl Iterator<Item = (usize, char)> + '_ {
        // String tokens come in source order, so one cursor over them suffices
        let mut strings = self
            .tokens
            .iter()
            .filter(|t| matches!(t.kind, TokenKind::StringLiteral(_)))
            .map(|t| (t.start, t.end))
            .peekable();

        self.source
            .iter()
            .copied()
            .enumerate()
            .filter(move |&(i, _)| {
                while strings.next_if(|&(_, end)| end <= i).is_some() {}
                !matches!(strings.peek(), Some(&(start, _)) if start <= i)
            })
    }
}

/// Tokenize a formula
///
/// # Example
/// ```rust
/// use costcalc_formula::lexer::{tokenize, TokenKind};
///
/// let lexed = tokenize("SUM({a}, 2)");
/// assert_eq!(lexed.tokens[0].kind, TokenKind::FunctionName("SUM".into()));
/// assert_eq!(lexed.fields, vec!["a".to_string()]);
/// ```
pub fn tokenize(formula: &str) -> Lexed {
    Lexer::new(formula).run()
}

/// Distinct field names referenced by a formula
pub fn extract_fields(formula: &str) -> BTreeSet<String> {
    tokenize(formula).fields.into_iter().collect()
}

/// Distinct function names called by a formula, as written
pub fn extract_functions(formula: &str) -> BTreeSet<String> {
    tokenize(formula).functions.into_iter().collect()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    out: Lexed,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            out: Lexed::default(),
        }
    }

    fn run(mut self) -> Lexed {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.advance();
                continue;
            }

            let start = self.pos;
            match c {
                '{' => {
                    if !self.scan_field(start) {
                        break;
                    }
                }
                '}' => {
                    self.advance();
                    self.diagnostic(LexDiagnosticKind::UnmatchedCloseBrace, start);
                }
                '"' => {
                    if !self.scan_string(start) {
                        break;
                    }
                }
                '(' => self.single(TokenKind::OpenParen, start),
                ')' => self.single(TokenKind::CloseParen, start),
                ',' => self.single(TokenKind::Comma, start),
                '+' => self.single(TokenKind::Operator(Operator::Add), start),
                '-' => self.single(TokenKind::Operator(Operator::Subtract), start),
                '*' => self.single(TokenKind::Operator(Operator::Multiply), start),
                '/' => self.single(TokenKind::Operator(Operator::Divide), start),
                '=' => {
                    self.advance();
                    // `==` is accepted as a synonym
                    if self.peek_char() == Some('=') {
                        self.advance();
                    }
                    self.push(TokenKind::Operator(Operator::Equal), start);
                }
                '!' => {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                        self.push(TokenKind::Operator(Operator::NotEqual), start);
                    } else {
                        self.diagnostic(LexDiagnosticKind::UnexpectedChar('!'), start);
                    }
                }
                '<' => {
                    self.advance();
                    let op = match self.peek_char() {
                        Some('=') => {
                            self.advance();
                            Operator::LessEqual
                        }
                        Some('>') => {
                            self.advance();
                            Operator::NotEqual
                        }
                        _ => Operator::LessThan,
                    };
                    self.push(TokenKind::Operator(op), start);
                }
                '>' => {
                    self.advance();
                    let op = if self.peek_char() == Some('=') {
                        self.advance();
                        Operator::GreaterEqual
                    } else {
                        Operator::GreaterThan
                    };
                    self.push(TokenKind::Operator(op), start);
                }
                c if c.is_ascii_digit()
                    || (c == '.' && self.peek_char_at(1).map_or(false, |n| n.is_ascii_digit())) =>
                {
                    self.scan_number(start)
                }
                c if c.is_ascii_alphabetic() || c == '_' => self.scan_identifier(start),
                other => {
                    self.advance();
                    self.diagnostic(LexDiagnosticKind::UnexpectedChar(other), start);
                }
            }
        }

        self.out.source = self.chars;
        self.out
    }

    // === Token scanning ===

    /// Returns false when the field runs off the end of the input
    fn scan_field(&mut self, start: usize) -> bool {
        self.advance(); // Skip '{'
        let name_start = self.pos;

        while let Some(c) = self.peek_char() {
            if c == '}' {
                let name: String = self.chars[name_start..self.pos].iter().collect();
                let name = name.trim().to_string();
                self.advance();

                if !name.is_empty() && !self.out.fields.contains(&name) {
                    self.out.fields.push(name.clone());
                }
                self.push(TokenKind::FieldRef(name), start);
                return true;
            }
            self.advance();
        }

        self.diagnostic(LexDiagnosticKind::UnterminatedField, start);
        self.out.truncated = true;
        false
    }

    /// Returns false when the literal runs off the end of the input
    fn scan_string(&mut self, start: usize) -> bool {
        self.advance(); // Skip opening quote

        let mut s = String::new();
        while let Some(c) = self.peek_char() {
            self.advance();
            if c == '"' {
                // Check for escaped quote ("")
                if self.peek_char() == Some('"') {
                    s.push('"');
                    self.advance();
                } else {
                    self.push(TokenKind::StringLiteral(s), start);
                    return true;
                }
            } else {
                s.push(c);
            }
        }

        self.push(TokenKind::StringLiteral(s), start);
        self.diagnostic(LexDiagnosticKind::UnterminatedString, start);
        self.out.truncated = true;
        false
    }

    fn scan_number(&mut self, start: usize) {
        // Integer part
        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }

        // Decimal part
        if self.peek_char() == Some('.')
            && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit())
        {
            self.advance();
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let text: String = self.chars[start..self.pos].iter().collect();
        let num: f64 = text.parse().unwrap_or(0.0);
        self.push(TokenKind::NumberLiteral(num), start);
    }

    fn scan_identifier(&mut self, start: usize) {
        while self
            .peek_char()
            .map_or(false, |c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.advance();
        }

        let text: String = self.chars[start..self.pos].iter().collect();

        // Function call only when '(' follows with no gap
        if self.peek_char() == Some('(') {
            if !self.out.functions.contains(&text) {
                self.out.functions.push(text.clone());
            }
            self.push(TokenKind::FunctionName(text), start);
        } else if text.eq_ignore_ascii_case("TRUE") {
            self.push(TokenKind::BooleanLiteral(true), start);
        } else if text.eq_ignore_ascii_case("FALSE") {
            self.push(TokenKind::BooleanLiteral(false), start);
        } else {
            self.push(TokenKind::Identifier(text), start);
        }
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn single(&mut self, kind: TokenKind, start: usize) {
        self.advance();
        self.push(kind, start);
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.out.tokens.push(Token {
            kind,
            start,
            end: self.pos,
        });
    }

    fn diagnostic(&mut self, kind: LexDiagnosticKind, position: usize) {
        self.out.diagnostics.push(LexDiagnostic { kind, position });
    }
}
