//! Formula parser
//!
//! Recursive descent over the token stream produced by [`crate::lexer`].

use crate::ast::*;
use crate::error::ParseError;
use crate::lexer::{tokenize, Lexed, Operator, Token, TokenKind};

/// Deepest parenthesis / call nesting the parser will descend into
const MAX_PARSE_DEPTH: usize = 256;

/// Tallest expression tree the parser will build. Operator chains count
/// towards this as well as nesting, since evaluation recurses per level.
const MAX_TREE_HEIGHT: usize = 256;

/// An expression with the height of its tree
type Parsed = (FormulaExpr, usize);

/// Parse a formula string into an AST
///
/// # Example
/// ```rust
/// use costcalc_formula::parse_formula;
///
/// let ast = parse_formula("SUM({a}, {b}) * 2").unwrap();
/// ```
pub fn parse_formula(formula: &str) -> Result<FormulaExpr, ParseError> {
    parse_lexed(&tokenize(formula))
}

/// Parse an already tokenized formula. The first lexer diagnostic, if any, is
/// reported as the error.
pub(crate) fn parse_lexed(lexed: &Lexed) -> Result<FormulaExpr, ParseError> {
    if let Some(diagnostic) = lexed.diagnostics.first() {
        return Err(ParseError::new(diagnostic.message(), diagnostic.position));
    }

    let mut parser = FormulaParser::new(&lexed.tokens, lexed.source_len());
    parser.parse()
}

struct FormulaParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    end: usize,
    depth: usize,
}

impl<'a> FormulaParser<'a> {
    fn new(tokens: &'a [Token], end: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            end,
            depth: 0,
        }
    }

    fn parse(&mut self) -> Result<FormulaExpr, ParseError> {
        if self.tokens.is_empty() {
            return Err(ParseError::new("Empty formula", 0));
        }

        let (expr, _) = self.parse_expression()?;

        match self.current_token() {
            None => Ok(expr),
            Some(token) => Err(ParseError::new(
                format!("Unexpected {}", describe(&token.kind)),
                token.start,
            )),
        }
    }

    // === Token helpers ===

    fn current_token(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn current_kind(&self) -> Option<&'a TokenKind> {
        self.current_token().map(|t| &t.kind)
    }

    fn current_operator(&self) -> Option<Operator> {
        self.current_token().and_then(Token::operator)
    }

    /// Offset of the current token, or the end of the formula
    fn position(&self) -> usize {
        self.current_token().map_or(self.end, |t| t.start)
    }

    fn consume(&mut self) {
        self.pos += 1;
    }

    fn expect_close_paren(&mut self) -> Result<(), ParseError> {
        match self.current_kind() {
            Some(TokenKind::CloseParen) => {
                self.consume();
                Ok(())
            }
            Some(kind) => Err(ParseError::new(
                format!("Expected ')', got {}", describe(kind)),
                self.position(),
            )),
            None => Err(ParseError::new("Expected ')'", self.end)),
        }
    }

    // === Expression parsing with precedence ===
    // Precedence (lowest to highest):
    // 1. Comparison: =, <>, <, <=, >, >=
    // 2. Addition/Subtraction: +, -
    // 3. Multiplication/Division: *, /
    // 4. Unary: -, +
    // 5. Primary: literals, fields, function calls, parentheses

    fn parse_expression(&mut self) -> Result<Parsed, ParseError> {
        self.depth += 1;
        if self.depth > MAX_PARSE_DEPTH {
            return Err(too_deep(self.position()));
        }
        let expr = self.parse_comparison();
        self.depth -= 1;
        expr
    }

    fn parse_comparison(&mut self) -> Result<Parsed, ParseError> {
        let mut left = self.parse_additive()?;

        while let Some(op) = self.current_operator().filter(|op| !op.is_arithmetic()) {
            let position = self.position();
            self.consume();
            let right = self.parse_additive()?;
            left = binary(op.into(), left, right, position)?;
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Parsed, ParseError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current_operator() {
                Some(Operator::Add) => BinaryOperator::Add,
                Some(Operator::Subtract) => BinaryOperator::Subtract,
                _ => break,
            };

            let position = self.position();
            self.consume();
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right, position)?;
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Parsed, ParseError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.current_operator() {
                Some(Operator::Multiply) => BinaryOperator::Multiply,
                Some(Operator::Divide) => BinaryOperator::Divide,
                _ => break,
            };

            let position = self.position();
            self.consume();
            let right = self.parse_unary()?;
            left = binary(op, left, right, position)?;
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Parsed, ParseError> {
        // Collect prefix signs iteratively, then wrap innermost first
        let mut prefixes = Vec::new();
        loop {
            let op = match self.current_operator() {
                Some(Operator::Subtract) => UnaryOperator::Negate,
                Some(Operator::Add) => UnaryOperator::Plus,
                _ => break,
            };
            prefixes.push((op, self.position()));
            self.consume();
        }

        let (mut expr, mut height) = self.parse_primary()?;
        for (op, position) in prefixes.into_iter().rev() {
            height = grow(height, position)?;
            expr = FormulaExpr::UnaryOp {
                op,
                operand: Box::new(expr),
            };
        }

        Ok((expr, height))
    }

    fn parse_primary(&mut self) -> Result<Parsed, ParseError> {
        let token = match self.current_token() {
            Some(token) => token,
            None => return Err(ParseError::new("Unexpected end of formula", self.end)),
        };

        let leaf = match &token.kind {
            TokenKind::NumberLiteral(n) => FormulaExpr::Number(*n),
            TokenKind::StringLiteral(s) => FormulaExpr::Text(s.clone()),
            TokenKind::BooleanLiteral(b) => FormulaExpr::Boolean(*b),

            TokenKind::FieldRef(name) => {
                if name.is_empty() {
                    return Err(ParseError::new("Empty field reference", token.start));
                }
                FormulaExpr::Field(name.clone())
            }

            TokenKind::OpenParen => {
                self.consume();
                let expr = self.parse_expression()?;
                self.expect_close_paren()?;
                return Ok(expr);
            }

            TokenKind::FunctionName(name) => {
                self.consume();
                return self.parse_function_call(name, token.start);
            }

            TokenKind::Identifier(name) => {
                return Err(ParseError::new(
                    format!("Unknown identifier '{}'", name),
                    token.start,
                ))
            }

            kind => {
                return Err(ParseError::new(
                    format!("Unexpected {}", describe(kind)),
                    token.start,
                ))
            }
        };

        self.consume();
        Ok((leaf, 1))
    }

    fn parse_function_call(&mut self, name: &str, start: usize) -> Result<Parsed, ParseError> {
        // The lexer only emits FunctionName when '(' follows directly
        self.consume();

        let mut args = Vec::new();
        let mut height = 0;

        if !matches!(self.current_kind(), Some(TokenKind::CloseParen)) {
            loop {
                let (arg, arg_height) = self.parse_expression()?;
                args.push(arg);
                height = height.max(arg_height);

                if !matches!(self.current_kind(), Some(TokenKind::Comma)) {
                    break;
                }
                self.consume();
            }
        }

        self.expect_close_paren()?;

        let call = FormulaExpr::Function {
            name: name.to_uppercase(),
            args,
        };
        Ok((call, grow(height, start)?))
    }
}

/// Join two operands, keeping the tree height within [`MAX_TREE_HEIGHT`]
fn binary(
    op: BinaryOperator,
    (left, left_height): Parsed,
    (right, right_height): Parsed,
    position: usize,
) -> Result<Parsed, ParseError> {
    let height = grow(left_height.max(right_height), position)?;
    let expr = FormulaExpr::BinaryOp {
        op,
        left: Box::new(left),
        right: Box::new(right),
    };
    Ok((expr, height))
}

fn grow(height: usize, position: usize) -> Result<usize, ParseError> {
    if height >= MAX_TREE_HEIGHT {
        Err(too_deep(position))
    } else {
        Ok(height + 1)
    }
}

fn too_deep(position: usize) -> ParseError {
    ParseError::new("Formula is nested too deeply", position)
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::FieldRef(name) => format!("field reference '{{{}}}'", name),
        TokenKind::FunctionName(name) => format!("function '{}'", name),
        TokenKind::Identifier(name) => format!("identifier '{}'", name),
        TokenKind::Operator(op) => format!("operator '{}'", op),
        TokenKind::NumberLiteral(n) => format!("number {}", n),
        TokenKind::StringLiteral(_) => "string literal".to_string(),
        TokenKind::BooleanLiteral(b) => format!("{}", if *b { "TRUE" } else { "FALSE" }),
        TokenKind::OpenParen => "'('".to_string(),
        TokenKind::CloseParen => "')'".to_string(),
        TokenKind::Comma => "','".to_string(),
    }
}
