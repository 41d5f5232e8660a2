//! Structural formula validation
//!
//! A validation pass never fails: every defect it finds is reported as data in
//! the [`ValidationResult`]. Checks run in a fixed order and their errors are
//! reported in that order:
//!
//! 1. parenthesis balance
//! 2. brace balance
//! 3. syntax smells (adjacent operators, empty groups, missing operands, ...)
//! 4. unknown fields
//! 5. unknown functions
//! 6. argument counts
//! 7. a full parse, only when nothing above was found
//!
//! Warnings about formula length and nesting depth never affect validity.

use crate::functions::FunctionRegistry;
use crate::lexer::{tokenize, LexDiagnosticKind, Lexed, TokenKind};
use crate::options::ValidatorOptions;
use crate::parser::parse_lexed;
use costcalc_core::FieldDeclaration;
use std::collections::BTreeSet;
use std::fmt;

/// Kind of validation error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub enum ErrorKind {
    Syntax,
    UnknownField,
    UnknownFunction,
    Arity,
}

/// A defect that makes a formula invalid
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValidationError {
    pub kind: ErrorKind,
    pub message: String,
    /// Character offset, when the defect has one
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub position: Option<usize>,
}

impl ValidationError {
    fn new<S: Into<String>>(kind: ErrorKind, message: S, position: Option<usize>) -> Self {
        Self {
            kind,
            message: message.into(),
            position,
        }
    }

    fn syntax<S: Into<String>>(message: S, position: usize) -> Self {
        Self::new(ErrorKind::Syntax, message, Some(position))
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(p) => write!(f, "{} (at position {})", self.message, p),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Kind of validation warning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub enum WarningKind {
    FormulaLength,
    NestingDepth,
}

/// Advice that does not affect validity
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValidationWarning {
    pub kind: WarningKind,
    pub message: String,
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Outcome of validating one formula
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    /// Field names referenced by the formula
    pub fields: BTreeSet<String>,
    /// Function names called by the formula, as written
    pub functions: BTreeSet<String>,
}

impl ValidationResult {
    /// Errors of one kind, in report order
    pub fn errors_of(&self, kind: ErrorKind) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(move |e| e.kind == kind)
    }
}

/// Validates formulas against declared fields and a function registry
#[derive(Debug, Clone)]
pub struct Validator<'r> {
    registry: &'r FunctionRegistry,
    options: ValidatorOptions,
}

impl Default for Validator<'static> {
    fn default() -> Self {
        Self::new(FunctionRegistry::builtin(), ValidatorOptions::default())
    }
}

/// Validate a formula with the built-in functions and default options
///
/// # Example
/// ```rust
/// use costcalc_core::FieldDeclaration;
/// use costcalc_formula::validate;
///
/// let fields = [FieldDeclaration::number("a"), FieldDeclaration::number("b")];
/// let result = validate("{a} + {b}", &fields);
/// assert!(result.is_valid);
/// ```
pub fn validate(formula: &str, fields: &[FieldDeclaration]) -> ValidationResult {
    Validator::default().validate(formula, fields)
}

impl<'r> Validator<'r> {
    pub fn new(registry: &'r FunctionRegistry, options: ValidatorOptions) -> Self {
        Self { registry, options }
    }

    pub fn options(&self) -> &ValidatorOptions {
        &self.options
    }

    /// Validate a formula
    pub fn validate(&self, formula: &str, fields: &[FieldDeclaration]) -> ValidationResult {
        if formula.trim().is_empty() {
            log::debug!("validated empty formula");
            return ValidationResult {
                is_valid: false,
                errors: vec![ValidationError::new(
                    ErrorKind::Syntax,
                    "Formula is empty",
                    None,
                )],
                ..Default::default()
            };
        }

        let lexed = tokenize(formula);
        let mut errors = Vec::new();

        let max_depth = check_balance(&lexed, ('(', ')'), "parenthesis", &mut errors);
        check_balance(&lexed, ('{', '}'), "brace", &mut errors);
        errors.extend(syntax_smells(&lexed));
        self.check_fields(&lexed, fields, &mut errors);
        self.check_functions(&lexed, &mut errors);
        self.check_arity(&lexed, &mut errors);

        // Only a structurally clean formula gets a full parse
        if errors.is_empty() {
            if let Err(e) = parse_lexed(&lexed) {
                errors.push(ValidationError::syntax(e.message, e.position));
            }
        }

        let warnings = self.warnings(formula, max_depth);

        log::debug!(
            "validated formula ({} chars): {} errors, {} warnings",
            lexed.source_len(),
            errors.len(),
            warnings.len()
        );

        ValidationResult {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            fields: lexed.fields.iter().cloned().collect(),
            functions: lexed.functions.iter().cloned().collect(),
        }
    }

    fn check_fields(
        &self,
        lexed: &Lexed,
        fields: &[FieldDeclaration],
        errors: &mut Vec<ValidationError>,
    ) {
        let available = if fields.is_empty() {
            "(none)".to_string()
        } else {
            fields
                .iter()
                .map(|f| f.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };

        for name in &lexed.fields {
            if fields.iter().any(|f| &f.name == name) {
                continue;
            }
            let position = lexed.tokens.iter().find_map(|t| match &t.kind {
                TokenKind::FieldRef(n) if n == name => Some(t.start),
                _ => None,
            });
            errors.push(ValidationError::new(
                ErrorKind::UnknownField,
                format!("Unknown field '{}'. Available fields: {}", name, available),
                position,
            ));
        }
    }

    fn check_functions(&self, lexed: &Lexed, errors: &mut Vec<ValidationError>) {
        for name in &lexed.functions {
            if self.registry.contains(name) {
                continue;
            }
            let position = lexed.tokens.iter().find_map(|t| match &t.kind {
                TokenKind::FunctionName(n) if n == name => Some(t.start),
                _ => None,
            });
            errors.push(ValidationError::new(
                ErrorKind::UnknownFunction,
                format!(
                    "Unknown function '{}'. Available functions: {}",
                    name,
                    self.registry.all_names().join(", ")
                ),
                position,
            ));
        }
    }

    /// Count top-level arguments of every closed, non-empty call
    fn check_arity(&self, lexed: &Lexed, errors: &mut Vec<ValidationError>) {
        struct Group<'a> {
            call: Option<(&'a str, usize)>,
            commas: usize,
            empty: bool,
        }

        let mut stack: Vec<Group<'_>> = Vec::new();
        let mut found = Vec::new();

        for (i, token) in lexed.tokens.iter().enumerate() {
            match &token.kind {
                TokenKind::OpenParen => {
                    if let Some(parent) = stack.last_mut() {
                        parent.empty = false;
                    }
                    let call = i
                        .checked_sub(1)
                        .and_then(|p| lexed.tokens.get(p))
                        .and_then(|prev| match &prev.kind {
                            TokenKind::FunctionName(name) => Some((name.as_str(), prev.start)),
                            _ => None,
                        });
                    stack.push(Group {
                        call,
                        commas: 0,
                        empty: true,
                    });
                }
                TokenKind::CloseParen => {
                    let Some(group) = stack.pop() else { continue };
                    let Some((name, position)) = group.call else { continue };
                    if group.empty {
                        continue;
                    }
                    let Some(spec) = self.registry.lookup(name) else { continue };

                    let count = group.commas + 1;
                    if !spec.accepts_arg_count(count) {
                        let expected = spec.arity_description();
                        let noun = if expected == "1" { "argument" } else { "arguments" };
                        found.push(ValidationError::new(
                            ErrorKind::Arity,
                            format!(
                                "{} expects {} {}, got {}",
                                spec.name, expected, noun, count
                            ),
                            Some(position),
                        ));
                    }
                }
                TokenKind::Comma => {
                    if let Some(group) = stack.last_mut() {
                        group.commas += 1;
                        group.empty = false;
                    }
                }
                _ => {
                    if let Some(group) = stack.last_mut() {
                        group.empty = false;
                    }
                }
            }
        }

        found.sort_by_key(|e| e.position);
        errors.extend(found);
    }

    fn warnings(&self, formula: &str, max_depth: usize) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        let length = formula.chars().count();
        if length > self.options.max_formula_length {
            warnings.push(ValidationWarning {
                kind: WarningKind::FormulaLength,
                message: format!(
                    "Formula is {} characters long (limit {}); consider splitting it into intermediate fields",
                    length, self.options.max_formula_length
                ),
            });
        }

        if max_depth > self.options.max_nesting_depth {
            warnings.push(ValidationWarning {
                kind: WarningKind::NestingDepth,
                message: format!(
                    "Parentheses are nested {} levels deep (limit {}); consider simplifying the formula",
                    max_depth, self.options.max_nesting_depth
                ),
            });
        }

        warnings
    }
}

/// Depth-counter balance scan over characters outside string literals.
/// Returns the deepest nesting reached.
fn check_balance(
    lexed: &Lexed,
    (open, close): (char, char),
    name: &str,
    errors: &mut Vec<ValidationError>,
) -> usize {
    let mut stack = Vec::new();
    let mut max_depth = 0;

    for (i, c) in lexed.structural_chars() {
        if c == open {
            stack.push(i);
            max_depth = max_depth.max(stack.len());
        } else if c == close && stack.pop().is_none() {
            errors.push(ValidationError::syntax(
                format!("Unexpected closing {} '{}'", name, close),
                i,
            ));
        }
    }

    if let Some(&last) = stack.last() {
        let plural = if name == "parenthesis" { "parentheses" } else { "braces" };
        let message = if stack.len() == 1 {
            format!("1 unclosed {} '{}'", name, open)
        } else {
            format!("{} unclosed {} '{}'", stack.len(), plural, open)
        };
        errors.push(ValidationError::syntax(message, last));
    }

    max_depth
}

/// Token-level defects, sorted by position
fn syntax_smells(lexed: &Lexed) -> Vec<ValidationError> {
    let tokens = &lexed.tokens;
    let mut smells = Vec::new();

    // Adjacent arithmetic operators, one error per run
    let adjacent = |a: usize, b: usize| -> bool {
        match (tokens.get(a), tokens.get(b)) {
            (Some(x), Some(y)) => {
                x.end == y.start
                    && x.operator().map_or(false, |op| op.is_arithmetic())
                    && y.operator().map_or(false, |op| op.is_arithmetic())
            }
            _ => false,
        }
    };

    let mut i = 0;
    while i < tokens.len() {
        if adjacent(i, i + 1) {
            let start = i;
            while adjacent(i, i + 1) {
                i += 1;
            }
            let run = lexed.text(tokens[start].start, tokens[i].end);
            smells.push(ValidationError::syntax(
                format!("Consecutive operators '{}'", run),
                tokens[start].start,
            ));
        }
        i += 1;
    }

    for (i, token) in tokens.iter().enumerate() {
        let prev = i.checked_sub(1).and_then(|p| tokens.get(p));
        let next = tokens.get(i + 1);

        match &token.kind {
            TokenKind::OpenParen if matches!(next.map(|t| &t.kind), Some(TokenKind::CloseParen)) => {
                smells.push(ValidationError::syntax("Empty parentheses '()'", token.start));
            }
            TokenKind::FieldRef(name) if name.is_empty() => {
                smells.push(ValidationError::syntax("Empty field reference '{}'", token.start));
            }
            TokenKind::Identifier(name) => {
                smells.push(ValidationError::syntax(
                    format!(
                        "Unknown identifier '{}'; field references are written in braces, e.g. {{{}}}",
                        name, name
                    ),
                    token.start,
                ));
            }
            TokenKind::Operator(op) => {
                // Runs are already reported as a whole
                if (i > 0 && adjacent(i - 1, i)) || adjacent(i, i + 1) {
                    continue;
                }

                let missing_after = match next.map(|t| &t.kind) {
                    None => !lexed.truncated,
                    Some(TokenKind::CloseParen) | Some(TokenKind::Comma) => true,
                    _ => false,
                };
                if missing_after {
                    smells.push(ValidationError::syntax(
                        format!("Missing operand after '{}'", op),
                        token.start,
                    ));
                    continue;
                }

                let missing_before = !op.is_unary()
                    && matches!(
                        prev.map(|t| &t.kind),
                        None | Some(TokenKind::OpenParen) | Some(TokenKind::Comma)
                    );
                if missing_before {
                    smells.push(ValidationError::syntax(
                        format!("Missing operand before '{}'", op),
                        token.start,
                    ));
                }
            }
            _ => {}
        }
    }

    // Lexer findings not already covered by the balance scans
    for diagnostic in &lexed.diagnostics {
        match diagnostic.kind {
            LexDiagnosticKind::UnterminatedString | LexDiagnosticKind::UnexpectedChar(_) => {
                smells.push(ValidationError::syntax(diagnostic.message(), diagnostic.position));
            }
            LexDiagnosticKind::UnterminatedField | LexDiagnosticKind::UnmatchedCloseBrace => {}
        }
    }

    smells.sort_by_key(|e| e.position);
    smells
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fields(names: &[&str]) -> Vec<FieldDeclaration> {
        names.iter().map(|n| FieldDeclaration::number(*n)).collect()
    }

    fn messages(result: &ValidationResult) -> Vec<String> {
        result.errors.iter().map(|e| e.message.clone()).collect()
    }

    #[test]
    fn test_empty_formula() {
        for formula in ["", "   \t"] {
            let result = validate(formula, &[]);
            assert!(!result.is_valid);
            assert_eq!(result.errors.len(), 1);
            assert_eq!(result.errors[0].kind, ErrorKind::Syntax);
        }
    }

    #[test]
    fn test_valid_formula() {
        let result = validate("{a} + {b}", &fields(&["a", "b"]));
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
        assert_eq!(
            result.fields,
            BTreeSet::from(["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_trailing_operator() {
        let result = validate("{a} +", &fields(&["a"]));
        assert!(!result.is_valid);
        assert_eq!(
            result.errors,
            vec![ValidationError::syntax("Missing operand after '+'", 4)]
        );
    }

    #[test]
    fn test_unclosed_call_reports_once() {
        let result = validate("SUM({a},{b}", &fields(&["a", "b"]));
        assert_eq!(
            result.errors,
            vec![ValidationError::syntax("1 unclosed parenthesis '('", 3)]
        );
    }

    #[test]
    fn test_unexpected_closing_parenthesis() {
        let result = validate(") + (1))", &[]);
        assert_eq!(
            messages(&result),
            vec![
                "Unexpected closing parenthesis ')'".to_string(),
                "Unexpected closing parenthesis ')'".to_string(),
            ]
        );
        assert_eq!(result.errors[0].position, Some(0));
        assert_eq!(result.errors[1].position, Some(7));
    }

    #[test]
    fn test_multiple_unclosed_parentheses() {
        let result = validate("MAX(1, MIN(2, (3", &[]);
        assert_eq!(
            result.errors,
            vec![ValidationError::syntax("3 unclosed parentheses '('", 14)]
        );
    }

    #[test]
    fn test_brace_balance() {
        let result = validate("{a} + {b", &fields(&["a", "b"]));
        assert_eq!(
            result.errors,
            vec![ValidationError::syntax("1 unclosed brace '{'", 6)]
        );

        let result = validate("{a} }", &fields(&["a"]));
        assert_eq!(
            result.errors,
            vec![ValidationError::syntax("Unexpected closing brace '}'", 4)]
        );
    }

    #[test]
    fn test_parentheses_inside_strings_ignored() {
        let result = validate("CONCAT(\")(\", {a})", &fields(&["a"]));
        assert!(result.is_valid, "{:?}", result.errors);
    }

    #[test]
    fn test_consecutive_operators() {
        let result = validate("{a}++{b}", &fields(&["a", "b"]));
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::Syntax);
        assert_eq!(result.errors[0].message, "Consecutive operators '++'");
        assert_eq!(result.errors[0].position, Some(3));

        let result = validate("{a} */- {b} +* 2", &fields(&["a", "b"]));
        assert_eq!(
            messages(&result),
            vec![
                "Consecutive operators '*/-'".to_string(),
                "Consecutive operators '+*'".to_string(),
            ]
        );
    }

    #[test]
    fn test_empty_groups() {
        let result = validate("SUM() + {}", &[]);
        assert_eq!(
            result.errors,
            vec![
                ValidationError::syntax("Empty parentheses '()'", 3),
                ValidationError::syntax("Empty field reference '{}'", 8),
            ]
        );
    }

    #[test]
    fn test_missing_operand_before() {
        let result = validate("MAX(* 2, 1)", &[]);
        assert_eq!(
            result.errors,
            vec![ValidationError::syntax("Missing operand before '*'", 4)]
        );

        // Leading sign is fine
        assert!(validate("-{a} + (+2)", &fields(&["a"])).is_valid);
    }

    #[test]
    fn test_missing_operand_before_comma() {
        let result = validate("MAX(1 -, 2)", &[]);
        assert_eq!(
            result.errors,
            vec![ValidationError::syntax("Missing operand after '-'", 6)]
        );
    }

    #[test]
    fn test_bare_identifier() {
        let result = validate("price * 2", &[]);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0]
            .message
            .starts_with("Unknown identifier 'price'"));
    }

    #[test]
    fn test_lexer_diagnostics_reported() {
        let result = validate("1 # 2", &[]);
        assert_eq!(
            result.errors,
            vec![ValidationError::syntax("Unexpected character '#'", 2)]
        );

        let result = validate("CONCAT(\"abc", &[]);
        assert!(messages(&result).contains(&"Unterminated string literal".to_string()));
    }

    #[test]
    fn test_unknown_field_lists_available() {
        let result = validate("{a} + {c} + {c}", &fields(&["a", "b"]));
        assert_eq!(
            result.errors,
            vec![ValidationError::new(
                ErrorKind::UnknownField,
                "Unknown field 'c'. Available fields: a, b",
                Some(6),
            )]
        );
    }

    #[test]
    fn test_field_names_case_sensitive() {
        let result = validate("{Qty}", &fields(&["qty"]));
        assert_eq!(result.errors_of(ErrorKind::UnknownField).count(), 1);
    }

    #[test]
    fn test_unknown_function() {
        let result = validate("VLOOKUP({a}) + sum({a})", &fields(&["a"]));
        assert_eq!(result.errors.len(), 1);
        let error = &result.errors[0];
        assert_eq!(error.kind, ErrorKind::UnknownFunction);
        assert_eq!(error.position, Some(0));
        assert!(error.message.starts_with("Unknown function 'VLOOKUP'. Available functions: SUM, AVG"));
        assert_eq!(
            result.functions,
            BTreeSet::from(["VLOOKUP".to_string(), "sum".to_string()])
        );
    }

    #[test]
    fn test_function_validation() {
        let result = validate("IF({a}>5,1,2)", &fields(&["a"]));
        assert!(result.is_valid);
        assert_eq!(result.functions, BTreeSet::from(["IF".to_string()]));
    }

    #[test]
    fn test_arity_errors() {
        let result = validate("ROUND({a}, 2, 3) + POW({a}) + IF(1, MAX(1, 2), 3)", &fields(&["a"]));
        assert_eq!(
            result.errors,
            vec![
                ValidationError::new(
                    ErrorKind::Arity,
                    "ROUND expects 1 to 2 arguments, got 3",
                    Some(0)
                ),
                ValidationError::new(ErrorKind::Arity, "POW expects 2 arguments, got 1", Some(19)),
            ]
        );
    }

    #[test]
    fn test_arity_counts_top_level_commas_only() {
        assert!(validate("ABS(MAX(1, 2, 3))", &[]).is_valid);
        assert!(validate("SQRT((1 + 2))", &[]).is_valid);
    }

    #[test]
    fn test_grammar_check() {
        let result = validate("{a} {b}", &fields(&["a", "b"]));
        assert_eq!(
            result.errors,
            vec![ValidationError::syntax("Unexpected field reference '{b}'", 4)]
        );

        let result = validate("{a} > = 1", &fields(&["a"]));
        assert!(!result.is_valid);
    }

    #[test]
    fn test_error_order() {
        let result = validate("({x} ++ FOO(1)", &fields(&["a"]));
        let kinds: Vec<ErrorKind> = result.errors.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ErrorKind::Syntax,
                ErrorKind::Syntax,
                ErrorKind::UnknownField,
                ErrorKind::UnknownFunction,
            ]
        );
        assert_eq!(result.errors[0].message, "1 unclosed parenthesis '('");
        assert_eq!(result.errors[1].message, "Consecutive operators '++'");
    }

    #[test]
    fn test_length_warning() {
        let formula = vec!["{a}"; 130].join("+");
        let result = validate(&formula, &fields(&["a"]));
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].kind, WarningKind::FormulaLength);
    }

    #[test]
    fn test_nesting_warning_and_options() {
        let formula = "((((((1))))))";
        let result = validate(formula, &[]);
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].kind, WarningKind::NestingDepth);

        let relaxed = Validator::new(
            FunctionRegistry::builtin(),
            ValidatorOptions {
                max_nesting_depth: 10,
                ..Default::default()
            },
        );
        assert!(relaxed.validate(formula, &[]).warnings.is_empty());

        let strict = Validator::new(
            FunctionRegistry::builtin(),
            ValidatorOptions {
                max_formula_length: 5,
                ..Default::default()
            },
        );
        let kinds: Vec<_> = strict
            .validate(formula, &[])
            .warnings
            .iter()
            .map(|w| w.kind)
            .collect();
        assert_eq!(kinds, vec![WarningKind::FormulaLength, WarningKind::NestingDepth]);
    }
}
