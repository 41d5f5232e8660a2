//! # costcalc-formula
//!
//! Formula engine for user-defined cost calculators.
//!
//! This crate provides:
//! - Tokenizing and field/function extraction
//! - Structural validation against declared fields (errors and warnings as data)
//! - Cursor-based autocomplete suggestions
//! - Formula parsing (text → AST)
//! - Formula evaluation against field values
//! - A registry of built-in math, statistical, logical, text and date functions
//!
//! Formulas reference calculator fields as `{fieldName}` and call functions
//! as `NAME(args)`, e.g. `ROUND({unitCost} * {quantity} * 1.2, 2)`.
//!
//! ## Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use costcalc_core::{FieldDeclaration, Value};
//! use costcalc_formula::{evaluate, validate};
//!
//! let fields = [FieldDeclaration::number("qty"), FieldDeclaration::number("price")];
//! let report = validate("IF({qty} > 100, {price} * 0.9, {price})", &fields);
//! assert!(report.is_valid);
//!
//! let values = HashMap::from([
//!     ("qty".to_string(), Value::Number(150.0)),
//!     ("price".to_string(), Value::Number(10.0)),
//! ]);
//! let price = evaluate("IF({qty} > 100, {price} * 0.9, {price})", &values).unwrap();
//! assert_eq!(price, Value::Number(9.0));
//! ```

pub mod ast;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod lexer;
pub mod options;
pub mod parser;
pub mod suggest;
pub mod validator;

pub use ast::{BinaryOperator, FormulaExpr, UnaryOperator};
pub use error::{EvalResult, ParseError, RuntimeError};
pub use evaluator::{evaluate, evaluate_with, EvaluationContext, Evaluator};
pub use functions::{FunctionCategory, FunctionRegistry, FunctionSpec};
pub use lexer::{extract_fields, extract_functions, tokenize};
pub use options::{SuggestOptions, ValidatorOptions};
pub use parser::parse_formula;
pub use suggest::{suggest, Suggester, Suggestion, SuggestionKind};
pub use validator::{
    validate, ErrorKind, ValidationError, ValidationResult, ValidationWarning, Validator,
    WarningKind,
};
