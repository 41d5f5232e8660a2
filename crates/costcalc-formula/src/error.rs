//! Formula error types

use thiserror::Error;

/// Result type for formula evaluation
pub type EvalResult<T> = std::result::Result<T, RuntimeError>;

/// Formula text that the parser cannot turn into an expression tree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at position {position}")]
pub struct ParseError {
    /// What went wrong
    pub message: String,
    /// Character offset into the formula
    pub position: usize,
}

impl ParseError {
    pub(crate) fn new<S: Into<String>>(message: S, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

/// Errors that can occur while evaluating a formula against field values
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// A referenced field has no value in the evaluation context
    #[error("Missing value for field '{0}'")]
    MissingFieldValue(String),

    /// Unknown function
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Operand or argument of the wrong type
    #[error("Type mismatch in {context}: expected {expected}, got {actual}")]
    TypeMismatch {
        context: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// Division (or MOD) by zero
    #[error("Division by zero")]
    DivisionByZero,

    /// Wrong number of arguments
    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArityMismatch {
        function: String,
        expected: String,
        actual: usize,
    },

    /// Argument outside the function's domain, or a non-finite result
    #[error("Invalid argument to {function}: {message}")]
    InvalidArgument { function: String, message: String },

    /// Formula text could not be parsed
    #[error("Parse error: {message} at position {position}")]
    Parse { message: String, position: usize },
}

impl RuntimeError {
    pub(crate) fn type_mismatch<S: Into<String>>(
        context: S,
        expected: &'static str,
        actual: &'static str,
    ) -> Self {
        RuntimeError::TypeMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }

    pub(crate) fn invalid_argument<F: Into<String>, M: Into<String>>(function: F, message: M) -> Self {
        RuntimeError::InvalidArgument {
            function: function.into(),
            message: message.into(),
        }
    }
}

impl From<ParseError> for RuntimeError {
    fn from(e: ParseError) -> Self {
        RuntimeError::Parse {
            message: e.message,
            position: e.position,
        }
    }
}
