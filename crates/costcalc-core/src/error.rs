//! Error types for costcalc-core

use crate::value::FieldType;
use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when building values and field declarations
#[derive(Debug, Error)]
pub enum Error {
    /// Field type name not recognised
    #[error("Unknown field type: '{0}' (expected number, text, boolean or date)")]
    UnknownFieldType(String),

    /// Malformed `name:type` declaration
    #[error("Invalid field declaration: '{0}' (expected name:type)")]
    InvalidDeclaration(String),

    /// Raw text that cannot be read as a value of the requested type
    #[error("Invalid {expected} value: '{actual}'")]
    InvalidValue { expected: FieldType, actual: String },
}
