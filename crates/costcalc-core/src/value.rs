//! Value types

use crate::error::{Error, Result};
use crate::DATE_FORMAT;
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

/// A concrete value bound to a field or produced by evaluating a formula
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "type", content = "value", rename_all = "lowercase")
)]
pub enum Value {
    /// Numeric value (all numbers are f64)
    Number(f64),

    /// Text value
    Text(String),

    /// Boolean value (TRUE/FALSE)
    Boolean(bool),

    /// Calendar date without time of day
    Date(NaiveDate),
}

impl Value {
    /// Create a new text value
    pub fn text<S: Into<String>>(s: S) -> Self {
        Value::Text(s.into())
    }

    /// The field type this value satisfies
    pub fn field_type(&self) -> FieldType {
        match self {
            Value::Number(_) => FieldType::Number,
            Value::Text(_) => FieldType::Text,
            Value::Boolean(_) => FieldType::Boolean,
            Value::Date(_) => FieldType::Date,
        }
    }

    /// Get the type name for error messages
    pub fn type_name(&self) -> &'static str {
        self.field_type().as_str()
    }

    /// Get the value as a number. Only numbers qualify; there is no implicit coercion.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the value as text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the value as a date
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Read raw text as a value of the given type.
    ///
    /// Numbers use Rust float syntax, booleans accept `true`/`false` in any case,
    /// dates use ISO `YYYY-MM-DD`. Text is taken verbatim.
    pub fn parse_as(field_type: FieldType, raw: &str) -> Result<Value> {
        let invalid = || Error::InvalidValue {
            expected: field_type,
            actual: raw.to_string(),
        };
        let trimmed = raw.trim();

        match field_type {
            FieldType::Number => trimmed
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Value::Number)
                .ok_or_else(invalid),
            FieldType::Text => Ok(Value::text(raw)),
            FieldType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" => Ok(Value::Boolean(true)),
                "false" => Ok(Value::Boolean(false)),
                _ => Err(invalid()),
            },
            FieldType::Date => NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
                .map(Value::Date)
                .map_err(|_| invalid()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => {
                // No trailing ".0" for whole numbers
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Text(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::text(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

/// Declared type of a calculator input field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum FieldType {
    Number,
    Text,
    Boolean,
    Date,
}

impl FieldType {
    /// All field types, in declaration order
    pub const ALL: [FieldType; 4] = [
        FieldType::Number,
        FieldType::Text,
        FieldType::Boolean,
        FieldType::Date,
    ];

    /// Lowercase name of the type
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Number => "number",
            FieldType::Text => "text",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "number" | "num" => Ok(FieldType::Number),
            "text" | "string" => Ok(FieldType::Text),
            "boolean" | "bool" => Ok(FieldType::Boolean),
            "date" => Ok(FieldType::Date),
            _ => Err(Error::UnknownFieldType(s.to_string())),
        }
    }
}
