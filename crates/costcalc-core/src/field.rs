//! Calculator field declarations

use crate::error::{Error, Result};
use crate::value::{FieldType, Value};
use std::fmt;
use std::str::FromStr;

/// A named, typed input field declared on a calculator.
///
/// Declarations are owned by the host application and passed to the engine on
/// every validation, suggestion, or evaluation call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldDeclaration {
    /// Field name as referenced inside `{...}` (case-sensitive)
    pub name: String,
    /// Declared type
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub field_type: FieldType,
}

impl FieldDeclaration {
    /// Create a new field declaration
    pub fn new<S: Into<String>>(name: S, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }

    /// Shorthand for a numeric field
    pub fn number<S: Into<String>>(name: S) -> Self {
        Self::new(name, FieldType::Number)
    }

    /// Read raw text as a value of this field's type
    pub fn parse_value(&self, raw: &str) -> Result<Value> {
        Value::parse_as(self.field_type, raw)
    }

    /// Check whether a value satisfies this field's declared type
    pub fn accepts(&self, value: &Value) -> bool {
        value.field_type() == self.field_type
    }
}

impl fmt::Display for FieldDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.field_type)
    }
}

/// Parses `name:type`; a bare `name` declares a number field.
impl FromStr for FieldDeclaration {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (name, field_type) = match s.rsplit_once(':') {
            Some((name, ty)) => (name.trim(), ty.parse::<FieldType>()?),
            None => (s.trim(), FieldType::Number),
        };

        if name.is_empty() || name.contains(['{', '}']) {
            return Err(Error::InvalidDeclaration(s.to_string()));
        }

        Ok(Self::new(name, field_type))
    }
}
