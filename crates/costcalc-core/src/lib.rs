//! # costcalc-core
//!
//! Core data structures shared by the costcalc formula engine and its hosts.
//!
//! This crate provides:
//! - [`Value`] - A concrete value bound to a field or produced by a formula
//! - [`FieldType`] - The declared type of a calculator input field
//! - [`FieldDeclaration`] - A named, typed input field of a calculator
//!
//! ## Example
//!
//! ```rust
//! use costcalc_core::{FieldDeclaration, FieldType, Value};
//!
//! let unit_cost = FieldDeclaration::new("unitCost", FieldType::Number);
//! let value = unit_cost.parse_value("12.50").unwrap();
//! assert_eq!(value, Value::Number(12.5));
//! ```

pub mod error;
pub mod field;
pub mod value;

pub use error::{Error, Result};
pub use field::FieldDeclaration;
pub use value::{FieldType, Value};

/// Date format used when dates are parsed from or rendered to text
pub const DATE_FORMAT: &str = "%Y-%m-%d";
