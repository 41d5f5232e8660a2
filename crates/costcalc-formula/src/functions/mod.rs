//! Built-in formula functions

pub mod date;
pub mod logical;
pub mod math;
pub mod statistical;
pub mod text;

use crate::ast::FormulaExpr;
use crate::error::{EvalResult, RuntimeError};
use crate::evaluator::EvaluationContext;
use ahash::AHashMap;
use chrono::NaiveDate;
use costcalc_core::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Signature of a function that receives its arguments already evaluated
pub type EagerFn = fn(&[Value]) -> EvalResult<Value>;

/// Signature of a function that decides itself which arguments to evaluate
pub type LazyFn = fn(&[FormulaExpr], &EvaluationContext<'_>) -> EvalResult<Value>;

/// How a function is invoked
#[derive(Clone, Copy)]
pub enum Implementation {
    Eager(EagerFn),
    /// Short-circuiting functions (IF, AND, OR)
    Lazy(LazyFn),
}

impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Implementation::Eager(_) => f.write_str("Eager"),
            Implementation::Lazy(_) => f.write_str("Lazy"),
        }
    }
}

/// Function category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum FunctionCategory {
    Math,
    Statistical,
    Logical,
    Text,
    Date,
}

impl FunctionCategory {
    pub const ALL: [FunctionCategory; 5] = [
        FunctionCategory::Math,
        FunctionCategory::Statistical,
        FunctionCategory::Logical,
        FunctionCategory::Text,
        FunctionCategory::Date,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionCategory::Math => "math",
            FunctionCategory::Statistical => "statistical",
            FunctionCategory::Logical => "logical",
            FunctionCategory::Text => "text",
            FunctionCategory::Date => "date",
        }
    }
}

impl fmt::Display for FunctionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FunctionCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FunctionCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown function category '{}'", s))
    }
}

/// Function definition
#[derive(Debug, Clone)]
pub struct FunctionSpec {
    /// Function name (uppercase)
    pub name: &'static str,
    pub category: FunctionCategory,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// One-line description shown by autocomplete
    pub description: &'static str,
    /// Usage example, e.g. `ROUND(x, digits)`
    pub syntax: &'static str,
    pub implementation: Implementation,
}

impl FunctionSpec {
    /// Whether `count` arguments satisfy the arity bounds
    pub fn accepts_arg_count(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.map_or(true, |max| count <= max)
    }

    /// Arity bounds in words: "1", "1 to 2", "at least 1"
    pub fn arity_description(&self) -> String {
        match self.max_args {
            Some(max) if max == self.min_args => max.to_string(),
            Some(max) => format!("{} to {}", self.min_args, max),
            None => format!("at least {}", self.min_args),
        }
    }

    /// Fail with `ArityMismatch` unless `count` is accepted
    pub fn check_arity(&self, count: usize) -> EvalResult<()> {
        if self.accepts_arg_count(count) {
            Ok(())
        } else {
            Err(RuntimeError::ArityMismatch {
                function: self.name.to_string(),
                expected: self.arity_description(),
                actual: count,
            })
        }
    }
}

/// Function registry
///
/// Names are matched case-insensitively. Iteration follows registration order.
pub struct FunctionRegistry {
    functions: Vec<FunctionSpec>,
    index: AHashMap<String, usize>,
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_builtin_functions();
        registry
    }

    /// Create a registry with no functions
    pub fn empty() -> Self {
        Self {
            functions: Vec::new(),
            index: AHashMap::new(),
        }
    }

    /// Process-wide registry of built-in functions, built on first use
    pub fn builtin() -> &'static FunctionRegistry {
        static BUILTIN: OnceLock<FunctionRegistry> = OnceLock::new();
        BUILTIN.get_or_init(FunctionRegistry::new)
    }

    /// Look up a function by name
    pub fn lookup(&self, name: &str) -> Option<&FunctionSpec> {
        self.index
            .get(&name.to_ascii_uppercase())
            .map(|&i| &self.functions[i])
    }

    /// Whether a function with this name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&name.to_ascii_uppercase())
    }

    /// Register a function. A function with the same name is replaced in place.
    pub fn register(&mut self, spec: FunctionSpec) {
        let key = spec.name.to_ascii_uppercase();
        match self.index.get(&key) {
            Some(&i) => self.functions[i] = spec,
            None => {
                self.index.insert(key, self.functions.len());
                self.functions.push(spec);
            }
        }
    }

    /// Registered names in declaration order
    pub fn all_names(&self) -> Vec<&'static str> {
        self.functions.iter().map(|f| f.name).collect()
    }

    /// Functions of one category, in declaration order
    pub fn by_category(&self, category: FunctionCategory) -> impl Iterator<Item = &FunctionSpec> {
        self.functions
            .iter()
            .filter(move |f| f.category == category)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FunctionSpec> {
        self.functions.iter()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    fn add(
        &mut self,
        name: &'static str,
        category: FunctionCategory,
        (min_args, max_args): (usize, Option<usize>),
        description: &'static str,
        syntax: &'static str,
        implementation: Implementation,
    ) {
        self.register(FunctionSpec {
            name,
            category,
            min_args,
            max_args,
            description,
            syntax,
            implementation,
        });
    }

    #[rustfmt::skip]
    fn register_builtin_functions(&mut self) {
        use FunctionCategory::*;
        use Implementation::{Eager, Lazy};

        const VARIADIC: (usize, Option<usize>) = (1, None);
        const UNARY: (usize, Option<usize>) = (1, Some(1));
        const BINARY: (usize, Option<usize>) = (2, Some(2));

        self.add("SUM", Math, VARIADIC, "Adds all arguments", "SUM(a, b, ...)", Eager(math::fn_sum));
        self.add("AVG", Statistical, VARIADIC, "Arithmetic mean of the arguments", "AVG(a, b, ...)", Eager(statistical::fn_avg));
        self.add("MIN", Statistical, VARIADIC, "Smallest argument", "MIN(a, b, ...)", Eager(statistical::fn_min));
        self.add("MAX", Statistical, VARIADIC, "Largest argument", "MAX(a, b, ...)", Eager(statistical::fn_max));
        self.add("ABS", Math, UNARY, "Absolute value", "ABS(x)", Eager(math::fn_abs));
        self.add("ROUND", Math, (1, Some(2)), "Rounds half away from zero to the given number of decimal places", "ROUND(x, digits)", Eager(math::fn_round));
        self.add("CEIL", Math, UNARY, "Rounds up to the nearest integer", "CEIL(x)", Eager(math::fn_ceil));
        self.add("FLOOR", Math, UNARY, "Rounds down to the nearest integer", "FLOOR(x)", Eager(math::fn_floor));
        self.add("SQRT", Math, UNARY, "Square root", "SQRT(x)", Eager(math::fn_sqrt));
        self.add("POW", Math, BINARY, "Raises a number to a power", "POW(base, exponent)", Eager(math::fn_pow));
        self.add("IF", Logical, (3, Some(3)), "Returns one value if the condition holds, another otherwise", "IF(condition, then, else)", Lazy(logical::fn_if));
        self.add("AND", Logical, VARIADIC, "TRUE if every argument is true", "AND(a, b, ...)", Lazy(logical::fn_and));
        self.add("OR", Logical, VARIADIC, "TRUE if any argument is true", "OR(a, b, ...)", Lazy(logical::fn_or));
        self.add("COUNT", Statistical, VARIADIC, "Counts the numeric arguments", "COUNT(a, b, ...)", Eager(statistical::fn_count));
        self.add("MEDIAN", Statistical, VARIADIC, "Middle value of the arguments", "MEDIAN(a, b, ...)", Eager(statistical::fn_median));
        self.add("MOD", Math, BINARY, "Remainder after division, with the sign of the divisor", "MOD(number, divisor)", Eager(math::fn_mod));
        self.add("NOT", Logical, UNARY, "Logical negation", "NOT(condition)", Eager(logical::fn_not));
        self.add("CONCAT", Text, VARIADIC, "Joins the arguments as text", "CONCAT(a, b, ...)", Eager(text::fn_concat));
        self.add("UPPER", Text, UNARY, "Converts text to upper case", "UPPER(text)", Eager(text::fn_upper));
        self.add("LOWER", Text, UNARY, "Converts text to lower case", "LOWER(text)", Eager(text::fn_lower));
        self.add("TRIM", Text, UNARY, "Removes leading and trailing whitespace", "TRIM(text)", Eager(text::fn_trim));
        self.add("LEN", Text, UNARY, "Number of characters in text", "LEN(text)", Eager(text::fn_len));
        self.add("DATE", Date, (3, Some(3)), "Builds a date from year, month and day", "DATE(year, month, day)", Eager(date::fn_date));
        self.add("YEAR", Date, UNARY, "Year of a date", "YEAR(date)", Eager(date::fn_year));
        self.add("MONTH", Date, UNARY, "Month of a date (1-12)", "MONTH(date)", Eager(date::fn_month));
        self.add("DAY", Date, UNARY, "Day of the month of a date", "DAY(date)", Eager(date::fn_day));
        self.add("DAYS", Date, BINARY, "Whole days from the start date to the end date", "DAYS(end, start)", Eager(date::fn_days));
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.all_names())
            .finish()
    }
}

// === Argument helpers shared by the function modules ===

/// Argument at `index`, or an error when the caller passed too few
pub(crate) fn nth<'a, T>(function: &str, args: &'a [T], index: usize) -> EvalResult<&'a T> {
    args.get(index).ok_or_else(|| {
        RuntimeError::invalid_argument(function, format!("missing argument {}", index + 1))
    })
}

/// Require a numeric argument
pub(crate) fn number_arg(function: &str, value: &Value) -> EvalResult<f64> {
    value
        .as_number()
        .ok_or_else(|| RuntimeError::type_mismatch(function, "number", value.type_name()))
}

/// Require every argument to be numeric
pub(crate) fn number_args(function: &str, args: &[Value]) -> EvalResult<Vec<f64>> {
    args.iter().map(|v| number_arg(function, v)).collect()
}

/// Require a text argument
pub(crate) fn text_arg<'a>(function: &str, value: &'a Value) -> EvalResult<&'a str> {
    value
        .as_text()
        .ok_or_else(|| RuntimeError::type_mismatch(function, "text", value.type_name()))
}

/// Require a date argument
pub(crate) fn date_arg(function: &str, value: &Value) -> EvalResult<NaiveDate> {
    value
        .as_date()
        .ok_or_else(|| RuntimeError::type_mismatch(function, "date", value.type_name()))
}

/// Reject NaN and infinite results
pub(crate) fn finite(function: &str, n: f64) -> EvalResult<Value> {
    if n.is_finite() {
        Ok(Value::Number(n))
    } else {
        Err(RuntimeError::invalid_argument(
            function,
            "result is not a finite number",
        ))
    }
}
