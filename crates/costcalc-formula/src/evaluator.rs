//! Formula evaluator
//!
//! Evaluates formula ASTs against a map of field values. Values never change
//! type implicitly: each operator and function states what it accepts and
//! anything else is a [`RuntimeError::TypeMismatch`].

use crate::ast::{BinaryOperator, FormulaExpr, UnaryOperator};
use crate::error::{EvalResult, RuntimeError};
use crate::functions::{FunctionRegistry, Implementation};
use crate::parser::parse_formula;
use chrono::{Days, NaiveDate};
use costcalc_core::Value;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Evaluates formulas with a chosen function registry
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'r> {
    registry: &'r FunctionRegistry,
}

impl<'r> Evaluator<'r> {
    pub fn new(registry: &'r FunctionRegistry) -> Self {
        Self { registry }
    }

    /// Parse and evaluate a formula
    pub fn evaluate(&self, formula: &str, values: &HashMap<String, Value>) -> EvalResult<Value> {
        let expr = parse_formula(formula)?;
        let ctx = EvaluationContext::new(values, self.registry);
        let result = ctx.evaluate(&expr);

        match &result {
            Ok(value) => log::trace!("evaluated {:?} => {}", formula, value),
            Err(e) => log::trace!("evaluation of {:?} failed: {}", formula, e),
        }
        result
    }
}

impl Default for Evaluator<'static> {
    fn default() -> Self {
        Self::new(FunctionRegistry::builtin())
    }
}

/// Evaluate a formula with the built-in functions
///
/// # Example
/// ```rust
/// use std::collections::HashMap;
/// use costcalc_core::Value;
/// use costcalc_formula::evaluate;
///
/// let values = HashMap::from([("x".to_string(), Value::Number(3.14159))]);
/// assert_eq!(evaluate("ROUND({x}, 2)", &values).unwrap(), Value::Number(3.14));
/// ```
pub fn evaluate(formula: &str, values: &HashMap<String, Value>) -> EvalResult<Value> {
    Evaluator::default().evaluate(formula, values)
}

/// Evaluate a formula with a custom function registry
pub fn evaluate_with(
    registry: &FunctionRegistry,
    formula: &str,
    values: &HashMap<String, Value>,
) -> EvalResult<Value> {
    Evaluator::new(registry).evaluate(formula, values)
}

/// Field values and functions visible to one evaluation
pub struct EvaluationContext<'a> {
    values: &'a HashMap<String, Value>,
    registry: &'a FunctionRegistry,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(values: &'a HashMap<String, Value>, registry: &'a FunctionRegistry) -> Self {
        Self { values, registry }
    }

    /// Value bound to a field, if any
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Evaluate an expression
    pub fn evaluate(&self, expr: &FormulaExpr) -> EvalResult<Value> {
        match expr {
            // === Literals ===
            FormulaExpr::Number(n) => Ok(Value::Number(*n)),
            FormulaExpr::Text(s) => Ok(Value::Text(s.clone())),
            FormulaExpr::Boolean(b) => Ok(Value::Boolean(*b)),

            // === References ===
            FormulaExpr::Field(name) => self
                .value(name)
                .cloned()
                .ok_or_else(|| RuntimeError::MissingFieldValue(name.clone())),

            // === Operators ===
            FormulaExpr::BinaryOp { op, left, right } => self.evaluate_binary_op(*op, left, right),
            FormulaExpr::UnaryOp { op, operand } => self.evaluate_unary_op(*op, operand),

            // === Functions ===
            FormulaExpr::Function { name, args } => self.evaluate_function(name, args),
        }
    }

    /// Evaluate a binary operation
    fn evaluate_binary_op(
        &self,
        op: BinaryOperator,
        left: &FormulaExpr,
        right: &FormulaExpr,
    ) -> EvalResult<Value> {
        let left_val = self.evaluate(left)?;
        let right_val = self.evaluate(right)?;

        if op.is_comparison() {
            return compare_values(op, &left_val, &right_val).map(Value::Boolean);
        }

        let context = || format!("operator '{}'", op.symbol());

        match (op, &left_val, &right_val) {
            (_, Value::Number(l), Value::Number(r)) => {
                let result = match op {
                    BinaryOperator::Add => l + r,
                    BinaryOperator::Subtract => l - r,
                    BinaryOperator::Multiply => l * r,
                    _ => {
                        if *r == 0.0 {
                            return Err(RuntimeError::DivisionByZero);
                        }
                        l / r
                    }
                };
                if result.is_finite() {
                    Ok(Value::Number(result))
                } else {
                    Err(RuntimeError::invalid_argument(
                        context(),
                        "result is not a finite number",
                    ))
                }
            }

            // Date arithmetic
            (BinaryOperator::Add, Value::Date(d), Value::Number(n))
            | (BinaryOperator::Add, Value::Number(n), Value::Date(d)) => shift_date(*d, *n),
            (BinaryOperator::Subtract, Value::Date(d), Value::Number(n)) => shift_date(*d, -n),
            (BinaryOperator::Subtract, Value::Date(l), Value::Date(r)) => {
                Ok(Value::Number((*l - *r).num_days() as f64))
            }

            (_, l, r) => {
                let actual = if l.as_number().is_none() { l } else { r };
                Err(RuntimeError::type_mismatch(
                    context(),
                    "number",
                    actual.type_name(),
                ))
            }
        }
    }

    /// Evaluate a unary operation
    fn evaluate_unary_op(&self, op: UnaryOperator, operand: &FormulaExpr) -> EvalResult<Value> {
        let val = self.evaluate(operand)?;

        let n = val.as_number().ok_or_else(|| {
            let symbol = match op {
                UnaryOperator::Negate => "-",
                UnaryOperator::Plus => "+",
            };
            RuntimeError::type_mismatch(format!("unary '{}'", symbol), "number", val.type_name())
        })?;

        match op {
            UnaryOperator::Negate => Ok(Value::Number(-n)),
            UnaryOperator::Plus => Ok(Value::Number(n)),
        }
    }

    /// Evaluate a function call
    fn evaluate_function(&self, name: &str, args: &[FormulaExpr]) -> EvalResult<Value> {
        let func = self
            .registry
            .lookup(name)
            .ok_or_else(|| RuntimeError::UnknownFunction(name.to_string()))?;

        func.check_arity(args.len())?;

        let result = match func.implementation {
            Implementation::Eager(f) => {
                let evaluated_args = args
                    .iter()
                    .map(|arg| self.evaluate(arg))
                    .collect::<EvalResult<Vec<_>>>()?;
                f(&evaluated_args)?
            }
            Implementation::Lazy(f) => f(args, self)?,
        };

        match result {
            Value::Number(n) if !n.is_finite() => Err(RuntimeError::invalid_argument(
                func.name,
                "result is not a finite number",
            )),
            value => Ok(value),
        }
    }
}

/// Compare two values of the same type
fn compare_values(op: BinaryOperator, left: &Value, right: &Value) -> EvalResult<bool> {
    let ordering = match (left, right) {
        (Value::Number(l), Value::Number(r)) => l.partial_cmp(r),
        // Case-sensitive
        (Value::Text(l), Value::Text(r)) => Some(l.cmp(r)),
        (Value::Boolean(l), Value::Boolean(r)) => Some(l.cmp(r)),
        (Value::Date(l), Value::Date(r)) => Some(l.cmp(r)),
        (l, r) => {
            return Err(RuntimeError::type_mismatch(
                format!("comparison '{}'", op.symbol()),
                l.type_name(),
                r.type_name(),
            ))
        }
    };

    // Unordered (NaN) compares unequal to everything
    let Some(ordering) = ordering else {
        return Ok(op == BinaryOperator::NotEqual);
    };

    Ok(match op {
        BinaryOperator::Equal => ordering == Ordering::Equal,
        BinaryOperator::NotEqual => ordering != Ordering::Equal,
        BinaryOperator::LessThan => ordering == Ordering::Less,
        BinaryOperator::LessEqual => ordering != Ordering::Greater,
        BinaryOperator::GreaterThan => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    })
}

/// Move a date by a number of days, truncated toward zero
fn shift_date(date: NaiveDate, days: f64) -> EvalResult<Value> {
    let out_of_range = || RuntimeError::invalid_argument("date arithmetic", "date out of range");

    let days = days.trunc();
    if !days.is_finite() || days.abs() > u32::MAX as f64 {
        return Err(out_of_range());
    }

    let magnitude = Days::new(days.abs() as u64);
    let shifted = if days >= 0.0 {
        date.checked_add_days(magnitude)
    } else {
        date.checked_sub_days(magnitude)
    };

    shifted.map(Value::Date).ok_or_else(out_of_range)
}
