//! Logical functions
//!
//! IF, AND and OR receive unevaluated arguments so they can short-circuit.

use super::nth;
use crate::ast::FormulaExpr;
use crate::error::{EvalResult, RuntimeError};
use crate::evaluator::EvaluationContext;
use costcalc_core::Value;

/// Read a value as a condition: booleans as-is, numbers are true when non-zero
pub(crate) fn truthy(function: &str, value: &Value) -> EvalResult<bool> {
    match value {
        Value::Boolean(b) => Ok(*b),
        Value::Number(n) => Ok(*n != 0.0),
        other => Err(RuntimeError::type_mismatch(
            function,
            "boolean",
            other.type_name(),
        )),
    }
}

/// IF function
///
/// Only the selected branch is evaluated.
pub fn fn_if(args: &[FormulaExpr], ctx: &EvaluationContext<'_>) -> EvalResult<Value> {
    let condition = ctx.evaluate(nth("IF", args, 0)?)?;

    if truthy("IF", &condition)? {
        ctx.evaluate(nth("IF", args, 1)?)
    } else {
        ctx.evaluate(nth("IF", args, 2)?)
    }
}

/// AND function
pub fn fn_and(args: &[FormulaExpr], ctx: &EvaluationContext<'_>) -> EvalResult<Value> {
    for arg in args {
        if !truthy("AND", &ctx.evaluate(arg)?)? {
            return Ok(Value::Boolean(false));
        }
    }
    Ok(Value::Boolean(true))
}

/// OR function
pub fn fn_or(args: &[FormulaExpr], ctx: &EvaluationContext<'_>) -> EvalResult<Value> {
    for arg in args {
        if truthy("OR", &ctx.evaluate(arg)?)? {
            return Ok(Value::Boolean(true));
        }
    }
    Ok(Value::Boolean(false))
}

/// NOT function
pub fn fn_not(args: &[Value]) -> EvalResult<Value> {
    let b = truthy("NOT", nth("NOT", args, 0)?)?;
    Ok(Value::Boolean(!b))
}
