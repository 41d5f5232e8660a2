//! Statistical functions
//!
//! All take their scalar arguments as-is; there is no array expansion.

use super::{finite, number_args};
use crate::error::{EvalResult, RuntimeError};
use costcalc_core::Value;

/// AVG function
pub fn fn_avg(args: &[Value]) -> EvalResult<Value> {
    let numbers = number_args("AVG", args)?;
    if numbers.is_empty() {
        return Err(RuntimeError::invalid_argument("AVG", "no values to average"));
    }
    let sum: f64 = numbers.iter().sum();
    finite("AVG", sum / numbers.len() as f64)
}

/// MIN function
pub fn fn_min(args: &[Value]) -> EvalResult<Value> {
    let min = number_args("MIN", args)?
        .into_iter()
        .fold(None, |acc: Option<f64>, n| Some(acc.map_or(n, |m| m.min(n))));
    Ok(Value::Number(min.unwrap_or(0.0)))
}

/// MAX function
pub fn fn_max(args: &[Value]) -> EvalResult<Value> {
    let max = number_args("MAX", args)?
        .into_iter()
        .fold(None, |acc: Option<f64>, n| Some(acc.map_or(n, |m| m.max(n))));
    Ok(Value::Number(max.unwrap_or(0.0)))
}

/// COUNT function
///
/// Counts the numeric arguments; other values are skipped, not rejected.
pub fn fn_count(args: &[Value]) -> EvalResult<Value> {
    let count = args.iter().filter(|v| v.as_number().is_some()).count();
    Ok(Value::Number(count as f64))
}

/// MEDIAN function
pub fn fn_median(args: &[Value]) -> EvalResult<Value> {
    let mut numbers = number_args("MEDIAN", args)?;
    if numbers.is_empty() {
        return Ok(Value::Number(0.0));
    }

    numbers.sort_by(|a, b| a.total_cmp(b));
    let mid = numbers.len() / 2;
    let median = if numbers.len() % 2 == 0 {
        (numbers[mid - 1] + numbers[mid]) / 2.0
    } else {
        numbers[mid]
    };
    Ok(Value::Number(median))
}
