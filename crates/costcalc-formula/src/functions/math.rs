//! Math functions

use super::{finite, nth, number_arg, number_args};
use crate::error::{EvalResult, RuntimeError};
use costcalc_core::Value;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

/// SUM function
pub fn fn_sum(args: &[Value]) -> EvalResult<Value> {
    let sum: f64 = number_args("SUM", args)?.into_iter().sum();
    finite("SUM", sum)
}

/// ABS function
pub fn fn_abs(args: &[Value]) -> EvalResult<Value> {
    let n = number_arg("ABS", nth("ABS", args, 0)?)?;
    Ok(Value::Number(n.abs()))
}

/// ROUND function
///
/// Rounds half away from zero. Negative `digits` round to the left of the
/// decimal point.
pub fn fn_round(args: &[Value]) -> EvalResult<Value> {
    let number = number_arg("ROUND", nth("ROUND", args, 0)?)?;
    let digits = match args.get(1) {
        Some(v) => number_arg("ROUND", v)?.trunc().clamp(-308.0, 308.0) as i32,
        None => 0,
    };

    finite("ROUND", round_half_away_from_zero(number, digits))
}

/// 2^53: every f64 at or above this magnitude is already an integer
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

pub(crate) fn round_half_away_from_zero(number: f64, digits: i32) -> f64 {
    if digits < 0 {
        let factor = 10_f64.powi(-digits);
        return (number / factor).round() * factor;
    }

    // Beyond f64 precision there is nothing left to round
    if digits > 15 || number.abs() >= MAX_EXACT_INTEGER {
        return number;
    }

    // Decimal avoids binary artifacts such as 2.675 rounding to 2.67
    Decimal::from_f64(number)
        .map(|d| d.round_dp_with_strategy(digits as u32, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|d| d.to_f64())
        .unwrap_or_else(|| {
            // Out of Decimal's range: multiplier approach
            let multiplier = 10_f64.powi(digits);
            (number * multiplier).round() / multiplier
        })
}

/// CEIL function
pub fn fn_ceil(args: &[Value]) -> EvalResult<Value> {
    let n = number_arg("CEIL", nth("CEIL", args, 0)?)?;
    Ok(Value::Number(n.ceil()))
}

/// FLOOR function
pub fn fn_floor(args: &[Value]) -> EvalResult<Value> {
    let n = number_arg("FLOOR", nth("FLOOR", args, 0)?)?;
    Ok(Value::Number(n.floor()))
}

/// SQRT function
pub fn fn_sqrt(args: &[Value]) -> EvalResult<Value> {
    let n = number_arg("SQRT", nth("SQRT", args, 0)?)?;
    if n < 0.0 {
        return Err(RuntimeError::invalid_argument(
            "SQRT",
            format!("cannot take the square root of negative number {}", Value::Number(n)),
        ));
    }
    Ok(Value::Number(n.sqrt()))
}

/// POW function
pub fn fn_pow(args: &[Value]) -> EvalResult<Value> {
    let base = number_arg("POW", nth("POW", args, 0)?)?;
    let exponent = number_arg("POW", nth("POW", args, 1)?)?;
    finite("POW", base.powf(exponent))
}

/// MOD function
///
/// The result takes the sign of the divisor: `MOD(-3, 2) = 1`.
pub fn fn_mod(args: &[Value]) -> EvalResult<Value> {
    let number = number_arg("MOD", nth("MOD", args, 0)?)?;
    let divisor = number_arg("MOD", nth("MOD", args, 1)?)?;

    if divisor == 0.0 {
        return Err(RuntimeError::DivisionByZero);
    }

    let r = number % divisor;
    let r = if r != 0.0 && (r < 0.0) != (divisor < 0.0) {
        r + divisor
    } else {
        r
    };
    finite("MOD", r)
}
