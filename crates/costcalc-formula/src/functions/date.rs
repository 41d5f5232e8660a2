//! Date functions

use super::{date_arg, nth, number_arg};
use crate::error::{EvalResult, RuntimeError};
use chrono::{Datelike, NaiveDate};
use costcalc_core::Value;

/// DATE function
///
/// Fractional parts are truncated. Out-of-range components are an error, not
/// rolled over into the next month or year.
pub fn fn_date(args: &[Value]) -> EvalResult<Value> {
    let year = number_arg("DATE", nth("DATE", args, 0)?)?.trunc();
    let month = number_arg("DATE", nth("DATE", args, 1)?)?.trunc();
    let day = number_arg("DATE", nth("DATE", args, 2)?)?.trunc();

    let invalid = || {
        RuntimeError::invalid_argument(
            "DATE",
            format!("{}-{}-{} is not a valid date", year, month, day),
        )
    };

    if !(1.0..=9999.0).contains(&year) || !(1.0..=12.0).contains(&month) || !(1.0..=31.0).contains(&day)
    {
        return Err(invalid());
    }

    NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .map(Value::Date)
        .ok_or_else(invalid)
}

/// YEAR function
pub fn fn_year(args: &[Value]) -> EvalResult<Value> {
    let date = date_arg("YEAR", nth("YEAR", args, 0)?)?;
    Ok(Value::Number(date.year() as f64))
}

/// MONTH function
pub fn fn_month(args: &[Value]) -> EvalResult<Value> {
    let date = date_arg("MONTH", nth("MONTH", args, 0)?)?;
    Ok(Value::Number(date.month() as f64))
}

/// DAY function
pub fn fn_day(args: &[Value]) -> EvalResult<Value> {
    let date = date_arg("DAY", nth("DAY", args, 0)?)?;
    Ok(Value::Number(date.day() as f64))
}

/// DAYS function: `end - start` in whole days
pub fn fn_days(args: &[Value]) -> EvalResult<Value> {
    let end = date_arg("DAYS", nth("DAYS", args, 0)?)?;
    let start = date_arg("DAYS", nth("DAYS", args, 1)?)?;
    Ok(Value::Number((end - start).num_days() as f64))
}
