//! Text functions

use super::{nth, text_arg};
use crate::error::EvalResult;
use costcalc_core::Value;

/// CONCAT function
///
/// Accepts any value and joins the display forms.
pub fn fn_concat(args: &[Value]) -> EvalResult<Value> {
    let result: String = args.iter().map(|v| v.to_string()).collect();
    Ok(Value::Text(result))
}

/// UPPER function
pub fn fn_upper(args: &[Value]) -> EvalResult<Value> {
    Ok(Value::text(text_arg("UPPER", nth("UPPER", args, 0)?)?.to_uppercase()))
}

/// LOWER function
pub fn fn_lower(args: &[Value]) -> EvalResult<Value> {
    Ok(Value::text(text_arg("LOWER", nth("LOWER", args, 0)?)?.to_lowercase()))
}

/// TRIM function
pub fn fn_trim(args: &[Value]) -> EvalResult<Value> {
    Ok(Value::text(text_arg("TRIM", nth("TRIM", args, 0)?)?.trim()))
}

/// LEN function (characters, not bytes)
pub fn fn_len(args: &[Value]) -> EvalResult<Value> {
    let text = text_arg("LEN", nth("LEN", args, 0)?)?;
    Ok(Value::Number(text.chars().count() as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeError;
    use chrono::NaiveDate;

    #[test]
    fn test_concat_uses_display_form() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let args = vec![
            Value::text("Qty "),
            Value::Number(3.0),
            Value::text(" due "),
            Value::Date(date),
            Value::text(" rush="),
            Value::Boolean(false),
        ];
        assert_eq!(
            fn_concat(&args).unwrap(),
            Value::text("Qty 3 due 2024-06-01 rush=FALSE")
        );
    }

    #[test]
    fn test_case_and_trim() {
        assert_eq!(fn_upper(&[Value::text("Steel")]).unwrap(), Value::text("STEEL"));
        assert_eq!(fn_lower(&[Value::text("Steel")]).unwrap(), Value::text("steel"));
        assert_eq!(fn_trim(&[Value::text("  pad  ")]).unwrap(), Value::text("pad"));
    }

    #[test]
    fn test_len_counts_chars() {
        assert_eq!(fn_len(&[Value::text("café")]).unwrap(), Value::Number(4.0));
    }

    #[test]
    fn test_non_text_rejected() {
        assert!(matches!(
            fn_upper(&[Value::Number(1.0)]),
            Err(RuntimeError::TypeMismatch { expected: "text", .. })
        ));
    }
}
