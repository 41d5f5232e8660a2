//! End-to-end behaviour of the public validate / evaluate / suggest API

use std::collections::{BTreeSet, HashMap};

use costcalc_core::{FieldDeclaration, FieldType, Value};
use costcalc_formula::{
    evaluate, extract_fields, extract_functions, suggest, validate, ErrorKind, FunctionRegistry,
    RuntimeError, Validator, ValidatorOptions,
};
use pretty_assertions::assert_eq;

fn numbers(names: &[&str]) -> Vec<FieldDeclaration> {
    names.iter().map(|n| FieldDeclaration::number(*n)).collect()
}

fn values(pairs: &[(&str, f64)]) -> HashMap<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Value::Number(*v)))
        .collect()
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_empty_formula_has_exactly_one_error() {
    let result = validate("", &[]);
    assert!(!result.is_valid);
    assert_eq!(result.errors.len(), 1);
}

#[test]
fn test_simple_sum_is_valid() {
    let result = validate("{a} + {b}", &numbers(&["a", "b"]));
    assert!(result.is_valid);
    assert!(result.errors.is_empty());
    assert_eq!(result.fields, set(&["a", "b"]));
}

#[test]
fn test_trailing_operator_is_syntax_error() {
    let result = validate("{a} +", &numbers(&["a"]));
    assert!(!result.is_valid);
    assert!(result.errors_of(ErrorKind::Syntax).count() >= 1);
}

#[test]
fn test_unclosed_parenthesis_reported_once() {
    let result = validate("SUM({a},{b}", &numbers(&["a", "b"]));
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].message.contains("unclosed parenthesis"));
}

#[test]
fn test_if_formula_is_valid() {
    let result = validate("IF({a}>5,1,2)", &numbers(&["a"]));
    assert!(result.is_valid);
    assert_eq!(result.functions, set(&["IF"]));
}

#[test]
fn test_double_plus_reports_run() {
    let result = validate("{a}++{b}", &numbers(&["a", "b"]));
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, ErrorKind::Syntax);
    assert!(result.errors[0].message.contains("++"));
}

#[test]
fn test_round_to_two_places() {
    assert_eq!(
        evaluate("ROUND({x},2)", &values(&[("x", 3.14159)])).unwrap(),
        Value::Number(3.14)
    );
}

#[test]
fn test_division_by_zero() {
    assert_eq!(
        evaluate("{a}/{b}", &values(&[("a", 1.0), ("b", 0.0)])),
        Err(RuntimeError::DivisionByZero)
    );
}

#[test]
fn test_untaken_branch_never_evaluated() {
    assert_eq!(
        evaluate("IF({a}>0, 1, {missing}/0)", &values(&[("a", 1.0)])).unwrap(),
        Value::Number(1.0)
    );
}

#[test]
fn test_suggestions_capped_at_ten() {
    let fields: Vec<FieldDeclaration> = (0..40)
        .map(|i| FieldDeclaration::number(format!("field{}", i)))
        .collect();
    for (formula, cursor) in [("", 0), ("{", 1), ("{field", 6), ("S", 1), ("1 + ", 4)] {
        assert!(suggest(formula, cursor, &fields).len() <= 10);
    }
}

#[test]
fn test_extraction_is_idempotent() {
    let formula = "ROUND({unitCost} * {quantity}, 2) + MAX({freight}, 0) + {unitCost}";
    let first = extract_fields(formula);
    assert_eq!(first, extract_fields(formula));
    assert_eq!(first, set(&["freight", "quantity", "unitCost"]));
    assert_eq!(extract_functions(formula), set(&["MAX", "ROUND"]));
}

#[test]
fn test_valid_formula_evaluates() {
    let fields = vec![
        FieldDeclaration::number("unitCost"),
        FieldDeclaration::number("quantity"),
        FieldDeclaration::new("rush", FieldType::Boolean),
    ];
    let formula = "ROUND({unitCost} * {quantity} * IF({rush}, 1.25, 1), 2)";
    assert!(validate(formula, &fields).is_valid);

    let mut vals = values(&[("unitCost", 19.99), ("quantity", 3.0)]);
    vals.insert("rush".into(), Value::Boolean(true));
    assert_eq!(evaluate(formula, &vals).unwrap(), Value::Number(74.96));
}

#[test]
fn test_tiered_discount_calculator() {
    let formula = "IF({qty} >= 100, {price} * 0.8, IF({qty} >= 10, {price} * 0.9, {price})) * {qty}";
    assert!(validate(formula, &numbers(&["qty", "price"])).is_valid);

    let cost = |qty: f64| evaluate(formula, &values(&[("qty", qty), ("price", 5.0)]));
    assert_eq!(cost(1.0).unwrap(), Value::Number(5.0));
    assert_eq!(cost(10.0).unwrap(), Value::Number(45.0));
    assert_eq!(cost(100.0).unwrap(), Value::Number(400.0));
}

#[test]
fn test_validator_with_custom_options() {
    let validator = Validator::new(
        FunctionRegistry::builtin(),
        ValidatorOptions {
            max_formula_length: 10,
            max_nesting_depth: 1,
        },
    );
    let result = validator.validate("SUM((({a})))", &numbers(&["a"]));
    assert!(result.is_valid);
    assert_eq!(result.warnings.len(), 2);
}

#[test]
fn test_all_defects_reported_in_one_pass() {
    let result = validate("SUM({a}, {zz}) ** NOPE(1) + POW(2)", &numbers(&["a"]));
    let kinds: Vec<ErrorKind> = result.errors.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ErrorKind::Syntax,
            ErrorKind::UnknownField,
            ErrorKind::UnknownFunction,
            ErrorKind::Arity,
        ]
    );
}

#[test]
fn test_long_operator_chain_is_rejected_not_fatal() {
    let fields = numbers(&["a"]);
    let vals = values(&[("a", 0.0)]);

    for formula in [
        format!("{{a}}{}", "+1".repeat(2000)),
        format!("{{a}}{}", " - 1 * {a}".repeat(5000)),
        format!("{}{{a}}", "- ".repeat(3000)),
    ] {
        let result = validate(&formula, &fields);
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].message, "Formula is nested too deeply");

        assert!(matches!(
            evaluate(&formula, &vals),
            Err(RuntimeError::Parse { .. })
        ));
    }
}

#[test]
fn test_moderate_chain_evaluates() {
    let formula = format!("{{a}}{}", "+1".repeat(200));
    assert!(validate(&formula, &numbers(&["a"])).is_valid);
    assert_eq!(
        evaluate(&formula, &values(&[("a", 0.5)])).unwrap(),
        Value::Number(200.5)
    );
}
