//! Numeric comparison predicates: `gt`, `gte`, `lt`, `lte`, `between`,
//! `notBetween`.
//!
//! These are the strictest predicates in the catalog: a non-numeric or
//! absent operand is a precondition violation, not a validation outcome,
//! and surfaces as a structured `PredicateInternal` failure. Frozen
//! parameters are checked earlier, at compile time.

use serde_json::Value;

use super::{
    as_finite_number, param, ParamSpec, PredicateCategory, PredicateDef, PredicateInput,
    PredicateResult,
};
use crate::error::EngineError;

pub(crate) fn defs() -> Vec<PredicateDef> {
    let value_param = || vec![param("value", ParamSpec::FiniteNumber)];
    let range_params = || {
        vec![
            param("min", ParamSpec::FiniteNumber),
            param("max", ParamSpec::FiniteNumber),
        ]
    };

    vec![
        PredicateDef::sync("gt", PredicateCategory::Comparison, value_param(), |i| {
            compare("gt", i, |v, p| v > p)
        }),
        PredicateDef::sync("gte", PredicateCategory::Comparison, value_param(), |i| {
            compare("gte", i, |v, p| v >= p)
        }),
        PredicateDef::sync("lt", PredicateCategory::Comparison, value_param(), |i| {
            compare("lt", i, |v, p| v < p)
        }),
        PredicateDef::sync("lte", PredicateCategory::Comparison, value_param(), |i| {
            compare("lte", i, |v, p| v <= p)
        }),
        PredicateDef::sync("between", PredicateCategory::Comparison, range_params(), |i| {
            range("between", i).map(|(v, min, max)| v >= min && v <= max)
        }),
        PredicateDef::sync(
            "notBetween",
            PredicateCategory::Comparison,
            range_params(),
            |i| range("notBetween", i).map(|(v, min, max)| v < min || v > max),
        ),
    ]
}

fn numeric_operand(op: &str, value: Option<&Value>) -> Result<f64, EngineError> {
    let value = value.ok_or_else(|| EngineError::predicate_internal(op, "operand is absent"))?;
    as_finite_number(value)
        .ok_or_else(|| EngineError::predicate_internal(op, "operand is not a finite number"))
}

fn numeric_param(op: &str, params: &[Value], index: usize) -> Result<f64, EngineError> {
    params
        .get(index)
        .and_then(as_finite_number)
        .ok_or_else(|| EngineError::predicate_internal(op, "parameter is not a finite number"))
}

fn compare(
    op: &str,
    input: &PredicateInput<'_>,
    check: impl Fn(f64, f64) -> bool,
) -> PredicateResult {
    let value = numeric_operand(op, input.value)?;
    let bound = numeric_param(op, input.params, 0)?;
    Ok(check(value, bound))
}

fn range(op: &str, input: &PredicateInput<'_>) -> Result<(f64, f64, f64), EngineError> {
    let value = numeric_operand(op, input.value)?;
    let min = numeric_param(op, input.params, 0)?;
    let max = numeric_param(op, input.params, 1)?;
    Ok((value, min, max))
}
