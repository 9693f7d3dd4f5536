//! Equality predicates: `eq`, `neq`.

use serde_json::Value;

use super::{
    as_finite_number, as_instant, param, ParamSpec, PredicateCategory, PredicateDef,
    PredicateInput, PredicateResult,
};

pub(crate) fn defs() -> Vec<PredicateDef> {
    vec![
        PredicateDef::sync(
            "eq",
            PredicateCategory::Equality,
            vec![param("value", ParamSpec::Any)],
            eq,
        ),
        PredicateDef::sync(
            "neq",
            PredicateCategory::Equality,
            vec![param("value", ParamSpec::Any)],
            neq,
        ),
    ]
}

/// Value equality with two domain-aware widenings: numbers compare by
/// numeric value regardless of integer/float representation, and timestamp
/// operands compare by absolute instant. Absent operands never compare
/// equal, and `neq` on an absent operand is also false.
fn loose_equal(left: &Value, right: &Value) -> bool {
    if let (Value::Number(_), Value::Number(_)) = (left, right) {
        return match (as_finite_number(left), as_finite_number(right)) {
            (Some(a), Some(b)) => a == b,
            _ => left == right,
        };
    }

    // Instant comparison only engages when at least one side is written as
    // an RFC 3339 string; two plain integers already compared above.
    if left.is_string() || right.is_string() {
        if let (Some(a), Some(b)) = (as_instant(left), as_instant(right)) {
            return a == b;
        }
    }

    left == right
}

fn eq(input: &PredicateInput<'_>) -> PredicateResult {
    match input.value {
        Some(value) => Ok(loose_equal(value, &input.params[0])),
        None => Ok(false),
    }
}

fn neq(input: &PredicateInput<'_>) -> PredicateResult {
    match input.value {
        Some(value) => Ok(!loose_equal(value, &input.params[0])),
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(def_name: &str, value: Option<&Value>, params: &[Value]) -> bool {
        let defs = defs();
        let def = defs.iter().find(|d| d.name == def_name).unwrap();
        let input = PredicateInput {
            value,
            params,
            regex: None,
        };
        match &def.function {
            super::super::PredicateFn::Sync(f) => f(&input).unwrap(),
            super::super::PredicateFn::Async(_) => unreachable!(),
        }
    }

    #[test]
    fn eq_compares_scalars() {
        assert!(run("eq", Some(&json!("a")), &[json!("a")]));
        assert!(!run("eq", Some(&json!("a")), &[json!("b")]));
    }

    #[test]
    fn eq_widens_numeric_representations() {
        assert!(run("eq", Some(&json!(25)), &[json!(25.0)]));
    }

    #[test]
    fn eq_compares_timestamps_by_instant() {
        assert!(run(
            "eq",
            Some(&json!("2024-01-01T00:00:00+02:00")),
            &[json!("2023-12-31T22:00:00Z")]
        ));
    }

    #[test]
    fn absent_operand_fails_both_ways() {
        assert!(!run("eq", None, &[json!(1)]));
        assert!(!run("neq", None, &[json!(1)]));
    }

    #[test]
    fn neq_negates_equality() {
        assert!(run("neq", Some(&json!(1)), &[json!(2)]));
        assert!(!run("neq", Some(&json!(1)), &[json!(1)]));
    }
}
