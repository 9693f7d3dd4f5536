//! Type-check predicates: `isString`, `isNumber`, `isBoolean`, `isDate`,
//! `isArray`, `isObject`.

use serde_json::Value;

use super::{as_instant, PredicateCategory, PredicateDef, PredicateInput, PredicateResult};

pub(crate) fn defs() -> Vec<PredicateDef> {
    vec![
        type_check("isString", Value::is_string),
        type_check("isNumber", Value::is_number),
        type_check("isBoolean", Value::is_boolean),
        type_check("isDate", |v| as_instant(v).is_some()),
        type_check("isArray", Value::is_array),
        // Mapping check: arrays and null are not objects in this model, so
        // serde_json's own discriminant is exactly the required semantics.
        type_check("isObject", Value::is_object),
    ]
}

fn type_check(name: &str, check: impl Fn(&Value) -> bool + Send + Sync + 'static) -> PredicateDef {
    PredicateDef::sync(name, PredicateCategory::Type, Vec::new(), move |input| {
        check_present(input, &check)
    })
}

fn check_present(input: &PredicateInput<'_>, check: &impl Fn(&Value) -> bool) -> PredicateResult {
    Ok(input.value.map(check).unwrap_or(false))
}
