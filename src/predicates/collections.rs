//! Collection predicates: emptiness, property presence, and membership.

use serde_json::Value;

use super::{
    param, ParamSpec, PredicateCategory, PredicateDef, PredicateInput, PredicateResult,
};
use crate::error::EngineError;

pub(crate) fn defs() -> Vec<PredicateDef> {
    vec![
        PredicateDef::sync(
            "isEmptyCollection",
            PredicateCategory::Collection,
            Vec::new(),
            is_empty_collection,
        )
        .handles_absent(),
        PredicateDef::sync(
            "hasProperty",
            PredicateCategory::Collection,
            vec![param("property", ParamSpec::NameOrNames)],
            has_property,
        )
        .handles_absent(),
        PredicateDef::sync(
            "containsItem",
            PredicateCategory::Collection,
            vec![param("item", ParamSpec::Any)],
            contains_item,
        ),
    ]
}

fn is_empty_collection(input: &PredicateInput<'_>) -> PredicateResult {
    Ok(match input.value {
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
        _ => false,
    })
}

/// Presence check for one name or every name in a list. Records in this
/// model are plain data with no inheritance chain, so presence means the
/// mapping carries the key itself.
fn has_property(input: &PredicateInput<'_>) -> PredicateResult {
    let map = match input.value {
        Some(Value::Object(map)) => map,
        _ => return Ok(false),
    };
    match input.params.first() {
        Some(Value::String(name)) => Ok(map.contains_key(name)),
        Some(Value::Array(names)) => Ok(names.iter().all(|name| {
            name.as_str()
                .map(|name| map.contains_key(name))
                .unwrap_or(false)
        })),
        _ => Err(EngineError::predicate_internal(
            "hasProperty",
            "property parameter must be a name or list of names",
        )),
    }
}

/// Membership by value equality: element membership for lists, any-value
/// match for mappings.
fn contains_item(input: &PredicateInput<'_>) -> PredicateResult {
    let needle = input.params.first().ok_or_else(|| {
        EngineError::predicate_internal("containsItem", "missing item parameter")
    })?;
    Ok(match input.value {
        Some(Value::Array(items)) => items.contains(needle),
        Some(Value::Object(map)) => map.values().any(|value| value == needle),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::super::PredicateFn;
    use super::*;
    use serde_json::json;

    fn run(name: &str, value: Option<&Value>, params: &[Value]) -> bool {
        let defs = defs();
        let def = defs.iter().find(|d| d.name == name).unwrap();
        let input = PredicateInput {
            value,
            params,
            regex: None,
        };
        match &def.function {
            PredicateFn::Sync(f) => f(&input).unwrap(),
            PredicateFn::Async(_) => unreachable!(),
        }
    }

    #[test]
    fn empty_collection_covers_lists_and_mappings() {
        assert!(run("isEmptyCollection", Some(&json!([])), &[]));
        assert!(run("isEmptyCollection", Some(&json!({})), &[]));
        assert!(!run("isEmptyCollection", Some(&json!([0])), &[]));
        assert!(!run("isEmptyCollection", Some(&json!({"k": 1})), &[]));
        assert!(!run("isEmptyCollection", Some(&json!("")), &[]));
        assert!(!run("isEmptyCollection", None, &[]));
    }

    #[test]
    fn has_property_single_name() {
        let record = json!({"a": 1, "b": null});
        assert!(run("hasProperty", Some(&record), &[json!("a")]));
        // Present-with-null still counts as present.
        assert!(run("hasProperty", Some(&record), &[json!("b")]));
        assert!(!run("hasProperty", Some(&record), &[json!("c")]));
    }

    #[test]
    fn has_property_list_requires_all() {
        let record = json!({"a": 1, "b": 2});
        assert!(run("hasProperty", Some(&record), &[json!(["a", "b"])]));
        assert!(!run("hasProperty", Some(&record), &[json!(["a", "z"])]));
    }

    #[test]
    fn has_property_on_non_mapping_is_false() {
        assert!(!run("hasProperty", Some(&json!([1, 2])), &[json!("0")]));
        assert!(!run("hasProperty", None, &[json!("a")]));
    }

    #[test]
    fn contains_item_in_list_and_mapping() {
        assert!(run("containsItem", Some(&json!([1, 2, 3])), &[json!(2)]));
        assert!(!run("containsItem", Some(&json!([1, 2, 3])), &[json!(4)]));
        assert!(run(
            "containsItem",
            Some(&json!({"x": "target"})),
            &[json!("target")]
        ));
        assert!(!run("containsItem", Some(&json!("target")), &[json!("target")]));
    }
}
