//! The process-wide built-in predicate catalog.
//!
//! Built once on first use and immutable afterwards; this is the only
//! process-global state the engine carries. Everything mutable (caches,
//! pools, options) is attached to an engine instance instead.

use once_cell::sync::Lazy;

use super::{collections, comparison, dates, equality, strings, types, PredicateRegistry};

static BUILTINS: Lazy<PredicateRegistry> = Lazy::new(|| {
    let mut registry = PredicateRegistry::empty();
    for def in equality::defs()
        .into_iter()
        .chain(comparison::defs())
        .chain(types::defs())
        .chain(strings::defs())
        .chain(dates::defs())
        .chain(collections::defs())
    {
        registry.insert(def);
    }
    registry
});

pub(crate) fn builtins() -> &'static PredicateRegistry {
    &BUILTINS
}

#[cfg(test)]
mod tests {
    use super::super::PredicateRegistry;

    const EXPECTED: &[&str] = &[
        // equality
        "eq",
        "neq",
        // comparison
        "gt",
        "gte",
        "lt",
        "lte",
        "between",
        "notBetween",
        // type
        "isString",
        "isNumber",
        "isBoolean",
        "isDate",
        "isArray",
        "isObject",
        // string
        "isEmpty",
        "contains",
        "startsWith",
        "endsWith",
        "regexMatch",
        "isEmail",
        "isURL",
        "isUUID",
        "minLength",
        "maxLength",
        // date
        "isAfter",
        "isBefore",
        "isToday",
        "isWeekend",
        "isWeekday",
        "isLeapYear",
        // collection
        "isEmptyCollection",
        "hasProperty",
        "containsItem",
    ];

    #[test]
    fn catalog_is_exhaustive() {
        let registry = PredicateRegistry::builtin();
        for name in EXPECTED {
            assert!(registry.contains(name), "missing builtin '{name}'");
        }
        assert_eq!(registry.len(), EXPECTED.len());
    }

    #[test]
    fn builtins_are_all_synchronous() {
        let registry = PredicateRegistry::builtin();
        for name in registry.names() {
            assert!(!registry.get(name).unwrap().is_async());
        }
    }

    #[test]
    fn existence_family_handles_absence() {
        let registry = PredicateRegistry::builtin();
        for name in ["isEmpty", "isEmptyCollection", "hasProperty"] {
            assert!(registry.get(name).unwrap().handles_absent);
        }
        assert!(!registry.get("eq").unwrap().handles_absent);
    }
}
