//! End-to-end engine scenarios.
//!
//! Covers the whole synchronous surface against realistic rule sets:
//!
//! 1. **Happy path**: multi-rule records that satisfy everything
//! 2. **Failure shaping**: custom messages, codes, and error ordering
//! 3. **Nested paths**: array indices and deep objects, present and absent
//! 4. **Early exit**: fail-fast and max-errors policies
//! 5. **Negation**: XOR semantics against the same rule set
//! 6. **Round-trips**: rule serialization and cache/pool clearing
//! 7. **Async paths**: async predicates, callbacks, and cancellation

use serde_json::{json, Value};
use veritor::{
    Callback, CallbackRegistry, CallbackSpec, CancelHandle, Engine, EngineOptions, Rule,
    ValidateOptions,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn signup_rules() -> Vec<Rule> {
    vec![
        Rule::new("email", "isEmail").message("Bad email"),
        Rule::new("age", "gte").param("value", json!(18)).code("AGE_LOW"),
    ]
}

#[test]
fn valid_record_yields_empty_errors() {
    init_logging();
    let engine = Engine::new(signup_rules()).unwrap();
    let record = json!({"email": "u@d.com", "age": 25});

    let report = engine.validate(&record).unwrap();
    assert!(report.is_valid);
    assert!(report.errors.is_empty());
    assert_eq!(report.data, record);

    let wire = serde_json::to_value(&report).unwrap();
    assert_eq!(wire, json!({"isValid": true, "data": record, "errors": {}}));
}

#[test]
fn failing_record_carries_messages_and_codes() {
    let engine = Engine::new(signup_rules()).unwrap();
    let report = engine.validate(&json!({"email": "bad", "age": 16})).unwrap();

    assert!(!report.is_valid);
    let email_errors = report.errors.get("email").unwrap();
    assert_eq!(email_errors.len(), 1);
    assert_eq!(email_errors[0].message, "Bad email");
    assert!(email_errors[0].code.is_none());

    let age_errors = report.errors.get("age").unwrap();
    assert_eq!(age_errors.len(), 1);
    assert_eq!(age_errors[0].code.as_deref(), Some("AGE_LOW"));
    assert!(!age_errors[0].message.is_empty());
}

#[test]
fn nested_array_path_resolves() {
    let engine = Engine::new(vec![Rule::new("users.0.profile.email", "isEmail")]).unwrap();
    let report = engine
        .validate(&json!({"users": [{"profile": {"email": "a@b.co"}}]}))
        .unwrap();
    assert!(report.is_valid);
}

#[test]
fn out_of_range_index_fails_with_exactly_one_error() {
    let engine = Engine::new(vec![Rule::new("users.5.profile.email", "isEmail")]).unwrap();
    let report = engine
        .validate(&json!({"users": [{"profile": {"email": "a@b.co"}}]}))
        .unwrap();
    assert!(!report.is_valid);
    assert_eq!(report.errors.field_count(), 1);
    assert_eq!(report.errors.get("users.5.profile.email").unwrap().len(), 1);
}

#[test]
fn record_is_never_mutated() {
    let record = json!({
        "email": "bad",
        "age": 16,
        "nested": {"list": [1, 2, {"deep": null}]},
    });
    let snapshot = record.clone();
    let engine = Engine::new(signup_rules()).unwrap();

    let report = engine.validate(&record).unwrap();
    assert_eq!(record, snapshot);
    assert_eq!(report.data, snapshot);
}

#[test]
fn rules_passing_individually_pass_in_combination() {
    let rules = vec![
        Rule::new("name", "minLength").param("value", json!(2)),
        Rule::new("name", "maxLength").param("value", json!(10)),
        Rule::new("site", "isURL"),
        Rule::new("id", "isUUID"),
    ];
    let record = json!({
        "name": "Rafael",
        "site": "https://example.com",
        "id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
    });

    for rule in &rules {
        let single = Engine::new(vec![rule.clone()]).unwrap();
        assert!(single.validate(&record).unwrap().is_valid, "rule {:?}", rule.op);
    }
    let combined = Engine::new(rules).unwrap();
    assert!(combined.validate(&record).unwrap().is_valid);
}

#[test]
fn field_errors_appear_in_rule_definition_order() {
    let engine = Engine::new(vec![
        Rule::new("name", "minLength").param("value", json!(5)).message("too short"),
        Rule::new("other", "isEmail").message("not email"),
        Rule::new("name", "contains").param("value", json!("zz")).message("no zz"),
    ])
    .unwrap();

    let report = engine
        .validate(&json!({"name": "abc", "other": "x"}))
        .unwrap();

    // Field order follows first failure; per-field order follows rules.
    let fields: Vec<&str> = report.errors.iter().map(|(f, _)| f).collect();
    assert_eq!(fields, vec!["name", "other"]);
    let name_errors = report.errors.get("name").unwrap();
    assert_eq!(name_errors[0].message, "too short");
    assert_eq!(name_errors[1].message, "no zz");
}

#[test]
fn negative_is_a_logical_xor() {
    let cases: Vec<(Rule, Value)> = vec![
        (Rule::new("email", "isEmail"), json!({"email": "u@d.com"})),
        (Rule::new("email", "isEmail"), json!({"email": "nope"})),
        (
            Rule::new("n", "between").param("min", json!(1)).param("max", json!(10)),
            json!({"n": 5}),
        ),
        (
            Rule::new("tags", "containsItem").param("item", json!("a")),
            json!({"tags": ["b", "c"]}),
        ),
    ];

    for (rule, record) in cases {
        let plain = Engine::new(vec![rule.clone()]).unwrap();
        let negated = Engine::new(vec![rule.clone().negative()]).unwrap();
        let a = plain.validate(&record).unwrap().is_valid;
        let b = negated.validate(&record).unwrap().is_valid;
        assert_ne!(a, b, "rule {:?} on {record}", rule.op);
    }
}

#[test]
fn fail_fast_leaves_exactly_one_error() {
    let engine = Engine::new(vec![
        Rule::new("a", "isEmail"),
        Rule::new("b", "isEmail"),
        Rule::new("a", "isURL"),
    ])
    .unwrap();
    let report = engine
        .validate_with(
            &json!({"a": "x", "b": "y"}),
            &CallbackSpec::None,
            &ValidateOptions::fail_fast(),
        )
        .unwrap();
    assert_eq!(report.errors.field_count(), 1);
    assert_eq!(report.errors.total_errors(), 1);
}

#[test]
fn max_errors_bounds_total_error_count() {
    let rules: Vec<Rule> = (0..6)
        .map(|i| Rule::new(format!("f{i}"), "isEmail"))
        .collect();
    let engine = Engine::new(rules).unwrap();
    let record = json!({"f0": "x", "f1": "x", "f2": "x", "f3": "x", "f4": "x", "f5": "x"});

    for k in 1..=4usize {
        let report = engine
            .validate_with(&record, &CallbackSpec::None, &ValidateOptions::max_errors(k))
            .unwrap();
        assert!(report.errors.total_errors() <= k);
        assert_eq!(report.errors.total_errors(), k);
    }
}

#[test]
fn serialized_rules_compile_to_equal_behavior() {
    let rules = vec![
        Rule::new("email", "isEmail").message("Bad email"),
        Rule::new("age", "between").param("min", json!(18)).param("max", json!(99)),
        Rule::new("name", "regexMatch").param("regex", json!("^[A-Z]")).negative(),
    ];
    let document = serde_json::to_string(&rules).unwrap();
    let parsed: Vec<Rule> = serde_json::from_str(&document).unwrap();
    assert_eq!(rules, parsed);

    let original = Engine::new(rules).unwrap();
    let round_tripped = Engine::new(parsed).unwrap();
    for record in [
        json!({"email": "u@d.com", "age": 30, "name": "lower"}),
        json!({"email": "bad", "age": 12, "name": "Upper"}),
        json!({"age": 50, "name": "Zed"}),
    ] {
        assert_eq!(
            original.validate(&record).unwrap(),
            round_tripped.validate(&record).unwrap()
        );
    }
}

#[test]
fn clearing_caches_and_pool_is_invisible_to_results() {
    let engine = Engine::new(signup_rules()).unwrap();
    let record = json!({"email": "bad", "age": 16});

    let before = engine.validate(&record).unwrap();
    engine.clear_caches();
    engine.clear_memory_pool();
    let after = engine.validate(&record).unwrap();
    assert_eq!(before, after);
}

#[test]
fn disabled_pool_produces_identical_reports() {
    let record = json!({"email": "bad", "age": 16});
    let pooled = Engine::new(signup_rules()).unwrap();
    let unpooled = Engine::with_options(
        signup_rules(),
        EngineOptions {
            enable_memory_pool: false,
            ..EngineOptions::default()
        },
    )
    .unwrap();
    assert_eq!(
        pooled.validate(&record).unwrap(),
        unpooled.validate(&record).unwrap()
    );
    assert_eq!(unpooled.memory_pool_metrics().returns, 0);
}

#[test]
fn non_object_records_are_rejected() {
    let engine = Engine::new(signup_rules()).unwrap();
    for record in [json!(null), json!(42), json!("text"), json!([1, 2])] {
        let err = engine.validate(&record).unwrap_err();
        assert_eq!(err.kind(), "BadInput");
    }
}

#[test]
fn absent_comparison_operand_is_a_predicate_failure() {
    let engine = Engine::new(vec![Rule::new("age", "notBetween")
        .param("min", json!(1))
        .param("max", json!(10))])
    .unwrap();
    let err = engine.validate(&json!({"other": true})).unwrap_err();
    assert_eq!(err.kind(), "PredicateInternal");
}

#[test]
fn nan_like_parameter_fails_at_compile_time() {
    let err = Engine::new(vec![Rule::new("age", "notBetween")
        .param("min", json!("low"))
        .param("max", json!(10))])
    .unwrap_err();
    assert_eq!(err.kind(), "BadParameterType");
}

#[test]
fn partial_validation_skips_only_non_existence_predicates() {
    let options = EngineOptions {
        allow_partial_validation: true,
        ..EngineOptions::default()
    };
    let engine = Engine::with_options(
        vec![
            Rule::new("age", "gte").param("value", json!(18)),
            Rule::new("email", "isEmail"),
            Rule::new("name", "isEmpty").negative(),
        ],
        options,
    )
    .unwrap();

    // age and email are absent and skipped; the required-name check still
    // sees the absence and fails.
    let report = engine.validate(&json!({"unrelated": 1})).unwrap();
    assert!(!report.is_valid);
    assert_eq!(report.errors.field_count(), 1);
    assert!(report.errors.get("name").is_some());
}

#[tokio::test]
async fn validate_async_matches_sync_for_sync_rules() {
    let engine = Engine::new(signup_rules()).unwrap();
    let record = json!({"email": "bad", "age": 16});
    let sync_report = engine.validate(&record).unwrap();
    let async_report = engine.validate_async(&record).await.unwrap();
    assert_eq!(sync_report, async_report);
}

#[tokio::test]
async fn cancelled_async_validation_surfaces_cancelled() {
    let engine = Engine::new(signup_rules()).unwrap();
    let cancel = CancelHandle::new();
    cancel.cancel();
    let err = engine
        .validate_async_with(
            &json!({"email": "u@d.com", "age": 30}),
            &CallbackSpec::None,
            &ValidateOptions::default(),
            Some(&cancel),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "Cancelled");
}

#[test]
fn callbacks_from_untyped_config_reject_non_names() {
    let mut callbacks = CallbackRegistry::new();
    callbacks.register("noop", Callback::sync(|_| {}));

    assert!(CallbackSpec::from_value(Some(&json!("noop"))).is_ok());
    assert!(CallbackSpec::from_value(Some(&Value::Null)).is_ok());
    let err = CallbackSpec::from_value(Some(&json!({"not": "a name"}))).unwrap_err();
    assert_eq!(err.kind(), "BadCallbackKind");
}
