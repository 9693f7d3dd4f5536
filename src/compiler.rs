//! Turns declarative rules into their executable form.
//!
//! Compilation happens once, in the engine constructor: predicate names
//! resolve against the registry, parameters freeze into an ordered tuple
//! after schema validation, regex parameters compile, and field paths are
//! interned in the shared segment cache. Everything that can fail for a
//! rule fails here, so the per-record hot path never re-checks schemas.

use std::sync::Arc;
use std::time::Instant;

use itertools::Itertools;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::config::EngineOptions;
use crate::error::{EngineError, EngineResult};
use crate::path_cache::{PathCache, PathSegment};
use crate::predicates::{ParamSpec, PredicateDef, PredicateRegistry};
use crate::rule::Rule;
use crate::{as_finite_number, as_instant};

/// Immutable executable form of one [`Rule`].
#[derive(Clone)]
pub struct CompiledRule {
    pub field: String,
    /// Shared with the path cache; read-only.
    pub segments: Arc<Vec<PathSegment>>,
    pub predicate: Arc<PredicateDef>,
    /// Frozen parameter values in declared order.
    pub params: Arc<Vec<Value>>,
    /// Pre-compiled pattern for regex predicates.
    pub regex: Option<Arc<Regex>>,
    pub negative: bool,
    pub message: Option<String>,
    pub code: Option<String>,
}

impl CompiledRule {
    /// Failure message for this rule: the custom message, or a generic one
    /// naming the field and operation.
    pub fn failure_message(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| format!("{} failed {} validation", self.field, self.predicate.name))
    }
}

impl std::fmt::Debug for CompiledRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledRule")
            .field("field", &self.field)
            .field("op", &self.predicate.name)
            .field("negative", &self.negative)
            .finish()
    }
}

/// Construction-time counters exposed through the engine metrics.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileStats {
    pub rule_count: usize,
    pub async_rule_count: usize,
    pub compile_time_us: u128,
}

/// Compiles `rules` in order; the output vector is positionally aligned
/// with the input.
pub fn compile_rules(
    rules: &[Rule],
    registry: &PredicateRegistry,
    cache: &PathCache,
    options: &EngineOptions,
) -> EngineResult<(Vec<CompiledRule>, CompileStats)> {
    let started = Instant::now();
    let mut compiled = Vec::with_capacity(rules.len());

    for rule in rules {
        compiled.push(compile_rule(rule, registry, cache, options)?);
    }

    let stats = CompileStats {
        rule_count: compiled.len(),
        async_rule_count: compiled.iter().filter(|r| r.predicate.is_async()).count(),
        compile_time_us: started.elapsed().as_micros(),
    };
    Ok((compiled, stats))
}

fn compile_rule(
    rule: &Rule,
    registry: &PredicateRegistry,
    cache: &PathCache,
    options: &EngineOptions,
) -> EngineResult<CompiledRule> {
    let predicate = registry.get(&rule.op).ok_or_else(|| EngineError::UnknownOp {
        op: rule.op.clone(),
    })?;

    check_path_strictness(&rule.field, options)?;
    let segments = cache.intern(&rule.field)?;

    let unknown = rule
        .params
        .keys()
        .filter(|name| !predicate.params.iter().any(|p| p.name == name.as_str()))
        .join(", ");
    if !unknown.is_empty() && !options.silent {
        log::warn!(
            target: "veritor::compiler",
            "rule for '{}' passes unknown parameters [{}] to '{}'; they are ignored",
            rule.field,
            unknown,
            rule.op
        );
    }

    let mut params = Vec::with_capacity(predicate.params.len());
    let mut regex = None;
    for declared in &predicate.params {
        let value = rule.params.get(declared.name).ok_or_else(|| {
            EngineError::bad_parameter(&rule.op, declared.name, "required parameter is missing")
        })?;
        if let Some(compiled) = check_param(&rule.op, declared.name, declared.spec, value)? {
            regex = Some(Arc::new(compiled));
        }
        params.push(value.clone());
    }

    Ok(CompiledRule {
        field: rule.field.clone(),
        segments,
        predicate,
        params: Arc::new(params),
        regex,
        negative: rule.negative,
        message: rule.message.clone(),
        code: rule.code.clone(),
    })
}

fn check_path_strictness(field: &str, options: &EngineOptions) -> EngineResult<()> {
    if field.is_empty() {
        return Err(EngineError::InvalidFieldPath {
            path: String::new(),
            detail: "path must be non-empty".to_string(),
        });
    }
    if field.split('.').any(str::is_empty) {
        if options.throw_on_unknown_field {
            return Err(EngineError::InvalidFieldPath {
                path: field.to_string(),
                detail: "path contains an empty segment".to_string(),
            });
        }
        if !options.silent {
            log::warn!(
                target: "veritor::compiler",
                "field path '{}' contains an empty segment and can never resolve",
                field
            );
        }
    }
    Ok(())
}

/// Validates one frozen parameter against its declared spec; returns the
/// compiled regex for `Pattern` parameters.
fn check_param(
    op: &str,
    name: &str,
    spec: ParamSpec,
    value: &Value,
) -> EngineResult<Option<Regex>> {
    match spec {
        ParamSpec::Any => Ok(None),
        ParamSpec::FiniteNumber => match as_finite_number(value) {
            Some(_) => Ok(None),
            None => Err(EngineError::bad_parameter(
                op,
                name,
                "expected a finite number",
            )),
        },
        ParamSpec::Text => match value.as_str() {
            Some(_) => Ok(None),
            None => Err(EngineError::bad_parameter(op, name, "expected text")),
        },
        ParamSpec::Pattern => {
            let source = value
                .as_str()
                .ok_or_else(|| EngineError::bad_parameter(op, name, "expected a pattern string"))?;
            Regex::new(source)
                .map(Some)
                .map_err(|err| EngineError::bad_parameter(op, name, err.to_string()))
        }
        ParamSpec::Timestamp => match as_instant(value) {
            Some(_) => Ok(None),
            None => Err(EngineError::bad_parameter(
                op,
                name,
                "expected an RFC 3339 string or epoch milliseconds",
            )),
        },
        ParamSpec::NameOrNames => match value {
            Value::String(_) => Ok(None),
            Value::Array(items) if items.iter().all(Value::is_string) => Ok(None),
            _ => Err(EngineError::bad_parameter(
                op,
                name,
                "expected a name or a list of names",
            )),
        },
    }
}
