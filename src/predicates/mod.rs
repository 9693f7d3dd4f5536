//! Predicate catalog: named boolean checks over extracted values.
//!
//! Each predicate declares its parameter schema up front so the rule
//! compiler can freeze and type-check parameters once, long before any
//! record is seen. The built-in catalog lives in [`registry`] behind a
//! process-wide immutable table; engines may layer custom predicates on top
//! with [`PredicateRegistry::extended`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use futures::future::BoxFuture;
use regex::Regex;
use serde_json::Value;

use crate::error::EngineResult;

pub mod collections;
pub mod comparison;
pub mod dates;
pub mod equality;
pub mod registry;
pub mod strings;
pub mod types;

/// Category tag carried by every predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredicateCategory {
    String,
    Date,
    Type,
    Equality,
    Comparison,
    Collection,
}

/// Declared shape of one predicate parameter, checked at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSpec {
    /// Any frozen value.
    Any,
    /// A finite numeric value; NaN and non-numbers are rejected.
    FiniteNumber,
    /// Text.
    Text,
    /// Text compiling to a regular expression; compiled once per rule.
    Pattern,
    /// An RFC 3339 string or integer epoch milliseconds.
    Timestamp,
    /// A single property name or a list of names.
    NameOrNames,
}

/// Named, typed parameter slot.
#[derive(Debug, Clone)]
pub struct ParamDef {
    pub name: &'static str,
    pub spec: ParamSpec,
}

pub const fn param(name: &'static str, spec: ParamSpec) -> ParamDef {
    ParamDef { name, spec }
}

/// Everything a predicate sees for one invocation: the extracted field
/// value (`None` when the path did not resolve), the frozen parameters in
/// declared order, and the pre-compiled pattern for regex predicates.
pub struct PredicateInput<'a> {
    pub value: Option<&'a Value>,
    pub params: &'a [Value],
    pub regex: Option<&'a Regex>,
}

/// Owned argument bundle handed to asynchronous predicates, cheap to move
/// into a pending future: the parameter tuple and compiled pattern are
/// shared, only the extracted value is cloned.
pub struct AsyncPredicateInput {
    pub value: Option<Value>,
    pub params: Arc<Vec<Value>>,
    pub regex: Option<Arc<Regex>>,
}

pub type PredicateResult = EngineResult<bool>;

pub type SyncPredicate = Arc<dyn Fn(&PredicateInput<'_>) -> PredicateResult + Send + Sync>;
pub type AsyncPredicate =
    Arc<dyn Fn(AsyncPredicateInput) -> BoxFuture<'static, PredicateResult> + Send + Sync>;

/// The predicate body, synchronous or suspending.
#[derive(Clone)]
pub enum PredicateFn {
    Sync(SyncPredicate),
    Async(AsyncPredicate),
}

/// A named entry of the predicate catalog.
#[derive(Clone)]
pub struct PredicateDef {
    pub name: String,
    pub category: PredicateCategory,
    pub params: Vec<ParamDef>,
    /// Existence-family predicates still evaluate when the extracted value
    /// is absent, even under partial validation.
    pub handles_absent: bool,
    pub function: PredicateFn,
}

impl PredicateDef {
    pub fn sync<F>(
        name: &str,
        category: PredicateCategory,
        params: Vec<ParamDef>,
        function: F,
    ) -> Self
    where
        F: Fn(&PredicateInput<'_>) -> PredicateResult + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            category,
            params,
            handles_absent: false,
            function: PredicateFn::Sync(Arc::new(function)),
        }
    }

    /// Registers an asynchronous predicate; the returned future is boxed
    /// internally so callers can hand over a plain `async` closure.
    pub fn asynchronous<F, Fut>(
        name: &str,
        category: PredicateCategory,
        params: Vec<ParamDef>,
        function: F,
    ) -> Self
    where
        F: Fn(AsyncPredicateInput) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = PredicateResult> + Send + 'static,
    {
        let boxed: AsyncPredicate = Arc::new(move |input| Box::pin(function(input)));
        Self {
            name: name.to_string(),
            category,
            params,
            handles_absent: false,
            function: PredicateFn::Async(boxed),
        }
    }

    #[must_use]
    pub fn handles_absent(mut self) -> Self {
        self.handles_absent = true;
        self
    }

    pub fn is_async(&self) -> bool {
        matches!(self.function, PredicateFn::Async(_))
    }

    /// Value plus declared parameters.
    pub fn arity(&self) -> usize {
        1 + self.params.len()
    }
}

impl std::fmt::Debug for PredicateDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredicateDef")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("arity", &self.arity())
            .field("async", &self.is_async())
            .finish()
    }
}

/// Name-keyed predicate table with O(1) lookup.
#[derive(Clone, Default)]
pub struct PredicateRegistry {
    by_name: HashMap<String, Arc<PredicateDef>>,
}

impl PredicateRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The immutable process-wide built-in catalog.
    pub fn builtin() -> &'static PredicateRegistry {
        registry::builtins()
    }

    /// A new registry layering `extra` predicates over this one. Entries
    /// with a colliding name shadow the originals.
    #[must_use]
    pub fn extended(&self, extra: Vec<PredicateDef>) -> Self {
        let mut by_name = self.by_name.clone();
        for def in extra {
            by_name.insert(def.name.clone(), Arc::new(def));
        }
        Self { by_name }
    }

    pub fn get(&self, name: &str) -> Option<Arc<PredicateDef>> {
        self.by_name.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub(crate) fn insert(&mut self, def: PredicateDef) {
        self.by_name.insert(def.name.clone(), Arc::new(def));
    }
}

/// Numeric view of a value, rejecting anything that is not a finite number.
pub fn as_finite_number(value: &Value) -> Option<f64> {
    value.as_f64().filter(|n| n.is_finite())
}

/// Timestamp view of a value: RFC 3339 text or integer epoch milliseconds,
/// normalized to UTC.
pub fn as_instant(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

pub(crate) fn as_text(value: &Value) -> Option<&str> {
    value.as_str()
}
