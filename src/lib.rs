//! # Veritor — Declarative Data-Validation Engine
//!
//! Veritor validates structured records against declarative rules. A rule
//! binds a dotted field path (`"users.0.profile.email"`) to a named
//! predicate (`"isEmail"`, `"between"`, ...) with frozen parameters; the
//! engine compiles the rule list once and then evaluates it against any
//! number of records through three pipelines sharing the same compiled
//! form:
//!
//! - [`Engine::validate`] — synchronous, one record;
//! - [`Engine::validate_async`] — awaits async predicates in rule order,
//!   with cooperative cancellation;
//! - [`Engine::validate_stream`] — a lazy sequence of records in, a lazy
//!   sequence of per-record outcomes out, terminated by one summary.
//!
//! Key components:
//! - Predicate Registry: process-wide immutable catalog of named checks
//! - Path Cache: bounded LRU of pre-split field paths
//! - Rule Compiler: schema-checks parameters and freezes them once
//! - Buffer Pool: recycled result/error/argument scratch buffers
//! - Callback Registry: named post-validation hooks
//!
//! Validation failures are data, never exceptions: they land in the
//! report's field-keyed error map. Structured failures (unknown operation,
//! bad parameter, cancelled, ...) surface as [`EngineError`].
//!
//! ```
//! use serde_json::json;
//! use veritor::{Engine, Rule};
//!
//! let engine = Engine::new(vec![
//!     Rule::new("email", "isEmail").message("Bad email"),
//!     Rule::new("age", "gte").param("value", json!(18)).code("AGE_LOW"),
//! ])?;
//!
//! let report = engine.validate(&json!({"email": "bad", "age": 16}))?;
//! assert!(!report.is_valid);
//! assert_eq!(report.errors.get("email").unwrap()[0].message, "Bad email");
//! # Ok::<(), veritor::EngineError>(())
//! ```

pub mod async_validator;
pub mod callbacks;
pub mod compiler;
pub mod config;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod path_cache;
pub mod pool;
pub mod predicates;
pub mod rule;
pub mod streaming;

mod validator;

pub use async_validator::CancelHandle;
pub use callbacks::{Callback, CallbackRegistry, CallbackSpec};
pub use compiler::{CompileStats, CompiledRule};
pub use config::{EngineOptions, StreamOptions, ValidateOptions};
pub use engine::{Engine, EngineMetrics};
pub use error::{EngineError, EngineResult};
pub use path_cache::{PathCache, PathCacheStats, PathSegment};
pub use pool::PoolMetrics;
pub use predicates::{
    as_finite_number, as_instant, AsyncPredicateInput, ParamSpec, PredicateCategory, PredicateDef,
    PredicateInput, PredicateRegistry,
};
pub use rule::{ErrorMap, FieldError, Rule, ValidationReport};
pub use streaming::{
    ChunkCallback, ChunkInfo, StreamEntry, StreamEvent, StreamingSummary, TextErrorMap,
    ValidationStream,
};
