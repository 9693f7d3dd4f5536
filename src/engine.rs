//! The engine facade: compiles rules once, then validates records through
//! the synchronous, asynchronous, and streaming pipelines.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::stream::Stream;
use serde::Serialize;
use serde_json::Value;

use crate::async_validator::CancelHandle;
use crate::callbacks::{Callback, CallbackRegistry, CallbackSpec};
use crate::compiler::{compile_rules, CompileStats};
use crate::config::{EngineOptions, StreamOptions, ValidateOptions};
use crate::error::EngineResult;
use crate::path_cache::{PathCache, PathCacheStats};
use crate::pool::{BufferPool, PoolMetrics};
use crate::predicates::PredicateRegistry;
use crate::rule::{Rule, ValidationReport};
use crate::streaming::{
    stream_events_async, ChunkCallback, StreamEntry, StreamEvent, StreamingSummary,
    ValidationStream,
};
use crate::validator::ValidationCore;

/// Aggregated engine observability: compile, cache, and pool counters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineMetrics {
    pub compile: CompileStats,
    pub path_cache: PathCacheStats,
    pub pool: PoolMetrics,
}

/// A compiled validation engine.
///
/// Rules are compiled in the constructor and immutable afterwards; every
/// `validate*` call evaluates the same compiled set. The engine never
/// mutates input records.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use veritor::{Engine, Rule};
///
/// let engine = Engine::new(vec![
///     Rule::new("email", "isEmail"),
///     Rule::new("age", "gte").param("value", json!(18)),
/// ])
/// .unwrap();
///
/// let report = engine.validate(&json!({"email": "u@d.com", "age": 25})).unwrap();
/// assert!(report.is_valid);
/// ```
pub struct Engine {
    core: ValidationCore,
    callbacks: CallbackRegistry,
    compile_stats: CompileStats,
    streaming_warned: AtomicBool,
}

impl Engine {
    /// Compiles `rules` against the built-in predicate catalog with
    /// default options.
    pub fn new(rules: Vec<Rule>) -> EngineResult<Self> {
        Self::with_parts(
            rules,
            PredicateRegistry::builtin(),
            CallbackRegistry::new(),
            EngineOptions::default(),
        )
    }

    pub fn with_options(rules: Vec<Rule>, options: EngineOptions) -> EngineResult<Self> {
        Self::with_parts(
            rules,
            PredicateRegistry::builtin(),
            CallbackRegistry::new(),
            options,
        )
    }

    /// Full constructor: custom predicate registry, named callbacks, and
    /// options. Compilation failures (`UnknownOp`, `BadParameterType`,
    /// `InvalidFieldPath`) surface here and nowhere else.
    pub fn with_parts(
        rules: Vec<Rule>,
        registry: &PredicateRegistry,
        callbacks: CallbackRegistry,
        options: EngineOptions,
    ) -> EngineResult<Self> {
        let cache = Arc::new(PathCache::new(options.path_cache_capacity));
        let (compiled, compile_stats) = compile_rules(&rules, registry, &cache, &options)?;
        let pool = BufferPool::new(options.memory_pool_size, options.enable_memory_pool);
        Ok(Self {
            core: ValidationCore {
                rules: compiled,
                pool,
                cache,
                options,
            },
            callbacks,
            compile_stats,
            streaming_warned: AtomicBool::new(false),
        })
    }

    /// Registers a named post-validation callback.
    pub fn register_callback(&mut self, name: impl Into<String>, callback: Callback) {
        self.callbacks.register(name, callback);
    }

    /// Synchronous validation of one record.
    pub fn validate(&self, record: &Value) -> EngineResult<ValidationReport> {
        self.validate_with(record, &CallbackSpec::None, &ValidateOptions::default())
    }

    /// Synchronous validation with a callback reference and early-exit
    /// options. The callback runs after the report is complete; an async
    /// callback's pending work is discarded on this path.
    pub fn validate_with(
        &self,
        record: &Value,
        callback: &CallbackSpec,
        opts: &ValidateOptions,
    ) -> EngineResult<ValidationReport> {
        let callback = self.callbacks.resolve(callback)?;
        let report = self.core.validate_sync(record, opts)?;
        if let Some(callback) = callback {
            callback.invoke_sync(&report);
        }
        Ok(report)
    }

    /// Asynchronous validation of one record.
    pub async fn validate_async(&self, record: &Value) -> EngineResult<ValidationReport> {
        self.validate_async_with(record, &CallbackSpec::None, &ValidateOptions::default(), None)
            .await
    }

    /// Asynchronous validation: async predicates are awaited in rule
    /// order, cancellation is honored between rules, and async callbacks
    /// are awaited before the report is returned.
    pub async fn validate_async_with(
        &self,
        record: &Value,
        callback: &CallbackSpec,
        opts: &ValidateOptions,
        cancel: Option<&CancelHandle>,
    ) -> EngineResult<ValidationReport> {
        let callback = self.callbacks.resolve(callback)?;
        let report = self.core.validate_async(record, opts, cancel).await?;
        if let Some(callback) = callback {
            callback.invoke_async(&report).await;
        }
        Ok(report)
    }

    /// Lazy validation over an iterator of records.
    ///
    /// When streaming is disabled in the engine options a warning is
    /// emitted (once) and records are still validated one by one with
    /// identical per-record results.
    pub fn validate_stream<I>(&self, source: I) -> ValidationStream<'_, I::IntoIter>
    where
        I: IntoIterator<Item = Value>,
    {
        self.validate_stream_with(source, self.stream_defaults(), None, None)
    }

    pub fn validate_stream_with<I>(
        &self,
        source: I,
        opts: StreamOptions,
        on_chunk: Option<ChunkCallback>,
        cancel: Option<CancelHandle>,
    ) -> ValidationStream<'_, I::IntoIter>
    where
        I: IntoIterator<Item = Value>,
    {
        self.warn_if_streaming_disabled();
        ValidationStream::new(&self.core, source.into_iter(), opts, on_chunk, cancel)
    }

    /// Async streaming over a `Stream` source, awaiting async predicates
    /// per record.
    pub fn validate_stream_async<'a, S>(
        &'a self,
        source: S,
        opts: StreamOptions,
        on_chunk: Option<ChunkCallback>,
        cancel: Option<CancelHandle>,
    ) -> impl Stream<Item = StreamEvent> + 'a
    where
        S: Stream<Item = Value> + Unpin + Send + 'a,
    {
        self.warn_if_streaming_disabled();
        stream_events_async(&self.core, source, opts, on_chunk, cancel)
    }

    /// Eager whole-array validation returning every entry plus the summary.
    pub fn validate_array(&self, records: &[Value]) -> (Vec<StreamEntry>, StreamingSummary) {
        let mut entries = Vec::with_capacity(records.len());
        let mut summary = StreamingSummary::default();
        let stream = ValidationStream::new(
            &self.core,
            records.iter().cloned(),
            self.stream_defaults(),
            None,
            None,
        );
        for event in stream {
            match event {
                StreamEvent::Entry(entry) => entries.push(entry),
                StreamEvent::Summary(s) => summary = s,
            }
        }
        (entries, summary)
    }

    /// Eager whole-array validation returning only the summary.
    pub fn validate_array_summary(&self, records: &[Value]) -> StreamingSummary {
        self.validate_array(records).1
    }

    pub fn metrics(&self) -> EngineMetrics {
        EngineMetrics {
            compile: self.compile_stats.clone(),
            path_cache: self.core.cache.stats(),
            pool: self.core.pool.metrics(),
        }
    }

    pub fn memory_pool_metrics(&self) -> PoolMetrics {
        self.core.pool.metrics()
    }

    /// Empties the path cache. Compiled rules keep their shared segment
    /// lists, so results are unchanged.
    pub fn clear_caches(&self) {
        self.core.cache.clear();
    }

    /// Drops pooled buffers and resets pool metrics.
    pub fn clear_memory_pool(&self) {
        self.core.pool.clear();
    }

    pub fn options(&self) -> &EngineOptions {
        &self.core.options
    }

    pub fn rule_count(&self) -> usize {
        self.core.rules.len()
    }

    fn stream_defaults(&self) -> StreamOptions {
        StreamOptions {
            chunk_size: self.core.options.streaming_chunk_size,
            ..StreamOptions::default()
        }
    }

    fn warn_if_streaming_disabled(&self) {
        if self.core.options.enable_streaming || self.core.options.silent {
            return;
        }
        if !self.streaming_warned.swap(true, Ordering::Relaxed) {
            log::warn!(
                target: "veritor::engine",
                "streaming validation requested but not enabled; records are validated one by one"
            );
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("rules", &self.core.rules.len())
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}
