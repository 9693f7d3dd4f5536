//! Engine and per-call configuration.

use serde::{Deserialize, Serialize};

/// Construction-time options for [`crate::engine::Engine`].
///
/// Every knob has a conservative default; `EngineOptions::default()` yields
/// an engine with pooling enabled, streaming disabled, and quiet logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineOptions {
    /// Emit one structured debug record per validation.
    pub debug: bool,
    /// Suppress all log output, including slow-validation warnings.
    pub silent: bool,
    /// Fail compilation when a rule's field path has empty segments
    /// (`"a..b"`, leading or trailing dot) instead of warning.
    pub throw_on_unknown_field: bool,
    /// Treat absent extracted values as passing for every predicate outside
    /// the existence family (`isEmpty`, `isEmptyCollection`, `hasProperty`).
    pub allow_partial_validation: bool,
    /// Reuse result/error/argument buffers across calls.
    pub enable_memory_pool: bool,
    /// Per-kind free-list capacity for the buffer pool.
    pub memory_pool_size: usize,
    /// Bound on the path-segment cache.
    pub path_cache_capacity: usize,
    /// Allow `validate_stream`; when false a warning is emitted and records
    /// are still validated one by one with identical results.
    pub enable_streaming: bool,
    /// Default chunk-callback frequency for streaming validation.
    pub streaming_chunk_size: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            debug: false,
            silent: false,
            throw_on_unknown_field: false,
            allow_partial_validation: false,
            enable_memory_pool: true,
            memory_pool_size: 50,
            path_cache_capacity: 128,
            enable_streaming: false,
            streaming_chunk_size: 50,
        }
    }
}

/// Per-call early-exit policy for `validate` and `validate_async`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValidateOptions {
    /// Stop after the first failing rule.
    pub fail_fast: bool,
    /// Stop once the total error count reaches this bound.
    pub max_errors: Option<usize>,
}

impl ValidateOptions {
    pub fn fail_fast() -> Self {
        Self {
            fail_fast: true,
            max_errors: None,
        }
    }

    pub fn max_errors(limit: usize) -> Self {
        Self {
            fail_fast: false,
            max_errors: Some(limit),
        }
    }
}

/// Per-call options for streaming validation.
///
/// `chunk_size` only controls chunk-callback frequency; `max_concurrent` is
/// accepted as a hint and the engine keeps its sequential scheduling model,
/// so output order always equals input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StreamOptions {
    pub chunk_size: usize,
    pub max_concurrent: usize,
    /// Early-exit policy applied to each record's rule walk.
    pub per_record: ValidateOptions,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            chunk_size: 50,
            max_concurrent: 1,
            per_record: ValidateOptions::default(),
        }
    }
}
