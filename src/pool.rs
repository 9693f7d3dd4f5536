//! Reusable per-call scratch buffers.
//!
//! Validation allocates the same three shapes on every call: a result
//! buffer, per-field error lists, and the argument tuple handed to each
//! predicate. The pool keeps a bounded free list per kind and resets
//! buffers on release; when a free list is full the release is a no-op and
//! the buffer is simply dropped. A disabled pool allocates fresh buffers
//! every time and must produce identical validation results.

use std::sync::Mutex;

use serde::Serialize;
use serde_json::Value;

use crate::rule::{ErrorMap, FieldError};

/// Pooled result accumulator. Reset state is `is_valid = true`, no data,
/// no errors.
#[derive(Debug, Default)]
pub struct ResultBuf {
    pub is_valid: bool,
    pub errors: ErrorMap,
}

impl ResultBuf {
    fn fresh() -> Self {
        Self {
            is_valid: true,
            errors: ErrorMap::new(),
        }
    }
}

/// Pool observability counters. `hit_rate` is hits over total acquisitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolMetrics {
    pub hits: u64,
    pub misses: u64,
    pub allocations: u64,
    pub returns: u64,
    pub hit_rate: f64,
    pub result_buffers: usize,
    pub error_lists: usize,
    pub argument_lists: usize,
}

#[derive(Default)]
struct PoolInner {
    results: Vec<ResultBuf>,
    error_lists: Vec<Vec<FieldError>>,
    argument_lists: Vec<Vec<Value>>,
    hits: u64,
    misses: u64,
    allocations: u64,
    returns: u64,
}

/// Type-keyed pool of scratch buffers with bounded free lists.
pub struct BufferPool {
    inner: Mutex<PoolInner>,
    capacity: usize,
    enabled: bool,
}

impl BufferPool {
    pub fn new(capacity: usize, enabled: bool) -> Self {
        Self {
            inner: Mutex::new(PoolInner::default()),
            capacity: capacity.max(1),
            enabled,
        }
    }

    pub fn acquire_result(&self) -> ResultBuf {
        let mut inner = self.lock();
        match self.enabled.then(|| inner.results.pop()).flatten() {
            Some(buf) => {
                inner.hits += 1;
                buf
            }
            None => {
                inner.misses += 1;
                inner.allocations += 1;
                ResultBuf::fresh()
            }
        }
    }

    /// Resets and recycles a result buffer. Error-list vectors inside the
    /// buffer flow back to their own free list.
    pub fn release_result(&self, mut buf: ResultBuf) {
        let entries = buf.errors.drain_entries();
        buf.is_valid = true;

        let mut inner = self.lock();
        if !self.enabled {
            return;
        }
        for (_, mut list) in entries {
            list.clear();
            if inner.error_lists.len() < self.capacity {
                inner.error_lists.push(list);
                inner.returns += 1;
            }
        }
        if inner.results.len() < self.capacity {
            inner.results.push(buf);
            inner.returns += 1;
        }
    }

    pub fn acquire_errors(&self) -> Vec<FieldError> {
        let mut inner = self.lock();
        match self.enabled.then(|| inner.error_lists.pop()).flatten() {
            Some(list) => {
                inner.hits += 1;
                list
            }
            None => {
                inner.misses += 1;
                inner.allocations += 1;
                Vec::new()
            }
        }
    }

    pub fn acquire_args(&self) -> Vec<Value> {
        let mut inner = self.lock();
        match self.enabled.then(|| inner.argument_lists.pop()).flatten() {
            Some(args) => {
                inner.hits += 1;
                args
            }
            None => {
                inner.misses += 1;
                inner.allocations += 1;
                Vec::new()
            }
        }
    }

    /// Truncates and recycles an argument tuple.
    pub fn release_args(&self, mut args: Vec<Value>) {
        args.clear();
        let mut inner = self.lock();
        if self.enabled && inner.argument_lists.len() < self.capacity {
            inner.argument_lists.push(args);
            inner.returns += 1;
        }
    }

    pub fn metrics(&self) -> PoolMetrics {
        let inner = self.lock();
        let acquisitions = inner.hits + inner.misses;
        PoolMetrics {
            hits: inner.hits,
            misses: inner.misses,
            allocations: inner.allocations,
            returns: inner.returns,
            hit_rate: if acquisitions == 0 {
                0.0
            } else {
                inner.hits as f64 / acquisitions as f64
            },
            result_buffers: inner.results.len(),
            error_lists: inner.error_lists.len(),
            argument_lists: inner.argument_lists.len(),
        }
    }

    /// Drops every pooled buffer and zeroes the counters.
    pub fn clear(&self) {
        let mut inner = self.lock();
        *inner = PoolInner::default();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PoolInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
