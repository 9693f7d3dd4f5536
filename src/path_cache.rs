//! Dotted field paths and the bounded segment cache.
//!
//! A path such as `"users.0.profile.email"` splits on `.` into tagged
//! segments: key lookups for object members and index lookups for array
//! elements. Splitting is cheap but repeated for every rule referencing the
//! same path, so parsed segment lists are interned in a bounded LRU cache
//! and shared with compiled rules via `Arc`.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::error::{EngineError, EngineResult};

/// One step of a dotted path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Object member lookup by name.
    Key(String),
    /// Array element lookup by position.
    Index(usize),
}

impl PathSegment {
    fn from_str(segment: &str) -> Self {
        // Digit-only segments address array positions; anything else,
        // including negative or mixed text, stays a key name.
        if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(index) = segment.parse::<usize>() {
                return PathSegment::Index(index);
            }
        }
        PathSegment::Key(segment.to_string())
    }
}

/// Splits a dotted path into tagged segments.
///
/// The empty path is invalid. Empty segments (`"a..b"`, leading or trailing
/// dots) parse into empty key names; the compiler decides whether those are
/// warnings or hard failures.
pub fn parse_path(path: &str) -> EngineResult<Vec<PathSegment>> {
    if path.is_empty() {
        return Err(EngineError::InvalidFieldPath {
            path: String::new(),
            detail: "path must be non-empty".to_string(),
        });
    }
    Ok(path.split('.').map(PathSegment::from_str).collect())
}

/// Counters for cache observability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
    pub capacity: usize,
}

struct CacheShard {
    map: HashMap<String, Arc<Vec<PathSegment>>>,
    // Front is least recently used. Promotion scans the queue, which is
    // linear but bounded by the small cache capacity.
    recency: VecDeque<String>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// Bounded LRU cache of parsed path segments.
///
/// Interior mutability keeps lookups callable from shared references; the
/// single mutex covers only the map update, satisfying the short-critical-
/// section requirement for engines shared across threads.
pub struct PathCache {
    shard: Mutex<CacheShard>,
    capacity: usize,
}

impl PathCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            shard: Mutex::new(CacheShard {
                map: HashMap::with_capacity(capacity),
                recency: VecDeque::with_capacity(capacity),
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
            capacity,
        }
    }

    /// Returns the shared segment list for `path`, parsing and inserting it
    /// on first sight. Re-parsing a cached path always yields a list
    /// structurally equal to the cached one, so sharing is sound.
    pub fn intern(&self, path: &str) -> EngineResult<Arc<Vec<PathSegment>>> {
        let mut shard = self.shard.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(segments) = shard.map.get(path).cloned() {
            shard.hits += 1;
            promote(&mut shard.recency, path);
            return Ok(segments);
        }

        let segments = Arc::new(parse_path(path)?);
        shard.misses += 1;

        if shard.map.len() >= self.capacity {
            if let Some(oldest) = shard.recency.pop_front() {
                shard.map.remove(&oldest);
                shard.evictions += 1;
            }
        }

        shard.map.insert(path.to_string(), Arc::clone(&segments));
        shard.recency.push_back(path.to_string());
        Ok(segments)
    }

    pub fn stats(&self) -> PathCacheStats {
        let shard = self.shard.lock().unwrap_or_else(|e| e.into_inner());
        PathCacheStats {
            hits: shard.hits,
            misses: shard.misses,
            evictions: shard.evictions,
            size: shard.map.len(),
            capacity: self.capacity,
        }
    }

    /// Drops every cached segment list and resets the counters. Compiled
    /// rules keep their own `Arc` handles, so clearing never invalidates an
    /// existing engine.
    pub fn clear(&self) {
        let mut shard = self.shard.lock().unwrap_or_else(|e| e.into_inner());
        shard.map.clear();
        shard.recency.clear();
        shard.hits = 0;
        shard.misses = 0;
        shard.evictions = 0;
    }

    pub fn len(&self) -> usize {
        self.shard
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .map
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn promote(recency: &mut VecDeque<String>, path: &str) {
    if let Some(pos) = recency.iter().position(|p| p == path) {
        if let Some(key) = recency.remove(pos) {
            recency.push_back(key);
        }
    }
}
