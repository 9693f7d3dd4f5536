//! Resolves parsed paths against record values.

use serde_json::Value;

use crate::path_cache::PathSegment;

/// Walks `segments` from `root`, returning the resolved value or `None` for
/// any path that does not fully resolve (*absent*).
///
/// Key segments only look up object members; index segments only look up
/// array elements within bounds. A key segment applied to an array, or an
/// index segment applied to an object, is absent rather than an error.
pub fn extract<'a>(root: &'a Value, segments: &[PathSegment]) -> Option<&'a Value> {
    let mut current = root;
    for segment in segments {
        current = match (segment, current) {
            (PathSegment::Key(name), Value::Object(map)) => map.get(name)?,
            (PathSegment::Index(index), Value::Array(items)) => items.get(*index)?,
            _ => return None,
        };
    }
    Some(current)
}
