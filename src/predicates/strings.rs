//! String predicates: emptiness, substring checks, pattern and format
//! matching, and grapheme-aware length bounds.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use unicode_segmentation::UnicodeSegmentation;
use uuid::{Uuid, Variant};

use super::{
    as_finite_number, as_text, param, ParamSpec, PredicateCategory, PredicateDef, PredicateInput,
    PredicateResult,
};
use crate::error::EngineError;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

const URL_SCHEMES: &[&str] = &["http", "https", "ftp", "file", "ws", "wss", "ldap"];

pub(crate) fn defs() -> Vec<PredicateDef> {
    let text_param = || vec![param("value", ParamSpec::Text)];
    let length_param = || vec![param("value", ParamSpec::FiniteNumber)];

    vec![
        PredicateDef::sync("isEmpty", PredicateCategory::String, Vec::new(), is_empty)
            .handles_absent(),
        PredicateDef::sync("contains", PredicateCategory::String, text_param(), |i| {
            text_pair("contains", i, |v, p| v.contains(p))
        }),
        PredicateDef::sync("startsWith", PredicateCategory::String, text_param(), |i| {
            text_pair("startsWith", i, |v, p| v.starts_with(p))
        }),
        PredicateDef::sync("endsWith", PredicateCategory::String, text_param(), |i| {
            text_pair("endsWith", i, |v, p| v.ends_with(p))
        }),
        PredicateDef::sync(
            "regexMatch",
            PredicateCategory::String,
            vec![param("regex", ParamSpec::Pattern)],
            regex_match,
        ),
        PredicateDef::sync("isEmail", PredicateCategory::String, Vec::new(), |i| {
            text_check(i, |v| EMAIL_REGEX.is_match(v))
        }),
        PredicateDef::sync("isURL", PredicateCategory::String, Vec::new(), |i| {
            text_check(i, is_url)
        }),
        PredicateDef::sync("isUUID", PredicateCategory::String, Vec::new(), |i| {
            text_check(i, is_uuid)
        }),
        PredicateDef::sync("minLength", PredicateCategory::String, length_param(), |i| {
            length_check("minLength", i, |len, bound| len >= bound)
        }),
        PredicateDef::sync("maxLength", PredicateCategory::String, length_param(), |i| {
            length_check("maxLength", i, |len, bound| len <= bound)
        }),
    ]
}

/// Whitespace-only text counts as empty, and so do absent and null values;
/// any other non-text input is simply not empty.
fn is_empty(input: &PredicateInput<'_>) -> PredicateResult {
    Ok(match input.value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.trim().is_empty(),
        Some(_) => false,
    })
}

fn text_check(input: &PredicateInput<'_>, check: impl Fn(&str) -> bool) -> PredicateResult {
    Ok(input.value.and_then(as_text).map(&check).unwrap_or(false))
}

fn text_pair(
    op: &str,
    input: &PredicateInput<'_>,
    check: impl Fn(&str, &str) -> bool,
) -> PredicateResult {
    let needle = input
        .params
        .first()
        .and_then(as_text)
        .ok_or_else(|| EngineError::predicate_internal(op, "parameter is not text"))?;
    Ok(input
        .value
        .and_then(as_text)
        .map(|v| check(v, needle))
        .unwrap_or(false))
}

fn regex_match(input: &PredicateInput<'_>) -> PredicateResult {
    let pattern = input
        .regex
        .ok_or_else(|| EngineError::predicate_internal("regexMatch", "missing compiled pattern"))?;
    Ok(input
        .value
        .and_then(as_text)
        .map(|v| pattern.is_match(v))
        .unwrap_or(false))
}

fn is_url(text: &str) -> bool {
    match url::Url::parse(text) {
        Ok(parsed) => URL_SCHEMES.contains(&parsed.scheme()),
        Err(_) => false,
    }
}

/// Canonical 8-4-4-4-12 hex form, case-insensitive, with an RFC 4122
/// variant and a version digit in 1..=5. The shape check runs first because
/// the uuid crate also accepts braced, simple, and URN forms.
fn is_uuid(text: &str) -> bool {
    let canonical_shape = text.len() == 36
        && text
            .bytes()
            .enumerate()
            .all(|(i, b)| match i {
                8 | 13 | 18 | 23 => b == b'-',
                _ => b.is_ascii_hexdigit(),
            });
    if !canonical_shape {
        return false;
    }
    match Uuid::parse_str(text) {
        Ok(uuid) => {
            (1..=5).contains(&uuid.get_version_num()) && uuid.get_variant() == Variant::RFC4122
        }
        Err(_) => false,
    }
}

/// Length in grapheme clusters after trimming outer whitespace. Counting
/// depends on the unicode-segmentation crate's cluster rules; code points
/// that merge into one cluster (e.g. combining marks) count once.
fn length_check(
    op: &str,
    input: &PredicateInput<'_>,
    check: impl Fn(usize, usize) -> bool,
) -> PredicateResult {
    let bound = input
        .params
        .first()
        .and_then(as_finite_number)
        .filter(|n| *n >= 0.0)
        .ok_or_else(|| EngineError::predicate_internal(op, "length bound must be non-negative"))?
        as usize;
    Ok(input
        .value
        .and_then(as_text)
        .map(|v| check(v.trim().graphemes(true).count(), bound))
        .unwrap_or(false))
}
