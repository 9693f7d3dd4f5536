//! Declarative rules and validation reports.
//!
//! A [`Rule`] is the serializable unit of configuration: a dotted field
//! path, a predicate name, frozen parameters, and display metadata. A
//! [`ValidationReport`] is the serializable outcome of one `validate*`
//! call. Both match the wire shapes other implementations of the same
//! rule vocabulary produce, so rule documents are interchangeable.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Declarative binding of a field path to a named predicate.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use veritor::rule::Rule;
///
/// let rule = Rule::new("age", "gte")
///     .param("value", json!(18))
///     .code("AGE_LOW")
///     .message("must be an adult");
/// assert_eq!(rule.field, "age");
/// assert!(!rule.negative);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub field: String,
    pub op: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub negative: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Rule {
    pub fn new(field: impl Into<String>, op: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op: op.into(),
            params: BTreeMap::new(),
            negative: false,
            message: None,
            code: None,
        }
    }

    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    /// Inverts the predicate outcome (logical XOR at evaluation time).
    #[must_use]
    pub fn negative(mut self) -> Self {
        self.negative = true;
        self
    }

    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// One failure entry under a field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl FieldError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(code.into()),
        }
    }
}

/// Field-keyed error lists preserving insertion order.
///
/// Errors for a field appear in rule-definition order, and fields appear in
/// the order their first error was recorded. A `BTreeMap` or `HashMap`
/// would lose that ordering, so the map is a thin wrapper over a vector of
/// entries; lookups scan, which is fine at realistic rule counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorMap {
    entries: Vec<(String, Vec<FieldError>)>,
}

impl ErrorMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of fields carrying at least one error.
    pub fn field_count(&self) -> usize {
        self.entries.len()
    }

    /// Total error count across all fields.
    pub fn total_errors(&self) -> usize {
        self.entries.iter().map(|(_, list)| list.len()).sum()
    }

    pub fn get(&self, field: &str) -> Option<&[FieldError]> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, list)| list.as_slice())
    }

    /// Appends an error to the field's list, creating the entry on first use.
    pub fn push(&mut self, field: &str, error: FieldError) {
        match self.entries.iter_mut().find(|(name, _)| name == field) {
            Some((_, list)) => list.push(error),
            None => self.entries.push((field.to_string(), vec![error])),
        }
    }

    /// Inserts a pre-allocated list for a field. Used by the buffer pool to
    /// seed entries with recycled vectors.
    pub(crate) fn insert_entry(&mut self, field: String, list: Vec<FieldError>) {
        self.entries.push((field, list));
    }

    pub(crate) fn entry_mut(&mut self, field: &str) -> Option<&mut Vec<FieldError>> {
        self.entries
            .iter_mut()
            .find(|(name, _)| name == field)
            .map(|(_, list)| list)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[FieldError])> {
        self.entries
            .iter()
            .map(|(name, list)| (name.as_str(), list.as_slice()))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drains the entries, handing each field's vector back to the caller.
    pub(crate) fn drain_entries(&mut self) -> Vec<(String, Vec<FieldError>)> {
        std::mem::take(&mut self.entries)
    }
}

impl Serialize for ErrorMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (field, list) in &self.entries {
            map.serialize_entry(field, list)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ErrorMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ErrorMapVisitor;

        impl<'de> Visitor<'de> for ErrorMapVisitor {
            type Value = ErrorMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of field paths to error lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((field, list)) = access.next_entry::<String, Vec<FieldError>>()? {
                    entries.push((field, list));
                }
                Ok(ErrorMap { entries })
            }
        }

        deserializer.deserialize_map(ErrorMapVisitor)
    }
}

/// Outcome of validating one record.
///
/// `data` carries the original record unchanged; an empty `errors` map is
/// equivalent to `is_valid == true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub data: Value,
    pub errors: ErrorMap,
}

impl ValidationReport {
    pub fn passed(data: Value) -> Self {
        Self {
            is_valid: true,
            data,
            errors: ErrorMap::new(),
        }
    }
}
