//! Engine failure kinds.
//!
//! Two failure channels exist and never mix: data that does not satisfy a
//! rule is reported inside [`crate::rule::ValidationReport::errors`], while
//! programming and operational failures travel through [`EngineError`].

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

/// Structured engine failure.
///
/// Compile-time kinds (`UnknownOp`, `BadParameterType`, `InvalidFieldPath`)
/// surface from [`crate::engine::Engine::new`]; the remaining kinds surface
/// from the `validate*` entry points.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Rule references an operation missing from the predicate registry.
    #[error("unknown operation '{op}'")]
    UnknownOp { op: String },

    /// A frozen rule parameter does not satisfy the predicate's schema.
    #[error("invalid parameter '{param}' for operation '{op}': {detail}")]
    BadParameterType {
        op: String,
        param: String,
        detail: String,
    },

    /// A rule field path cannot be split into usable segments.
    #[error("invalid field path '{path}': {detail}")]
    InvalidFieldPath { path: String, detail: String },

    /// `validate*` was called with a record that is not a mapping.
    #[error("record must be an object, got {got}")]
    BadInput { got: String },

    /// A callback name was supplied that is not in the callback registry.
    #[error("unknown callback '{name}'")]
    UnknownCallback { name: String },

    /// A callback reference is neither a function, a registered name, nor
    /// absent.
    #[error("callback must be a function or a registered callback name")]
    BadCallbackKind,

    /// A predicate observed a violated precondition while evaluating. This
    /// is a programming error, not a validation outcome.
    #[error("predicate '{op}' failed: {detail}")]
    PredicateInternal { op: String, detail: String },

    /// A cooperative cancellation signal was observed between rules.
    #[error("validation cancelled")]
    Cancelled,
}

impl EngineError {
    /// Stable machine-readable tag for the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::UnknownOp { .. } => "UnknownOp",
            EngineError::BadParameterType { .. } => "BadParameterType",
            EngineError::InvalidFieldPath { .. } => "InvalidFieldPath",
            EngineError::BadInput { .. } => "BadInput",
            EngineError::UnknownCallback { .. } => "UnknownCallback",
            EngineError::BadCallbackKind => "BadCallbackKind",
            EngineError::PredicateInternal { .. } => "PredicateInternal",
            EngineError::Cancelled => "Cancelled",
        }
    }

    pub(crate) fn bad_input(value: &serde_json::Value) -> Self {
        let got = match value {
            serde_json::Value::Null => "null",
            serde_json::Value::Bool(_) => "a boolean",
            serde_json::Value::Number(_) => "a number",
            serde_json::Value::String(_) => "a string",
            serde_json::Value::Array(_) => "an array",
            serde_json::Value::Object(_) => "an object",
        };
        EngineError::BadInput {
            got: got.to_string(),
        }
    }

    pub(crate) fn predicate_internal(op: &str, detail: impl Into<String>) -> Self {
        EngineError::PredicateInternal {
            op: op.to_string(),
            detail: detail.into(),
        }
    }

    pub(crate) fn bad_parameter(op: &str, param: &str, detail: impl Into<String>) -> Self {
        EngineError::BadParameterType {
            op: op.to_string(),
            param: param.to_string(),
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_are_stable() {
        assert_eq!(
            EngineError::UnknownOp { op: "nope".into() }.kind(),
            "UnknownOp"
        );
        assert_eq!(EngineError::Cancelled.kind(), "Cancelled");
        assert_eq!(EngineError::BadCallbackKind.kind(), "BadCallbackKind");
    }

    #[test]
    fn bad_input_names_the_offending_type() {
        let err = EngineError::bad_input(&serde_json::json!([1, 2]));
        assert_eq!(err.to_string(), "record must be an object, got an array");
    }
}
