//! Error types for field-tree compilation, addressing, and value access.

use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

/// Errors during schema compilation.
///
/// All of these are fatal: a schema that trips one of them cannot be
/// compiled into a field tree.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema at {path:?} has no \"type\"")]
    MissingType { path: String },

    #[error("invalid \"editor\" at {path:?}: expected string, got {actual}")]
    InvalidEditor { path: String, actual: String },

    #[error("unknown editor kind \"{kind}\" at {path:?}")]
    UnknownEditor { path: String, kind: String },

    #[error("array schema at {path:?} requires an object \"items\" schema, got {actual}")]
    InvalidItems { path: String, actual: String },

    #[error("invalid \"availableIf\" at {path:?}: expected single-entry object, got {actual}")]
    ConditionNotObject { path: String, actual: String },

    #[error("\"availableIf\" at {path:?} must have exactly one entry, got {}", keys.join(", "))]
    ConditionMultipleKeys { path: String, keys: Vec<String> },

    #[error("\"availableIf\" at {path:?} references unknown sibling \"{key}\"")]
    UnknownConditionKey { path: String, key: String },

    #[error("invalid \"availableIf\" pattern at {path:?}: {source}")]
    InvalidPattern {
        path: String,
        #[source]
        source: regex::Error,
    },

    #[error("schema at {path:?} declares \"enum\" without \"optionLabels\"")]
    MissingOptionLabels { path: String },

    #[error("schema at {path:?} declares \"optionLabels\" without \"enum\"")]
    OptionLabelsWithoutEnum { path: String },

    #[error("schema at {path:?} has {labels} option labels for {options} enum values")]
    OptionLabelsLength {
        path: String,
        labels: usize,
        options: usize,
    },

    #[error("invalid \"{keyword}\" at {path:?}: expected a transform name, got {actual}")]
    InvalidHook {
        path: String,
        keyword: &'static str,
        actual: String,
    },

    #[error("unknown transform \"{name}\" at {path:?}")]
    UnknownTransform { path: String, name: String },

    #[error("\"{keyword}\" at {path:?} is only allowed on leaf fields")]
    HookOnContainer {
        path: String,
        keyword: &'static str,
    },

    #[error("invalid schema: {message}")]
    Invalid { message: String },
}

/// Errors during JSON Pointer resolution.
#[derive(Debug, Error)]
pub enum PointerError {
    #[error("pointer {pointer:?}: no field named \"{token}\"")]
    UnknownField { pointer: String, token: String },

    #[error("pointer {pointer:?}: \"{token}\" is not a valid array index")]
    BadIndex { pointer: String, token: String },

    #[error("pointer {pointer:?}: index {index} out of range (list has {len} items)")]
    IndexOutOfRange {
        pointer: String,
        index: usize,
        len: usize,
    },

    #[error("pointer {pointer:?}: cannot descend into \"{token}\" at {path:?}")]
    NotAContainer {
        pointer: String,
        token: String,
        path: String,
    },
}

/// Errors during value access and structural mutation.
///
/// `NotRendered`, `Detached`, and the array-op misuse variants are
/// programmer errors: the caller violated an ordering or addressing
/// contract. `InvalidSelection` is a data error from a selection editor.
#[derive(Debug, Error)]
pub enum ValueError {
    #[error("node at {path:?} has no editor attached yet")]
    NotRendered { path: String },

    #[error("node at {path:?} has been removed from the tree")]
    Detached { path: String },

    #[error("value {value} at {path:?} is not one of the declared options")]
    InvalidSelection { path: String, value: Value },

    #[error("array operation on {actual} node at {path:?}")]
    NotAList { path: String, actual: &'static str },

    #[error("node at {path:?} is not an item of this list")]
    NotAnItem { path: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Errors during whole-tree validation.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error(transparent)]
    Value(#[from] ValueError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Pointer(#[from] PointerError),

    #[error("validation failed with {} error(s)", errors.len())]
    Invalid { errors: Vec<FieldError> },
}

/// Errors while loading a schema document.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },
}

/// Single routed validation error with pointer context.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FieldError {
    /// JSON Pointer (RFC 6901) to the invalid field.
    #[serde(rename = "dataPath")]
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl SchemaError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

impl PointerError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

impl ValueError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

impl ValidateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ValidateError::Invalid { .. } => 1,
            _ => 2,
        }
    }
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::InvalidJson { .. } => 2,
            _ => 3, // IO
        }
    }
}
