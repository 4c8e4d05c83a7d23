//! Core types and keyword tables for field-tree compilation.

use serde_json::Value;

/// Schema extension keywords consumed by the field tree.
///
/// These are stripped before handing a schema to a stock JSON-Schema
/// validator (see [`crate::validator::strip_extensions`]).
pub const EXTENSION_KEYWORDS: &[&str] = &[
    "editor",
    "optionLabels",
    "inputAttributes",
    "showOnly",
    "serialize",
    "deserialize",
    "availableIf",
    "templateName",
];

/// Editor kinds the default registry ships with.
pub const BUILTIN_EDITOR_KINDS: &[&str] = &["text", "checkbox", "select", "date"];

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Stringify a value the way pattern conditions and message rendering see it.
///
/// Null renders as the empty string; strings render bare; everything else
/// renders as compact JSON.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Returns true if the schema's declared `type` includes `name`.
///
/// Handles both the string form (`"type": "array"`) and the list form
/// (`"type": ["array", "null"]`).
pub fn type_includes(schema: &Value, name: &str) -> bool {
    match schema.get("type") {
        Some(Value::String(t)) => t == name,
        Some(Value::Array(ts)) => ts.iter().any(|t| t.as_str() == Some(name)),
        _ => false,
    }
}

/// Options for value extraction.
#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    /// Keep mapping entries whose value resolved to null instead of
    /// dropping them. Off by default (null-pruning).
    pub keep_null_values: bool,
}

impl GetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep null-valued mapping entries in the output.
    pub fn keep_null_values(mut self, keep: bool) -> Self {
        self.keep_null_values = keep;
        self
    }
}

/// Options for value injection.
#[derive(Debug, Clone)]
pub struct SetOptions {
    /// Skip children whose key is absent from the incoming mapping instead
    /// of resetting them to null. On by default.
    pub ignore_missing_value: bool,
}

impl Default for SetOptions {
    fn default() -> Self {
        Self {
            ignore_missing_value: true,
        }
    }
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset children missing from the incoming mapping to null.
    pub fn ignore_missing_value(mut self, ignore: bool) -> Self {
        self.ignore_missing_value = ignore;
        self
    }
}

/// Field names of incoming error objects consumed by the error router.
#[derive(Debug, Clone)]
pub struct ErrorFields {
    /// Field carrying the JSON Pointer. Default `dataPath`.
    pub pointer: String,
    /// Field carrying the message. Default `message`.
    pub message: String,
}

impl Default for ErrorFields {
    fn default() -> Self {
        Self {
            pointer: "dataPath".to_string(),
            message: "message".to_string(),
        }
    }
}
