//! Validation adapter around the `jsonschema` crate.
//!
//! The core never validates data itself; it only attaches pre-computed
//! errors. This module is the bridge: strip the UI extension keywords so
//! a stock validator accepts the schema, validate an extracted value, and
//! route the resulting errors back onto the tree.

use serde_json::{Map, Value};

use crate::error::{FieldError, SchemaError, ValidateError};
use crate::tree::FieldTree;
use crate::types::{ErrorFields, GetOptions, EXTENSION_KEYWORDS};

/// Strip the field-tree extension keywords from a schema, recursively.
///
/// The result is a plain JSON Schema suitable for a stock validator.
pub fn strip_extensions(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => {
            let mut result = Map::new();
            for (key, value) in map {
                if !EXTENSION_KEYWORDS.contains(&key.as_str()) {
                    result.insert(key.clone(), strip_extensions(value));
                }
            }
            Value::Object(result)
        }
        Value::Array(items) => Value::Array(items.iter().map(strip_extensions).collect()),
        other => other.clone(),
    }
}

/// Validate a value against an already-stripped schema.
///
/// Returns the collected errors; an empty list means the value is valid.
///
/// # Errors
///
/// Returns `SchemaError::Invalid` if the schema itself is rejected by the
/// validator.
pub fn validate_value(schema: &Value, value: &Value) -> Result<Vec<FieldError>, SchemaError> {
    let validator = jsonschema::validator_for(schema).map_err(|e| SchemaError::Invalid {
        message: e.to_string(),
    })?;

    Ok(validator
        .iter_errors(value)
        .map(|e| FieldError {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect())
}

/// Extract the tree's current value, validate it against the tree's own
/// schema, and route the errors onto the nodes.
///
/// Previously attached messages are cleared first, so a clean run leaves
/// the tree without any.
///
/// # Errors
///
/// Returns `ValidateError::Invalid` carrying the routed errors when the
/// value fails validation, or the underlying error when extraction,
/// schema compilation, or routing fails.
pub fn validate_tree(tree: &mut FieldTree) -> Result<(), ValidateError> {
    let value = tree.get_value(tree.root(), &GetOptions::default())?;
    let schema = strip_extensions(&tree.node(tree.root()).schema);
    let errors = validate_value(&schema, &value)?;

    tree.clear_errors();
    if errors.is_empty() {
        return Ok(());
    }

    let objects: Vec<Value> = errors
        .iter()
        .map(|e| serde_json::to_value(e).unwrap_or(Value::Null))
        .collect();
    tree.set_errors(&objects, &ErrorFields::default())?;

    Err(ValidateError::Invalid { errors })
}
