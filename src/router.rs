//! Routing of externally produced validation errors onto tree nodes.
//!
//! Incoming errors are plain JSON objects; which fields carry the pointer
//! and the message is configurable (default `dataPath`/`message`).
//! Errors sharing a pointer are combined into one composite message
//! rather than dropping all but the first.

use serde_json::Value;

use crate::error::PointerError;
use crate::pointer;
use crate::tree::{FieldTree, NodeId};
use crate::types::{value_to_string, ErrorFields};

/// Separator between combined messages for one pointer.
const MESSAGE_SEPARATOR: &str = "; ";

/// Resolve each error's pointer and attach the (possibly combined)
/// message to the addressed node.
///
/// Resolution is all-or-nothing: if any pointer fails to resolve, no
/// message is attached.
///
/// # Errors
///
/// Returns `PointerError` when a pointer does not address a node of this
/// tree; the caller is responsible for producing pointers consistent
/// with the compiled tree.
pub(crate) fn set_errors(
    tree: &mut FieldTree,
    errors: &[Value],
    fields: &ErrorFields,
) -> Result<(), PointerError> {
    // Group by pointer, preserving first-appearance order.
    let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
    for error in errors {
        let pointer = error
            .get(&fields.pointer)
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let message = match error.get(&fields.message) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => value_to_string(other),
            None => "invalid value".to_string(),
        };
        match grouped.iter_mut().find(|(p, _)| *p == pointer) {
            Some((_, messages)) => messages.push(message),
            None => grouped.push((pointer, vec![message])),
        }
    }

    // Resolve everything before attaching anything.
    let mut resolved: Vec<(NodeId, String)> = Vec::with_capacity(grouped.len());
    for (ptr, messages) in grouped {
        let node = pointer::resolve(tree, tree.root(), &ptr)?;
        resolved.push((node, messages.join(MESSAGE_SEPARATOR)));
    }

    for (node, message) in resolved {
        tree.node_mut(node).error = Some(message);
    }
    Ok(())
}

/// Clear the attached message from every node under the root.
pub(crate) fn clear_errors(tree: &mut FieldTree) {
    for id in pointer::enumerate_fields(tree, tree.root()) {
        tree.node_mut(id).error = None;
    }
}
