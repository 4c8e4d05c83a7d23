//! Availability re-evaluation for object groups.
//!
//! Each group child may carry an `availableIf` condition: a single-entry
//! mapping from a sibling name to an expected value, a pattern object
//! (`{"pattern": "^x"}`), or a membership test for array-typed children.
//! Conditions are parsed and the pattern compiled once at tree-compile
//! time; evaluation reads sibling values fresh during the pass, in
//! declaration order, so chained dependencies (A gates B, B gates C)
//! settle within one pass.
//!
//! A sibling that is currently inactive reads as undefined rather than
//! erroring. A condition naming a sibling that does not exist at all is
//! rejected at compile time instead.

use regex::Regex;
use serde_json::Value;

use crate::error::SchemaError;
use crate::tree::{ChangeEvent, FieldTree, NodeId};
use crate::types::{json_type_name, type_includes, value_to_string};
use crate::value;

/// Compiled `availableIf` condition.
#[derive(Debug, Clone)]
pub(crate) struct Condition {
    /// Sibling name whose value gates the child.
    pub key: String,
    pub test: ConditionTest,
}

#[derive(Debug, Clone)]
pub(crate) enum ConditionTest {
    /// Match the stringified sibling value (empty string for undefined
    /// or null).
    Pattern(Regex),
    /// The sibling value contains the expected value as a member. Chosen
    /// when the dependent child's own declared type includes `array`.
    Contains(Value),
    /// Deep equality against the sibling value.
    Equals(Value),
}

/// Parse a child's `availableIf` keyword, if any.
///
/// # Errors
///
/// Returns `SchemaError` for non-object conditions, multi-entry mappings,
/// references to names outside the sibling set, and unparseable patterns.
pub(crate) fn parse_condition(
    schema: &Value,
    path: &str,
    sibling_names: &[String],
) -> Result<Option<Condition>, SchemaError> {
    let Some(condition) = schema.get("availableIf") else {
        return Ok(None);
    };

    let map = condition
        .as_object()
        .ok_or_else(|| SchemaError::ConditionNotObject {
            path: path.to_string(),
            actual: json_type_name(condition).to_string(),
        })?;

    if map.len() != 1 {
        return Err(SchemaError::ConditionMultipleKeys {
            path: path.to_string(),
            keys: map.keys().cloned().collect(),
        });
    }

    let Some((key, test)) = map.iter().next() else {
        return Ok(None);
    };

    if !sibling_names.iter().any(|name| name == key) {
        return Err(SchemaError::UnknownConditionKey {
            path: path.to_string(),
            key: key.clone(),
        });
    }

    Ok(Some(Condition {
        key: key.clone(),
        test: parse_test(test, schema, path)?,
    }))
}

fn parse_test(
    test: &Value,
    child_schema: &Value,
    path: &str,
) -> Result<ConditionTest, SchemaError> {
    if let Value::Object(map) = test {
        if map.len() == 1 {
            if let Some(Value::String(pattern)) = map.get("pattern") {
                let regex =
                    Regex::new(pattern).map_err(|source| SchemaError::InvalidPattern {
                        path: path.to_string(),
                        source,
                    })?;
                return Ok(ConditionTest::Pattern(regex));
            }
        }
    }
    if type_includes(child_schema, "array") {
        return Ok(ConditionTest::Contains(test.clone()));
    }
    Ok(ConditionTest::Equals(test.clone()))
}

/// Recompute a group's active child set.
///
/// `origin` is the name of the group's direct child whose value changed,
/// or `None` for a structural pass (after bulk set). When an origin is
/// given and no sibling condition references it, the pass is skipped
/// entirely: callers may rely on the absence of spurious notifications.
/// A pass already in progress for the same group suppresses nested
/// requests.
pub(crate) fn reevaluate(tree: &mut FieldTree, group: NodeId, origin: Option<&str>, emit: bool) {
    {
        let Some(state) = tree.node(group).as_group() else {
            return;
        };
        if state.evaluating {
            return;
        }
        if let Some(origin_name) = origin {
            let has_dependent = state
                .conditions
                .iter()
                .flatten()
                .any(|condition| condition.key == origin_name);
            if !has_dependent {
                return;
            }
        }
    }

    let (children, conditions, old_active) = {
        let Some(state) = tree.node_mut(group).as_group_mut() else {
            return;
        };
        state.evaluating = true;
        (
            state.children.clone(),
            state.conditions.clone(),
            state.active.clone(),
        )
    };

    let names: Vec<String> = children
        .iter()
        .map(|&child| tree.node(child).name.clone())
        .collect();

    let mut new_active: Vec<NodeId> = Vec::new();
    // Availability decided earlier in this pass, by name. Later children
    // see these fresh decisions, not the pre-pass snapshot.
    let mut decided: Vec<(&str, bool)> = Vec::with_capacity(children.len());

    for (i, &child) in children.iter().enumerate() {
        let available = match &conditions[i] {
            None => true,
            Some(condition) => {
                let value = names
                    .iter()
                    .position(|name| name == &condition.key)
                    .and_then(|pos| {
                        let sibling = children[pos];
                        let sibling_active = decided
                            .iter()
                            .find(|(name, _)| *name == condition.key)
                            .map(|(_, active)| *active)
                            .unwrap_or_else(|| old_active.contains(&sibling));
                        if sibling_active {
                            value::peek_value(tree, sibling)
                        } else {
                            None
                        }
                    });
                evaluate_test(&condition.test, value.as_ref())
            }
        };
        if available {
            new_active.push(child);
        }
        decided.push((names[i].as_str(), available));
    }

    let activated: Vec<NodeId> = new_active
        .iter()
        .copied()
        .filter(|id| !old_active.contains(id))
        .collect();
    let deactivated: Vec<NodeId> = old_active
        .iter()
        .copied()
        .filter(|id| !new_active.contains(id))
        .collect();
    let changed = !activated.is_empty() || !deactivated.is_empty();

    if let Some(state) = tree.node_mut(group).as_group_mut() {
        state.active = new_active.clone();
        state.evaluating = false;
    }

    if emit && changed {
        let path = tree.node(group).path.clone();
        tree.push_event(ChangeEvent::Activation {
            group,
            path,
            activated,
            deactivated,
            active: new_active,
        });
    }
}

fn evaluate_test(test: &ConditionTest, value: Option<&Value>) -> bool {
    match test {
        ConditionTest::Pattern(regex) => {
            let text = value.map(value_to_string).unwrap_or_default();
            regex.is_match(&text)
        }
        ConditionTest::Contains(expected) => match value {
            Some(Value::Array(items)) => items.contains(expected),
            _ => false,
        },
        ConditionTest::Equals(expected) => value == Some(expected),
    }
}
