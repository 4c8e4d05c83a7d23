//! Recursive value extraction and injection across the tree.
//!
//! Extraction coerces empty leaf input to null, prunes null entries from
//! group mappings (unless asked to keep them), and keeps null entries in
//! list sequences because array positions are semantically meaningful.
//! Injection walks the *full* child set of a group (setting a value may
//! itself change what becomes active) and finishes each group with one
//! structural availability pass.

use serde_json::{Map, Value};

use crate::array;
use crate::dependency;
use crate::error::ValueError;
use crate::tree::{ChangeEvent, FieldTree, NodeId, NodeKind};
use crate::types::{GetOptions, SetOptions};

/// Extract the current value of the subtree rooted at `id`.
pub(crate) fn get_value(
    tree: &FieldTree,
    id: NodeId,
    options: &GetOptions,
) -> Result<Value, ValueError> {
    tree.ensure_live(id)?;
    let node = tree.node(id);
    match &node.kind {
        NodeKind::Leaf(leaf) => {
            let editor = leaf.editor.as_ref().ok_or_else(|| ValueError::NotRendered {
                path: node.path.clone(),
            })?;
            let coerced = coerce_null(editor.value());
            Ok(apply_hook(tree, leaf.deserialize.as_deref(), coerced))
        }
        NodeKind::Group(group) => {
            let mut out = Map::new();
            for &child in group.active() {
                let child_node = tree.node(child);
                if child_node.show_only() {
                    continue;
                }
                let value = get_value(tree, child, options)?;
                if value.is_null() && !options.keep_null_values {
                    continue;
                }
                out.insert(child_node.name.clone(), value);
            }
            Ok(Value::Object(out))
        }
        NodeKind::List(list) => {
            let mut out = Vec::with_capacity(list.items().len());
            for &item in list.items() {
                // Null entries stay: dropping them would corrupt indices.
                out.push(get_value(tree, item, options)?);
            }
            Ok(Value::Array(out))
        }
        NodeKind::Item(item) => get_value(tree, item.inner(), options),
    }
}

/// Non-failing value read used by condition evaluation.
///
/// A leaf without an editor reads as `None` (undefined), which is how
/// initial activation is computed before the tree is rendered.
pub(crate) fn peek_value(tree: &FieldTree, id: NodeId) -> Option<Value> {
    let node = tree.node(id);
    if node.is_detached() {
        return None;
    }
    match &node.kind {
        NodeKind::Leaf(leaf) => {
            let editor = leaf.editor.as_ref()?;
            let coerced = coerce_null(editor.value());
            Some(apply_hook(tree, leaf.deserialize.as_deref(), coerced))
        }
        NodeKind::Group(group) => {
            let mut out = Map::new();
            for &child in group.active() {
                let child_node = tree.node(child);
                if child_node.show_only() {
                    continue;
                }
                if let Some(value) = peek_value(tree, child) {
                    if !value.is_null() {
                        out.insert(child_node.name.clone(), value);
                    }
                }
            }
            Some(Value::Object(out))
        }
        NodeKind::List(list) => Some(Value::Array(
            list.items()
                .iter()
                .map(|&item| peek_value(tree, item).unwrap_or(Value::Null))
                .collect(),
        )),
        NodeKind::Item(item) => peek_value(tree, item.inner()),
    }
}

/// Inject `value` into the subtree rooted at `id`.
pub(crate) fn set_value(
    tree: &mut FieldTree,
    id: NodeId,
    value: &Value,
    options: &SetOptions,
) -> Result<(), ValueError> {
    tree.ensure_live(id)?;

    enum Shape {
        Leaf,
        Group,
        List,
        Item(NodeId),
    }
    let shape = match &tree.node(id).kind {
        NodeKind::Leaf(_) => Shape::Leaf,
        NodeKind::Group(_) => Shape::Group,
        NodeKind::List(_) => Shape::List,
        NodeKind::Item(item) => Shape::Item(item.inner()),
    };

    match shape {
        Shape::Leaf => set_leaf(tree, id, value),
        Shape::Group => set_group(tree, id, value, options),
        Shape::List => set_list(tree, id, value, options),
        Shape::Item(inner) => set_value(tree, inner, value, options),
    }
}

fn set_leaf(tree: &mut FieldTree, id: NodeId, value: &Value) -> Result<(), ValueError> {
    let (path, serialize) = {
        let node = tree.node(id);
        let serialize = node.as_leaf().and_then(|leaf| leaf.serialize.clone());
        (node.path.clone(), serialize)
    };

    let prepared = match serialize.as_deref().and_then(|name| tree.registry.transform(name)) {
        Some(transform) => transform(value.clone()),
        None => value.clone(),
    };

    match tree.node_mut(id).as_leaf_mut() {
        Some(leaf) => match leaf.editor.as_mut() {
            Some(editor) => editor.set_value(prepared),
            None => Err(ValueError::NotRendered { path }),
        },
        None => Ok(()),
    }
}

fn set_group(
    tree: &mut FieldTree,
    id: NodeId,
    value: &Value,
    options: &SetOptions,
) -> Result<(), ValueError> {
    let children: Vec<(NodeId, String)> = match tree.node(id).as_group() {
        Some(group) => group
            .children()
            .iter()
            .map(|&child| (child, tree.node(child).name.clone()))
            .collect(),
        None => Vec::new(),
    };

    for (child, name) in children {
        match value.get(&name) {
            Some(entry) => set_value(tree, child, entry, options)?,
            None if options.ignore_missing_value => continue,
            None => set_value(tree, child, &Value::Null, options)?,
        }
    }

    // One structural pass so activation reflects the newly-set values.
    dependency::reevaluate(tree, id, None, true);
    Ok(())
}

fn set_list(
    tree: &mut FieldTree,
    id: NodeId,
    value: &Value,
    options: &SetOptions,
) -> Result<(), ValueError> {
    // Item identity is discarded and rebuilt wholesale; in-place patching
    // of existing items is out of scope.
    array::clear_items(tree, id)?;

    let elements = value.as_array().cloned().unwrap_or_default();
    for element in &elements {
        let item = array::append_item(tree, id)?;
        set_value(tree, item, element, options)?;
    }

    let path = tree.node(id).path.clone();
    tree.push_event(ChangeEvent::Structure { list: id, path });
    Ok(())
}

fn coerce_null(value: Value) -> Value {
    match value {
        Value::String(s) if s.is_empty() => Value::Null,
        other => other,
    }
}

fn apply_hook(tree: &FieldTree, name: Option<&str>, value: Value) -> Value {
    match name.and_then(|n| tree.registry.transform(n)) {
        Some(transform) => transform(value),
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::EditorRegistry;
    use crate::FieldTree;
    use serde_json::json;

    fn compile(schema: Value) -> FieldTree {
        let mut tree = FieldTree::compile(&schema, EditorRegistry::with_defaults()).unwrap();
        tree.render().unwrap();
        tree
    }

    fn person() -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "age": { "type": "integer" }
            }
        })
    }

    #[test]
    fn value_access_before_render_fails() {
        let tree = FieldTree::compile(&person(), EditorRegistry::with_defaults()).unwrap();
        let result = tree.get_value(tree.root(), &GetOptions::default());
        assert!(matches!(result, Err(ValueError::NotRendered { .. })));

        let mut tree = FieldTree::compile(&person(), EditorRegistry::with_defaults()).unwrap();
        let root = tree.root();
        let result = tree.set_value(root, &json!({"name": "Ann"}), &SetOptions::default());
        assert!(matches!(result, Err(ValueError::NotRendered { .. })));
    }

    #[test]
    fn null_entries_are_pruned_from_groups() {
        let mut tree = compile(person());
        let root = tree.root();
        tree.set_value(root, &json!({"name": "Ann"}), &SetOptions::default())
            .unwrap();

        let value = tree.get_value(root, &GetOptions::default()).unwrap();
        assert_eq!(value, json!({"name": "Ann"}));
    }

    #[test]
    fn keep_null_values_retains_entries() {
        let mut tree = compile(person());
        let root = tree.root();
        tree.set_value(root, &json!({"name": "Ann"}), &SetOptions::default())
            .unwrap();

        let value = tree
            .get_value(root, &GetOptions::new().keep_null_values(true))
            .unwrap();
        assert_eq!(value, json!({"name": "Ann", "age": null}));
    }

    #[test]
    fn empty_string_coerces_to_null() {
        let mut tree = compile(person());
        let root = tree.root();
        tree.set_value(root, &json!({"name": ""}), &SetOptions::default())
            .unwrap();

        let value = tree.get_value(root, &GetOptions::default()).unwrap();
        assert_eq!(value, json!({}));
    }

    #[test]
    fn show_only_fields_never_appear_in_output() {
        let mut tree = compile(json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "summary": { "type": "string", "showOnly": true }
            }
        }));
        let root = tree.root();
        let summary = tree.resolve("/summary").unwrap();
        tree.set_value(summary, &json!("visible but not extracted"), &SetOptions::default())
            .unwrap();

        let value = tree
            .get_value(root, &GetOptions::new().keep_null_values(true))
            .unwrap();
        assert!(value.get("summary").is_none());
    }

    #[test]
    fn array_nulls_are_kept() {
        let mut tree = compile(json!({
            "type": "object",
            "properties": {
                "rows": {
                    "type": "array",
                    "items": { "type": "string" }
                }
            }
        }));
        let root = tree.root();
        tree.set_value(
            root,
            &json!({"rows": ["a", null, "c"]}),
            &SetOptions::default(),
        )
        .unwrap();

        let value = tree.get_value(root, &GetOptions::default()).unwrap();
        assert_eq!(value["rows"], json!(["a", null, "c"]));
    }

    #[test]
    fn ignore_missing_value_skips_absent_keys() {
        let mut tree = compile(person());
        let root = tree.root();
        tree.set_value(root, &json!({"name": "Ann", "age": 40}), &SetOptions::default())
            .unwrap();

        // Default: absent keys leave current input untouched.
        tree.set_value(root, &json!({"name": "Bea"}), &SetOptions::default())
            .unwrap();
        let value = tree.get_value(root, &GetOptions::default()).unwrap();
        assert_eq!(value, json!({"name": "Bea", "age": 40}));

        // Opting out resets absent keys to null.
        tree.set_value(
            root,
            &json!({"name": "Cal"}),
            &SetOptions::new().ignore_missing_value(false),
        )
        .unwrap();
        let value = tree.get_value(root, &GetOptions::default()).unwrap();
        assert_eq!(value, json!({"name": "Cal"}));
    }

    #[test]
    fn set_rebuilds_list_items() {
        let mut tree = compile(json!({
            "type": "object",
            "properties": {
                "rows": {
                    "type": "array",
                    "items": { "type": "string" }
                }
            }
        }));
        let root = tree.root();
        let list = tree.resolve("/rows").unwrap();

        tree.set_value(root, &json!({"rows": ["a", "b"]}), &SetOptions::default())
            .unwrap();
        let first_generation = tree.node(list).as_list().unwrap().items().to_vec();

        tree.set_value(root, &json!({"rows": ["c"]}), &SetOptions::default())
            .unwrap();
        let second_generation = tree.node(list).as_list().unwrap().items().to_vec();

        assert_eq!(second_generation.len(), 1);
        // Identity is rebuilt, and the old items are detached.
        assert!(!second_generation.contains(&first_generation[0]));
        assert!(tree.node(first_generation[0]).is_detached());

        let value = tree.get_value(root, &GetOptions::default()).unwrap();
        assert_eq!(value["rows"], json!(["c"]));
    }

    #[test]
    fn null_list_value_empties_the_list() {
        let mut tree = compile(json!({
            "type": "object",
            "properties": {
                "rows": { "type": "array", "items": { "type": "string" } }
            }
        }));
        let root = tree.root();
        tree.set_value(root, &json!({"rows": ["a"]}), &SetOptions::default())
            .unwrap();
        tree.set_value(
            root,
            &json!({"rows": null}),
            &SetOptions::new().ignore_missing_value(false),
        )
        .unwrap();

        let value = tree.get_value(root, &GetOptions::default()).unwrap();
        assert_eq!(value["rows"], json!([]));
    }

    #[test]
    fn serialize_and_deserialize_hooks_apply() {
        let mut tree = compile(json!({
            "type": "object",
            "properties": {
                "tags": {
                    "type": ["array", "null"],
                    "editor": "text",
                    "serialize": "csv.join",
                    "deserialize": "csv.split"
                }
            }
        }));
        let root = tree.root();
        let tags = tree.resolve("/tags").unwrap();

        tree.set_value(root, &json!({"tags": ["red", "green"]}), &SetOptions::default())
            .unwrap();

        // The editor buffer holds the serialized text form.
        let leaf = tree.node(tags).as_leaf().unwrap();
        assert_eq!(leaf.editor().unwrap().value(), json!("red, green"));

        // Extraction applies the deserialize hook.
        let value = tree.get_value(root, &GetOptions::default()).unwrap();
        assert_eq!(value["tags"], json!(["red", "green"]));
    }

    #[test]
    fn select_editor_rejects_invalid_value_on_set() {
        let mut tree = compile(json!({
            "type": "object",
            "properties": {
                "color": {
                    "type": "string",
                    "enum": ["red", "green"],
                    "optionLabels": ["Red", "Green"]
                }
            }
        }));
        let root = tree.root();
        let result = tree.set_value(root, &json!({"color": "blue"}), &SetOptions::default());
        assert!(matches!(result, Err(ValueError::InvalidSelection { .. })));
    }

    #[test]
    fn inactive_children_are_excluded_but_still_settable() {
        let mut tree = compile(json!({
            "type": "object",
            "properties": {
                "mode": { "type": "string" },
                "extra": { "type": "string", "availableIf": { "mode": "on" } }
            }
        }));
        let root = tree.root();

        // Bulk set writes the inactive child too, then the structural
        // pass activates it based on the new values.
        tree.set_value(
            root,
            &json!({"mode": "on", "extra": "kept"}),
            &SetOptions::default(),
        )
        .unwrap();
        let value = tree.get_value(root, &GetOptions::default()).unwrap();
        assert_eq!(value, json!({"mode": "on", "extra": "kept"}));

        tree.set_value(root, &json!({"mode": "off"}), &SetOptions::default())
            .unwrap();
        let value = tree.get_value(root, &GetOptions::default()).unwrap();
        assert_eq!(value, json!({"mode": "off"}));
    }
}
