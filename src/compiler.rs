//! Schema compilation: turns a JSON-Schema fragment into tree nodes.
//!
//! One `match` per schema shape selects the node variant, in contract
//! order: an `editor` hint always wins, then `object` builds a group,
//! `array` builds a list, and everything else becomes a leaf field whose
//! editor kind is inferred (`enum` → select, boolean → checkbox,
//! `format: "date"` → date unless the registry reports a native date
//! input, else text).
//!
//! Every statically detectable schema defect is rejected here, so the
//! rest of the core can assume a well-formed tree.

use serde_json::{Map, Value};

use crate::dependency;
use crate::editor::EditorRegistry;
use crate::error::SchemaError;
use crate::tree::{ArrayItem, ArrayList, LeafField, Node, NodeId, NodeKind, ObjectGroup};
use crate::types::json_type_name;

/// Build the node for `schema` (and, recursively, its children) into the
/// arena. Returns the new node's id.
pub(crate) fn build_node(
    nodes: &mut Vec<Node>,
    registry: &EditorRegistry,
    schema: &Value,
    name: &str,
    path: &str,
    parent: Option<NodeId>,
) -> Result<NodeId, SchemaError> {
    if schema.get("type").is_none() {
        return Err(SchemaError::MissingType {
            path: path.to_string(),
        });
    }

    if let Some(hint) = schema.get("editor") {
        let kind = hint.as_str().ok_or_else(|| SchemaError::InvalidEditor {
            path: path.to_string(),
            actual: json_type_name(hint).to_string(),
        })?;
        return build_leaf(nodes, registry, schema, name, path, parent, kind.to_string());
    }

    match schema.get("type").and_then(Value::as_str) {
        Some("object") => build_group(nodes, registry, schema, name, path, parent),
        Some("array") => build_list(nodes, registry, schema, name, path, parent),
        _ => {
            let kind = infer_editor_kind(schema, registry);
            build_leaf(nodes, registry, schema, name, path, parent, kind)
        }
    }
}

/// Editor-kind inference for leaves without an `editor` hint.
///
/// The order of checks is schema-compatibility contract: `enum` first,
/// then boolean, then date format, then plain text.
pub(crate) fn infer_editor_kind(schema: &Value, registry: &EditorRegistry) -> String {
    if schema.get("enum").is_some() {
        return "select".to_string();
    }
    if schema.get("type").and_then(Value::as_str) == Some("boolean") {
        return "checkbox".to_string();
    }
    if schema.get("format").and_then(Value::as_str) == Some("date")
        && !registry.native_date_input()
    {
        return "date".to_string();
    }
    "text".to_string()
}

fn build_leaf(
    nodes: &mut Vec<Node>,
    registry: &EditorRegistry,
    schema: &Value,
    name: &str,
    path: &str,
    parent: Option<NodeId>,
    editor_kind: String,
) -> Result<NodeId, SchemaError> {
    if !registry.has_editor(&editor_kind) {
        return Err(SchemaError::UnknownEditor {
            path: path.to_string(),
            kind: editor_kind,
        });
    }

    check_option_labels(schema, path)?;
    let serialize = check_hook(registry, schema, path, "serialize")?;
    let deserialize = check_hook(registry, schema, path, "deserialize")?;

    Ok(alloc(
        nodes,
        Node {
            name: name.to_string(),
            path: path.to_string(),
            schema: schema.clone(),
            parent,
            error: None,
            detached: false,
            kind: NodeKind::Leaf(LeafField {
                editor_kind,
                serialize,
                deserialize,
                editor: None,
            }),
        },
    ))
}

fn build_group(
    nodes: &mut Vec<Node>,
    registry: &EditorRegistry,
    schema: &Value,
    name: &str,
    path: &str,
    parent: Option<NodeId>,
) -> Result<NodeId, SchemaError> {
    reject_hooks_on_container(schema, path)?;

    let empty = Map::new();
    let properties = match schema.get("properties") {
        None => &empty,
        Some(Value::Object(props)) => props,
        Some(other) => {
            return Err(SchemaError::Invalid {
                message: format!(
                    "\"properties\" at {path:?} must be an object, got {}",
                    json_type_name(other)
                ),
            })
        }
    };

    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let group_id = alloc(
        nodes,
        Node {
            name: name.to_string(),
            path: path.to_string(),
            schema: schema.clone(),
            parent,
            error: None,
            detached: false,
            kind: NodeKind::Group(ObjectGroup {
                children: Vec::new(),
                active: Vec::new(),
                conditions: Vec::new(),
                evaluating: false,
            }),
        },
    );

    let mut children = Vec::with_capacity(properties.len());
    for (prop_name, prop_schema) in properties {
        // A membership in the parent's required list is normalized into
        // the child's own schema before the child is built.
        let mut child_schema = prop_schema.clone();
        if required.contains(&prop_name.as_str()) {
            if let Value::Object(map) = &mut child_schema {
                map.insert("required".to_string(), Value::Bool(true));
            }
        }

        let child_path = format!("{path}/{prop_name}");
        let child = build_node(
            nodes,
            registry,
            &child_schema,
            prop_name,
            &child_path,
            Some(group_id),
        )?;
        children.push(child);
    }

    let sibling_names: Vec<String> = properties.keys().cloned().collect();
    let mut conditions = Vec::with_capacity(children.len());
    for &child in &children {
        let child_node = &nodes[child.index()];
        conditions.push(dependency::parse_condition(
            &child_node.schema,
            &child_node.path,
            &sibling_names,
        )?);
    }

    if let NodeKind::Group(group) = &mut nodes[group_id.index()].kind {
        group.active = children.clone();
        group.children = children;
        group.conditions = conditions;
    }

    Ok(group_id)
}

fn build_list(
    nodes: &mut Vec<Node>,
    registry: &EditorRegistry,
    schema: &Value,
    name: &str,
    path: &str,
    parent: Option<NodeId>,
) -> Result<NodeId, SchemaError> {
    reject_hooks_on_container(schema, path)?;

    let item_schema = match schema.get("items") {
        Some(items @ Value::Object(_)) => items.clone(),
        Some(other) => {
            return Err(SchemaError::InvalidItems {
                path: path.to_string(),
                actual: json_type_name(other).to_string(),
            })
        }
        None => {
            return Err(SchemaError::InvalidItems {
                path: path.to_string(),
                actual: "nothing".to_string(),
            })
        }
    };

    // Probe-build the item schema into a scratch arena so that every
    // static check runs now, not on first insert.
    let mut scratch = Vec::new();
    build_node(
        &mut scratch,
        registry,
        &item_schema,
        "",
        &format!("{path}/items"),
        None,
    )?;

    Ok(alloc(
        nodes,
        Node {
            name: name.to_string(),
            path: path.to_string(),
            schema: schema.clone(),
            parent,
            error: None,
            detached: false,
            kind: NodeKind::List(ArrayList {
                items: Vec::new(),
                item_schema,
            }),
        },
    ))
}

/// Build one array item (wrapper plus inner subtree) at `index`.
///
/// The caller splices the returned id into the list and re-indexes.
pub(crate) fn build_item(
    nodes: &mut Vec<Node>,
    registry: &EditorRegistry,
    list: NodeId,
    list_path: &str,
    item_schema: &Value,
    index: usize,
) -> Result<NodeId, SchemaError> {
    let item_path = format!("{list_path}/{index}");
    let item_index = nodes.len();
    let item_id = NodeId::new(item_index);
    nodes.push(Node {
        name: String::new(),
        path: item_path.clone(),
        schema: item_schema.clone(),
        parent: Some(list),
        error: None,
        detached: false,
        // Points at itself until the inner subtree exists.
        kind: NodeKind::Item(ArrayItem {
            inner: item_id,
            index,
        }),
    });

    match build_node(nodes, registry, item_schema, "", &item_path, Some(item_id)) {
        Ok(inner) => {
            if let NodeKind::Item(item) = &mut nodes[item_index].kind {
                item.inner = inner;
            }
            Ok(item_id)
        }
        Err(err) => {
            nodes[item_index].detached = true;
            Err(err)
        }
    }
}

pub(crate) fn check_option_labels(schema: &Value, path: &str) -> Result<(), SchemaError> {
    let options = schema.get("enum").and_then(Value::as_array);
    let labels = schema.get("optionLabels").and_then(Value::as_array);

    match (options, labels) {
        (Some(options), Some(labels)) => {
            if options.len() != labels.len() {
                return Err(SchemaError::OptionLabelsLength {
                    path: path.to_string(),
                    labels: labels.len(),
                    options: options.len(),
                });
            }
            Ok(())
        }
        (Some(_), None) => Err(SchemaError::MissingOptionLabels {
            path: path.to_string(),
        }),
        (None, Some(_)) => Err(SchemaError::OptionLabelsWithoutEnum {
            path: path.to_string(),
        }),
        (None, None) => Ok(()),
    }
}

pub(crate) fn check_hook(
    registry: &EditorRegistry,
    schema: &Value,
    path: &str,
    keyword: &'static str,
) -> Result<Option<String>, SchemaError> {
    let Some(hook) = schema.get(keyword) else {
        return Ok(None);
    };
    let name = hook.as_str().ok_or_else(|| SchemaError::InvalidHook {
        path: path.to_string(),
        keyword,
        actual: json_type_name(hook).to_string(),
    })?;
    if !registry.has_transform(name) {
        return Err(SchemaError::UnknownTransform {
            path: path.to_string(),
            name: name.to_string(),
        });
    }
    Ok(Some(name.to_string()))
}

fn reject_hooks_on_container(schema: &Value, path: &str) -> Result<(), SchemaError> {
    for keyword in ["serialize", "deserialize"] {
        if schema.get(keyword).is_some() {
            return Err(SchemaError::HookOnContainer {
                path: path.to_string(),
                keyword,
            });
        }
    }
    Ok(())
}

fn alloc(nodes: &mut Vec<Node>, node: Node) -> NodeId {
    let id = NodeId::new(nodes.len());
    nodes.push(node);
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldTree;
    use serde_json::json;

    fn compile(schema: Value) -> Result<FieldTree, SchemaError> {
        FieldTree::compile(&schema, EditorRegistry::with_defaults())
    }

    // === Decision table ===

    #[test]
    fn editor_hint_wins_over_shape() {
        let tree = compile(json!({
            "type": "object",
            "properties": {
                "body": { "type": "string", "editor": "text" }
            }
        }))
        .unwrap();
        let body = tree.resolve("/body").unwrap();
        assert_eq!(tree.node(body).as_leaf().unwrap().editor_kind, "text");
    }

    #[test]
    fn object_without_hint_builds_group() {
        let tree = compile(json!({
            "type": "object",
            "properties": {
                "address": {
                    "type": "object",
                    "properties": { "city": { "type": "string" } }
                }
            }
        }))
        .unwrap();
        let address = tree.resolve("/address").unwrap();
        assert!(tree.node(address).as_group().is_some());
    }

    #[test]
    fn array_without_hint_builds_list() {
        let tree = compile(json!({
            "type": "object",
            "properties": {
                "tags": {
                    "type": "array",
                    "items": { "type": "string" }
                }
            }
        }))
        .unwrap();
        let tags = tree.resolve("/tags").unwrap();
        assert!(tree.node(tags).as_list().is_some());
    }

    #[test]
    fn inference_enum_beats_boolean() {
        let registry = EditorRegistry::with_defaults();
        let schema = json!({"type": "boolean", "enum": [true, false]});
        assert_eq!(infer_editor_kind(&schema, &registry), "select");
    }

    #[test]
    fn inference_boolean_checkbox() {
        let registry = EditorRegistry::with_defaults();
        assert_eq!(
            infer_editor_kind(&json!({"type": "boolean"}), &registry),
            "checkbox"
        );
    }

    #[test]
    fn inference_date_format() {
        let registry = EditorRegistry::with_defaults();
        let schema = json!({"type": "string", "format": "date"});
        assert_eq!(infer_editor_kind(&schema, &registry), "date");
    }

    #[test]
    fn inference_date_skipped_with_native_input() {
        let registry = EditorRegistry::with_defaults().with_native_date_input(true);
        let schema = json!({"type": "string", "format": "date"});
        assert_eq!(infer_editor_kind(&schema, &registry), "text");
    }

    #[test]
    fn inference_falls_back_to_text() {
        let registry = EditorRegistry::with_defaults();
        assert_eq!(
            infer_editor_kind(&json!({"type": "integer"}), &registry),
            "text"
        );
    }

    // === Static rejection ===

    #[test]
    fn missing_type_fails() {
        let result = compile(json!({
            "type": "object",
            "properties": { "x": { "title": "no type here" } }
        }));
        assert!(matches!(result, Err(SchemaError::MissingType { path }) if path == "/x"));
    }

    #[test]
    fn missing_type_fails_even_with_editor_hint() {
        let result = compile(json!({
            "type": "object",
            "properties": { "x": { "editor": "text" } }
        }));
        assert!(matches!(result, Err(SchemaError::MissingType { .. })));
    }

    #[test]
    fn non_string_editor_hint_fails() {
        let result = compile(json!({
            "type": "object",
            "properties": { "x": { "type": "string", "editor": 7 } }
        }));
        assert!(matches!(result, Err(SchemaError::InvalidEditor { .. })));
    }

    #[test]
    fn unknown_editor_kind_fails() {
        let result = compile(json!({
            "type": "object",
            "properties": { "x": { "type": "string", "editor": "rich-text" } }
        }));
        assert!(
            matches!(result, Err(SchemaError::UnknownEditor { kind, .. }) if kind == "rich-text")
        );
    }

    #[test]
    fn array_without_items_fails() {
        let result = compile(json!({
            "type": "object",
            "properties": { "tags": { "type": "array" } }
        }));
        assert!(matches!(result, Err(SchemaError::InvalidItems { .. })));
    }

    #[test]
    fn array_with_tuple_items_fails() {
        let result = compile(json!({
            "type": "object",
            "properties": {
                "tags": { "type": "array", "items": [{ "type": "string" }] }
            }
        }));
        assert!(
            matches!(result, Err(SchemaError::InvalidItems { actual, .. }) if actual == "array")
        );
    }

    #[test]
    fn defective_item_schema_fails_at_compile_not_insert() {
        // The item schema's nested defect is caught by the probe build.
        let result = compile(json!({
            "type": "object",
            "properties": {
                "rows": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": { "cell": { "title": "typeless" } }
                    }
                }
            }
        }));
        assert!(
            matches!(result, Err(SchemaError::MissingType { path }) if path == "/rows/items/cell")
        );
    }

    #[test]
    fn enum_without_option_labels_fails() {
        let result = compile(json!({
            "type": "object",
            "properties": {
                "color": { "type": "string", "enum": ["r", "g"] }
            }
        }));
        assert!(matches!(result, Err(SchemaError::MissingOptionLabels { .. })));
    }

    #[test]
    fn option_labels_without_enum_fails() {
        let result = compile(json!({
            "type": "object",
            "properties": {
                "color": { "type": "string", "optionLabels": ["Red"] }
            }
        }));
        assert!(matches!(
            result,
            Err(SchemaError::OptionLabelsWithoutEnum { .. })
        ));
    }

    #[test]
    fn option_labels_length_mismatch_fails() {
        let result = compile(json!({
            "type": "object",
            "properties": {
                "color": {
                    "type": "string",
                    "enum": ["r", "g"],
                    "optionLabels": ["Red"]
                }
            }
        }));
        assert!(matches!(
            result,
            Err(SchemaError::OptionLabelsLength { labels: 1, options: 2, .. })
        ));
    }

    #[test]
    fn unknown_transform_fails() {
        let result = compile(json!({
            "type": "object",
            "properties": {
                "tags": { "type": "string", "deserialize": "no.such.hook" }
            }
        }));
        assert!(
            matches!(result, Err(SchemaError::UnknownTransform { name, .. }) if name == "no.such.hook")
        );
    }

    #[test]
    fn non_string_hook_fails() {
        let result = compile(json!({
            "type": "object",
            "properties": {
                "tags": { "type": "string", "serialize": 1 }
            }
        }));
        assert!(matches!(result, Err(SchemaError::InvalidHook { .. })));
    }

    #[test]
    fn hooks_on_container_fail() {
        let result = compile(json!({
            "type": "object",
            "properties": {
                "nested": {
                    "type": "object",
                    "serialize": "csv.join",
                    "properties": {}
                }
            }
        }));
        assert!(matches!(result, Err(SchemaError::HookOnContainer { .. })));
    }

    // === Normalization ===

    #[test]
    fn required_list_normalizes_into_children() {
        let tree = compile(json!({
            "type": "object",
            "required": ["name"],
            "properties": {
                "name": { "type": "string" },
                "age": { "type": "integer" }
            }
        }))
        .unwrap();
        assert!(tree.node(tree.resolve("/name").unwrap()).required());
        assert!(!tree.node(tree.resolve("/age").unwrap()).required());
    }

    #[test]
    fn children_keep_declaration_order() {
        let tree = compile(json!({
            "type": "object",
            "properties": {
                "zeta": { "type": "string" },
                "alpha": { "type": "string" },
                "mid": { "type": "string" }
            }
        }))
        .unwrap();
        let root = tree.node(tree.root());
        let names: Vec<&str> = root
            .as_group()
            .unwrap()
            .children()
            .iter()
            .map(|&id| tree.node(id).name.as_str())
            .collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn group_without_properties_is_empty() {
        let tree = compile(json!({"type": "object"})).unwrap();
        assert!(tree
            .node(tree.root())
            .as_group()
            .unwrap()
            .children()
            .is_empty());
    }
}
