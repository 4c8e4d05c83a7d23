//! Ordered mutable-list operations on array lists.
//!
//! Insert, remove, and move preserve the identity of every surviving
//! item: external `NodeId` handles keep pointing at the same nodes across
//! structural changes. After every operation each item's positional index
//! and path prefix are re-derived, so `items[i].index == i` holds before
//! the operation returns. Removal tombstones the item's subtree; later
//! calls against a removed node fail with a detached error instead of
//! touching released state.

use serde_json::Value;

use crate::compiler;
use crate::error::ValueError;
use crate::tree::{ChangeEvent, FieldTree, NodeId};

/// Insert a fresh item built from the list's item schema at `index`
/// (clamped to the end; default end). Emits one structural notification.
pub(crate) fn insert(
    tree: &mut FieldTree,
    list: NodeId,
    index: Option<usize>,
) -> Result<NodeId, ValueError> {
    tree.ensure_live(list)?;
    let (len, path, item_schema) = list_parts(tree, list)?;
    let position = index.unwrap_or(len).min(len);

    let item = build_item(tree, list, &path, &item_schema, position)?;
    if let Some(state) = tree.node_mut(list).as_list_mut() {
        state.items.insert(position, item);
    }
    reindex(tree, list);
    tree.push_event(ChangeEvent::Structure { list, path });
    Ok(item)
}

/// Append a fresh item without emitting a notification. Used by bulk
/// value injection, which emits a single notification for the rebuild.
pub(crate) fn append_item(tree: &mut FieldTree, list: NodeId) -> Result<NodeId, ValueError> {
    tree.ensure_live(list)?;
    let (len, path, item_schema) = list_parts(tree, list)?;

    let item = build_item(tree, list, &path, &item_schema, len)?;
    if let Some(state) = tree.node_mut(list).as_list_mut() {
        state.items.push(item);
    }
    Ok(item)
}

/// Detach every item without emitting a notification.
pub(crate) fn clear_items(tree: &mut FieldTree, list: NodeId) -> Result<(), ValueError> {
    tree.ensure_live(list)?;
    let items = match tree.node(list).as_list() {
        Some(state) => state.items.clone(),
        None => return Err(not_a_list(tree, list)),
    };
    for item in items {
        tree.detach_subtree(item);
    }
    if let Some(state) = tree.node_mut(list).as_list_mut() {
        state.items.clear();
    }
    Ok(())
}

/// Remove `item` from `list`, detaching its whole subtree.
pub(crate) fn remove(tree: &mut FieldTree, list: NodeId, item: NodeId) -> Result<(), ValueError> {
    tree.ensure_live(list)?;
    tree.ensure_live(item)?;
    let position = position_of(tree, list, item)?;

    tree.detach_subtree(item);
    if let Some(state) = tree.node_mut(list).as_list_mut() {
        state.items.remove(position);
    }
    reindex(tree, list);

    let path = tree.node(list).path.clone();
    tree.push_event(ChangeEvent::Structure { list, path });
    Ok(())
}

/// Swap `item` with its predecessor; no-op (`false`) on the first item.
pub(crate) fn move_up(
    tree: &mut FieldTree,
    list: NodeId,
    item: NodeId,
) -> Result<bool, ValueError> {
    tree.ensure_live(list)?;
    tree.ensure_live(item)?;
    let position = position_of(tree, list, item)?;
    if position == 0 {
        return Ok(false);
    }
    swap_items(tree, list, position - 1, position);
    Ok(true)
}

/// Swap `item` with its successor; no-op (`false`) on the last item.
pub(crate) fn move_down(
    tree: &mut FieldTree,
    list: NodeId,
    item: NodeId,
) -> Result<bool, ValueError> {
    tree.ensure_live(list)?;
    tree.ensure_live(item)?;
    let position = position_of(tree, list, item)?;
    let len = tree
        .node(list)
        .as_list()
        .map(|state| state.items.len())
        .unwrap_or(0);
    if position + 1 >= len {
        return Ok(false);
    }
    swap_items(tree, list, position, position + 1);
    Ok(true)
}

fn swap_items(tree: &mut FieldTree, list: NodeId, a: usize, b: usize) {
    if let Some(state) = tree.node_mut(list).as_list_mut() {
        state.items.swap(a, b);
    }
    reindex(tree, list);
    let path = tree.node(list).path.clone();
    tree.push_event(ChangeEvent::Structure { list, path });
}

/// Re-derive every item's positional index and path prefix.
fn reindex(tree: &mut FieldTree, list: NodeId) {
    let (path, items) = {
        let node = tree.node(list);
        let items = node
            .as_list()
            .map(|state| state.items.clone())
            .unwrap_or_default();
        (node.path.clone(), items)
    };
    for (i, item) in items.into_iter().enumerate() {
        if let Some(state) = tree.node_mut(item).as_item_mut() {
            state.index = i;
        }
        tree.recompute_paths(item, format!("{path}/{i}"));
    }
}

fn build_item(
    tree: &mut FieldTree,
    list: NodeId,
    list_path: &str,
    item_schema: &Value,
    index: usize,
) -> Result<NodeId, ValueError> {
    let item = compiler::build_item(
        &mut tree.nodes,
        &tree.registry,
        list,
        list_path,
        item_schema,
        index,
    )?;
    if tree.is_rendered() {
        if let Err(err) = tree.attach_editors(item) {
            tree.detach_subtree(item);
            return Err(err.into());
        }
    }
    Ok(item)
}

fn list_parts(tree: &FieldTree, list: NodeId) -> Result<(usize, String, Value), ValueError> {
    let node = tree.node(list);
    match node.as_list() {
        Some(state) => Ok((
            state.items.len(),
            node.path.clone(),
            state.item_schema.clone(),
        )),
        None => Err(not_a_list(tree, list)),
    }
}

fn not_a_list(tree: &FieldTree, id: NodeId) -> ValueError {
    let node = tree.node(id);
    ValueError::NotAList {
        path: node.path.clone(),
        actual: node.kind_name(),
    }
}

fn position_of(tree: &FieldTree, list: NodeId, item: NodeId) -> Result<usize, ValueError> {
    let node = tree.node(list);
    let items = match node.as_list() {
        Some(state) => &state.items,
        None => return Err(not_a_list(tree, list)),
    };
    items
        .iter()
        .position(|&candidate| candidate == item)
        .ok_or_else(|| ValueError::NotAnItem {
            path: tree.node(item).path.clone(),
        })
}
