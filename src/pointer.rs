//! JSON Pointer resolution against a live field tree.
//!
//! RFC-6901-style grammar: `/`-separated tokens, `~1`/`~0` escapes, plus
//! percent-decoding of `%XX` sequences. The empty pointer and the bare
//! `"/"` both address the root. At a group, a token indexes the *full*
//! child set by name (pointers address the schema tree regardless of
//! current visibility); at a list, a numeric token selects an item and
//! resolution immediately substitutes that item's inner field, so the
//! item wrapper is transparent to addressing.

use crate::error::PointerError;
use crate::tree::{FieldTree, NodeId, NodeKind};

/// Resolve `pointer` against `root`, returning the addressed node.
///
/// # Errors
///
/// Returns `PointerError` if a traversed segment is missing or if the
/// pointer descends into a non-container.
pub fn resolve(tree: &FieldTree, root: NodeId, pointer: &str) -> Result<NodeId, PointerError> {
    if pointer.is_empty() || pointer == "/" {
        return Ok(root);
    }

    let body = pointer.strip_prefix('/').unwrap_or(pointer);
    let mut current = root;

    for raw_token in body.split('/') {
        let token = unescape_token(raw_token);

        // An item wrapper is never addressed directly.
        if let Some(item) = tree.node(current).as_item() {
            current = item.inner();
        }

        let node = tree.node(current);
        current = match &node.kind {
            NodeKind::Group(group) => group
                .children()
                .iter()
                .copied()
                .find(|&child| tree.node(child).name == token)
                .ok_or_else(|| PointerError::UnknownField {
                    pointer: pointer.to_string(),
                    token: token.clone(),
                })?,
            NodeKind::List(list) => {
                if !is_valid_index(&token) {
                    return Err(PointerError::BadIndex {
                        pointer: pointer.to_string(),
                        token,
                    });
                }
                let index: usize =
                    token.parse().map_err(|_| PointerError::BadIndex {
                        pointer: pointer.to_string(),
                        token: token.clone(),
                    })?;
                let items = list.items();
                let &item = items.get(index).ok_or(PointerError::IndexOutOfRange {
                    pointer: pointer.to_string(),
                    index,
                    len: items.len(),
                })?;
                // Substitute the inner field for the wrapper (the extra
                // "entering the item" token is not consumed).
                tree.node(item)
                    .as_item()
                    .map(|it| it.inner())
                    .unwrap_or(item)
            }
            NodeKind::Leaf(_) | NodeKind::Item(_) => {
                return Err(PointerError::NotAContainer {
                    pointer: pointer.to_string(),
                    token,
                    path: node.path.clone(),
                })
            }
        };
    }

    Ok(current)
}

/// Flattened pre-order sequence of all nodes reachable from `from`,
/// item wrappers included. Used to bulk-clear errors.
pub fn enumerate_fields(tree: &FieldTree, from: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![from];
    while let Some(id) = stack.pop() {
        out.push(id);
        match &tree.node(id).kind {
            NodeKind::Leaf(_) => {}
            NodeKind::Group(group) => stack.extend(group.children().iter().rev().copied()),
            NodeKind::List(list) => stack.extend(list.items().iter().rev().copied()),
            NodeKind::Item(item) => stack.push(item.inner()),
        }
    }
    out
}

/// Unescape one pointer token: `~1` → `/`, `~0` → `~`, then `%XX`.
pub(crate) fn unescape_token(token: &str) -> String {
    let unescaped = if token.contains('~') {
        token.replace("~1", "/").replace("~0", "~")
    } else {
        token.to_string()
    };
    percent_decode(&unescaped)
}

fn percent_decode(s: &str) -> String {
    if !s.contains('%') {
        return s.to_string();
    }
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_digit(bytes[i + 1]), hex_digit(bytes[i + 2])) {
                out.push(hi * 16 + lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    // Malformed sequences fall back to the raw token.
    String::from_utf8(out).unwrap_or_else(|_| s.to_string())
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// A valid array-index token: decimal digits with no leading zero.
fn is_valid_index(token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    let bytes = token.as_bytes();
    if bytes.len() > 1 && bytes[0] == b'0' {
        return false;
    }
    bytes.iter().all(|b| b.is_ascii_digit())
}
