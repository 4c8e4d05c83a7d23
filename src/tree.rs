//! The runtime field tree: an index arena of nodes compiled from a schema.
//!
//! Nodes address each other with [`NodeId`] indices into the tree-owned
//! arena, so parent back-references are plain `Option<NodeId>` values and
//! ownership flows strictly down the forward edges. Removing a subtree
//! tombstones its slots instead of freeing them: a stale `NodeId` held by
//! a caller resolves to a detached node and fails loudly rather than
//! reading a reused slot.

use serde_json::Value;

use crate::array;
use crate::compiler;
use crate::dependency::{self, Condition};
use crate::editor::{Editor, EditorRegistry};
use crate::error::{PointerError, SchemaError, ValueError};
use crate::pointer;
use crate::router;
use crate::types::{ErrorFields, GetOptions, SetOptions};
use crate::value;

/// Handle to a node in a [`FieldTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Leaf field payload: the editor handle and hook names.
#[derive(Debug)]
pub struct LeafField {
    /// Editor kind chosen by the compiler (hint or inference).
    pub editor_kind: String,
    pub(crate) serialize: Option<String>,
    pub(crate) deserialize: Option<String>,
    pub(crate) editor: Option<Box<dyn Editor>>,
}

impl LeafField {
    /// The attached editor, if the tree has been rendered.
    pub fn editor(&self) -> Option<&dyn Editor> {
        self.editor.as_deref()
    }

    pub fn is_rendered(&self) -> bool {
        self.editor.is_some()
    }
}

/// Object group payload: the full child set and the active subset.
#[derive(Debug)]
pub struct ObjectGroup {
    pub(crate) children: Vec<NodeId>,
    pub(crate) active: Vec<NodeId>,
    pub(crate) conditions: Vec<Option<Condition>>,
    pub(crate) evaluating: bool,
}

impl ObjectGroup {
    /// All children, in schema property declaration order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Currently available children, a subset of [`Self::children`] in the
    /// same order. Membership changes only through dependency
    /// re-evaluation.
    pub fn active(&self) -> &[NodeId] {
        &self.active
    }
}

/// Array list payload: ordered items sharing one item schema.
#[derive(Debug)]
pub struct ArrayList {
    pub(crate) items: Vec<NodeId>,
    /// Schema fragment applied to every item.
    pub item_schema: Value,
}

impl ArrayList {
    pub fn items(&self) -> &[NodeId] {
        &self.items
    }
}

/// Array item payload: the wrapper around one value-bearing subtree.
#[derive(Debug)]
pub struct ArrayItem {
    pub(crate) inner: NodeId,
    pub(crate) index: usize,
}

impl ArrayItem {
    /// The item's single child node. Pointer resolution and value access
    /// skip the item wrapper and land here.
    pub fn inner(&self) -> NodeId {
        self.inner
    }

    /// Current position in the owning list.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Variant payload of a node.
#[derive(Debug)]
pub enum NodeKind {
    Leaf(LeafField),
    Group(ObjectGroup),
    List(ArrayList),
    Item(ArrayItem),
}

/// One node of the compiled tree.
#[derive(Debug)]
pub struct Node {
    /// Local identifier; empty for the root and for item inner fields.
    pub name: String,
    /// Pointer-form path from the root (`/person/addresses/0/street`),
    /// doubling as a stable widget identifier. An array item and its
    /// unnamed inner field share the item's path.
    pub path: String,
    /// The schema fragment governing this node, with `required`
    /// normalization already applied.
    pub schema: Value,
    /// Non-owning back-reference; `None` for the root and detached nodes.
    pub parent: Option<NodeId>,
    /// Validation message attached by the error router.
    pub error: Option<String>,
    pub(crate) detached: bool,
    pub(crate) kind: NodeKind,
}

impl Node {
    /// Read-only access to the variant payload.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn as_leaf(&self) -> Option<&LeafField> {
        match &self.kind {
            NodeKind::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&ObjectGroup> {
        match &self.kind {
            NodeKind::Group(group) => Some(group),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ArrayList> {
        match &self.kind {
            NodeKind::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_item(&self) -> Option<&ArrayItem> {
        match &self.kind {
            NodeKind::Item(item) => Some(item),
            _ => None,
        }
    }

    pub(crate) fn as_leaf_mut(&mut self) -> Option<&mut LeafField> {
        match &mut self.kind {
            NodeKind::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    pub(crate) fn as_group_mut(&mut self) -> Option<&mut ObjectGroup> {
        match &mut self.kind {
            NodeKind::Group(group) => Some(group),
            _ => None,
        }
    }

    pub(crate) fn as_list_mut(&mut self) -> Option<&mut ArrayList> {
        match &mut self.kind {
            NodeKind::List(list) => Some(list),
            _ => None,
        }
    }

    pub(crate) fn as_item_mut(&mut self) -> Option<&mut ArrayItem> {
        match &mut self.kind {
            NodeKind::Item(item) => Some(item),
            _ => None,
        }
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Leaf(_) => "field",
            NodeKind::Group(_) => "group",
            NodeKind::List(_) => "list",
            NodeKind::Item(_) => "item",
        }
    }

    /// `showOnly` fields render but are excluded from extracted values.
    pub fn show_only(&self) -> bool {
        self.schema.get("showOnly").and_then(Value::as_bool) == Some(true)
    }

    /// Required flag, after parent `required`-list normalization.
    pub fn required(&self) -> bool {
        self.schema.get("required").and_then(Value::as_bool) == Some(true)
    }

    pub fn title(&self) -> Option<&str> {
        self.schema.get("title").and_then(Value::as_str)
    }
}

/// Notification emitted by tree mutations.
///
/// Events are queued during a mutation and dispatched synchronously once
/// the mutation completes, so listeners always observe a consistent tree.
#[derive(Debug, Clone)]
pub enum ChangeEvent {
    /// A field's value changed.
    Value { node: NodeId, path: String },
    /// A list gained, lost, or reordered items.
    Structure { list: NodeId, path: String },
    /// A group's active child set changed. `active` is the full desired
    /// active set in declaration order; `activated`/`deactivated` are the
    /// diff against the previous set, for minimal attach/detach.
    Activation {
        group: NodeId,
        path: String,
        activated: Vec<NodeId>,
        deactivated: Vec<NodeId>,
        active: Vec<NodeId>,
    },
}

type Listener = Box<dyn Fn(&ChangeEvent)>;

/// A live field tree compiled from a JSON Schema.
pub struct FieldTree {
    pub(crate) nodes: Vec<Node>,
    root: NodeId,
    pub(crate) registry: EditorRegistry,
    rendered: bool,
    listeners: Vec<Listener>,
    pub(crate) pending: Vec<ChangeEvent>,
}

impl FieldTree {
    /// Compile a schema into a field tree.
    ///
    /// The registry is consulted for editor kinds and transform names at
    /// compile time; editors themselves are attached later by
    /// [`FieldTree::render`]. Initial group activation is computed as part
    /// of compilation (conditions see every sibling value as undefined).
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` on any statically detectable schema defect.
    pub fn compile(schema: &Value, registry: EditorRegistry) -> Result<Self, SchemaError> {
        let mut nodes = Vec::new();
        let root = compiler::build_node(&mut nodes, &registry, schema, "", "", None)?;
        let mut tree = Self {
            nodes,
            root,
            registry,
            rendered: false,
            listeners: Vec::new(),
            pending: Vec::new(),
        };

        let groups: Vec<NodeId> = (0..tree.nodes.len())
            .map(NodeId::new)
            .filter(|id| tree.node(*id).as_group().is_some())
            .collect();
        for group in groups {
            dependency::reevaluate(&mut tree, group, None, false);
        }

        Ok(tree)
    }

    /// The tree root.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Borrow a node.
    ///
    /// # Panics
    ///
    /// Panics if `id` did not come from this tree.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn registry(&self) -> &EditorRegistry {
        &self.registry
    }

    pub fn is_rendered(&self) -> bool {
        self.rendered
    }

    /// Attach editors to every leaf via the registry.
    ///
    /// Value access fails with [`ValueError::NotRendered`] until this has
    /// run. Items inserted after rendering get their editors on insert.
    pub fn render(&mut self) -> Result<(), SchemaError> {
        self.attach_editors(self.root)?;
        self.rendered = true;
        Ok(())
    }

    /// Subscribe to change events. Listeners are invoked synchronously
    /// after each mutation completes.
    pub fn subscribe(&mut self, listener: impl Fn(&ChangeEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Report an externally driven editor change on `node`.
    ///
    /// Bubbles the change up through every ancestor group, re-evaluating
    /// availability with the direct child's name as the originating field.
    pub fn notify_change(&mut self, node: NodeId) -> Result<(), ValueError> {
        self.ensure_live(node)?;
        self.bubble_change(node);
        self.dispatch_pending();
        Ok(())
    }

    /// Resolve a JSON Pointer against the tree root.
    pub fn resolve(&self, ptr: &str) -> Result<NodeId, PointerError> {
        pointer::resolve(self, self.root, ptr)
    }

    /// Pre-order sequence of all nodes reachable from `from`.
    pub fn enumerate_fields(&self, from: NodeId) -> Vec<NodeId> {
        pointer::enumerate_fields(self, from)
    }

    /// Extract the current value of the subtree rooted at `node`.
    pub fn get_value(&self, node: NodeId, options: &GetOptions) -> Result<Value, ValueError> {
        value::get_value(self, node, options)
    }

    /// Inject a value into the subtree rooted at `node`, then re-evaluate
    /// availability up the ancestor chain.
    pub fn set_value(
        &mut self,
        node: NodeId,
        val: &Value,
        options: &SetOptions,
    ) -> Result<(), ValueError> {
        let result = value::set_value(self, node, val, options);
        if result.is_ok() {
            self.bubble_change(node);
        }
        self.dispatch_pending();
        result
    }

    /// Explicit availability re-evaluation with no originating field.
    /// No-op on non-group nodes.
    pub fn reevaluate(&mut self, group: NodeId) -> Result<(), ValueError> {
        self.ensure_live(group)?;
        if self.node(group).as_group().is_some() {
            dependency::reevaluate(self, group, None, true);
            self.dispatch_pending();
        }
        Ok(())
    }

    /// Insert a fresh item into a list at `index` (default: end).
    pub fn insert_item(
        &mut self,
        list: NodeId,
        index: Option<usize>,
    ) -> Result<NodeId, ValueError> {
        let result = array::insert(self, list, index);
        self.dispatch_pending();
        result
    }

    /// Remove `item` from `list`, detaching its subtree.
    pub fn remove_item(&mut self, list: NodeId, item: NodeId) -> Result<(), ValueError> {
        let result = array::remove(self, list, item);
        self.dispatch_pending();
        result
    }

    /// Swap `item` with its predecessor. Returns `false` (and changes
    /// nothing) when the item is already first.
    pub fn move_up(&mut self, list: NodeId, item: NodeId) -> Result<bool, ValueError> {
        let result = array::move_up(self, list, item);
        self.dispatch_pending();
        result
    }

    /// Swap `item` with its successor. Returns `false` (and changes
    /// nothing) when the item is already last.
    pub fn move_down(&mut self, list: NodeId, item: NodeId) -> Result<bool, ValueError> {
        let result = array::move_down(self, list, item);
        self.dispatch_pending();
        result
    }

    /// Route validation errors onto the tree by pointer.
    pub fn set_errors(&mut self, errors: &[Value], fields: &ErrorFields) -> Result<(), PointerError> {
        router::set_errors(self, errors, fields)
    }

    /// Clear every attached validation message under the root.
    pub fn clear_errors(&mut self) {
        router::clear_errors(self);
    }

    // --- Internal plumbing ---

    pub(crate) fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub(crate) fn ensure_live(&self, id: NodeId) -> Result<(), ValueError> {
        let node = self.node(id);
        if node.detached {
            Err(ValueError::Detached {
                path: node.path.clone(),
            })
        } else {
            Ok(())
        }
    }

    pub(crate) fn push_event(&mut self, event: ChangeEvent) {
        self.pending.push(event);
    }

    /// Drain the queue, invoking listeners in order. Runs after the
    /// mutation that produced the events has fully completed.
    pub(crate) fn dispatch_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let events = std::mem::take(&mut self.pending);
        for event in &events {
            for listener in &self.listeners {
                listener(event);
            }
        }
    }

    /// Queue a value event for `from` and re-evaluate every ancestor
    /// group. At each group the originating field is the name of that
    /// group's direct child on the path from the change.
    pub(crate) fn bubble_change(&mut self, from: NodeId) {
        let path = self.node(from).path.clone();
        self.push_event(ChangeEvent::Value { node: from, path });

        let mut current = from;
        while let Some(parent) = self.node(current).parent {
            if self.node(parent).as_group().is_some() {
                let origin = self.node(current).name.clone();
                dependency::reevaluate(self, parent, Some(&origin), true);
            }
            current = parent;
        }
    }

    /// Create editors for every unrendered leaf under `from`.
    pub(crate) fn attach_editors(&mut self, from: NodeId) -> Result<(), SchemaError> {
        for id in pointer::enumerate_fields(self, from) {
            let node = &self.nodes[id.index()];
            if node.detached {
                continue;
            }
            let kind = match &node.kind {
                NodeKind::Leaf(leaf) if leaf.editor.is_none() => leaf.editor_kind.clone(),
                _ => continue,
            };
            let editor = self.registry.create(
                &kind,
                &self.nodes[id.index()].schema,
                &self.nodes[id.index()].path,
            )?;
            if let Some(leaf) = self.nodes[id.index()].as_leaf_mut() {
                leaf.editor = Some(editor);
            }
        }
        Ok(())
    }

    /// Tombstone `from` and its whole subtree, severing the back-reference.
    /// Forward references are dropped by the caller (the owning list).
    pub(crate) fn detach_subtree(&mut self, from: NodeId) {
        for id in pointer::enumerate_fields(self, from) {
            self.nodes[id.index()].detached = true;
        }
        self.nodes[from.index()].parent = None;
    }

    /// Rewrite `id`'s path to `path` and re-derive descendant paths.
    /// Used after list re-indexing.
    pub(crate) fn recompute_paths(&mut self, id: NodeId, path: String) {
        enum Descend {
            Leaf,
            Group(Vec<NodeId>),
            List(Vec<NodeId>),
            Item(NodeId),
        }

        let node = &mut self.nodes[id.index()];
        node.path = path.clone();
        let descend = match &node.kind {
            NodeKind::Leaf(_) => Descend::Leaf,
            NodeKind::Group(group) => Descend::Group(group.children.clone()),
            NodeKind::List(list) => Descend::List(list.items.clone()),
            NodeKind::Item(item) => Descend::Item(item.inner),
        };

        match descend {
            Descend::Leaf => {}
            Descend::Group(children) => {
                for child in children {
                    let name = self.nodes[child.index()].name.clone();
                    self.recompute_paths(child, format!("{path}/{name}"));
                }
            }
            Descend::List(items) => {
                for (i, item) in items.into_iter().enumerate() {
                    self.recompute_paths(item, format!("{path}/{i}"));
                }
            }
            // The unnamed inner field shares the item's path.
            Descend::Item(inner) => self.recompute_paths(inner, path),
        }
    }
}

impl std::fmt::Debug for FieldTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldTree")
            .field("nodes", &self.nodes.len())
            .field("root", &self.root)
            .field("rendered", &self.rendered)
            .finish()
    }
}
