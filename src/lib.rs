//! Field Tree
//!
//! Compiles a JSON Schema into a live, hierarchical field tree: leaf
//! fields, object groups, array lists, and array items. The tree can
//! produce a JSON value from current input state, accept a JSON value to
//! populate input state, attach validation errors addressed by JSON
//! Pointer, and hide or show subtrees based on cross-field conditions.
//!
//! # Example
//!
//! ```
//! use field_tree::{EditorRegistry, FieldTree, GetOptions, SetOptions};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "object",
//!     "properties": {
//!         "name": { "type": "string" },
//!         "age": { "type": "integer" }
//!     }
//! });
//!
//! let mut tree = FieldTree::compile(&schema, EditorRegistry::with_defaults()).unwrap();
//! tree.render().unwrap();
//!
//! let root = tree.root();
//! tree.set_value(root, &json!({"name": "Ann"}), &SetOptions::default()).unwrap();
//!
//! // Null-valued entries are pruned: "age" was never set.
//! let value = tree.get_value(root, &GetOptions::default()).unwrap();
//! assert_eq!(value, json!({"name": "Ann"}));
//! ```
//!
//! # Schema extensions
//!
//! On top of draft-4 object/array/primitive schemas, the compiler honors:
//!
//! | Keyword | Effect |
//! |---------|--------|
//! | `editor` | Editor kind, overrides shape-based inference |
//! | `optionLabels` | Display labels, required iff `enum` present |
//! | `inputAttributes` | Passed through to the editor untouched |
//! | `showOnly` | Rendered but excluded from extracted values |
//! | `serialize`/`deserialize` | Named value transforms, leaf-only |
//! | `availableIf` | Single-entry sibling-name → expected-value condition |
//! | `templateName` | Presentation hint, ignored by the core |
//!
//! # Ordering contract
//!
//! Editors are attached by [`FieldTree::render`]; reading or writing
//! values before that fails with a not-rendered error. All mutations run
//! to completion synchronously; change listeners are invoked after the
//! mutating call finishes, never in the middle of one.

mod array;
mod compiler;
mod dependency;
mod editor;
mod error;
mod linter;
mod loader;
mod pointer;
mod router;
mod tree;
mod types;
mod validator;
mod value;

pub use editor::{Editor, EditorFactory, EditorRegistry, Transform};
pub use error::{
    FieldError, LoadError, PointerError, SchemaError, ValidateError, ValueError,
};
pub use linter::{lint, lint_file, Diagnostic, FileResult, FileStatus, LintResult, Severity};
pub use loader::{is_url, load_schema, load_schema_auto, load_schema_str};
pub use pointer::{enumerate_fields, resolve};
pub use tree::{
    ArrayItem, ArrayList, ChangeEvent, FieldTree, LeafField, Node, NodeId, NodeKind, ObjectGroup,
};
pub use types::{
    json_type_name, ErrorFields, GetOptions, SetOptions, BUILTIN_EDITOR_KINDS, EXTENSION_KEYWORDS,
};
pub use validator::{strip_extensions, validate_tree, validate_value};

#[cfg(feature = "remote")]
pub use loader::load_schema_url;
