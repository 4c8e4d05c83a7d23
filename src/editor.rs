//! The editor capability and the registry that produces editors.
//!
//! The core is polymorphic over anything implementing [`Editor`]: get a
//! value, set a value, report whether the control is hidden. Change
//! notification flows through [`crate::FieldTree::notify_change`] rather
//! than per-editor callbacks, so the tree's synchronous dispatch queue is
//! the single subscription seam.
//!
//! [`EditorRegistry`] maps an editor-kind name to a factory. It is passed
//! into the compiler explicitly, so tests can swap in doubles. The built-in
//! editors are headless value buffers: enough to drive the tree from tests
//! and the CLI, while real widget toolkits register their own factories.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{SchemaError, ValueError};
use crate::types::value_to_string;

/// The capability the core requires from an input control.
pub trait Editor: std::fmt::Debug {
    /// Current raw value of the control.
    fn value(&self) -> Value;

    /// Replace the control's value.
    fn set_value(&mut self, value: Value) -> Result<(), ValueError>;

    /// Hidden editors bypass label/description wrapping in the
    /// presentation layer. The core passes this through untouched.
    fn hidden(&self) -> bool {
        false
    }
}

/// Factory producing an editor from a leaf schema and the leaf's path.
pub type EditorFactory = Box<dyn Fn(&Value, &str) -> Result<Box<dyn Editor>, SchemaError>>;

/// Named value transform used by `serialize`/`deserialize` hooks.
pub type Transform = Box<dyn Fn(Value) -> Value>;

/// Maps editor-kind names to factories and transform names to transforms.
pub struct EditorRegistry {
    factories: HashMap<String, EditorFactory>,
    transforms: HashMap<String, Transform>,
    native_date_input: bool,
}

impl EditorRegistry {
    /// An empty registry. Compilation fails on any editor kind or
    /// transform name the registry does not know.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            transforms: HashMap::new(),
            native_date_input: false,
        }
    }

    /// Registry with the built-in buffer editors (`text`, `checkbox`,
    /// `select`, `date`) and the built-in transforms (`csv.join`,
    /// `csv.split`, `json.encode`, `json.decode`).
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register("text", |schema, _path| {
            Ok(Box::new(BufferEditor::new(schema)) as Box<dyn Editor>)
        });
        registry.register("date", |schema, _path| {
            Ok(Box::new(BufferEditor::new(schema)) as Box<dyn Editor>)
        });
        registry.register("checkbox", |schema, _path| {
            Ok(Box::new(CheckboxEditor::new(schema)) as Box<dyn Editor>)
        });
        registry.register("select", |schema, path| {
            Ok(Box::new(SelectEditor::new(schema, path)) as Box<dyn Editor>)
        });

        registry.register_transform("csv.join", |value| match value {
            Value::Array(items) => Value::String(
                items
                    .iter()
                    .map(value_to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            other => other,
        });
        registry.register_transform("csv.split", |value| match value {
            Value::String(s) => Value::Array(
                s.split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(|part| Value::String(part.to_string()))
                    .collect(),
            ),
            other => other,
        });
        registry.register_transform("json.encode", |value| match value {
            Value::Null => Value::Null,
            other => Value::String(other.to_string()),
        });
        registry.register_transform("json.decode", |value| match value {
            Value::String(s) => match serde_json::from_str(&s) {
                Ok(parsed) => parsed,
                Err(_) => Value::String(s),
            },
            other => other,
        });

        registry
    }

    /// Register (or replace) an editor factory for a kind name.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&Value, &str) -> Result<Box<dyn Editor>, SchemaError> + 'static,
    {
        self.factories.insert(kind.into(), Box::new(factory));
    }

    /// Register (or replace) a named value transform.
    pub fn register_transform<F>(&mut self, name: impl Into<String>, transform: F)
    where
        F: Fn(Value) -> Value + 'static,
    {
        self.transforms.insert(name.into(), Box::new(transform));
    }

    pub fn has_editor(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn has_transform(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }

    /// Declare that the host toolkit renders native date inputs, so
    /// `format: "date"` leaves editor inference at plain text.
    pub fn with_native_date_input(mut self, native: bool) -> Self {
        self.native_date_input = native;
        self
    }

    pub fn native_date_input(&self) -> bool {
        self.native_date_input
    }

    pub(crate) fn create(
        &self,
        kind: &str,
        schema: &Value,
        path: &str,
    ) -> Result<Box<dyn Editor>, SchemaError> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| SchemaError::UnknownEditor {
                path: path.to_string(),
                kind: kind.to_string(),
            })?;
        factory(schema, path)
    }

    pub(crate) fn transform(&self, name: &str) -> Option<&Transform> {
        self.transforms.get(name)
    }
}

impl Default for EditorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for EditorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorRegistry")
            .field("editors", &self.factories.keys().collect::<Vec<_>>())
            .field("transforms", &self.transforms.keys().collect::<Vec<_>>())
            .field("native_date_input", &self.native_date_input)
            .finish()
    }
}

fn hidden_from_attributes(schema: &Value) -> bool {
    schema
        .get("inputAttributes")
        .and_then(|attrs| attrs.get("type"))
        .and_then(Value::as_str)
        == Some("hidden")
}

/// Plain value buffer backing `text` and `date` editors.
#[derive(Debug)]
struct BufferEditor {
    value: Value,
    hidden: bool,
}

impl BufferEditor {
    fn new(schema: &Value) -> Self {
        Self {
            value: Value::Null,
            hidden: hidden_from_attributes(schema),
        }
    }
}

impl Editor for BufferEditor {
    fn value(&self) -> Value {
        self.value.clone()
    }

    fn set_value(&mut self, value: Value) -> Result<(), ValueError> {
        self.value = value;
        Ok(())
    }

    fn hidden(&self) -> bool {
        self.hidden
    }
}

/// Boolean buffer; null clears back to unchecked.
#[derive(Debug)]
struct CheckboxEditor {
    checked: bool,
    hidden: bool,
}

impl CheckboxEditor {
    fn new(schema: &Value) -> Self {
        Self {
            checked: false,
            hidden: hidden_from_attributes(schema),
        }
    }
}

impl Editor for CheckboxEditor {
    fn value(&self) -> Value {
        Value::Bool(self.checked)
    }

    fn set_value(&mut self, value: Value) -> Result<(), ValueError> {
        self.checked = match value {
            Value::Bool(b) => b,
            Value::Null => false,
            other => !value_to_string(&other).is_empty(),
        };
        Ok(())
    }

    fn hidden(&self) -> bool {
        self.hidden
    }
}

/// Selection editor bound to the schema's `enum`. Rejects values outside
/// the declared option set instead of coercing them.
#[derive(Debug)]
struct SelectEditor {
    path: String,
    options: Vec<Value>,
    value: Value,
    hidden: bool,
}

impl SelectEditor {
    fn new(schema: &Value, path: &str) -> Self {
        let options = schema
            .get("enum")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Self {
            path: path.to_string(),
            options,
            value: Value::Null,
            hidden: hidden_from_attributes(schema),
        }
    }
}

impl Editor for SelectEditor {
    fn value(&self) -> Value {
        self.value.clone()
    }

    fn set_value(&mut self, value: Value) -> Result<(), ValueError> {
        if !value.is_null() && !self.options.contains(&value) {
            return Err(ValueError::InvalidSelection {
                path: self.path.clone(),
                value,
            });
        }
        self.value = value;
        Ok(())
    }

    fn hidden(&self) -> bool {
        self.hidden
    }
}
