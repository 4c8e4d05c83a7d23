//! Schema linting - static analysis of field-tree schema files.
//!
//! Reports every condition the compiler would reject (missing `type`,
//! malformed `availableIf`, `enum`/`optionLabels` mismatches, unknown
//! editor kinds and transforms, non-object array `items`) plus warnings
//! for tolerated-but-suspicious shapes.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::compiler;
use crate::dependency;
use crate::editor::EditorRegistry;
use crate::error::SchemaError;
use crate::loader::load_schema;
use crate::types::json_type_name;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message from linting.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub file: PathBuf,
    /// JSON path to the issue (e.g., "/person/name")
    pub path: String,
    pub message: String,
}

/// Result of linting a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Status of a linted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Result of linting a directory or set of files.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// Returns true if all files passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Lint a file or directory.
///
/// If path is a directory, recursively finds all .json files.
/// If `strict` is true, warnings are treated as errors.
/// Returns aggregated results for all files.
pub fn lint(path: &Path, strict: bool) -> LintResult {
    let files = collect_schema_files(path);
    let mut results = Vec::new();
    let mut total_errors = 0;
    let mut total_warnings = 0;

    for file in &files {
        let file_result = lint_file(file, path);
        total_errors += file_result
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count();
        total_warnings += file_result
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count();
        results.push(file_result);
    }

    let failed = results
        .iter()
        .filter(|r| {
            if strict {
                r.status != FileStatus::Ok
            } else {
                r.status == FileStatus::Error
            }
        })
        .count();

    LintResult {
        path: path.to_path_buf(),
        files_checked: files.len(),
        passed: files.len() - failed,
        failed,
        errors: total_errors,
        warnings: total_warnings,
        results,
    }
}

/// Lint a single schema file.
pub fn lint_file(file: &Path, base_path: &Path) -> FileResult {
    let mut diagnostics = Vec::new();

    // Try to load the file (checks syntax)
    let schema = match load_schema(file) {
        Ok(s) => s,
        Err(e) => {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                code: "E001".to_string(),
                file: file.to_path_buf(),
                path: "/".to_string(),
                message: format!("syntax error: {}", e),
            });
            return FileResult {
                file: file.strip_prefix(base_path).unwrap_or(file).to_path_buf(),
                status: FileStatus::Error,
                diagnostics,
            };
        }
    };

    let registry = EditorRegistry::with_defaults();
    check_schema(&schema, file, "", None, &registry, &mut diagnostics);

    let has_errors = diagnostics.iter().any(|d| d.severity == Severity::Error);
    let has_warnings = diagnostics.iter().any(|d| d.severity == Severity::Warning);

    let status = if has_errors {
        FileStatus::Error
    } else if has_warnings {
        FileStatus::Warning
    } else {
        FileStatus::Ok
    };

    FileResult {
        file: file.strip_prefix(base_path).unwrap_or(file).to_path_buf(),
        status,
        diagnostics,
    }
}

/// Recursively check one schema fragment.
///
/// `siblings` is the property-name set of the enclosing object schema;
/// `None` at positions where `availableIf` is never evaluated (the
/// document root and item-schema roots).
fn check_schema(
    schema: &Value,
    file: &Path,
    path: &str,
    siblings: Option<&[String]>,
    registry: &EditorRegistry,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if schema.get("type").is_none() {
        push_error(
            diagnostics,
            file,
            path,
            &SchemaError::MissingType {
                path: path.to_string(),
            },
        );
    }

    match siblings {
        Some(names) => {
            if let Err(e) = dependency::parse_condition(schema, path, names) {
                push_error(diagnostics, file, path, &e);
            }
        }
        None => {
            if schema.get("availableIf").is_some() {
                diagnostics.push(Diagnostic {
                    severity: Severity::Warning,
                    code: "W001".to_string(),
                    file: file.to_path_buf(),
                    path: path.to_string(),
                    message: "\"availableIf\" here has no siblings and is never evaluated"
                        .to_string(),
                });
            }
        }
    }

    if let Some(hint) = schema.get("editor") {
        match hint.as_str() {
            None => push_error(
                diagnostics,
                file,
                path,
                &SchemaError::InvalidEditor {
                    path: path.to_string(),
                    actual: json_type_name(hint).to_string(),
                },
            ),
            Some(kind) if !registry.has_editor(kind) => push_error(
                diagnostics,
                file,
                path,
                &SchemaError::UnknownEditor {
                    path: path.to_string(),
                    kind: kind.to_string(),
                },
            ),
            Some(_) => {}
        }
        check_leaf(schema, file, path, registry, diagnostics);
        return;
    }

    match schema.get("type").and_then(Value::as_str) {
        Some("object") => {
            check_container_hooks(schema, file, path, diagnostics);
            if let Some(props) = schema.get("properties").and_then(Value::as_object) {
                let names: Vec<String> = props.keys().cloned().collect();
                for (name, child) in props {
                    check_schema(
                        child,
                        file,
                        &format!("{path}/{name}"),
                        Some(&names),
                        registry,
                        diagnostics,
                    );
                }
            }
        }
        Some("array") => {
            check_container_hooks(schema, file, path, diagnostics);
            match schema.get("items") {
                Some(items @ Value::Object(_)) => {
                    check_schema(items, file, &format!("{path}/items"), None, registry, diagnostics);
                }
                Some(other) => push_error(
                    diagnostics,
                    file,
                    path,
                    &SchemaError::InvalidItems {
                        path: path.to_string(),
                        actual: json_type_name(other).to_string(),
                    },
                ),
                None => push_error(
                    diagnostics,
                    file,
                    path,
                    &SchemaError::InvalidItems {
                        path: path.to_string(),
                        actual: "nothing".to_string(),
                    },
                ),
            }
        }
        _ => check_leaf(schema, file, path, registry, diagnostics),
    }
}

fn check_leaf(
    schema: &Value,
    file: &Path,
    path: &str,
    registry: &EditorRegistry,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match compiler::check_option_labels(schema, path) {
        Err(e) => push_error(diagnostics, file, path, &e),
        Ok(()) => {
            if schema.get("enum").and_then(Value::as_array).is_some_and(Vec::is_empty) {
                diagnostics.push(Diagnostic {
                    severity: Severity::Warning,
                    code: "W002".to_string(),
                    file: file.to_path_buf(),
                    path: path.to_string(),
                    message: "\"enum\" declares no options".to_string(),
                });
            }
        }
    }

    for keyword in ["serialize", "deserialize"] {
        if let Err(e) = compiler::check_hook(registry, schema, path, keyword) {
            push_error(diagnostics, file, path, &e);
        }
    }
}

fn check_container_hooks(
    schema: &Value,
    file: &Path,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for keyword in ["serialize", "deserialize"] {
        if schema.get(keyword).is_some() {
            push_error(
                diagnostics,
                file,
                path,
                &SchemaError::HookOnContainer {
                    path: path.to_string(),
                    keyword,
                },
            );
        }
    }
}

fn push_error(diagnostics: &mut Vec<Diagnostic>, file: &Path, path: &str, error: &SchemaError) {
    diagnostics.push(Diagnostic {
        severity: Severity::Error,
        code: error_code(error).to_string(),
        file: file.to_path_buf(),
        path: path.to_string(),
        message: error.to_string(),
    });
}

fn error_code(error: &SchemaError) -> &'static str {
    match error {
        SchemaError::MissingType { .. } => "E002",
        SchemaError::InvalidEditor { .. } | SchemaError::UnknownEditor { .. } => "E003",
        SchemaError::InvalidItems { .. } => "E004",
        SchemaError::ConditionNotObject { .. }
        | SchemaError::ConditionMultipleKeys { .. }
        | SchemaError::InvalidPattern { .. } => "E005",
        SchemaError::UnknownConditionKey { .. } => "E006",
        SchemaError::MissingOptionLabels { .. }
        | SchemaError::OptionLabelsWithoutEnum { .. }
        | SchemaError::OptionLabelsLength { .. } => "E007",
        SchemaError::InvalidHook { .. } | SchemaError::UnknownTransform { .. } => "E008",
        SchemaError::HookOnContainer { .. } => "E009",
        SchemaError::Invalid { .. } => "E010",
    }
}

/// Collect all .json files in a path (file or directory).
fn collect_schema_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            return vec![path.to_path_buf()];
        }
        return vec![];
    }

    let mut files = Vec::new();
    collect_files_recursive(path, &mut files);
    files.sort();
    files
}

fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files_recursive(&path, files);
        } else if path.extension().map(|e| e == "json").unwrap_or(false) {
            files.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    fn lint_str(content: &str) -> FileResult {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        lint_file(file.path(), file.path().parent().unwrap())
    }

    #[test]
    fn lint_valid_schema() {
        let result = lint_str(
            r#"{
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "done": { "type": "boolean" }
            }
        }"#,
        );
        assert_eq!(result.status, FileStatus::Ok);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn lint_invalid_json_syntax() {
        let result = lint_str("{ not valid json }");
        assert_eq!(result.status, FileStatus::Error);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, "E001");
    }

    #[test]
    fn lint_missing_type() {
        let result = lint_str(
            r#"{
            "type": "object",
            "properties": {
                "name": { "title": "typeless" }
            }
        }"#,
        );
        assert_eq!(result.status, FileStatus::Error);
        assert!(result
            .diagnostics
            .iter()
            .any(|d| d.code == "E002" && d.path == "/name"));
    }

    #[test]
    fn lint_unknown_editor() {
        let result = lint_str(
            r#"{
            "type": "object",
            "properties": {
                "body": { "type": "string", "editor": "rich-text" }
            }
        }"#,
        );
        assert!(result.diagnostics.iter().any(|d| d.code == "E003"));
    }

    #[test]
    fn lint_bad_items() {
        let result = lint_str(
            r#"{
            "type": "object",
            "properties": {
                "tags": { "type": "array", "items": true }
            }
        }"#,
        );
        assert!(result.diagnostics.iter().any(|d| d.code == "E004"));
    }

    #[test]
    fn lint_malformed_condition() {
        let result = lint_str(
            r#"{
            "type": "object",
            "properties": {
                "a": { "type": "string" },
                "b": { "type": "string", "availableIf": { "a": "x", "c": "y" } }
            }
        }"#,
        );
        assert!(result.diagnostics.iter().any(|d| d.code == "E005"));
    }

    #[test]
    fn lint_unknown_condition_sibling() {
        let result = lint_str(
            r#"{
            "type": "object",
            "properties": {
                "b": { "type": "string", "availableIf": { "ghost": "x" } }
            }
        }"#,
        );
        assert!(result.diagnostics.iter().any(|d| d.code == "E006"));
    }

    #[test]
    fn lint_option_labels_mismatch() {
        let result = lint_str(
            r#"{
            "type": "object",
            "properties": {
                "color": { "type": "string", "enum": ["r", "g"], "optionLabels": ["Red"] }
            }
        }"#,
        );
        assert!(result.diagnostics.iter().any(|d| d.code == "E007"));
    }

    #[test]
    fn lint_unknown_transform() {
        let result = lint_str(
            r#"{
            "type": "object",
            "properties": {
                "tags": { "type": "string", "serialize": "bogus" }
            }
        }"#,
        );
        assert!(result.diagnostics.iter().any(|d| d.code == "E008"));
    }

    #[test]
    fn lint_hook_on_container() {
        let result = lint_str(
            r#"{
            "type": "object",
            "serialize": "csv.join",
            "properties": {}
        }"#,
        );
        assert!(result.diagnostics.iter().any(|d| d.code == "E009"));
    }

    #[test]
    fn lint_root_condition_warns() {
        let result = lint_str(
            r#"{
            "type": "object",
            "availableIf": { "x": 1 },
            "properties": {}
        }"#,
        );
        assert_eq!(result.status, FileStatus::Warning);
        assert!(result.diagnostics.iter().any(|d| d.code == "W001"));
    }

    #[test]
    fn lint_empty_enum_warns() {
        let result = lint_str(
            r#"{
            "type": "object",
            "properties": {
                "color": { "type": "string", "enum": [], "optionLabels": [] }
            }
        }"#,
        );
        assert_eq!(result.status, FileStatus::Warning);
        assert!(result.diagnostics.iter().any(|d| d.code == "W002"));
    }

    #[test]
    fn lint_descends_into_item_schemas() {
        let result = lint_str(
            r#"{
            "type": "object",
            "properties": {
                "rows": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "cell": { "title": "typeless" }
                        }
                    }
                }
            }
        }"#,
        );
        assert!(result
            .diagnostics
            .iter()
            .any(|d| d.code == "E002" && d.path == "/rows/items/cell"));
    }

    #[test]
    fn lint_directory() {
        let dir = tempdir().unwrap();

        let valid_path = dir.path().join("valid.json");
        std::fs::write(
            &valid_path,
            r#"{"type": "object", "properties": {"x": {"type": "string"}}}"#,
        )
        .unwrap();

        let invalid_path = dir.path().join("invalid.json");
        std::fs::write(&invalid_path, "{ not json }").unwrap();

        let result = lint(dir.path(), false);
        assert_eq!(result.files_checked, 2);
        assert_eq!(result.passed, 1);
        assert_eq!(result.failed, 1);
        assert!(!result.is_ok());
    }

    #[test]
    fn lint_strict_mode() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.json");
        // Schema with warning only (empty enum).
        std::fs::write(
            &file_path,
            r#"{"type": "object", "properties": {"c": {"type": "string", "enum": [], "optionLabels": []}}}"#,
        )
        .unwrap();

        // Non-strict: warnings don't cause failure
        let result = lint(&file_path, false);
        assert_eq!(result.files_checked, 1);
        assert_eq!(result.passed, 1);
        assert_eq!(result.failed, 0);

        // Strict: warnings cause failure
        let result = lint(&file_path, true);
        assert_eq!(result.files_checked, 1);
        assert_eq!(result.passed, 0);
        assert_eq!(result.failed, 1);
    }
}
