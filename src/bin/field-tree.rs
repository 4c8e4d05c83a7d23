//! Field Tree CLI
//!
//! Command-line interface for inspecting, filling, and validating
//! schema-compiled field trees.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use field_tree::{
    lint, load_schema_auto, validate_tree, EditorRegistry, FieldTree, FileStatus, GetOptions,
    NodeId, SetOptions, Severity, ValidateError,
};

#[derive(Parser)]
#[command(name = "field-tree")]
#[command(about = "Compile JSON Schemas into field trees; inspect, fill, and validate them")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a schema and print the resulting field tree
    Inspect {
        /// Schema source: file path or URL (http:// or https://)
        schema: String,

        /// Output the tree as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Fill a tree from a data file and print the extracted value
    Fill {
        /// Schema source: file path or URL
        schema: String,

        /// Data file with the value to inject
        data: PathBuf,

        /// Keep mapping entries whose value is null
        #[arg(long)]
        keep_nulls: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Fill a tree from a data file and validate the extracted value
    Validate {
        /// Schema source: file path or URL
        schema: String,

        /// Data file with the value to validate
        data: PathBuf,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Lint schema files for errors the compiler would reject
    Lint {
        /// File or directory to lint
        path: PathBuf,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Suppress progress output, only show errors
        #[arg(long, short)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Inspect { schema, json } => run_inspect(&schema, json),
        Commands::Fill {
            schema,
            data,
            keep_nulls,
            pretty,
            output,
        } => run_fill(&schema, &data, keep_nulls, pretty, output),
        Commands::Validate { schema, data, json } => run_validate(&schema, &data, json),
        Commands::Lint {
            path,
            format,
            strict,
            quiet,
        } => run_lint(&path, &format, strict, quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

/// Load a schema and compile it into a rendered tree.
fn compile_tree(schema_source: &str) -> Result<FieldTree, u8> {
    let schema = load_schema_auto(schema_source).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let mut tree = FieldTree::compile(&schema, EditorRegistry::with_defaults()).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    tree.render().map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    Ok(tree)
}

/// Load a data file and inject it at the root.
fn fill_tree(tree: &mut FieldTree, data: &Path) -> Result<(), u8> {
    let value = field_tree::load_schema(data).map_err(|e| {
        eprintln!("Error loading data: {}", e);
        e.exit_code() as u8
    })?;

    let root = tree.root();
    tree.set_value(root, &value, &SetOptions::default())
        .map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })
}

fn run_inspect(schema_source: &str, json_output: bool) -> Result<(), u8> {
    let tree = compile_tree(schema_source)?;

    if json_output {
        let rendered = node_to_json(&tree, tree.root(), true);
        println!("{}", serde_json::to_string_pretty(&rendered).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?);
    } else {
        print_node(&tree, tree.root(), 0, true);
    }
    Ok(())
}

/// One line per node: indented path, kind, editor kind, and flags.
fn print_node(tree: &FieldTree, id: NodeId, depth: usize, active: bool) {
    let node = tree.node(id);
    let indent = "  ".repeat(depth);
    let label = if node.path.is_empty() {
        "/"
    } else {
        node.path.as_str()
    };

    let mut line = format!("{indent}{label} {}", node.kind_name());
    if let Some(leaf) = node.as_leaf() {
        line.push_str(&format!("({})", leaf.editor_kind));
    }
    if let Some(title) = node.title() {
        line.push_str(&format!(" \"{title}\""));
    }
    if node.required() {
        line.push_str(" required");
    }
    if node.show_only() {
        line.push_str(" showOnly");
    }
    if !active {
        line.push_str(" inactive");
    }
    println!("{line}");

    if let Some(group) = node.as_group() {
        for &child in group.children() {
            let child_active = group.active().contains(&child);
            print_node(tree, child, depth + 1, child_active);
        }
    } else if let Some(list) = node.as_list() {
        for &item in list.items() {
            print_node(tree, item, depth + 1, true);
        }
    } else if let Some(item) = node.as_item() {
        print_node(tree, item.inner(), depth + 1, true);
    }
}

fn node_to_json(tree: &FieldTree, id: NodeId, active: bool) -> Value {
    let node = tree.node(id);
    let mut out = json!({
        "path": node.path,
        "name": node.name,
        "kind": node.kind_name(),
        "active": active,
    });

    if let Some(leaf) = node.as_leaf() {
        out["editor"] = json!(leaf.editor_kind);
    }
    if let Some(title) = node.title() {
        out["title"] = json!(title);
    }
    if node.required() {
        out["required"] = json!(true);
    }
    if node.show_only() {
        out["showOnly"] = json!(true);
    }

    if let Some(group) = node.as_group() {
        out["children"] = Value::Array(
            group
                .children()
                .iter()
                .map(|&child| node_to_json(tree, child, group.active().contains(&child)))
                .collect(),
        );
    } else if let Some(list) = node.as_list() {
        out["items"] = Value::Array(
            list.items()
                .iter()
                .map(|&item| node_to_json(tree, item, true))
                .collect(),
        );
    } else if let Some(item) = node.as_item() {
        out["inner"] = node_to_json(tree, item.inner(), true);
    }

    out
}

fn run_fill(
    schema_source: &str,
    data: &Path,
    keep_nulls: bool,
    pretty: bool,
    output: Option<PathBuf>,
) -> Result<(), u8> {
    let mut tree = compile_tree(schema_source)?;
    fill_tree(&mut tree, data)?;

    let options = GetOptions::new().keep_null_values(keep_nulls);
    let root = tree.root();
    let value = tree.get_value(root, &options).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let json_output = if pretty {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

fn run_validate(schema_source: &str, data: &Path, json_output: bool) -> Result<(), u8> {
    let mut tree = compile_tree(schema_source)?;
    fill_tree(&mut tree, data)?;

    match validate_tree(&mut tree) {
        Ok(()) => {
            if json_output {
                println!(r#"{{"valid":true}}"#);
            } else {
                println!("Valid");
            }
            Ok(())
        }
        Err(ValidateError::Invalid { errors }) => {
            if json_output {
                let output = json!({
                    "valid": false,
                    "errors": errors
                });
                println!("{}", output);
            } else {
                eprintln!("Validation failed:");
                for error in errors {
                    eprintln!("  {}", error);
                }
            }
            Err(1)
        }
        Err(e) => {
            if json_output {
                println!(r#"{{"valid":false,"error":"{}"}}"#, e);
            } else {
                eprintln!("Error: {}", e);
            }
            Err(e.exit_code() as u8)
        }
    }
}

fn run_lint(path: &Path, format: &str, strict: bool, quiet: bool) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(2);
    }

    let result = lint(path, strict);

    if format == "json" {
        match serde_json::to_string_pretty(&result) {
            Ok(rendered) => println!("{}", rendered),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                return Err(2);
            }
        }
    } else {
        // Text output
        if !quiet {
            println!("Linting {} ...\n", path.display());
        }

        for file_result in &result.results {
            let status_icon = match file_result.status {
                FileStatus::Ok => "\x1b[32m✓\x1b[0m",
                FileStatus::Warning => "\x1b[33m⚠\x1b[0m",
                FileStatus::Error => "\x1b[31m✗\x1b[0m",
            };

            if !quiet || file_result.status != FileStatus::Ok {
                println!("  {} {}", status_icon, file_result.file.display());
            }

            for diag in &file_result.diagnostics {
                let color = match diag.severity {
                    Severity::Error => "\x1b[31m",
                    Severity::Warning => "\x1b[33m",
                };
                if !quiet || diag.severity == Severity::Error {
                    println!(
                        "    {}{}[{}]\x1b[0m: {} - {}",
                        color,
                        match diag.severity {
                            Severity::Error => "error",
                            Severity::Warning => "warning",
                        },
                        diag.code,
                        diag.path,
                        diag.message
                    );
                }
            }
        }

        println!();
        if result.is_ok() && (!strict || result.warnings == 0) {
            println!(
                "\x1b[32m✓ {} files checked, all passed\x1b[0m",
                result.files_checked
            );
        } else {
            println!(
                "\x1b[31m✗ {} files checked: {} passed, {} failed ({} errors, {} warnings)\x1b[0m",
                result.files_checked, result.passed, result.failed, result.errors, result.warnings
            );
        }
    }

    if result.is_ok() && (!strict || result.warnings == 0) {
        Ok(())
    } else {
        Err(1)
    }
}
