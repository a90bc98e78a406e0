//! `yads`: YADS command-line interface.
//!
//! Offline subcommands run the same validators the server runs:
//!
//! - **`validate`**: check document data against a schema or a reference type.
//! - **`merge`**: apply a PATCH body (with `-key` deletion markers) to stored data.
//! - **`check-edge`**: ask the graph rules whether an edge may exist.
//! - **`links`**: render a file of graph edges as text.
//! - **`fixtures`**: print the reference seed data as JSON.
//!
//! Two talk to a running node: **`seed`** loads the fixtures into it and
//! **`version`** reports the CLI's and, with `--node`, the server's version.
//!
//! File arguments accept `-` for stdin.

mod remote;

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde_json::Value;
use yads::{
    render, validate_edge, DocumentGraph, EdgeCandidate, Fixtures, Graph, Named, RuleTable, Schema,
    Violation,
};

/// yads: typed-document and graph store CLI
///
/// Validate document data, preview PATCH merges, check graph edges, and seed
/// a running node.
#[derive(Parser)]
#[command(name = "yads", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate document data against a schema.
    ///
    /// FILE holds one data object or an array of them. The schema is either
    /// a JSON Schema file (`--schema`) or a reference type (`--type note`).
    /// Exits 0 if everything is valid, 1 otherwise.
    Validate {
        /// Path to a JSON file, or `-` for stdin.
        file: PathBuf,

        /// JSON Schema (draft 2020-12) to validate against.
        #[arg(short, long, value_name = "FILE", conflicts_with = "document_type")]
        schema: Option<PathBuf>,

        /// Name of a reference document type: group | notebook | note | task
        #[arg(short = 't', long = "type", value_name = "NAME")]
        document_type: Option<String>,
    },

    /// Merge a PATCH body onto stored data and print the result.
    ///
    /// Keys prefixed with `-` delete the unprefixed key, at any depth.
    ///
    /// Example:
    ///   yads merge stored.json patch.json
    Merge {
        /// The stored data.
        base: PathBuf,

        /// The PATCH body.
        patch: PathBuf,

        /// Validate the merged result against a reference document type.
        #[arg(short = 't', long = "type", value_name = "NAME")]
        document_type: Option<String>,
    },

    /// Check whether an edge between two reference document types is allowed.
    ///
    /// Example:
    ///   yads check-edge group notebook contains
    ///   yads check-edge task task related --role parent
    CheckEdge {
        /// Source document type name.
        source: String,

        /// Target document type name.
        target: String,

        /// Graph type title: contains | related | linked
        graph_type: String,

        /// Role name carried by the edge.
        #[arg(long, value_name = "NAME")]
        role: Option<String>,

        /// Mark the edge as a derived reverse edge.
        #[arg(long)]
        reversed: bool,
    },

    /// Render a JSON array of graph edges as text.
    Links {
        /// Path to a JSON file, or `-` for stdin.
        file: PathBuf,

        /// Show only the links of this document id.
        #[arg(short, long, value_name = "ID")]
        document: Option<String>,
    },

    /// Print the reference document types, graph types, roles and rules.
    Fixtures,

    /// Load the reference fixtures into a running node.
    Seed {
        /// Base URL of the node.
        #[arg(long, env = "YADS_NODE", default_value = "http://127.0.0.1:3000")]
        node: String,
    },

    /// Print the CLI version, and the node's when `--node` is given.
    Version {
        /// Base URL of a node to query.
        #[arg(long, env = "YADS_NODE")]
        node: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Validate {
            file,
            schema,
            document_type,
        } => {
            let schema_doc = match (schema, document_type) {
                (Some(path), _) => parse_json(&read_input(&path), &path),
                (None, Some(name)) => reference_schema(&name),
                (None, None) => fatal("one of --schema or --type is required"),
            };
            let schema = Schema::compile(&schema_doc)
                .unwrap_or_else(|e| fatal(&format!("schema is unusable: {e}")));

            let input = parse_json(&read_input(&file), &file);
            let items = match input {
                Value::Array(items) if items.is_empty() => {
                    fatal("input is an empty array, nothing to validate")
                }
                Value::Array(items) => items,
                other => vec![other],
            };

            let mut all_valid = true;
            for (i, data) in items.iter().enumerate() {
                let violations = check_data(&schema, data);
                if items.len() > 1 {
                    print!("[{i}] ");
                }
                print!("{}", render::render_violations(&violations));
                all_valid &= violations.is_empty();
            }
            if !all_valid {
                process::exit(1);
            }
        }

        Command::Merge {
            base,
            patch,
            document_type,
        } => {
            let base = parse_json(&read_input(&base), &base);
            let patch = parse_json(&read_input(&patch), &patch);
            let merged = yads::merge_owned(base, patch);
            println!("{}", to_pretty(&merged));

            if let Some(name) = document_type {
                let schema = Schema::compile(&reference_schema(&name))
                    .unwrap_or_else(|e| fatal(&format!("schema is unusable: {e}")));
                let violations = check_data(&schema, &merged);
                eprint!("{}", render::render_violations(&violations));
                if !violations.is_empty() {
                    process::exit(1);
                }
            }
        }

        Command::CheckEdge {
            source,
            target,
            graph_type,
            role,
            reversed,
        } => {
            let fixtures = Fixtures::build();
            let named_type = |name: &str| {
                fixtures
                    .document_type(name)
                    .map(|t| Named::new(&t.id, &t.type_name))
                    .unwrap_or_else(|| fatal(&format!("unknown document type {name:?}")))
            };
            let gt = fixtures
                .graph_type(&graph_type)
                .unwrap_or_else(|| fatal(&format!("unknown graph type {graph_type:?}")));
            let role = role.map(|name| {
                fixtures
                    .role(&name)
                    .map(|r| r.id.clone())
                    .unwrap_or_else(|| fatal(&format!("unknown role {name:?}")))
            });

            let candidate = EdgeCandidate {
                source_type: named_type(&source),
                target_type: named_type(&target),
                graph_type: Named::new(&gt.id, &gt.title),
                role,
                reversed,
            };
            let rules = RuleTable::from_rules(fixtures.graph_rules.iter().cloned())
                .unwrap_or_else(|e| fatal(&e.to_string()));
            let violations = validate_edge(&candidate, &rules);
            print!("{}", render::render_violations(&violations));
            if !violations.is_empty() {
                process::exit(1);
            }
        }

        Command::Links { file, document } => {
            let json = read_input(&file);
            let edges: Vec<Graph> = serde_json::from_str(&json)
                .unwrap_or_else(|e| fatal(&format!("failed to parse input as graph edges: {e}")));
            let mut graph = DocumentGraph::from_edges(edges);
            for graph_type in Fixtures::build().graph_types {
                graph.add_graph_type(graph_type);
            }
            match document {
                Some(id) => print!("{}", render::render_links(&id, &graph.links(&id))),
                None => print!("{}", render::render_graph(&graph)),
            }
        }

        Command::Fixtures => {
            println!("{}", to_pretty(&Fixtures::build()));
        }

        Command::Seed { node } => {
            let client = remote::NodeClient::new(&node).unwrap_or_else(|e| fatal(&e.to_string()));
            let summary = client
                .seed(&Fixtures::build())
                .unwrap_or_else(|e| fatal(&e.to_string()));
            println!("{summary}");
        }

        Command::Version { node } => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            if let Some(node) = node {
                let client = remote::NodeClient::new(&node).unwrap_or_else(|e| fatal(&e.to_string()));
                let info = client.version().unwrap_or_else(|e| fatal(&e.to_string()));
                println!("{} {} at {node}", info.name, info.version);
            }
        }
    }
}

/// Validate one data value the way the server validates `Document.data`.
fn check_data(schema: &Schema, data: &Value) -> Vec<Violation> {
    if !data.is_object() {
        return vec![Violation::new("", "data must be an object")];
    }
    schema.validate(data)
}

fn reference_schema(name: &str) -> Value {
    match name {
        yads::fixtures::GROUP => yads::fixtures::group_schema(),
        yads::fixtures::NOTEBOOK => yads::fixtures::notebook_schema(),
        yads::fixtures::NOTE => yads::fixtures::note_schema(),
        yads::fixtures::TASK => yads::fixtures::task_schema(),
        other => fatal(&format!(
            "unknown document type {other:?}; expected one of: group, notebook, note, task"
        )),
    }
}

/// Read the full contents of a file, or stdin when the path is `"-"`.
fn read_input(path: &Path) -> String {
    if path.to_str() == Some("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .unwrap_or_else(|e| fatal(&format!("failed to read stdin: {}", e)));
        buf
    } else {
        fs::read_to_string(path).unwrap_or_else(|e| {
            fatal(&format!("failed to read {}: {}", path.display(), e))
        })
    }
}

fn parse_json(text: &str, path: &Path) -> Value {
    serde_json::from_str(text)
        .unwrap_or_else(|e| fatal(&format!("{} is not valid JSON: {}", path.display(), e)))
}

fn to_pretty<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| fatal(&format!("failed to serialise output: {e}")))
}

/// Print an error message to stderr and exit with code 2.
fn fatal(msg: &str) -> ! {
    eprintln!("yads: {}", msg);
    process::exit(2);
}
