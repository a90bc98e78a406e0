//! Domain core of YADS, a typed-document and graph-relationship store.
//!
//! Documents carry a free-form `data` payload whose shape is defined at
//! runtime by their document type's JSON Schema. Documents are linked by
//! typed graph edges, and which links may exist is governed by a rule table.
//! This crate holds the data model and the two validators that guard every
//! write; it performs no I/O. The HTTP server (`yads-node`), its wire types
//! (`yads-api`) and the `yads` CLI are built on it.
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`types`] | Records: [`DocumentType`], [`Document`], [`GraphType`], [`Role`], [`GraphRule`], [`Graph`], [`Tag`], [`DocumentTag`] |
//! | [`schema`] | Draft 2020-12 subset evaluator for document `data` |
//! | [`merge`] | Deep merge with deletion markers for PATCH bodies |
//! | [`rules`] | Graph rule checks for proposed edges |
//! | [`registry`] | Compiled-schema cache shared across requests |
//! | [`graph`] | In-memory link traversal over graph edges |
//! | [`render`] | Plain-text rendering for terminals |
//! | [`fixtures`] | The reference document types, graph types, roles and rules |
//! | [`violation`] | [`Violation`] and [`ResolutionError`] |
//!
//! # Quick start
//!
//! ```rust,ignore
//! use serde_json::json;
//! use yads::{fixtures, merge, validate_data};
//!
//! let stored = json!({ "title": "Buy milk", "done": false });
//! let merged = merge(&stored, &json!({ "done": true, "-title": null }));
//!
//! let violations = validate_data(&merged, &fixtures::task_schema()).unwrap();
//! assert_eq!(violations[0].path, "/title");
//! ```

pub mod fixtures;
pub mod graph;
pub mod merge;
pub mod registry;
pub mod render;
pub mod rules;
pub mod schema;
pub mod types;
pub mod violation;

pub use fixtures::Fixtures;
pub use graph::{DocumentGraph, Link, LinkDirection};
pub use merge::{collect_deletions, merge, merge_owned, DeletionSet};
pub use registry::SchemaCache;
pub use rules::{validate_edge, DuplicateRule, EdgeCandidate, Named, RuleLookup, RuleTable};
pub use schema::{validate_data, validate_document, Schema};
pub use types::{
    Document, DocumentTag, DocumentType, Graph, GraphDirection, GraphRule, GraphType, Role, Tag,
};
pub use violation::{ResolutionError, Violation};
