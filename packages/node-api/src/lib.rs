//! Request and response bodies for the YADS REST API.
//!
//! Entities themselves ([`yads::Document`], [`yads::Graph`], …) are returned
//! as-is; this crate adds the bodies clients send, the page and view
//! envelopes, and the error format.
//!
//! # Endpoints covered
//!
//! | Method | Path | Type |
//! |--------|------|------|
//! | GET | `/version` | → [`VersionInfo`] |
//! | POST, PUT | `/document_types[/{id}]` | [`DocumentTypeRequest`] → [`yads::DocumentType`] |
//! | POST, PUT | `/documents[/{id}]` | [`DocumentRequest`] → [`yads::Document`] |
//! | PATCH | `/documents/{id}` | [`DocumentPatch`] → [`yads::Document`] |
//! | GET | `/documents/{id}/links` | → [`LinksResponse`] |
//! | GET | `/documents/{id}/subgraph` | → [`SubgraphResponse`] |
//! | POST, PUT | `/graph_types[/{id}]` | [`GraphTypeRequest`] → [`yads::GraphType`] |
//! | POST, PUT | `/roles[/{id}]` | [`RoleRequest`] → [`yads::Role`] |
//! | POST, PUT | `/graph_rules[/{id}]` | [`GraphRuleRequest`] → [`yads::GraphRule`] |
//! | POST, PUT | `/graphs[/{id}]` | [`GraphRequest`] → [`yads::Graph`] |
//! | POST, PUT | `/tags[/{id}]` | [`TagRequest`] → [`yads::Tag`] |
//! | POST | `/document_tags` | [`DocumentTagRequest`] → [`yads::DocumentTag`] |
//! | GET | any collection | → [`ListResponse`] |
//! | * | any, on failure | → [`ErrorResponse`] |

pub mod document;
pub mod error;
pub mod graph;
pub mod list;
pub mod tag;
pub mod version;

pub use document::{DocumentPatch, DocumentRequest, DocumentTypeRequest};
pub use error::{codes, ErrorResponse, ViolationRecord};
pub use graph::{
    GraphRequest, GraphRuleRequest, GraphTypeRequest, LinksResponse, RoleRequest, SubgraphResponse,
};
pub use list::{Identified, ListQuery, ListResponse, DEFAULT_LIMIT, MAX_LIMIT};
pub use tag::{DocumentTagRequest, TagRequest};
pub use version::VersionInfo;
