//! Core data types for the YADS document store.
//!
//! This module defines the records the store persists: [`DocumentType`],
//! [`Document`], [`GraphType`], [`Role`], [`GraphRule`], [`Graph`], [`Tag`]
//! and [`DocumentTag`]. All types serialise to and from JSON with camelCase
//! keys. Each field that differs between its Rust name and its wire name
//! declares the mapping explicitly; snake_case spellings are accepted on input
//! as aliases.

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Generate a fresh record id (UUIDv7, sorts in creation order).
pub fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Current UTC time as an RFC 3339 string with microsecond precision.
pub fn now() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ---------------------------------------------------------------------------
// DocumentType
// ---------------------------------------------------------------------------

/// A named document kind (group, notebook, note, task, …) and the JSON Schema
/// its documents' `data` must satisfy.
///
/// `allowedAttributes` is kept as an opaque [`Value`]; it is compiled on
/// demand by [`Schema::compile`](crate::schema::Schema::compile).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentType {
    pub id: String,

    /// Unique type name, e.g. `"task"`.
    #[serde(rename = "type")]
    pub type_name: String,

    /// Draft 2020-12 JSON Schema describing `Document.data`.
    #[serde(alias = "allowed_attributes")]
    pub allowed_attributes: Value,

    /// Attribute names a client shows by default for this type.
    #[serde(default)]
    pub defaults: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl DocumentType {
    pub fn new(type_name: impl Into<String>, allowed_attributes: Value) -> Self {
        Self {
            id: new_id(),
            type_name: type_name.into(),
            allowed_attributes,
            defaults: Vec::new(),
            icon: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// A typed record. Its `data` payload must validate against the schema of
/// the [`DocumentType`] referenced by `document_type` after every write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,

    /// Id of the owning [`DocumentType`].
    #[serde(alias = "document_type")]
    pub document_type: String,

    /// Free-form payload, always a JSON object.
    pub data: Value,

    #[serde(alias = "created_at")]
    pub created_at: String,

    #[serde(alias = "updated_at")]
    pub updated_at: String,
}

impl Document {
    /// Create a document with a fresh id and both timestamps set to now.
    pub fn new(document_type: impl Into<String>, data: Value) -> Self {
        let ts = now();
        Self {
            id: new_id(),
            document_type: document_type.into(),
            data,
            created_at: ts.clone(),
            updated_at: ts,
        }
    }

    /// Refresh `updated_at`. Guarantees the new value differs from the old
    /// one so it can serve as a compare-and-swap token.
    pub fn touch(&mut self) {
        let mut ts = now();
        if ts == self.updated_at {
            ts = bump(&ts);
        }
        self.updated_at = ts;
    }
}

/// Advance an RFC 3339 timestamp by one microsecond.
fn bump(ts: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(ts)
        .map(|t| {
            (t + chrono::Duration::microseconds(1))
                .with_timezone(&chrono::Utc)
                .to_rfc3339_opts(SecondsFormat::Micros, true)
        })
        .unwrap_or_else(|_| now())
}

// ---------------------------------------------------------------------------
// GraphType
// ---------------------------------------------------------------------------

/// How the direction of an edge is interpreted.
///
/// Serialises as a snake_case string (e.g. `"not_directed"`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GraphDirection {
    /// The relation reads in both directions, with its own reverse title.
    Bidirectional,
    /// The relation reads from source to target only.
    Unidirectional,
    /// Direction carries no meaning.
    NotDirected,
}

impl std::fmt::Display for GraphDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphDirection::Bidirectional => write!(f, "bidirectional"),
            GraphDirection::Unidirectional => write!(f, "unidirectional"),
            GraphDirection::NotDirected => write!(f, "not_directed"),
        }
    }
}

impl std::str::FromStr for GraphDirection {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bidirectional" => Ok(GraphDirection::Bidirectional),
            "unidirectional" => Ok(GraphDirection::Unidirectional),
            "not_directed" => Ok(GraphDirection::NotDirected),
            _ => Err(format!(
                "unknown graph direction {:?}; expected one of: \
                 bidirectional, unidirectional, not_directed",
                s
            )),
        }
    }
}

/// Reference data describing one kind of edge, e.g. "contains" / "contained in".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphType {
    pub id: String,

    /// Label read from source to target.
    pub title: String,

    /// Label read from target to source, when it differs.
    #[serde(default, alias = "title_reverse", skip_serializing_if = "Option::is_none")]
    pub title_reverse: Option<String>,

    #[serde(alias = "graph_type")]
    pub graph_type: GraphDirection,
}

impl GraphType {
    pub fn new(title: impl Into<String>, graph_type: GraphDirection) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            title_reverse: None,
            graph_type,
        }
    }
}

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Optional edge annotation such as `"owner"` or `"parent"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Role {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            description: None,
        }
    }
}

// ---------------------------------------------------------------------------
// GraphRule
// ---------------------------------------------------------------------------

/// Permission record: an edge of `graph_type` from a document of type
/// `document_type_source` to one of type `document_type_target` is allowed.
///
/// Unique on `(document_type_source, document_type_target, graph_type)`.
/// When `role` is set, edges matching this rule may carry any role; when it
/// is `None`, they may carry none.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphRule {
    pub id: String,

    #[serde(alias = "document_type_source")]
    pub document_type_source: String,

    #[serde(alias = "document_type_target")]
    pub document_type_target: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(alias = "graph_type")]
    pub graph_type: String,
}

impl GraphRule {
    pub fn new(
        document_type_source: impl Into<String>,
        document_type_target: impl Into<String>,
        graph_type: impl Into<String>,
        role: Option<String>,
    ) -> Self {
        Self {
            id: new_id(),
            document_type_source: document_type_source.into(),
            document_type_target: document_type_target.into(),
            role,
            graph_type: graph_type.into(),
        }
    }

    /// `true` if this rule covers the given `(source, target, graph_type)` triple.
    pub fn matches(&self, source: &str, target: &str, graph_type: &str) -> bool {
        self.document_type_source == source
            && self.document_type_target == target
            && self.graph_type == graph_type
    }
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

/// One edge instance between two documents.
///
/// Endpoints are referenced by id, never owned. `graph_type_reversed` marks
/// an edge materialised as the mirror of a forward relation; such edges are
/// exempt from rule validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Graph {
    pub id: String,

    #[serde(alias = "document_source")]
    pub document_source: String,

    #[serde(alias = "document_target")]
    pub document_target: String,

    #[serde(alias = "graph_type")]
    pub graph_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default, alias = "graph_type_reversed")]
    pub graph_type_reversed: bool,

    #[serde(default)]
    pub weight: i64,
}

impl Graph {
    pub fn new(
        document_source: impl Into<String>,
        document_target: impl Into<String>,
        graph_type: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id(),
            document_source: document_source.into(),
            document_target: document_target.into(),
            graph_type: graph_type.into(),
            role: None,
            graph_type_reversed: false,
            weight: 0,
        }
    }

    /// `true` if `document_id` is either endpoint of this edge.
    pub fn touches(&self, document_id: &str) -> bool {
        self.document_source == document_id || self.document_target == document_id
    }
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

/// A label in a tag tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, alias = "parent_tag", skip_serializing_if = "Option::is_none")]
    pub parent_tag: Option<String>,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            description: None,
            parent_tag: None,
        }
    }
}

/// Association of a [`Tag`] with a [`Document`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentTag {
    pub id: String,
    pub document: String,
    pub tag: String,
}

impl DocumentTag {
    pub fn new(document: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            document: document.into(),
            tag: tag.into(),
        }
    }
}
