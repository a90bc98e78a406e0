//! Reference seed data.
//!
//! Four document types ship with every store: `group`, `notebook`, `note` and
//! `task`. Groups contain notebooks, notebooks contain notes and tasks, notes
//! and tasks may be linked to each other, and tasks may be related to tasks
//! under a role such as `parent`.
//!
//! | Source | Target | Graph type | Role |
//! |--------|--------|------------|------|
//! | group | notebook | contains | none |
//! | notebook | note | contains | none |
//! | notebook | task | contains | none |
//! | note | note | linked | none |
//! | note | task | linked | none |
//! | task | task | related | any |
//! | group | group | related | any |

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::types::{DocumentType, GraphDirection, GraphRule, GraphType, Role};

pub const GROUP: &str = "group";
pub const NOTEBOOK: &str = "notebook";
pub const NOTE: &str = "note";
pub const TASK: &str = "task";

pub const CONTAINS: &str = "contains";
pub const RELATED: &str = "related";
pub const LINKED: &str = "linked";

const SCHEMA_DIALECT: &str = "https://json-schema.org/draft/2020-12/schema";

/// The `allowedAttributes` of the `group` type.
pub fn group_schema() -> Value {
    json!({
        "$id": "https://yads.dev/schemas/group.json",
        "$schema": SCHEMA_DIALECT,
        "title": "Group",
        "type": "object",
        "additionalProperties": false,
        "required": ["title"],
        "properties": {
            "title": { "type": "string", "minLength": 1, "maxLength": 255 },
            "description": { "type": ["string", "null"] }
        }
    })
}

/// The `allowedAttributes` of the `notebook` type.
pub fn notebook_schema() -> Value {
    json!({
        "$id": "https://yads.dev/schemas/notebook.json",
        "$schema": SCHEMA_DIALECT,
        "title": "Notebook",
        "type": "object",
        "additionalProperties": false,
        "required": ["title"],
        "properties": {
            "title": { "type": "string", "minLength": 1, "maxLength": 255 },
            "description": { "type": ["string", "null"] },
            "color": { "type": ["string", "null"], "maxLength": 7 }
        }
    })
}

/// The `allowedAttributes` of the `note` type.
pub fn note_schema() -> Value {
    json!({
        "$id": "https://yads.dev/schemas/note.json",
        "$schema": SCHEMA_DIALECT,
        "title": "Note",
        "type": "object",
        "additionalProperties": false,
        "required": ["title"],
        "properties": {
            "title": { "type": "string", "minLength": 1, "maxLength": 255 },
            "content": { "type": ["string", "null"] },
            "pinned": { "type": ["boolean", "null"] },
            "reminder": { "type": ["string", "null"], "format": "date-time" }
        }
    })
}

/// The `allowedAttributes` of the `task` type.
pub fn task_schema() -> Value {
    json!({
        "$id": "https://yads.dev/schemas/task.json",
        "$schema": SCHEMA_DIALECT,
        "title": "Task",
        "type": "object",
        "additionalProperties": false,
        "required": ["title"],
        "properties": {
            "title": { "type": "string", "minLength": 1, "maxLength": 255 },
            "description": { "type": ["string", "null"] },
            "done": { "type": ["boolean", "null"] },
            "priority": { "type": ["integer", "null"], "minimum": 0, "maximum": 5 },
            "dueDate": { "type": ["string", "null"], "format": "date" },
            "dueTime": { "type": ["string", "null"], "format": "time" }
        }
    })
}

/// A consistent set of seed records with freshly generated ids.
///
/// Graph rules reference the document type, graph type and role ids of the
/// same set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixtures {
    pub document_types: Vec<DocumentType>,
    pub graph_types: Vec<GraphType>,
    pub roles: Vec<Role>,
    pub graph_rules: Vec<GraphRule>,
}

impl Fixtures {
    pub fn build() -> Self {
        let document_types = vec![
            document_type(GROUP, group_schema(), &["title"], "folder"),
            document_type(NOTEBOOK, notebook_schema(), &["title", "color"], "book"),
            document_type(NOTE, note_schema(), &["title", "content"], "sticky-note"),
            document_type(TASK, task_schema(), &["title", "done", "dueDate"], "check-square"),
        ];

        let graph_types = vec![
            graph_type(CONTAINS, Some("contained in"), GraphDirection::Unidirectional),
            graph_type(RELATED, Some("related to"), GraphDirection::Bidirectional),
            graph_type(LINKED, None, GraphDirection::NotDirected),
        ];

        let roles = vec![
            role("owner", "Owns the target document"),
            role("parent", "Parent in a task hierarchy"),
            role("member", "Member of a group"),
        ];

        let mut fixtures = Self {
            document_types,
            graph_types,
            roles,
            graph_rules: Vec::new(),
        };

        let any_role = fixtures.role("parent").map(|r| r.id.clone());
        let rules = [
            (GROUP, NOTEBOOK, CONTAINS, None),
            (NOTEBOOK, NOTE, CONTAINS, None),
            (NOTEBOOK, TASK, CONTAINS, None),
            (NOTE, NOTE, LINKED, None),
            (NOTE, TASK, LINKED, None),
            (TASK, TASK, RELATED, any_role.clone()),
            (GROUP, GROUP, RELATED, any_role),
        ];
        let graph_rules = rules
            .into_iter()
            .filter_map(|(source, target, graph_type, role)| {
                Some(GraphRule::new(
                    fixtures.document_type(source)?.id.clone(),
                    fixtures.document_type(target)?.id.clone(),
                    fixtures.graph_type(graph_type)?.id.clone(),
                    role,
                ))
            })
            .collect();
        fixtures.graph_rules = graph_rules;
        fixtures
    }

    pub fn document_type(&self, name: &str) -> Option<&DocumentType> {
        self.document_types.iter().find(|t| t.type_name == name)
    }

    pub fn graph_type(&self, title: &str) -> Option<&GraphType> {
        self.graph_types.iter().find(|t| t.title == title)
    }

    pub fn role(&self, name: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.name == name)
    }
}

// --- helpers -----------------------------------------------------------------

fn document_type(name: &str, schema: Value, defaults: &[&str], icon: &str) -> DocumentType {
    let mut t = DocumentType::new(name, schema);
    t.defaults = defaults.iter().map(|d| d.to_string()).collect();
    t.icon = Some(icon.to_string());
    t
}

fn graph_type(title: &str, reverse: Option<&str>, direction: GraphDirection) -> GraphType {
    let mut t = GraphType::new(title, direction);
    t.title_reverse = reverse.map(str::to_string);
    t
}

fn role(name: &str, description: &str) -> Role {
    let mut r = Role::new(name);
    r.description = Some(description.to_string());
    r
}

// --- tests -------------------------------------------------------------------
