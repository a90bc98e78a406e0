//! Graph type, role, graph rule and graph edge bodies, plus the link and
//! subgraph views.

use serde::{Deserialize, Serialize};

use yads::{Document, Graph, GraphDirection, GraphRule, GraphType, Link, Role};

/// Body of `POST /graph_types` and `PUT /graph_types/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphTypeRequest {
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none", alias = "title_reverse")]
    pub title_reverse: Option<String>,

    #[serde(alias = "graph_type")]
    pub graph_type: GraphDirection,
}

impl GraphTypeRequest {
    pub fn into_graph_type(self) -> GraphType {
        let mut t = GraphType::new(self.title, self.graph_type);
        t.title_reverse = self.title_reverse;
        t
    }

    pub fn apply_to(self, target: &mut GraphType) {
        target.title = self.title;
        target.title_reverse = self.title_reverse;
        target.graph_type = self.graph_type;
    }
}

/// Body of `POST /roles` and `PUT /roles/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoleRequest {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RoleRequest {
    pub fn into_role(self) -> Role {
        let mut r = Role::new(self.name);
        r.description = self.description;
        r
    }

    pub fn apply_to(self, target: &mut Role) {
        target.name = self.name;
        target.description = self.description;
    }
}

/// Body of `POST /graph_rules` and `PUT /graph_rules/{id}`. All fields are ids.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphRuleRequest {
    #[serde(alias = "document_type_source")]
    pub document_type_source: String,

    #[serde(alias = "document_type_target")]
    pub document_type_target: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(alias = "graph_type")]
    pub graph_type: String,
}

impl GraphRuleRequest {
    pub fn into_graph_rule(self) -> GraphRule {
        GraphRule::new(
            self.document_type_source,
            self.document_type_target,
            self.graph_type,
            self.role,
        )
    }

    pub fn apply_to(self, target: &mut GraphRule) {
        target.document_type_source = self.document_type_source;
        target.document_type_target = self.document_type_target;
        target.role = self.role;
        target.graph_type = self.graph_type;
    }
}

/// Body of `POST /graphs` and `PUT /graphs/{id}`.
///
/// `PATCH /graphs/{id}` takes a merge patch over this same shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphRequest {
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

impl GraphRequest {
    pub fn into_graph(self) -> Graph {
        let mut g = Graph::new(self.document_source, self.document_target, self.graph_type);
        g.role = self.role;
        g.graph_type_reversed = self.graph_type_reversed;
        g.weight = self.weight;
        g
    }

    pub fn apply_to(self, target: &mut Graph) {
        target.document_source = self.document_source;
        target.document_target = self.document_target;
        target.graph_type = self.graph_type;
        target.role = self.role;
        target.graph_type_reversed = self.graph_type_reversed;
        target.weight = self.weight;
    }
}

impl From<&Graph> for GraphRequest {
    fn from(g: &Graph) -> Self {
        Self {
            document_source: g.document_source.clone(),
            document_target: g.document_target.clone(),
            graph_type: g.graph_type.clone(),
            role: g.role.clone(),
            graph_type_reversed: g.graph_type_reversed,
            weight: g.weight,
        }
    }
}

/// Response body for `GET /documents/{id}/links`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinksResponse {
    pub document: String,
    pub links: Vec<Link>,
}

/// Response body for `GET /documents/{id}/subgraph`.
///
/// `documents` holds the root and every document reachable from it within
/// `depth` hops; `graphs` holds the edges among them. Order is unspecified.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubgraphResponse {
    pub root: String,
    pub depth: u32,
    pub documents: Vec<Document>,
    pub graphs: Vec<Graph>,
}
