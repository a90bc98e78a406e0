//! Graph rule checks: may this edge exist?
//!
//! An edge from document A to document B with graph type G is permitted when
//! a [`GraphRule`] exists for `(type(A), type(B), G)`. If the edge carries a
//! role, the matching rule must declare one too. Edges flagged
//! `graphTypeReversed` are derived mirrors of a forward edge and are not
//! checked.
//!
//! The rule table is reached through [`RuleLookup`], so callers can hand in
//! a full table, a slice, or just the single row their store found for the
//! triple.

use std::collections::HashMap;

use thiserror::Error;

use crate::types::{DocumentType, Graph, GraphRule, GraphType};
use crate::violation::Violation;

/// Message for a `(source, target, graph type)` triple with no rule.
pub const COMBINATION_NOT_ALLOWED: &str = "combination not allowed";
/// Message for a role on an edge whose rule declares none.
pub const ROLE_NOT_ALLOWED: &str = "role not allowed";

/// An id with the human-readable name used in violation messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Named {
    pub id: String,
    pub name: String,
}

impl Named {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A proposed edge with its endpoint document types already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeCandidate {
    pub source_type: Named,
    pub target_type: Named,
    pub graph_type: Named,
    pub role: Option<String>,
    pub reversed: bool,
}

impl EdgeCandidate {
    /// Build a candidate for `graph`, whose source document is of
    /// `source_type` and target document of `target_type`.
    pub fn for_graph(
        graph: &Graph,
        source_type: &DocumentType,
        target_type: &DocumentType,
        graph_type: &GraphType,
    ) -> Self {
        Self {
            source_type: Named::new(&source_type.id, &source_type.type_name),
            target_type: Named::new(&target_type.id, &target_type.type_name),
            graph_type: Named::new(&graph_type.id, &graph_type.title),
            role: graph.role.clone(),
            reversed: graph.graph_type_reversed,
        }
    }
}

// ---------------------------------------------------------------------------
// RuleLookup
// ---------------------------------------------------------------------------

/// Read-only access to the graph rule table.
pub trait RuleLookup {
    /// The rule for the exact `(source type, target type, graph type)` triple.
    fn find(&self, source: &str, target: &str, graph_type: &str) -> Option<&GraphRule>;
}

impl RuleLookup for [GraphRule] {
    fn find(&self, source: &str, target: &str, graph_type: &str) -> Option<&GraphRule> {
        self.iter().find(|r| r.matches(source, target, graph_type))
    }
}

/// A store that already queried by triple can pass its result straight in.
impl RuleLookup for Option<GraphRule> {
    fn find(&self, source: &str, target: &str, graph_type: &str) -> Option<&GraphRule> {
        self.as_ref().filter(|r| r.matches(source, target, graph_type))
    }
}

/// Returned when a second rule is added for an existing triple.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("a graph rule for {source_type} -> {target_type} ({graph_type}) already exists")]
pub struct DuplicateRule {
    pub source_type: String,
    pub target_type: String,
    pub graph_type: String,
}

type Triple = (String, String, String);

/// Graph rules indexed by their unique triple.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: HashMap<Triple, GraphRule>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table, rejecting the first duplicate triple.
    pub fn from_rules(rules: impl IntoIterator<Item = GraphRule>) -> Result<Self, DuplicateRule> {
        let mut table = Self::new();
        for rule in rules {
            table.insert(rule)?;
        }
        Ok(table)
    }

    pub fn insert(&mut self, rule: GraphRule) -> Result<(), DuplicateRule> {
        let key = (
            rule.document_type_source.clone(),
            rule.document_type_target.clone(),
            rule.graph_type.clone(),
        );
        if self.rules.contains_key(&key) {
            return Err(DuplicateRule {
                source_type: key.0,
                target_type: key.1,
                graph_type: key.2,
            });
        }
        self.rules.insert(key, rule);
        Ok(())
    }
}

impl RuleLookup for RuleTable {
    fn find(&self, source: &str, target: &str, graph_type: &str) -> Option<&GraphRule> {
        self.rules
            .get(&(source.to_string(), target.to_string(), graph_type.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Decide whether `candidate` is permitted. An empty result means it is.
///
/// The role check runs only once a rule for the triple has been found.
pub fn validate_edge<L>(candidate: &EdgeCandidate, rules: &L) -> Vec<Violation>
where
    L: RuleLookup + ?Sized,
{
    if candidate.reversed {
        return Vec::new();
    }

    let Some(rule) = rules.find(
        &candidate.source_type.id,
        &candidate.target_type.id,
        &candidate.graph_type.id,
    ) else {
        return vec![Violation::new(
            "/graphType",
            format!(
                "{COMBINATION_NOT_ALLOWED}: {} -> {} ({})",
                candidate.source_type.name, candidate.target_type.name, candidate.graph_type.name
            ),
        )];
    };

    if candidate.role.is_some() && rule.role.is_none() {
        return vec![Violation::new("/role", ROLE_NOT_ALLOWED)];
    }

    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(source: &str, target: &str, role: Option<&str>) -> EdgeCandidate {
        EdgeCandidate {
            source_type: Named::new(source, source),
            target_type: Named::new(target, target),
            graph_type: Named::new("bidirectional", "related"),
            role: role.map(str::to_string),
            reversed: false,
        }
    }

    fn table() -> Vec<GraphRule> {
        vec![GraphRule::new("group", "notebook", "bidirectional", None)]
    }

    #[test]
    fn matching_rule_without_role_permits_plain_edge() {
        assert!(validate_edge(&candidate("group", "notebook", None), table().as_slice()).is_empty());
    }

    #[test]
    fn role_on_edge_requires_role_on_rule() {
        let v = validate_edge(&candidate("group", "notebook", Some("owner")), table().as_slice());
        assert_eq!(v, vec![Violation::new("/role", ROLE_NOT_ALLOWED)]);
    }

    #[test]
    fn rule_with_role_permits_any_or_no_role() {
        let rules = vec![GraphRule::new(
            "group",
            "notebook",
            "bidirectional",
            Some("owner".into()),
        )];
        assert!(validate_edge(&candidate("group", "notebook", Some("editor")), rules.as_slice()).is_empty());
        assert!(validate_edge(&candidate("group", "notebook", None), rules.as_slice()).is_empty());
    }

    #[test]
    fn missing_rule_is_combination_not_allowed() {
        let v = validate_edge(&candidate("group", "task", None), table().as_slice());
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].path, "/graphType");
        assert_eq!(v[0].message, "combination not allowed: group -> task (related)");
    }

    #[test]
    fn direction_matters() {
        let v = validate_edge(&candidate("notebook", "group", None), table().as_slice());
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn reversed_edges_skip_validation() {
        let mut c = candidate("group", "task", Some("owner"));
        c.reversed = true;
        assert!(validate_edge(&c, table().as_slice()).is_empty());
        assert!(validate_edge(&c, &RuleTable::new()).is_empty());
    }

    #[test]
    fn single_row_lookup() {
        let found: Option<GraphRule> = table().into_iter().next();
        assert!(validate_edge(&candidate("group", "notebook", None), &found).is_empty());
        assert_eq!(validate_edge(&candidate("group", "task", None), &found).len(), 1);
        assert_eq!(validate_edge(&candidate("group", "notebook", None), &None::<GraphRule>).len(), 1);
    }

    #[test]
    fn rule_table_rejects_duplicate_triples() {
        let mut t = RuleTable::from_rules(table()).unwrap();
        let err = t
            .insert(GraphRule::new("group", "notebook", "bidirectional", Some("owner".into())))
            .unwrap_err();
        assert_eq!(err.source_type, "group");
        assert!(validate_edge(&candidate("group", "notebook", None), &t).is_empty());
        // The first rule (without a role) is the one kept.
        assert_eq!(validate_edge(&candidate("group", "notebook", Some("owner")), &t).len(), 1);
    }

    #[test]
    fn candidate_from_entities() {
        let group = DocumentType::new("group", serde_json::json!(true));
        let notebook = DocumentType::new("notebook", serde_json::json!(true));
        let gt = GraphType::new("related", crate::types::GraphDirection::Bidirectional);
        let mut g = Graph::new("doc-a", "doc-b", &gt.id);
        g.role = Some("owner".into());
        let c = EdgeCandidate::for_graph(&g, &group, &notebook, &gt);
        assert_eq!(c.source_type.name, "group");
        assert_eq!(c.graph_type.id, gt.id);
        assert_eq!(c.role.as_deref(), Some("owner"));
        assert!(!c.reversed);
    }
}
