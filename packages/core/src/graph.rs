use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::types::{Graph, GraphDirection, GraphType};

/// A local, in-memory collection of [`Graph`] edges between documents.
///
/// This is a traversal structure, not storage. Load the edges around a
/// document from the store, add them here, and use the query methods to read
/// the relationships from either end.
///
/// Edges are indexed by `id`; adding an edge with an existing `id` replaces it.
/// Graph types are optional and only used to label [`Link`]s.
#[derive(Debug, Default)]
pub struct DocumentGraph {
    edges: HashMap<String, Graph>,
    graph_types: HashMap<String, GraphType>,
}

/// Which end of an edge a document sits on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LinkDirection {
    /// The document is the edge's source.
    Outgoing,
    /// The document is the edge's target.
    Incoming,
}

/// One edge as seen from one of its documents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    /// Id of the underlying [`Graph`] edge.
    pub graph: String,
    /// The document at the other end.
    pub document: String,
    pub graph_type: String,
    /// The graph type's title read in this direction.
    pub label: String,
    pub direction: LinkDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub weight: i64,
    pub reversed: bool,
}

impl DocumentGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_edges(iter: impl IntoIterator<Item = Graph>) -> Self {
        let mut g = Self::new();
        for e in iter {
            g.add(e);
        }
        g
    }

    pub fn add(&mut self, edge: Graph) {
        self.edges.insert(edge.id.clone(), edge);
    }

    /// Register a graph type so links of that type get its titles.
    pub fn add_graph_type(&mut self, graph_type: GraphType) {
        self.graph_types.insert(graph_type.id.clone(), graph_type);
    }

    pub fn get(&self, id: &str) -> Option<&Graph> {
        self.edges.get(id)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Graph> {
        self.edges.values()
    }

    /// Edges whose source is `document`.
    pub fn outgoing(&self, document: &str) -> Vec<&Graph> {
        self.edges
            .values()
            .filter(|e| e.document_source == document)
            .collect()
    }

    /// Edges whose target is `document`.
    pub fn incoming(&self, document: &str) -> Vec<&Graph> {
        self.edges
            .values()
            .filter(|e| e.document_target == document)
            .collect()
    }

    /// Every edge touching `document`, viewed from `document`, ordered by
    /// weight and then edge id.
    pub fn links(&self, document: &str) -> Vec<Link> {
        let mut links: Vec<Link> = self
            .outgoing(document)
            .into_iter()
            .map(|e| self.link(e, LinkDirection::Outgoing))
            .chain(
                self.incoming(document)
                    .into_iter()
                    // A self-loop is already listed as outgoing.
                    .filter(|e| e.document_source != document)
                    .map(|e| self.link(e, LinkDirection::Incoming)),
            )
            .collect();
        links.sort_by(|a, b| a.weight.cmp(&b.weight).then_with(|| a.graph.cmp(&b.graph)));
        links
    }

    /// Documents reachable from `document` within `depth` hops, following
    /// edges in either direction. Excludes `document` itself; BFS order.
    pub fn reachable(&self, document: &str, depth: usize) -> Vec<String> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<(&str, usize)> = VecDeque::new();
        let mut result: Vec<String> = Vec::new();

        visited.insert(document);
        queue.push_back((document, 0));

        while let Some((current, d)) = queue.pop_front() {
            if d == depth {
                continue;
            }
            for neighbour in self.neighbours(current) {
                if visited.insert(neighbour) {
                    result.push(neighbour.to_string());
                    queue.push_back((neighbour, d + 1));
                }
            }
        }

        result
    }

    /// The edges among `document` and everything reachable from it within
    /// `depth` hops.
    pub fn subgraph(&self, document: &str, depth: usize) -> DocumentGraph {
        let mut members: HashSet<String> = self.reachable(document, depth).into_iter().collect();
        members.insert(document.to_string());
        let mut sub = DocumentGraph::from_edges(
            self.edges
                .values()
                .filter(|e| {
                    members.contains(&e.document_source) && members.contains(&e.document_target)
                })
                .cloned(),
        );
        sub.graph_types = self.graph_types.clone();
        sub
    }

    fn neighbours<'a>(&'a self, document: &str) -> impl Iterator<Item = &'a str> + 'a {
        let document = document.to_string();
        self.edges.values().filter_map(move |e| {
            if e.document_source == document {
                Some(e.document_target.as_str())
            } else if e.document_target == document {
                Some(e.document_source.as_str())
            } else {
                None
            }
        })
    }

    fn link(&self, edge: &Graph, direction: LinkDirection) -> Link {
        let graph_type = self.graph_types.get(&edge.graph_type);
        let label = match (graph_type, direction) {
            (None, _) => edge.graph_type.clone(),
            (Some(t), LinkDirection::Outgoing) => t.title.clone(),
            (Some(t), LinkDirection::Incoming) => match t.graph_type {
                GraphDirection::Bidirectional | GraphDirection::Unidirectional => {
                    t.title_reverse.clone().unwrap_or_else(|| t.title.clone())
                }
                GraphDirection::NotDirected => t.title.clone(),
            },
        };
        let document = match direction {
            LinkDirection::Outgoing => edge.document_target.clone(),
            LinkDirection::Incoming => edge.document_source.clone(),
        };
        Link {
            graph: edge.id.clone(),
            document,
            graph_type: edge.graph_type.clone(),
            label,
            direction,
            role: edge.role.clone(),
            weight: edge.weight,
            reversed: edge.graph_type_reversed,
        }
    }
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(id: &str, source: &str, target: &str, graph_type: &str, weight: i64) -> Graph {
        let mut g = Graph::new(source, target, graph_type);
        g.id = id.into();
        g.weight = weight;
        g
    }

    fn contains() -> GraphType {
        let mut t = GraphType::new("contains", GraphDirection::Bidirectional);
        t.id = "contains".into();
        t.title_reverse = Some("contained in".into());
        t
    }

    fn linked() -> GraphType {
        let mut t = GraphType::new("linked with", GraphDirection::NotDirected);
        t.id = "linked".into();
        t.title_reverse = Some("ignored".into());
        t
    }

    #[test]
    fn outgoing_and_incoming() {
        let g = DocumentGraph::from_edges([edge("e1", "group", "notebook", "contains", 0)]);
        assert_eq!(g.outgoing("group").len(), 1);
        assert_eq!(g.incoming("notebook").len(), 1);
        assert!(g.outgoing("notebook").is_empty());
        assert!(g.incoming("group").is_empty());
    }

    #[test]
    fn links_use_reverse_title_from_target_side() {
        let mut g = DocumentGraph::from_edges([
            edge("e1", "group", "notebook", "contains", 0),
            edge("e2", "note", "notebook", "linked", 0),
        ]);
        g.add_graph_type(contains());
        g.add_graph_type(linked());

        let from_group = g.links("group");
        assert_eq!(from_group.len(), 1);
        assert_eq!(from_group[0].label, "contains");
        assert_eq!(from_group[0].direction, LinkDirection::Outgoing);
        assert_eq!(from_group[0].document, "notebook");

        let from_notebook = g.links("notebook");
        assert_eq!(from_notebook.len(), 2);
        let by_graph: HashMap<&str, &Link> =
            from_notebook.iter().map(|l| (l.graph.as_str(), l)).collect();
        assert_eq!(by_graph["e1"].label, "contained in");
        assert_eq!(by_graph["e1"].document, "group");
        assert_eq!(by_graph["e2"].label, "linked with");
    }

    #[test]
    fn links_without_known_type_fall_back_to_type_id() {
        let g = DocumentGraph::from_edges([edge("e1", "a", "b", "mystery", 0)]);
        assert_eq!(g.links("a")[0].label, "mystery");
    }

    #[test]
    fn links_sorted_by_weight() {
        let g = DocumentGraph::from_edges([
            edge("e1", "a", "b", "t", 5),
            edge("e2", "a", "c", "t", -1),
            edge("e3", "d", "a", "t", 2),
        ]);
        let order: Vec<String> = g.links("a").into_iter().map(|l| l.graph).collect();
        assert_eq!(order, vec!["e2", "e3", "e1"]);
    }

    #[test]
    fn self_loop_listed_once() {
        let g = DocumentGraph::from_edges([edge("e1", "a", "a", "t", 0)]);
        assert_eq!(g.links("a").len(), 1);
    }

    #[test]
    fn reachable_respects_depth() {
        // chain: a -> b -> c -> d, plus disconnected x -> y
        let g = DocumentGraph::from_edges([
            edge("e1", "a", "b", "t", 0),
            edge("e2", "b", "c", "t", 0),
            edge("e3", "d", "c", "t", 0),
            edge("e4", "x", "y", "t", 0),
        ]);
        assert_eq!(g.reachable("a", 1), vec!["b"]);
        assert_eq!(g.reachable("a", 2), vec!["b", "c"]);
        assert_eq!(g.reachable("a", 10), vec!["b", "c", "d"]);
        assert!(g.reachable("a", 0).is_empty());
    }

    #[test]
    fn subgraph() {
        let g = DocumentGraph::from_edges([
            edge("e1", "a", "b", "t", 0),
            edge("e2", "b", "c", "t", 0),
            edge("e4", "x", "y", "t", 0),
        ]);
        let sg = g.subgraph("b", 1);
        assert_eq!(sg.len(), 2);
        assert!(sg.get("e4").is_none());
    }
}
