//! Plain-text rendering of validation results and document links.
//!
//! Used by the `yads` CLI for terminal output. Only the JSON wire format is
//! normative; this output may change between releases.

use crate::graph::{DocumentGraph, Link, LinkDirection};
use crate::violation::Violation;

/// Render a violation list, one per line, with the offending pointer first.
///
/// ```text
/// 2 violations
///   /due          "someday" is not a "date"
///   /title        the property title is required
/// ```
///
/// An empty list renders as `valid`.
pub fn render_violations(violations: &[Violation]) -> String {
    if violations.is_empty() {
        return "valid\n".to_string();
    }
    let width = violations
        .iter()
        .map(|v| display_path(&v.path).chars().count())
        .max()
        .unwrap_or(0);

    let mut out = format!(
        "{} violation{}\n",
        violations.len(),
        if violations.len() == 1 { "" } else { "s" }
    );
    for v in violations {
        out.push_str(&format!(
            "  {:<width$}  {}\n",
            display_path(&v.path),
            v.message,
            width = width
        ));
    }
    out
}

/// Render the links of one document.
///
/// ```text
/// 0195…  2 links
///   → contains      0195aa01  (weight 0)
///   ← contained in  0195bb02  role: owner  (weight 1)
/// ```
pub fn render_links(document: &str, links: &[Link]) -> String {
    let mut out = format!(
        "{}  {} link{}\n",
        short_id(document),
        links.len(),
        if links.len() == 1 { "" } else { "s" }
    );
    let width = links.iter().map(|l| l.label.chars().count()).max().unwrap_or(0);
    for l in links {
        let arrow = match l.direction {
            LinkDirection::Outgoing => '→',
            LinkDirection::Incoming => '←',
        };
        let role = l
            .role
            .as_deref()
            .map(|r| format!("  role: {r}"))
            .unwrap_or_default();
        let reversed = if l.reversed { "  (reversed)" } else { "" };
        out.push_str(&format!(
            "  {arrow} {:<width$}  {}{role}{reversed}  (weight {})\n",
            l.label,
            short_id(&l.document),
            l.weight,
            width = width
        ));
    }
    out
}

/// Render every document of a [`DocumentGraph`] with its links, documents in
/// id order.
pub fn render_graph(graph: &DocumentGraph) -> String {
    let mut documents: Vec<&str> = graph
        .edges()
        .flat_map(|e| [e.document_source.as_str(), e.document_target.as_str()])
        .collect();
    documents.sort_unstable();
    documents.dedup();

    let total = graph.len();
    let header = format!(
        "{} document{}  {} edge{}",
        documents.len(),
        if documents.len() == 1 { "" } else { "s" },
        total,
        if total == 1 { "" } else { "s" }
    );
    let mut out = format!("{}\n{}\n", header, "─".repeat(header.chars().count()));
    for d in documents {
        out.push('\n');
        out.push_str(&render_links(d, &graph.links(d)));
    }
    out
}

// --- helpers -----------------------------------------------------------------

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else {
        path
    }
}

fn short_id(id: &str) -> &str {
    // first 8 chars; ids may be non-ASCII in hand-written fixtures
    match id.char_indices().nth(8) {
        Some((i, _)) => &id[..i],
        None => id,
    }
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Graph, GraphDirection, GraphType};

    #[test]
    fn empty_violations_render_as_valid() {
        assert_eq!(render_violations(&[]), "valid\n");
    }

    #[test]
    fn violations_list_paths_and_messages() {
        let out = render_violations(&[
            Violation::new("", "data must be an object"),
            Violation::new("/title", "the property title is required"),
        ]);
        assert!(out.starts_with("2 violations\n"));
        assert!(out.contains("/       data must be an object"));
        assert!(out.contains("/title  the property title is required"));
    }

    #[test]
    fn links_show_direction_and_label() {
        let mut gt = GraphType::new("contains", GraphDirection::Unidirectional);
        gt.title_reverse = Some("contained in".into());
        let mut edge = Graph::new("group-0001", "notebook-0002", &gt.id);
        edge.role = Some("owner".into());
        let mut g = DocumentGraph::from_edges([edge]);
        g.add_graph_type(gt);

        let out = render_links("notebook-0002", &g.links("notebook-0002"));
        assert!(out.starts_with("notebook  1 link\n"));
        assert!(out.contains("← contained in  group-00  role: owner  (weight 0)"));
    }

    #[test]
    fn graph_summary_counts() {
        let g = DocumentGraph::from_edges([
            Graph::new("a", "b", "t"),
            Graph::new("b", "c", "t"),
        ]);
        let out = render_graph(&g);
        assert!(out.starts_with("3 documents  2 edges\n"));
    }
}
