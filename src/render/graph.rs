//! Derivation graph reconstruction from a flat node/edge listing
//!
//! The backend sends the neighbourhood of a memory as two flat lists. The
//! graph is rebuilt here, walked downward in full and upward one hop, and
//! rendered as an indented tree:
//!
//! ```text
//! [m1] root content
//!   > [m2] child
//!     > [m4] grandchild
//!   < [m3] parent
//! ```
//!
//! Edges may form cycles (mutual supersedes), so every walk threads a
//! visited set and renders a node at most once.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use super::request_str;
use super::truncate;
use super::views::{EdgeView, GraphView, NodeView, decode};

const LABEL_CONTENT_CHARS: usize = 60;
const DEFAULT_EDGE_TYPE: &str = "derives_from";

/// Adjacency built from an edge list
#[derive(Debug, Clone, Default)]
pub struct DerivationGraph {
    contents: HashMap<String, String>,
    children: HashMap<String, Vec<(String, String)>>,
    parents: HashMap<String, Vec<(String, String)>>,
}

impl DerivationGraph {
    pub fn new(nodes: &[NodeView], edges: &[EdgeView]) -> Self {
        let mut graph = Self::default();

        for node in nodes {
            let id = node.id.clone().unwrap_or_default();
            graph.contents.insert(id, node.content.clone().unwrap_or_default());
        }

        for edge in edges {
            let source = edge.source_id.clone().unwrap_or_default();
            let target = edge.target_id.clone().unwrap_or_default();
            let edge_type = edge.edge_type.clone().unwrap_or_else(|| DEFAULT_EDGE_TYPE.to_string());
            graph
                .children
                .entry(source.clone())
                .or_default()
                .push((target.clone(), edge_type.clone()));
            graph.parents.entry(target).or_default().push((source, edge_type));
        }

        graph
    }

    /// Outgoing `(target, edge_type)` pairs in edge-list order
    pub fn children(&self, id: &str) -> &[(String, String)] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Incoming `(source, edge_type)` pairs in edge-list order
    pub fn parents(&self, id: &str) -> &[(String, String)] {
        self.parents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `[id] content`, content capped at 60 characters.
    /// Ids without a node entry render with empty content, like any other memory line.
    pub fn label(&self, id: &str) -> String {
        let content = self.contents.get(id).map(|c| truncate(c, LABEL_CONTENT_CHARS)).unwrap_or_default();
        format!("[{}] {}", id, content)
    }

    /// Depth-first pre-order over descendants of `root`.
    ///
    /// Returns `(id, depth)` with direct children at depth 1. Nodes already in
    /// `visited` are skipped; every node returned is added to it.
    pub fn walk_descendants(&self, root: &str, visited: &mut HashSet<String>) -> Vec<(String, usize)> {
        let mut order = Vec::new();
        // (node, index of the next child to look at)
        let mut stack: Vec<(&str, usize)> = vec![(root, 0)];

        while let Some(top) = stack.last_mut() {
            let (node, next) = (top.0, top.1);
            let children = self.children(node);
            if next >= children.len() {
                stack.pop();
                continue;
            }
            top.1 += 1;

            let child = children[next].0.as_str();
            if visited.insert(child.to_string()) {
                order.push((child.to_string(), stack.len()));
                stack.push((child, 0));
            }
        }

        order
    }

    /// Direct parents of `root` not yet in `visited`; one hop only
    pub fn direct_ancestors(&self, root: &str, visited: &mut HashSet<String>) -> Vec<String> {
        self.parents(root)
            .iter()
            .filter(|(parent, _)| visited.insert(parent.clone()))
            .map(|(parent, _)| parent.clone())
            .collect()
    }

    /// Indented tree: root, every descendant, then the root's direct parents
    pub fn render(&self, root: &str) -> String {
        let mut visited = HashSet::from([root.to_string()]);
        let mut lines = vec![self.label(root)];

        for (id, depth) in self.walk_descendants(root, &mut visited) {
            lines.push(format!("{}> {}", "  ".repeat(depth), self.label(&id)));
        }
        for id in self.direct_ancestors(root, &mut visited) {
            lines.push(format!("  < {}", self.label(&id)));
        }

        lines.join("\n")
    }
}

/// Render a `reference` reply
pub fn render_reference(data: &Value, request: &Map<String, Value>) -> String {
    let view: GraphView = decode(data);
    let root = view
        .root
        .as_deref()
        .or_else(|| request_str(request, "memory_id"))
        .unwrap_or("?");

    let nodes = view.nodes.unwrap_or_default();
    if nodes.is_empty() {
        return format!("No graph data for [{}]", root);
    }

    DerivationGraph::new(&nodes, &view.edges.unwrap_or_default()).render(root)
}
