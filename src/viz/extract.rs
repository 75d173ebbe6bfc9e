use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::graph_utils::graph::{ResultRow, RowValue, ViewEdge, ViewNode};

/// Insertion-ordered counter keyed by label or relationship type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CountTable {
    entries: Vec<(String, usize)>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl CountTable {
    pub fn new() -> Self { Self::default() }

    pub fn increment(&mut self, key: &str) {
        match self.index.get(key) {
            Some(&i) => self.entries[i].1 += 1,
            None => {
                self.index.insert(key.to_string(), self.entries.len());
                self.entries.push((key.to_string(), 1));
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<usize> {
        self.index.get(key).map(|&i| self.entries[i].1)
    }

    pub fn contains(&self, key: &str) -> bool { self.index.contains_key(key) }

    /// Position of `key` in first-seen order.
    pub fn position(&self, key: &str) -> Option<usize> { self.index.get(key).copied() }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(k, c)| (k.as_str(), *c))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

/// Output of one extraction sweep.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Extraction {
    pub nodes: Vec<ViewNode>,
    pub edges: Vec<ViewEdge>,
    pub label_counts: CountTable,
    pub type_counts: CountTable,
}

/// Turn result rows into deduplicated view entities.
///
/// Every column value is visited once. The first occurrence of an identity
/// wins. Edges are only kept once all rows have been seen, and only if both
/// endpoints were extracted as nodes; dangling edges are logged and dropped.
pub fn extract(rows: &[ResultRow]) -> Extraction {
    let mut out = Extraction::default();
    let mut seen_nodes: HashSet<String> = HashSet::new();
    let mut seen_edges: HashSet<String> = HashSet::new();
    let mut pending_edges: Vec<ViewEdge> = Vec::new();

    for row in rows {
        for value in row.values() {
            match value {
                RowValue::Node(node) => {
                    if !seen_nodes.insert(node.identity.clone()) {
                        continue;
                    }
                    let view = ViewNode::from_graph_node(node);
                    if let Some(primary) = view.primary_label() {
                        out.label_counts.increment(primary);
                    }
                    out.nodes.push(view);
                }
                RowValue::Relationship(rel) => {
                    if !seen_edges.insert(rel.identity.clone()) {
                        continue;
                    }
                    pending_edges.push(ViewEdge::from_relationship(rel));
                }
                RowValue::Scalar(_) => {}
            }
        }
    }

    for edge in pending_edges {
        let missing = [&edge.start_id, &edge.end_id]
            .into_iter()
            .find(|id| !seen_nodes.contains(id.as_str()));
        if let Some(missing) = missing {
            log::warn!("dropping relationship {} ({}): endpoint node {} not in result set", edge.id, edge.label, missing);
            continue;
        }
        out.type_counts.increment(&edge.rel_type);
        out.edges.push(edge);
    }

    log::info!(
        "extracted {} nodes, {} relationships, {} labels, {} types from {} rows",
        out.nodes.len(),
        out.edges.len(),
        out.label_counts.len(),
        out.type_counts.len(),
        rows.len()
    );
    out
}
