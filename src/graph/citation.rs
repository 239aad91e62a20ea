//! Directed citation graph of one decade, backed by petgraph

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::model::CitationEdge;

/// A work in the assembled graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkNode {
    pub id: String,

    /// Label of the cluster the work was retained in
    pub cluster: String,
}

/// Citation graph over a fixed node set. Citations touching a work outside
/// the set are rejected.
pub struct CitationGraph {
    decade_start: i32,
    graph: DiGraph<WorkNode, ()>,
    node_index: HashMap<String, NodeIndex>,
}

impl CitationGraph {
    pub fn new(decade_start: i32) -> Self {
        Self {
            decade_start,
            graph: DiGraph::new(),
            node_index: HashMap::new(),
        }
    }

    /// Add a work; a work already present keeps its first cluster
    pub fn add_work(&mut self, id: &str, cluster: &str) -> NodeIndex {
        if let Some(&idx) = self.node_index.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(WorkNode {
            id: id.to_string(),
            cluster: cluster.to_string(),
        });
        self.node_index.insert(id.to_string(), idx);
        idx
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    /// Add `from -> to` if both works are in the graph. Returns whether an
    /// edge was added.
    pub fn add_citation(&mut self, from: &str, to: &str) -> bool {
        let (Some(&a), Some(&b)) = (self.node_index.get(from), self.node_index.get(to)) else {
            return false;
        };
        if a == b || self.graph.contains_edge(a, b) {
            return false;
        }
        self.graph.add_edge(a, b, ());
        true
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Works ordered by ID
    pub fn nodes(&self) -> Vec<WorkNode> {
        let mut nodes: Vec<WorkNode> = self.graph.node_weights().cloned().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        nodes
    }

    /// Citations ordered by `(from_id, to_id)`
    pub fn edges(&self) -> Vec<CitationEdge> {
        let mut edges: Vec<CitationEdge> = self
            .graph
            .edge_references()
            .map(|e| CitationEdge {
                from_id: self.graph[e.source()].id.clone(),
                to_id: self.graph[e.target()].id.clone(),
                decade_start: self.decade_start,
            })
            .collect();
        edges.sort();
        edges
    }
}
