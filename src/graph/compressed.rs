//! Compressed sparse row representation of a decade citation subgraph

use serde::{Deserialize, Serialize};

/// Directed graph in CSR form. Node `i` is `node_ids[i]`; node IDs are sorted,
/// so node indices are stable for a given node set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompressedGraph {
    /// Number of nodes in the graph
    pub node_count: usize,

    /// offsets[i] to offsets[i+1] is the edge range for node i
    pub offsets: Vec<u32>,

    /// Concatenated, per-node sorted lists of cited nodes
    pub edges: Vec<u32>,

    /// Work ID of each node
    pub node_ids: Vec<String>,
}

impl CompressedGraph {
    /// Create an empty graph with pre-allocated capacity
    pub fn with_capacity(node_count: usize, edge_count: usize) -> Self {
        Self {
            node_count: 0,
            offsets: Vec::with_capacity(node_count + 1),
            edges: Vec::with_capacity(edge_count),
            node_ids: Vec::with_capacity(node_count),
        }
    }

    /// Nodes cited by `node`
    pub fn outgoing_edges(&self, node: usize) -> &[u32] {
        let start = self.offsets[node] as usize;
        let end = self.offsets[node + 1] as usize;
        &self.edges[start..end]
    }

    pub fn has_edge(&self, src: usize, dst: u32) -> bool {
        self.outgoing_edges(src).binary_search(&dst).is_ok()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node_index(&self, id: &str) -> Option<u32> {
        self.node_ids
            .binary_search_by(|probe| probe.as_str().cmp(id))
            .ok()
            .map(|i| i as u32)
    }

    /// Iterate `(src, dst)` pairs
    pub fn edge_pairs(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (0..self.node_count).flat_map(move |src| {
            self.outgoing_edges(src)
                .iter()
                .map(move |&dst| (src as u32, dst))
        })
    }
}
