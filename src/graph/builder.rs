//! Graph construction module

use std::collections::{BTreeSet, HashMap};

use crate::graph::CompressedGraph;

/// Builds the induced subgraph over a fixed node set.
///
/// Nodes are registered up front; edges whose endpoints are not both
/// registered are dropped, as are self-citations and repeated edges.
pub struct GraphBuilder {
    /// Mapping from work IDs to node indices
    id_to_index: HashMap<String, u32>,

    /// Node work IDs, sorted
    node_ids: Vec<String>,

    /// Adjacency sets for each node
    adjacency: Vec<BTreeSet<u32>>,

    /// Edges skipped because an endpoint is outside the node set
    dropped: usize,
}

impl GraphBuilder {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut node_ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        node_ids.sort();
        node_ids.dedup();

        let id_to_index = node_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i as u32))
            .collect();
        let adjacency = vec![BTreeSet::new(); node_ids.len()];

        Self {
            id_to_index,
            node_ids,
            adjacency,
            dropped: 0,
        }
    }

    /// Add a citation from one work to another. Returns false if it was dropped.
    pub fn add_edge(&mut self, src_id: &str, dst_id: &str) -> bool {
        let (Some(&src), Some(&dst)) = (self.id_to_index.get(src_id), self.id_to_index.get(dst_id))
        else {
            self.dropped += 1;
            return false;
        };
        if src == dst {
            return false;
        }
        self.adjacency[src as usize].insert(dst)
    }

    pub fn dropped_edges(&self) -> usize {
        self.dropped
    }

    /// Build the compressed graph
    pub fn build(self) -> CompressedGraph {
        let node_count = self.node_ids.len();
        let edge_count = self.adjacency.iter().map(BTreeSet::len).sum();

        let mut graph = CompressedGraph::with_capacity(node_count, edge_count);
        graph.offsets.push(0);
        let mut offset = 0u32;
        for targets in &self.adjacency {
            // BTreeSet iteration is ascending, which keeps has_edge's binary search valid
            graph.edges.extend(targets.iter().copied());
            offset += targets.len() as u32;
            graph.offsets.push(offset);
        }
        graph.node_count = node_count;
        graph.node_ids = self.node_ids;
        graph
    }
}

/// Induced subgraph over `rows` of `(work_id, in-decade references)`
pub fn induced_subgraph<'a, I>(rows: I) -> (CompressedGraph, usize)
where
    I: IntoIterator<Item = (&'a str, &'a [String])> + Clone,
{
    let mut builder = GraphBuilder::new(rows.clone().into_iter().map(|(id, _)| id));
    for (id, refs) in rows {
        for r in refs {
            builder.add_edge(id, r);
        }
    }
    let dropped = builder.dropped_edges();
    (builder.build(), dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_sorted_csr() {
        let mut b = GraphBuilder::new(["C", "A", "B"]);
        assert!(b.add_edge("A", "C"));
        assert!(b.add_edge("A", "B"));
        assert!(!b.add_edge("A", "B"));
        assert!(!b.add_edge("A", "OUTSIDE"));
        assert!(!b.add_edge("B", "B"));
        assert_eq!(b.dropped_edges(), 1);

        let g = b.build();
        assert_eq!(g.node_ids, vec!["A", "B", "C"]);
        assert_eq!(g.outgoing_edges(0), &[1, 2]);
        assert!(g.has_edge(0, 2));
        assert!(!g.has_edge(2, 0));
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.node_index("C"), Some(2));
        assert_eq!(g.node_index("Z"), None);
    }

    #[test]
    fn induced_subgraph_keeps_isolated_nodes() {
        let refs_a = vec!["B".to_string(), "X".to_string()];
        let refs_b: Vec<String> = Vec::new();
        let refs_c: Vec<String> = Vec::new();
        let rows = vec![
            ("A", refs_a.as_slice()),
            ("B", refs_b.as_slice()),
            ("C", refs_c.as_slice()),
        ];
        let (g, dropped) = induced_subgraph(rows);
        assert_eq!(g.node_count, 3);
        assert_eq!(g.edge_pairs().collect::<Vec<_>>(), vec![(0, 1)]);
        assert_eq!(dropped, 1);
    }
}
