//! Graph transformations used by community detection

use crate::graph::CompressedGraph;

/// Undirected weighted graph with explicit node strengths.
///
/// `adjacency[i]` lists `(neighbour, weight)` pairs sorted by neighbour and
/// never contains `i` itself; weight internal to an aggregated node is only
/// reflected in its strength.
#[derive(Debug, Clone, Default)]
pub struct WeightedGraph {
    pub adjacency: Vec<Vec<(usize, f64)>>,

    /// Sum of incident edge weights per node (self-loops counted twice)
    pub strength: Vec<f64>,

    /// Sum of all strengths, i.e. twice the total edge weight
    pub total_strength: f64,
}

impl WeightedGraph {
    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn neighbours(&self, node: usize) -> &[(usize, f64)] {
        &self.adjacency[node]
    }
}

/// Collapse citation direction: each citation contributes weight 1 to the
/// undirected pair, so a mutual citation pair has weight 2.
pub fn to_undirected_weighted(graph: &CompressedGraph) -> WeightedGraph {
    let node_count = graph.node_count;
    let mut adjacency: Vec<Vec<(usize, f64)>> = vec![Vec::new(); node_count];

    for src in 0..node_count {
        for &dst in graph.outgoing_edges(src) {
            let dst = dst as usize;
            if dst == src {
                continue;
            }
            // Count each mutual pair once from the lower index
            let mutual = graph.has_edge(dst, src as u32);
            if mutual && dst < src {
                continue;
            }
            let weight = if mutual { 2.0 } else { 1.0 };
            adjacency[src].push((dst, weight));
            adjacency[dst].push((src, weight));
        }
    }

    for list in &mut adjacency {
        list.sort_by_key(|&(n, _)| n);
    }
    let strength: Vec<f64> = adjacency
        .iter()
        .map(|list| list.iter().map(|&(_, w)| w).sum())
        .collect();
    let total_strength = strength.iter().sum();

    WeightedGraph {
        adjacency,
        strength,
        total_strength,
    }
}

/// Contract nodes by `membership` (values in `0..community_count`).
/// Edges inside a community become part of the aggregate node's strength.
pub fn aggregate(graph: &WeightedGraph, membership: &[usize], community_count: usize) -> WeightedGraph {
    let mut strength = vec![0.0; community_count];
    let mut weights: Vec<std::collections::BTreeMap<usize, f64>> =
        vec![Default::default(); community_count];

    for node in 0..graph.node_count() {
        let c = membership[node];
        strength[c] += graph.strength[node];
        for &(other, w) in graph.neighbours(node) {
            let d = membership[other];
            if c != d {
                *weights[c].entry(d).or_insert(0.0) += w;
            }
        }
    }

    WeightedGraph {
        adjacency: weights.into_iter().map(|m| m.into_iter().collect()).collect(),
        strength,
        total_strength: graph.total_strength,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::builder::GraphBuilder;

    #[test]
    fn mutual_citations_double_the_weight() {
        let mut b = GraphBuilder::new(["A", "B", "C"]);
        b.add_edge("A", "B");
        b.add_edge("B", "A");
        b.add_edge("B", "C");
        let g = to_undirected_weighted(&b.build());

        assert_eq!(g.neighbours(0), &[(1, 2.0)]);
        assert_eq!(g.neighbours(1), &[(0, 2.0), (2, 1.0)]);
        assert_eq!(g.neighbours(2), &[(1, 1.0)]);
        assert_eq!(g.strength, vec![2.0, 3.0, 1.0]);
        assert_eq!(g.total_strength, 6.0);
    }

    #[test]
    fn aggregation_preserves_total_strength() {
        let mut b = GraphBuilder::new(["A", "B", "C", "D"]);
        b.add_edge("A", "B");
        b.add_edge("B", "C");
        b.add_edge("C", "D");
        let g = to_undirected_weighted(&b.build());
        let agg = aggregate(&g, &[0, 0, 1, 1], 2);

        assert_eq!(agg.node_count(), 2);
        assert_eq!(agg.neighbours(0), &[(1, 1.0)]);
        assert_eq!(agg.strength, vec![3.0, 3.0]);
        assert_eq!(agg.total_strength, g.total_strength);
    }
}
