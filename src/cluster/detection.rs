//! Community detection over a decade subgraph

use std::collections::BTreeMap;

use itertools::Itertools;
use log;

use crate::cluster::leiden::Leiden;
use crate::config::{ClusterConfig, ClusteringMethod};
use crate::graph::algorithms::to_undirected_weighted;
use crate::graph::CompressedGraph;

/// Union-Find data structure for connected component analysis
pub struct DisjointSets {
    /// Parent pointers (parent[i] = parent of node i)
    parent: Vec<u32>,

    /// Size of each set, valid at roots
    rank: Vec<u32>,
}

impl DisjointSets {
    /// Create a new DisjointSets data structure
    pub fn new(size: usize) -> Self {
        Self {
            parent: (0..size as u32).collect(),
            rank: vec![1; size],
        }
    }

    /// Find the root of the set containing x with path compression
    pub fn find(&mut self, x: u32) -> u32 {
        let px = self.parent[x as usize];
        if px != x {
            self.parent[x as usize] = self.find(px);
        }
        self.parent[x as usize]
    }

    /// Union the sets containing x and y
    pub fn union(&mut self, x: u32, y: u32) {
        let root_x = self.find(x);
        let root_y = self.find(y);

        if root_x == root_y {
            return;
        }

        // Attach smaller tree under root of larger tree
        let rank_x = self.rank[root_x as usize];
        let rank_y = self.rank[root_y as usize];

        if rank_x > rank_y {
            self.parent[root_y as usize] = root_x;
            self.rank[root_x as usize] += rank_y;
        } else {
            self.parent[root_x as usize] = root_y;
            self.rank[root_y as usize] += rank_x;
        }
    }
}

/// Weakly connected components, each sorted by node index
pub fn find_connected_components(graph: &CompressedGraph) -> Vec<Vec<u32>> {
    let mut sets = DisjointSets::new(graph.node_count);
    for (src, dst) in graph.edge_pairs() {
        sets.union(src, dst);
    }

    let mut components: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
    for node in 0..graph.node_count as u32 {
        let root = sets.find(node);
        components.entry(root).or_default().push(node);
    }
    components.into_values().collect()
}

fn group_membership(membership: &[usize]) -> Vec<Vec<u32>> {
    let count = membership.iter().copied().max().map_or(0, |m| m + 1);
    let mut groups = vec![Vec::new(); count];
    for (node, &c) in membership.iter().enumerate() {
        groups[c].push(node as u32);
    }
    groups
}

/// Partition every node of `graph` with the configured method
pub fn detect_communities(graph: &CompressedGraph, config: &ClusterConfig) -> Vec<Vec<u32>> {
    log::debug!(
        "Running {} on {} nodes / {} edges",
        config.clustering_method,
        graph.node_count,
        graph.edge_count()
    );
    match config.clustering_method {
        ClusteringMethod::Components => find_connected_components(graph),
        ClusteringMethod::Leiden | ClusteringMethod::Louvain => {
            let base = if config.clustering_method == ClusteringMethod::Leiden {
                Leiden::new()
            } else {
                Leiden::louvain()
            };
            let algorithm = base
                .with_resolution(config.resolution)
                .with_seed(config.seed)
                .with_max_iterations(config.max_iterations);
            let membership = algorithm.detect(&to_undirected_weighted(graph));
            group_membership(&membership)
        }
    }
}

/// Drop communities below `cutoff`, order the rest by size descending and
/// then by smallest member, and keep the first `top_n`.
///
/// Node IDs are sorted, so the smallest node index is also the
/// lexicographically smallest work ID.
pub fn rank_communities(communities: Vec<Vec<u32>>, cutoff: usize, top_n: usize) -> Vec<Vec<u32>> {
    communities
        .into_iter()
        .filter(|members| members.len() >= cutoff)
        .map(|mut members| {
            members.sort_unstable();
            members
        })
        .sorted_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.first().cmp(&b.first())))
        .take(top_n)
        .collect()
}
