//! Cluster statistics and metrics

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::graph::CompressedGraph;

/// Calculate density (actual edges / potential edges)
pub fn calculate_density(graph: &CompressedGraph, members: &[u32]) -> f32 {
    let n = members.len();
    if n <= 1 {
        return 1.0; // By convention, singleton clusters have density 1
    }

    // Potential edges = n * (n - 1) for directed graph
    let potential_edges = n * (n - 1);

    let member_set: HashSet<u32> = members.iter().copied().collect();
    let actual_edges: usize = members
        .iter()
        .map(|&src| {
            graph
                .outgoing_edges(src as usize)
                .iter()
                .filter(|dst| member_set.contains(dst))
                .count()
        })
        .sum();

    actual_edges as f32 / potential_edges as f32
}

/// Up to `limit` members with the highest in-cluster degree (in + out),
/// ties broken by node index
pub fn central_nodes(graph: &CompressedGraph, members: &[u32], limit: usize) -> Vec<u32> {
    let member_set: HashSet<u32> = members.iter().copied().collect();
    let mut degrees: HashMap<u32, u32> = members.iter().map(|&m| (m, 0)).collect();

    for &src in members {
        for &dst in graph.outgoing_edges(src as usize) {
            if member_set.contains(&dst) {
                *degrees.entry(src).or_default() += 1;
                *degrees.entry(dst).or_default() += 1;
            }
        }
    }

    let mut nodes_by_degree: Vec<(u32, u32)> = degrees.into_iter().collect();
    nodes_by_degree.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    nodes_by_degree
        .into_iter()
        .take(limit)
        .map(|(node, _)| node)
        .collect()
}

/// Share of each label among members with a known label
pub fn label_distribution<'a, I>(labels: I) -> BTreeMap<String, f64>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for label in labels.into_iter().flatten() {
        *counts.entry(label.to_string()).or_default() += 1;
    }
    let total: usize = counts.values().sum();
    if total == 0 {
        return BTreeMap::new();
    }
    counts
        .into_iter()
        .map(|(label, count)| (label, count as f64 / total as f64))
        .collect()
}

/// Outgoing citation counts of a cluster, grouped by the retained cluster
/// the cited work belongs to
pub fn link_counts<'a, I>(references: I, node_to_cluster: &HashMap<String, String>) -> (BTreeMap<String, usize>, usize)
where
    I: IntoIterator<Item = &'a String>,
{
    let mut total = 0;
    let mut by_cluster: BTreeMap<String, usize> = BTreeMap::new();
    for r in references {
        total += 1;
        if let Some(label) = node_to_cluster.get(r) {
            *by_cluster.entry(label.clone()).or_default() += 1;
        }
    }
    (by_cluster, total)
}
