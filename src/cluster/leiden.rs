//! Modularity-based community detection (Leiden, and Louvain as its
//! refinement-free special case).
//!
//! Each round runs three phases over the current graph:
//!
//! 1. **Local moving**: nodes are visited from a queue and moved to the
//!    neighbouring community with the largest modularity gain.
//! 2. **Refinement**: inside every community, singleton nodes are merged into
//!    well-connected sub-communities, picked at random with probability
//!    proportional to `exp(gain / θ)`. This guarantees connected communities.
//! 3. **Aggregation**: refined sub-communities become nodes of the next
//!    graph, starting from the unrefined partition.
//!
//! All randomness (visit order and refinement choices) comes from a
//! `StdRng` seeded by the caller, so identical input and seed give an
//! identical partition.
//!
//! Reference: Traag, Waltman, van Eck (2019). "From Louvain to Leiden:
//! guaranteeing well-connected communities." Scientific Reports 9, 5233.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::graph::algorithms::{aggregate, WeightedGraph};

const EPSILON: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct Leiden {
    resolution: f64,
    seed: u64,
    max_iterations: usize,
    refine: bool,
    /// θ in the refinement merge probability
    randomness: f64,
}

impl Default for Leiden {
    fn default() -> Self {
        Self::new()
    }
}

impl Leiden {
    pub fn new() -> Self {
        Self {
            resolution: 1.0,
            seed: 42,
            max_iterations: 10,
            refine: true,
            randomness: 0.01,
        }
    }

    /// Louvain: local moving and aggregation without refinement
    pub fn louvain() -> Self {
        Self {
            refine: false,
            ..Self::new()
        }
    }

    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Community ID per node, numbered by first appearance in node order
    pub fn detect(&self, graph: &WeightedGraph) -> Vec<usize> {
        let n = graph.node_count();
        if n == 0 {
            return Vec::new();
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut current = graph.clone();
        let mut node_to_level: Vec<usize> = (0..n).collect();
        let mut partition: Vec<usize> = (0..current.node_count()).collect();

        for round in 0..self.max_iterations {
            move_nodes(&current, &mut partition, self.resolution, &mut rng);
            let community_count = renumber(&mut partition);
            log::debug!(
                "Round {}: {} nodes, {} communities",
                round,
                current.node_count(),
                community_count
            );
            if community_count == current.node_count() {
                break;
            }

            let (refined, refined_count) = if self.refine {
                let mut refined = refine(
                    &current,
                    &partition,
                    community_count,
                    self.resolution,
                    self.randomness,
                    &mut rng,
                );
                let count = renumber(&mut refined);
                (refined, count)
            } else {
                (partition.clone(), community_count)
            };
            if refined_count == current.node_count() {
                break;
            }

            let mut next_partition = vec![0; refined_count];
            for node in 0..current.node_count() {
                next_partition[refined[node]] = partition[node];
            }
            for level in node_to_level.iter_mut() {
                *level = refined[*level];
            }
            current = aggregate(&current, &refined, refined_count);
            partition = next_partition;
        }

        let mut membership: Vec<usize> = node_to_level.iter().map(|&l| partition[l]).collect();
        renumber(&mut membership);
        membership
    }
}

/// Relabel communities `0..k` by first appearance. Returns `k`.
pub fn renumber(membership: &mut [usize]) -> usize {
    let size = membership.iter().copied().max().map_or(0, |m| m + 1);
    let mut mapping = vec![usize::MAX; size];
    let mut next = 0;
    for c in membership.iter_mut() {
        if mapping[*c] == usize::MAX {
            mapping[*c] = next;
            next += 1;
        }
        *c = mapping[*c];
    }
    next
}

/// Modularity of `membership` on a graph without aggregated nodes
pub fn modularity(graph: &WeightedGraph, membership: &[usize], resolution: f64) -> f64 {
    let m2 = graph.total_strength;
    if m2 <= 0.0 {
        return 0.0;
    }
    let count = membership.iter().copied().max().map_or(0, |m| m + 1);
    let mut internal = 0.0;
    let mut strength = vec![0.0; count];
    for node in 0..graph.node_count() {
        strength[membership[node]] += graph.strength[node];
        for &(other, w) in graph.neighbours(node) {
            if membership[other] == membership[node] {
                internal += w;
            }
        }
    }
    let expected: f64 = strength.iter().map(|k| (k / m2).powi(2)).sum();
    internal / m2 - resolution * expected
}

/// Queue-based local moving. Returns whether any node changed community.
fn move_nodes(graph: &WeightedGraph, partition: &mut [usize], gamma: f64, rng: &mut StdRng) -> bool {
    let n = graph.node_count();
    let m2 = graph.total_strength;
    if m2 <= 0.0 {
        return false;
    }

    let mut community_strength = vec![0.0; n];
    let mut community_size = vec![0usize; n];
    for v in 0..n {
        community_strength[partition[v]] += graph.strength[v];
        community_size[partition[v]] += 1;
    }
    let mut empty: Vec<usize> = (0..n).filter(|&c| community_size[c] == 0).collect();

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);
    let mut queue: VecDeque<usize> = order.into();
    let mut in_queue = vec![true; n];

    let mut neighbour_weight = vec![0.0; n];
    let mut touched: Vec<usize> = Vec::new();
    let mut moved = false;

    while let Some(v) = queue.pop_front() {
        in_queue[v] = false;
        let current = partition[v];
        let k_v = graph.strength[v];

        touched.clear();
        for &(u, w) in graph.neighbours(v) {
            let c = partition[u];
            if neighbour_weight[c] == 0.0 {
                touched.push(c);
            }
            neighbour_weight[c] += w;
        }

        community_strength[current] -= k_v;
        community_size[current] -= 1;

        let gain = |c: usize, weights: &[f64], strengths: &[f64]| {
            weights[c] - gamma * k_v * strengths[c] / m2
        };
        let mut best = current;
        let mut best_gain = gain(current, &neighbour_weight, &community_strength);
        for &c in &touched {
            if c == current {
                continue;
            }
            let g = gain(c, &neighbour_weight, &community_strength);
            if g > best_gain + EPSILON {
                best = c;
                best_gain = g;
            }
        }
        // Isolating v in an empty community has gain 0
        if best_gain < -EPSILON && community_size[current] > 0 {
            if let Some(c) = empty.pop() {
                best = c;
            }
        }

        community_strength[best] += k_v;
        community_size[best] += 1;
        partition[v] = best;

        if best != current {
            moved = true;
            if community_size[current] == 0 {
                empty.push(current);
            }
            for &(u, _) in graph.neighbours(v) {
                if !in_queue[u] && partition[u] != best {
                    in_queue[u] = true;
                    queue.push_back(u);
                }
            }
        }

        for &c in &touched {
            neighbour_weight[c] = 0.0;
        }
    }

    moved
}

/// Split each community of `partition` into well-connected sub-communities
fn refine(
    graph: &WeightedGraph,
    partition: &[usize],
    community_count: usize,
    gamma: f64,
    theta: f64,
    rng: &mut StdRng,
) -> Vec<usize> {
    let n = graph.node_count();
    let m2 = graph.total_strength;
    let mut refined: Vec<usize> = (0..n).collect();
    if m2 <= 0.0 {
        return refined;
    }

    let mut community_strength = vec![0.0; community_count];
    for v in 0..n {
        community_strength[partition[v]] += graph.strength[v];
    }

    let mut refined_strength = graph.strength.clone();
    let mut refined_size = vec![1usize; n];
    // Weight from each sub-community to the rest of its enclosing community
    let mut external = vec![0.0; n];
    for v in 0..n {
        for &(u, w) in graph.neighbours(v) {
            if partition[u] == partition[v] {
                external[v] += w;
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);
    let mut neighbour_weight = vec![0.0; n];
    let mut touched: Vec<usize> = Vec::new();

    for v in order {
        let own = refined[v];
        if refined_size[own] != 1 {
            continue;
        }
        let s = partition[v];
        let k_v = graph.strength[v];
        let k_s = community_strength[s];
        if external[own] + EPSILON < gamma * k_v * (k_s - k_v) / m2 {
            continue;
        }

        touched.clear();
        for &(u, w) in graph.neighbours(v) {
            if partition[u] != s {
                continue;
            }
            let c = refined[u];
            if neighbour_weight[c] == 0.0 {
                touched.push(c);
            }
            neighbour_weight[c] += w;
        }

        let mut candidates: Vec<(usize, f64, f64)> = Vec::new();
        for &c in &touched {
            if c == own {
                continue;
            }
            let k_c = refined_strength[c];
            if external[c] + EPSILON < gamma * k_c * (k_s - k_c) / m2 {
                continue;
            }
            let g = neighbour_weight[c] - gamma * k_v * k_c / m2;
            if g >= 0.0 {
                candidates.push((c, g, neighbour_weight[c]));
            }
        }
        for &c in &touched {
            neighbour_weight[c] = 0.0;
        }
        if candidates.is_empty() {
            continue;
        }

        let max_gain = candidates.iter().map(|c| c.1).fold(f64::MIN, f64::max);
        let weights: Vec<f64> = candidates
            .iter()
            .map(|&(_, g, _)| ((g - max_gain) / theta).exp())
            .collect();
        let total: f64 = weights.iter().sum();
        let mut pick = rng.gen::<f64>() * total;
        let mut chosen = candidates.len() - 1;
        for (i, w) in weights.iter().enumerate() {
            if pick < *w {
                chosen = i;
                break;
            }
            pick -= w;
        }
        let (target, _, link) = candidates[chosen];

        external[target] = external[target] + external[own] - 2.0 * link;
        refined_strength[target] += k_v;
        refined_strength[own] = 0.0;
        refined_size[target] += 1;
        refined_size[own] = 0;
        refined[v] = target;
    }

    refined
}
