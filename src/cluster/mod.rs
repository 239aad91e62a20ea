//! Per-decade cluster analysis

pub mod detection;
pub mod leiden;
pub mod metrics;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::config::ClusterConfig;
use crate::error::{Result, Step, StepContext};
use crate::graph::builder::induced_subgraph;
use crate::store::{DecadeRow, ExtraColumn, RecordStore};

/// Number of central nodes reported per cluster
const CENTRAL_NODE_COUNT: usize = 5;

/// A retained cluster of works within one decade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    /// Position in the decade's ranking, 0 = largest
    pub rank: usize,

    /// `"{decade_start}-{rank}"`, unique across the report
    pub label: String,

    pub size: usize,

    /// Member work IDs, sorted
    pub members: Vec<String>,

    /// Density: actual citations / potential citations
    pub density: f32,

    /// Members with the highest in-cluster degree
    pub central_nodes: Vec<String>,

    #[serde(default)]
    pub field_distribution: BTreeMap<String, f64>,

    #[serde(default)]
    pub domain_distribution: BTreeMap<String, f64>,

    #[serde(default)]
    pub topic_distribution: BTreeMap<String, f64>,

    /// Citations from members into each retained cluster (any decade),
    /// divided by the product of both cluster sizes
    #[serde(default)]
    pub cluster_links: BTreeMap<String, f64>,

    /// Share of members' references that point inside this cluster
    #[serde(default)]
    pub intracluster_link_ratio: f64,
}

/// Clusters retained for one decade
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecadeClusters {
    pub decade_start: i32,

    /// Works in the decade's subgraph
    pub work_count: usize,

    pub clusters: Vec<Cluster>,

    /// In-decade citations of every retained work, restricted to the decade's works
    pub references: BTreeMap<String, Vec<String>>,
}

impl DecadeClusters {
    fn empty(decade_start: i32, work_count: usize) -> Self {
        Self {
            decade_start,
            work_count,
            ..Self::default()
        }
    }
}

/// Output of a clustering run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterReport {
    pub config: ClusterConfig,
    pub decades: BTreeMap<i32, DecadeClusters>,
}

impl ClusterReport {
    pub fn cluster_count(&self) -> usize {
        self.decades.values().map(|d| d.clusters.len()).sum()
    }
}

/// Cluster one decade's rows. Pure: identical rows and configuration give
/// an identical result.
pub fn build_decade(decade_start: i32, rows: &[DecadeRow], config: &ClusterConfig) -> DecadeClusters {
    if rows.len() < config.cluster_size_cutoff {
        log::info!(
            "Decade {}: {} works, below cutoff {}",
            decade_start,
            rows.len(),
            config.cluster_size_cutoff
        );
        return DecadeClusters::empty(decade_start, rows.len());
    }

    let (graph, dropped) = induced_subgraph(
        rows.iter()
            .map(|r| (r.oa_id.as_str(), r.in_decade_references.as_slice())),
    );
    if dropped > 0 {
        log::debug!("Decade {}: {} references outside the decade set", decade_start, dropped);
    }

    let communities = detection::detect_communities(&graph, config);
    let found = communities.len();
    let ranked =
        detection::rank_communities(communities, config.cluster_size_cutoff, config.top_n);

    let row_of: HashMap<&str, &DecadeRow> = rows.iter().map(|r| (r.oa_id.as_str(), r)).collect();
    let id = |node: u32| graph.node_ids[node as usize].clone();

    let mut references = BTreeMap::new();
    let clusters: Vec<Cluster> = ranked
        .iter()
        .enumerate()
        .map(|(rank, members)| {
            for &node in members {
                let cited = graph.outgoing_edges(node as usize).iter().map(|&d| id(d)).collect();
                references.insert(id(node), cited);
            }
            let member_rows: Vec<&DecadeRow> = members
                .iter()
                .filter_map(|&m| row_of.get(graph.node_ids[m as usize].as_str()).copied())
                .collect();

            Cluster {
                rank,
                label: format!("{decade_start}-{rank}"),
                size: members.len(),
                members: members.iter().map(|&m| id(m)).collect(),
                density: metrics::calculate_density(&graph, members),
                central_nodes: metrics::central_nodes(&graph, members, CENTRAL_NODE_COUNT)
                    .into_iter()
                    .map(id)
                    .collect(),
                field_distribution: metrics::label_distribution(
                    member_rows.iter().map(|r| r.field.as_deref()),
                ),
                domain_distribution: metrics::label_distribution(
                    member_rows.iter().map(|r| r.domain.as_deref()),
                ),
                topic_distribution: metrics::label_distribution(
                    member_rows.iter().map(|r| r.topic.as_deref()),
                ),
                cluster_links: BTreeMap::new(),
                intracluster_link_ratio: 0.0,
            }
        })
        .collect();

    log::info!(
        "Decade {}: {} works, {} citations, {} communities, {} retained",
        decade_start,
        graph.node_count,
        graph.edge_count(),
        found,
        clusters.len()
    );

    DecadeClusters {
        decade_start,
        work_count: rows.len(),
        clusters,
        references,
    }
}

/// Fill `cluster_links` and `intracluster_link_ratio` from each cluster's
/// full reference lists (`full_references[label]`)
pub fn link_clusters(report: &mut ClusterReport, full_references: &HashMap<String, Vec<String>>) {
    let mut node_to_cluster: HashMap<String, String> = HashMap::new();
    let mut size_of: HashMap<String, usize> = HashMap::new();
    for decade in report.decades.values() {
        for cluster in &decade.clusters {
            size_of.insert(cluster.label.clone(), cluster.size);
            for m in &cluster.members {
                node_to_cluster.insert(m.clone(), cluster.label.clone());
            }
        }
    }

    for decade in report.decades.values_mut() {
        for cluster in &mut decade.clusters {
            let refs = full_references.get(&cluster.label).map(Vec::as_slice).unwrap_or(&[]);
            let (counts, total) = metrics::link_counts(refs, &node_to_cluster);

            let internal = counts.get(&cluster.label).copied().unwrap_or(0);
            cluster.intracluster_link_ratio = if total > 0 {
                internal as f64 / total as f64
            } else {
                0.0
            };
            cluster.cluster_links = counts
                .into_iter()
                .filter_map(|(label, count)| {
                    let product = cluster.size * size_of.get(&label).copied().unwrap_or(0);
                    (product > 0).then(|| (label, count as f64 / product as f64))
                })
                .collect();
        }
    }
}

/// Cluster every configured decade of the corpus
pub fn run<S: RecordStore>(store: &S, config: &ClusterConfig) -> Result<ClusterReport> {
    config.validate().in_step(Step::Cluster)?;
    log::info!(
        "Clustering decades {}..={} with {} (cutoff {}, top {}, seed {})",
        config.decade_start,
        config.decade_end,
        config.clustering_method,
        config.cluster_size_cutoff,
        config.top_n,
        config.seed
    );

    let extra = [
        ExtraColumn::Topic,
        ExtraColumn::Field,
        ExtraColumn::Domain,
        ExtraColumn::ReferencedWorks,
    ];
    let mut report = ClusterReport {
        config: config.clone(),
        decades: BTreeMap::new(),
    };
    let mut full_references: HashMap<String, Vec<String>> = HashMap::new();

    for decade_start in config.decades() {
        let rows = store
            .fetch_per_decade_data(decade_start, &extra)
            .in_step(Step::Cluster)?;
        let decade = build_decade(decade_start, &rows, config);

        let row_of: HashMap<&str, &DecadeRow> = rows.iter().map(|r| (r.oa_id.as_str(), r)).collect();
        for cluster in &decade.clusters {
            let refs = cluster
                .members
                .iter()
                .filter_map(|m| row_of.get(m.as_str()))
                .flat_map(|r| r.referenced_works.iter().flatten().cloned())
                .collect();
            full_references.insert(cluster.label.clone(), refs);
        }
        report.decades.insert(decade_start, decade);
    }

    link_clusters(&mut report, &full_references);
    log::info!(
        "Retained {} clusters across {} decades",
        report.cluster_count(),
        report.decades.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClusteringMethod;

    fn row(id: &str, refs: &[&str]) -> DecadeRow {
        DecadeRow {
            oa_id: id.to_string(),
            in_decade_references: refs.iter().map(|s| s.to_string()).collect(),
            ..DecadeRow::default()
        }
    }

    /// Clique of `size` works prefixed with `prefix`, all citing each other
    fn clique(prefix: &str, size: usize) -> Vec<DecadeRow> {
        let ids: Vec<String> = (0..size).map(|i| format!("{prefix}{i}")).collect();
        ids.iter()
            .map(|id| {
                let refs: Vec<&str> = ids.iter().filter(|o| *o != id).map(String::as_str).collect();
                row(id, &refs)
            })
            .collect()
    }

    #[test]
    fn small_decade_yields_no_clusters() {
        let rows = vec![row("A", &["B"]), row("B", &["C"]), row("C", &[])];
        let decade = build_decade(1990, &rows, &ClusterConfig::default());
        assert!(decade.clusters.is_empty());
        assert_eq!(decade.work_count, 3);
    }

    #[test]
    fn component_below_cutoff_is_dropped() {
        let mut rows = clique("P", 6);
        rows.extend(vec![row("X", &["Y"]), row("Y", &["Z"]), row("Z", &[])]);
        let decade = build_decade(1990, &rows, &ClusterConfig::default());
        assert_eq!(decade.clusters.len(), 1);
        assert_eq!(decade.clusters[0].members, vec!["P0", "P1", "P2", "P3", "P4", "P5"]);
        assert_eq!(decade.clusters[0].label, "1990-0");
        assert!(!decade.references.contains_key("X"));
        assert_eq!(decade.references["P0"].len(), 5);
    }

    #[test]
    fn equal_sizes_rank_by_smallest_member() {
        let mut rows = clique("M", 5);
        rows.extend(clique("B", 5));
        rows.extend(clique("Z", 7));
        let decade = build_decade(1980, &rows, &ClusterConfig::default());
        let firsts: Vec<&str> = decade.clusters.iter().map(|c| c.members[0].as_str()).collect();
        assert_eq!(firsts, vec!["Z0", "B0", "M0"]);
        let ranks: Vec<usize> = decade.clusters.iter().map(|c| c.rank).collect();
        assert_eq!(ranks, vec![0, 1, 2]);
    }

    #[test]
    fn top_n_limits_retained_clusters() {
        let mut rows = Vec::new();
        for prefix in ["A", "B", "C", "D"] {
            rows.extend(clique(prefix, 5));
        }
        let config = ClusterConfig { top_n: 2, ..ClusterConfig::default() };
        let decade = build_decade(1970, &rows, &config);
        assert_eq!(decade.clusters.len(), 2);
        assert!(decade.clusters.iter().all(|c| c.size >= config.cluster_size_cutoff));
    }

    #[test]
    fn components_method_keeps_whole_components() {
        let mut rows = clique("A", 5);
        rows.push(row("A9", &["A0"]));
        let config = ClusterConfig {
            clustering_method: ClusteringMethod::Components,
            ..ClusterConfig::default()
        };
        let decade = build_decade(1970, &rows, &config);
        assert_eq!(decade.clusters.len(), 1);
        assert_eq!(decade.clusters[0].size, 6);
    }

    #[test]
    fn links_are_normalized_by_size_product() {
        let mut report = ClusterReport {
            config: ClusterConfig::default(),
            decades: BTreeMap::new(),
        };
        let cluster = |label: &str, members: &[&str]| Cluster {
            rank: 0,
            label: label.to_string(),
            size: members.len(),
            members: members.iter().map(|s| s.to_string()).collect(),
            density: 0.0,
            central_nodes: Vec::new(),
            field_distribution: BTreeMap::new(),
            domain_distribution: BTreeMap::new(),
            topic_distribution: BTreeMap::new(),
            cluster_links: BTreeMap::new(),
            intracluster_link_ratio: 0.0,
        };
        report.decades.insert(
            1980,
            DecadeClusters {
                decade_start: 1980,
                work_count: 2,
                clusters: vec![cluster("1980-0", &["OLD1", "OLD2"])],
                references: BTreeMap::new(),
            },
        );
        report.decades.insert(
            1990,
            DecadeClusters {
                decade_start: 1990,
                work_count: 2,
                clusters: vec![cluster("1990-0", &["NEW1", "NEW2"])],
                references: BTreeMap::new(),
            },
        );
        let mut refs = HashMap::new();
        refs.insert(
            "1990-0".to_string(),
            vec!["OLD1".into(), "OLD2".into(), "NEW2".into(), "ELSEWHERE".into()],
        );

        link_clusters(&mut report, &refs);
        let newer = &report.decades[&1990].clusters[0];
        assert!((newer.cluster_links["1980-0"] - 0.5).abs() < 1e-9);
        assert!((newer.cluster_links["1990-0"] - 0.25).abs() < 1e-9);
        assert!((newer.intracluster_link_ratio - 0.25).abs() < 1e-9);
        assert!(report.decades[&1980].clusters[0].cluster_links.is_empty());
    }
}
