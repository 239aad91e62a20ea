//! Assembly of cluster reports into decade-partitioned citation graphs

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cluster::ClusterReport;
use crate::error::{Result, Step, StepContext};
use crate::graph::citation::{CitationGraph, WorkNode};
use crate::model::CitationEdge;
use crate::storage;
use crate::store::RecordStore;

/// Citation graph of one decade's retained works
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecadeGraph {
    pub nodes: Vec<WorkNode>,
    pub edges: Vec<CitationEdge>,
}

/// One retained cluster in the evolution graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterNode {
    pub label: String,
    pub decade_start: i32,
    pub size: usize,
}

/// Normalized citation flow from one cluster into another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterLink {
    pub source: String,
    pub target: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphArtifact {
    pub decades: BTreeMap<i32, DecadeGraph>,

    #[serde(default)]
    pub clusters: Vec<ClusterNode>,

    #[serde(default)]
    pub cluster_links: Vec<ClusterLink>,
}

impl GraphArtifact {
    pub fn node_count(&self) -> usize {
        self.decades.values().map(|d| d.nodes.len()).sum()
    }

    pub fn edge_count(&self) -> usize {
        self.decades.values().map(|d| d.edges.len()).sum()
    }

    /// Every edge of every decade
    pub fn all_edges(&self) -> impl Iterator<Item = &CitationEdge> + '_ {
        self.decades.values().flat_map(|d| d.edges.iter())
    }
}

/// Build the citation graph of each decade's retained works, plus the
/// cluster-level graph
pub fn assemble(report: &ClusterReport) -> GraphArtifact {
    let mut artifact = GraphArtifact::default();

    for (&decade_start, decade) in &report.decades {
        let mut graph = CitationGraph::new(decade_start);
        for cluster in &decade.clusters {
            for member in &cluster.members {
                graph.add_work(member, &cluster.label);
            }
            artifact.clusters.push(ClusterNode {
                label: cluster.label.clone(),
                decade_start,
                size: cluster.size,
            });
        }

        let mut outside = 0usize;
        for (from, cited) in &decade.references {
            if !graph.contains(from) {
                outside += cited.len();
                continue;
            }
            for to in cited {
                if !graph.add_citation(from, to) && !graph.contains(to) {
                    outside += 1;
                }
            }
        }
        log::debug!(
            "Decade {}: {} nodes, {} edges, {} citations to pruned works dropped",
            decade_start,
            graph.node_count(),
            graph.edge_count(),
            outside
        );

        artifact.decades.insert(
            decade_start,
            DecadeGraph {
                nodes: graph.nodes(),
                edges: graph.edges(),
            },
        );
    }

    for decade in report.decades.values() {
        for cluster in &decade.clusters {
            for (target, &weight) in &cluster.cluster_links {
                artifact.cluster_links.push(ClusterLink {
                    source: cluster.label.clone(),
                    target: target.clone(),
                    weight,
                });
            }
        }
    }

    artifact
}

/// Read a cluster report, write the assembled graph and optionally record
/// its edges in `store`
pub fn run<S: RecordStore>(input: &Path, output: &Path, store: Option<&mut S>) -> Result<GraphArtifact> {
    let report = storage::load_report(input).in_step(Step::Assemble)?;
    let artifact = assemble(&report);
    log::info!(
        "Assembled {} nodes and {} edges across {} decades",
        artifact.node_count(),
        artifact.edge_count(),
        artifact.decades.len()
    );

    storage::save_graph(&artifact, output).in_step(Step::Assemble)?;

    if let Some(store) = store {
        let edges: Vec<CitationEdge> = artifact.all_edges().cloned().collect();
        let inserted = store.insert_citation_edges(&edges).in_step(Step::Assemble)?;
        log::info!("Persisted {} new citation edges", inserted);
    }
    Ok(artifact)
}
