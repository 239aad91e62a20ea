use std::collections::HashSet;

use citation_cluster_analyzer::config::{ClusterConfig, ClusteringMethod, CrawlConfig};
use citation_cluster_analyzer::error::Step;
use citation_cluster_analyzer::model::Work;
use citation_cluster_analyzer::store::{ExtraColumn, MemoryStore, RecordStore, SqliteStore};
use citation_cluster_analyzer::{assemble, cluster, crawl, resolve, storage, Error};

/// `size` works of `year` that all cite each other
fn clique(prefix: &str, size: usize, year: i32) -> Vec<Work> {
    let ids: Vec<String> = (0..size).map(|i| format!("{prefix}{i}")).collect();
    ids.iter()
        .map(|id| {
            Work::new(id.clone(), year)
                .with_citations(50)
                .with_references(ids.iter().filter(|o| *o != id).cloned())
        })
        .collect()
}

fn corpus() -> Vec<Work> {
    let mut works = clique("P", 6, 1991);
    works.extend(clique("Q", 5, 1994));
    // Small chain, below the cutoff
    works.push(Work::new("X", 1992).with_references(["Y"]));
    works.push(Work::new("Y", 1993).with_references(["P0"]));
    // Different decade
    works.push(Work::new("OLD", 1984));
    works[0].referenced_works.push("OLD".into());
    works
}

#[test]
fn crawl_follows_the_chain_across_stores() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = SqliteStore::open(dir.path().join("source.db")).unwrap();
    source
        .bulk_insert(&[
            Work::new("A", 1987).with_title("A vector space model").with_references(["B"]),
            Work::new("B", 1985).with_references(["C"]),
            Work::new("C", 1986),
        ])
        .unwrap();

    let mut target = SqliteStore::open(dir.path().join("crawl.db")).unwrap();
    let config = CrawlConfig {
        search_term: "vector space".into(),
        max_hops: 2,
        min_citations: 0,
        min_year_exclusive: 1920,
    };
    let result = crawl::run(&source, &mut target, &config).unwrap();

    assert_eq!(result.layer_of("A"), Some(0));
    assert_eq!(result.layer_of("B"), Some(1));
    assert_eq!(result.layer_of("C"), Some(2));
    assert_eq!(target.count_works().unwrap(), 3);
}

#[test]
fn resolver_keeps_only_same_decade_references() {
    let mut store = MemoryStore::from_works([
        Work::new("X", 1991).with_references(["Y", "Z"]),
        Work::new("Y", 1991),
        Work::new("Z", 1989),
    ]);
    resolve::run(&mut store).unwrap();

    let rows = store.fetch_per_decade_data(1990, &[]).unwrap();
    let x = rows.iter().find(|r| r.oa_id == "X").unwrap();
    assert_eq!(x.in_decade_references, vec!["Y".to_string()]);
}

#[test]
fn small_decade_yields_zero_clusters() {
    let mut store = MemoryStore::from_works([
        Work::new("A", 1990).with_references(["B"]),
        Work::new("B", 1991).with_references(["C"]),
        Work::new("C", 1992),
    ]);
    resolve::run(&mut store).unwrap();

    let config = ClusterConfig {
        decade_start: 1990,
        decade_end: 1990,
        ..ClusterConfig::default()
    };
    let report = cluster::run(&store, &config).unwrap();
    assert!(report.decades[&1990].clusters.is_empty());
}

#[test]
fn full_pipeline_on_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = SqliteStore::open(dir.path().join("works.db")).unwrap();
    store.bulk_insert(&corpus()).unwrap();
    resolve::run(&mut store).unwrap();

    let config = ClusterConfig {
        decade_start: 1980,
        decade_end: 1990,
        ..ClusterConfig::default()
    };
    let report = cluster::run(&store, &config).unwrap();
    assert!(report.decades[&1980].clusters.is_empty());

    let clusters = &report.decades[&1990].clusters;
    let members: Vec<Vec<&str>> = clusters
        .iter()
        .map(|c| c.members.iter().map(String::as_str).collect())
        .collect();
    assert_eq!(
        members,
        vec![
            vec!["P0", "P1", "P2", "P3", "P4", "P5"],
            vec!["Q0", "Q1", "Q2", "Q3", "Q4"],
        ]
    );
    assert_eq!(clusters[0].label, "1990-0");
    assert!((clusters[0].density - 1.0).abs() < 1e-6);

    let report_path = dir.path().join("clusters.json");
    storage::save_report(&report, &report_path).unwrap();

    let graph_path = dir.path().join("graph.json");
    let artifact = assemble::run(&report_path, &graph_path, Some(&mut store)).unwrap();

    let retained: HashSet<&str> = clusters.iter().flat_map(|c| c.members.iter().map(String::as_str)).collect();
    assert!(artifact
        .all_edges()
        .all(|e| retained.contains(e.from_id.as_str()) && retained.contains(e.to_id.as_str())));
    assert_eq!(artifact.edge_count(), 6 * 5 + 5 * 4);
    assert_eq!(storage::load_graph(&graph_path).unwrap().decades, artifact.decades);

    let stored = store.execute_query("SELECT COUNT(*) FROM citation_edges").unwrap();
    assert_eq!(stored, vec![vec!["50".to_string()]]);

    // Reruns insert nothing new
    let again = store.insert_citation_edges(&artifact.all_edges().cloned().collect::<Vec<_>>()).unwrap();
    assert_eq!(again, 0);
}

#[test]
fn clustering_is_reproducible() {
    let mut store = MemoryStore::from_works(corpus());
    resolve::run(&mut store).unwrap();
    let config = ClusterConfig {
        decade_start: 1990,
        decade_end: 1990,
        cluster_size_cutoff: 2,
        ..ClusterConfig::default()
    };

    let first = serde_json::to_string(&cluster::run(&store, &config).unwrap()).unwrap();
    let second = serde_json::to_string(&cluster::run(&store, &config).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn top_n_and_cutoff_bound_every_decade() {
    let mut store = MemoryStore::from_works(corpus());
    resolve::run(&mut store).unwrap();
    for method in [ClusteringMethod::Leiden, ClusteringMethod::Louvain, ClusteringMethod::Components] {
        let config = ClusterConfig {
            clustering_method: method,
            decade_start: 1990,
            decade_end: 1990,
            top_n: 1,
            ..ClusterConfig::default()
        };
        let report = cluster::run(&store, &config).unwrap();
        let clusters = &report.decades[&1990].clusters;
        assert_eq!(clusters.len(), 1, "{method}");
        assert!(clusters[0].size >= config.cluster_size_cutoff);
    }
}

#[test]
fn distributions_come_from_classification() {
    let mut works = clique("P", 5, 1991);
    for (i, work) in works.iter_mut().enumerate() {
        let field = if i < 4 { "Computer Science" } else { "Mathematics" };
        *work = work.clone().with_classification("Physical Sciences", field, "Information Retrieval");
    }
    let mut store = MemoryStore::from_works(works);
    resolve::run(&mut store).unwrap();
    let config = ClusterConfig {
        decade_start: 1990,
        decade_end: 1990,
        ..ClusterConfig::default()
    };

    let report = cluster::run(&store, &config).unwrap();
    let cluster = &report.decades[&1990].clusters[0];
    assert!((cluster.field_distribution["Computer Science"] - 0.8).abs() < 1e-9);
    assert_eq!(cluster.domain_distribution["Physical Sciences"], 1.0);
    assert_eq!(cluster.intracluster_link_ratio, 1.0);
    assert!((cluster.cluster_links[&cluster.label] - 20.0 / 25.0).abs() < 1e-9);

    let rows = store
        .fetch_per_decade_data(1990, &[ExtraColumn::Field])
        .unwrap();
    assert_eq!(rows.len(), 5);
}

#[test]
fn invalid_configuration_fails_before_clustering() {
    let store = MemoryStore::new();
    let config = ClusterConfig {
        decade_start: 1955,
        ..ClusterConfig::default()
    };
    let err = cluster::run(&store, &config).unwrap_err();
    assert_eq!(err.step(), Some(Step::Cluster));

    assert!(matches!(
        "infomap".parse::<ClusteringMethod>(),
        Err(Error::Config { param: "clustering_method", .. })
    ));
}

#[test]
fn missing_database_is_a_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = SqliteStore::open_existing(dir.path().join("absent.db")).err().unwrap();
    assert!(matches!(err, Error::Connection(_)));
}
