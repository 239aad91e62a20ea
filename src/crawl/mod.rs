//! Seed discovery and breadth-first citation crawl

use std::collections::HashMap;

use log;

use crate::config::CrawlConfig;
use crate::data::preprocessing::Deduper;
use crate::error::{Result, Step, StepContext};
use crate::model::Work;
use crate::store::{RecordStore, WorkFilter};

/// Works discovered by a crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlResult {
    /// Every admitted work, seeds first, annotated with its layer
    pub works: Vec<Work>,

    /// IDs first discovered at hop `i + 1`
    pub layers: Vec<Vec<String>>,
}

impl CrawlResult {
    pub fn layer_of(&self, id: &str) -> Option<u32> {
        self.works.iter().find(|w| w.id == id).map(|w| w.layer)
    }
}

/// Select the seed set: works matching the search term, published after the
/// year bound and cited at least `min_citations` times
pub fn discover_seeds<S: RecordStore>(store: &S, config: &CrawlConfig) -> Result<Vec<Work>> {
    config.validate()?;
    log::info!(
        "Discovering seeds for {:?} (cited_by >= {}, year > {})",
        config.search_term,
        config.min_citations,
        config.min_year_exclusive
    );

    let filter = WorkFilter {
        search: Some(config.search_term.clone()),
        min_cited_by: Some(config.min_citations),
        published_after: Some(config.min_year_exclusive),
        ..WorkFilter::default()
    };
    let mut deduper = Deduper::new();
    let seeds: Vec<Work> = store
        .fetch_by_filter(&filter)?
        .into_iter()
        .filter(|w| deduper.admit(w))
        .collect();

    log::info!("Found {} seed works", seeds.len());
    Ok(seeds)
}

fn admissible(work: &Work, config: &CrawlConfig) -> bool {
    work.cited_by_count >= config.min_citations && work.publication_year > config.min_year_exclusive
}

/// Breadth-first expansion from `seed_ids` over both citation directions.
///
/// Seeds take layer 0 unconditionally. A neighbour joins the next frontier only
/// if it passes the citation and year thresholds and was not discovered
/// earlier, so each work keeps its minimal hop distance. Seed IDs missing
/// from the store are skipped.
pub fn crawl<S: RecordStore>(
    store: &S,
    seed_ids: &[String],
    config: &CrawlConfig,
) -> Result<CrawlResult> {
    config.validate()?;

    let mut layer_of: HashMap<String, u32> = HashMap::new();
    let mut deduper = Deduper::new();
    let mut result = CrawlResult::default();

    let mut seeds = store.fetch_by_filter(&WorkFilter::ids(seed_ids.iter().cloned()))?;
    seeds.sort_by(|a, b| a.id.cmp(&b.id));
    if seeds.len() < seed_ids.len() {
        log::warn!(
            "{} of {} seed IDs not found in the store",
            seed_ids.len() - seeds.len(),
            seed_ids.len()
        );
    }

    let mut frontier = Vec::with_capacity(seeds.len());
    for mut seed in seeds {
        if !deduper.admit(&seed) {
            continue;
        }
        seed.layer = 0;
        layer_of.insert(seed.id.clone(), 0);
        frontier.push(seed.id.clone());
        result.works.push(seed);
    }

    for hop in 1..=config.max_hops {
        if frontier.is_empty() {
            log::info!("No new frontier to expand");
            break;
        }
        log::info!("Hop {}: expanding {} works", hop, frontier.len());

        let mut next = Vec::new();
        for id in &frontier {
            let mut neighbours = store.fetch_cited(id)?;
            neighbours.extend(store.fetch_citing(id)?);

            for mut candidate in neighbours {
                if layer_of.contains_key(&candidate.id) {
                    continue;
                }
                if !admissible(&candidate, config) {
                    log::debug!(
                        "Rejected {} (cited_by {}, year {})",
                        candidate.id,
                        candidate.cited_by_count,
                        candidate.publication_year
                    );
                    continue;
                }
                if !deduper.admit(&candidate) {
                    continue;
                }
                candidate.layer = hop;
                layer_of.insert(candidate.id.clone(), hop);
                next.push(candidate.id.clone());
                result.works.push(candidate);
            }
        }

        log::info!(
            "Layer {}: {} new works; total: {}",
            hop,
            next.len(),
            result.works.len()
        );
        result.layers.push(next.clone());
        frontier = next;
    }

    Ok(result)
}

/// Discover seeds in `source`, crawl, and upsert every discovered work into `target`
pub fn run<S: RecordStore, T: RecordStore>(
    source: &S,
    target: &mut T,
    config: &CrawlConfig,
) -> Result<CrawlResult> {
    let seeds = discover_seeds(source, config).in_step(Step::Discovery)?;
    let seed_ids: Vec<String> = seeds.into_iter().map(|w| w.id).collect();
    let result = crawl(source, &seed_ids, config).in_step(Step::Crawl)?;
    let written = target.bulk_insert(&result.works).in_step(Step::Crawl)?;
    log::info!("Stored {} crawled works", written);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::collections::{HashSet, VecDeque};

    fn config(max_hops: u32, min_citations: i64) -> CrawlConfig {
        CrawlConfig {
            search_term: "vector".into(),
            max_hops,
            min_citations,
            min_year_exclusive: 1920,
        }
    }

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn chain_is_discovered_layer_by_layer() {
        let store = MemoryStore::from_works([
            Work::new("A", 1987).with_references(["B"]),
            Work::new("B", 1985).with_references(["C"]),
            Work::new("C", 1986),
        ]);
        let result = crawl(&store, &ids(&["A"]), &config(2, 0)).unwrap();
        assert_eq!(result.layer_of("A"), Some(0));
        assert_eq!(result.layer_of("B"), Some(1));
        assert_eq!(result.layer_of("C"), Some(2));
        assert_eq!(result.layers, vec![ids(&["B"]), ids(&["C"])]);
    }

    #[test]
    fn hop_limit_stops_expansion() {
        let store = MemoryStore::from_works([
            Work::new("A", 1987).with_references(["B"]),
            Work::new("B", 1985).with_references(["C"]),
            Work::new("C", 1986),
        ]);
        let result = crawl(&store, &ids(&["A"]), &config(1, 0)).unwrap();
        assert_eq!(result.works.len(), 2);
        assert_eq!(result.layer_of("C"), None);
    }

    #[test]
    fn citing_direction_is_followed() {
        let store = MemoryStore::from_works([
            Work::new("S", 1990),
            Work::new("X", 1995).with_citations(50).with_references(["S"]),
        ]);
        let result = crawl(&store, &ids(&["S"]), &config(2, 20)).unwrap();
        assert_eq!(result.layer_of("X"), Some(1));
    }

    #[test]
    fn threshold_blocks_frontier_but_keeps_dangling_references() {
        let store = MemoryStore::from_works([
            Work::new("A", 1990).with_citations(1).with_references(["LOW", "HIGH"]),
            Work::new("LOW", 1990).with_citations(5).with_references(["BEHIND"]),
            Work::new("HIGH", 1990).with_citations(25),
            Work::new("BEHIND", 1990).with_citations(100),
        ]);
        let result = crawl(&store, &ids(&["A"]), &config(3, 20)).unwrap();

        // The seed itself is below threshold but still occupies layer 0
        assert_eq!(result.layer_of("A"), Some(0));
        assert_eq!(result.layer_of("HIGH"), Some(1));
        assert_eq!(result.layer_of("LOW"), None);
        assert_eq!(result.layer_of("BEHIND"), None);
        assert!(result.works.iter().filter(|w| w.layer > 0).all(|w| w.cited_by_count >= 20));

        let seed = result.works.iter().find(|w| w.id == "A").unwrap();
        assert_eq!(seed.referenced_works, ids(&["LOW", "HIGH"]));
    }

    #[test]
    fn year_bound_is_exclusive() {
        let store = MemoryStore::from_works([
            Work::new("A", 1990).with_references(["OLD", "EDGE"]),
            Work::new("OLD", 1900),
            Work::new("EDGE", 1920),
        ]);
        let result = crawl(&store, &ids(&["A"]), &config(1, 0)).unwrap();
        assert_eq!(result.works.len(), 1);
    }

    #[test]
    fn isolated_and_missing_seeds() {
        let store = MemoryStore::from_works([Work::new("LONE", 1990)]);
        let result = crawl(&store, &ids(&["LONE", "GHOST"]), &config(2, 0)).unwrap();
        assert_eq!(result.works.len(), 1);
        assert_eq!(result.layer_of("LONE"), Some(0));
        assert!(result.layers.iter().all(|l| l.is_empty()));
    }

    #[test]
    fn duplicate_titles_are_admitted_once() {
        let store = MemoryStore::from_works([
            Work::new("A", 1990).with_references(["B", "C"]),
            Work::new("B", 1990).with_title("Same Paper"),
            Work::new("C", 1990).with_title("same   paper"),
        ]);
        let result = crawl(&store, &ids(&["A"]), &config(1, 0)).unwrap();
        assert_eq!(result.works.len(), 2);
        assert_eq!(result.layer_of("B"), Some(1));
    }

    /// Reference BFS over the undirected citation graph
    fn bfs_distances(works: &[Work], seeds: &[&str]) -> HashMap<String, u32> {
        let mut adj: HashMap<&str, Vec<&str>> = HashMap::new();
        let present: HashSet<&str> = works.iter().map(|w| w.id.as_str()).collect();
        for w in works {
            for r in &w.referenced_works {
                if present.contains(r.as_str()) {
                    adj.entry(w.id.as_str()).or_default().push(r.as_str());
                    adj.entry(r.as_str()).or_default().push(w.id.as_str());
                }
            }
        }
        let mut dist = HashMap::new();
        let mut queue = VecDeque::new();
        for s in seeds {
            dist.insert(s.to_string(), 0);
            queue.push_back(*s);
        }
        while let Some(node) = queue.pop_front() {
            let d = dist[node];
            for &next in adj.get(node).into_iter().flatten() {
                if !dist.contains_key(next) {
                    dist.insert(next.to_string(), d + 1);
                    queue.push_back(next);
                }
            }
        }
        dist
    }

    #[test]
    fn layers_are_minimal_hop_distances() {
        // Two seeds, a diamond, a longer detour and a tail
        let works = vec![
            Work::new("S1", 1990).with_references(["A", "B"]),
            Work::new("S2", 1991).with_references(["D"]),
            Work::new("A", 1992).with_references(["C"]),
            Work::new("B", 1993).with_references(["C", "E"]),
            Work::new("C", 1994).with_references(["F"]),
            Work::new("D", 1995).with_references(["F"]),
            Work::new("E", 1996),
            Work::new("F", 1997).with_references(["G"]),
            Work::new("G", 1998).with_references(["H"]),
            Work::new("H", 1999),
        ];
        let store = MemoryStore::from_works(works.clone());
        let result = crawl(&store, &ids(&["S1", "S2"]), &config(10, 0)).unwrap();
        let expected = bfs_distances(&works, &["S1", "S2"]);

        assert_eq!(result.works.len(), expected.len());
        for work in &result.works {
            assert_eq!(Some(&work.layer), expected.get(&work.id), "layer of {}", work.id);
        }
        assert_eq!(result.layer_of("F"), Some(2));
        assert_eq!(result.layer_of("H"), Some(4));
    }

    #[test]
    fn run_discovers_crawls_and_stores() {
        let source = MemoryStore::from_works([
            Work::new("S", 1990).with_title("Vector spaces").with_citations(30).with_references(["N"]),
            Work::new("N", 1991).with_title("Neighbour").with_citations(30),
            Work::new("Q", 1991).with_title("Vector fields").with_citations(2),
        ]);
        let mut target = MemoryStore::new();
        let result = run(&source, &mut target, &config(2, 20)).unwrap();
        assert_eq!(result.works.len(), 2);
        assert_eq!(target.get("S").map(|w| w.layer), Some(0));
        assert_eq!(target.get("N").map(|w| w.layer), Some(1));
        assert!(target.get("Q").is_none());
    }
}
