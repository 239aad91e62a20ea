//! Same-decade reference derivation

use std::collections::{BTreeMap, HashMap, HashSet};

use log;
use rayon::prelude::*;

use crate::error::{Result, Step, StepContext};
use crate::model::{decade_of, Work};
use crate::store::{RecordStore, WorkFilter};

/// Rows written per store update
pub const BATCH_SIZE: usize = 2000;

/// Counts reported after resolving a corpus
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveSummary {
    pub works_updated: usize,
    pub references_kept: usize,
    pub references_unresolved: usize,
}

/// References of `work` published in the same decade as `work`, in reference
/// order without repeats. IDs missing from `years` are dropped.
pub fn in_decade_references(work: &Work, years: &HashMap<String, i32>) -> Vec<String> {
    let decade = work.decade();
    let mut seen = HashSet::new();
    work.referenced_works
        .iter()
        .filter(|r| {
            years
                .get(r.as_str())
                .is_some_and(|&year| decade_of(year) == decade)
        })
        .filter(|r| seen.insert(r.as_str()))
        .cloned()
        .collect()
}

/// Resolve every work of a corpus snapshot in parallel
pub fn resolve_corpus(works: &[Work]) -> Vec<(String, Vec<String>)> {
    let years: HashMap<String, i32> = works
        .iter()
        .map(|w| (w.id.clone(), w.publication_year))
        .collect();

    works
        .par_iter()
        .map(|w| (w.id.clone(), in_decade_references(w, &years)))
        .collect()
}

/// Compute and store the in-decade reference column for the whole corpus
pub fn run<S: RecordStore>(store: &mut S) -> Result<ResolveSummary> {
    let works = store.fetch_by_filter(&WorkFilter::all()).in_step(Step::Resolve)?;
    log::info!("Resolving in-decade references for {} works", works.len());

    let known: HashSet<&str> = works.iter().map(|w| w.id.as_str()).collect();
    let references_unresolved = works
        .iter()
        .flat_map(|w| &w.referenced_works)
        .filter(|r| !known.contains(r.as_str()))
        .count();

    let resolved = resolve_corpus(&works);
    let decade_by_id: HashMap<&str, i32> = works.iter().map(|w| (w.id.as_str(), w.decade())).collect();

    let mut by_decade: BTreeMap<i32, Vec<(String, Vec<String>)>> = BTreeMap::new();
    for (id, refs) in resolved {
        let decade = decade_by_id.get(id.as_str()).copied().unwrap_or_default();
        by_decade.entry(decade).or_default().push((id, refs));
    }

    let mut summary = ResolveSummary {
        references_unresolved,
        ..ResolveSummary::default()
    };
    for (decade, updates) in by_decade {
        let kept: usize = updates.iter().map(|(_, refs)| refs.len()).sum();
        for batch in updates.chunks(BATCH_SIZE) {
            store.update_in_decade_references(batch).in_step(Step::Resolve)?;
        }
        log::info!(
            "Decade {}-{}: {} works, {} in-decade references",
            decade,
            decade + 9,
            updates.len(),
            kept
        );
        summary.works_updated += updates.len();
        summary.references_kept += kept;
    }

    log::info!(
        "Resolved {} works ({} references kept, {} unresolved)",
        summary.works_updated,
        summary.references_kept,
        summary.references_unresolved
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn keeps_only_same_decade_references() {
        let works = vec![
            Work::new("X", 1991).with_references(["Y", "Z", "MISSING"]),
            Work::new("Y", 1991),
            Work::new("Z", 1989),
        ];
        let resolved: HashMap<_, _> = resolve_corpus(&works).into_iter().collect();
        assert_eq!(resolved["X"], vec!["Y".to_string()]);
        assert!(resolved["Y"].is_empty());
    }

    #[test]
    fn decade_boundaries_are_floor_based() {
        let works = vec![
            Work::new("A", 2000).with_references(["B", "C", "D"]),
            Work::new("B", 2009),
            Work::new("C", 1999),
            Work::new("D", 2010),
        ];
        let resolved: HashMap<_, _> = resolve_corpus(&works).into_iter().collect();
        assert_eq!(resolved["A"], vec!["B".to_string()]);
    }

    #[test]
    fn repeated_references_are_collapsed() {
        let works = vec![
            Work::new("A", 1975).with_references(["B", "B"]),
            Work::new("B", 1971),
        ];
        let resolved: HashMap<_, _> = resolve_corpus(&works).into_iter().collect();
        assert_eq!(resolved["A"], vec!["B".to_string()]);
    }

    #[test]
    fn result_is_subset_with_matching_decades() {
        let works: Vec<Work> = (0..40)
            .map(|i| {
                let refs = (0..40).filter(|j| (i * 7 + j) % 3 == 0).map(|j| format!("W{j}"));
                Work::new(format!("W{i}"), 1950 + i * 2).with_references(refs)
            })
            .collect();
        let years: HashMap<String, i32> =
            works.iter().map(|w| (w.id.clone(), w.publication_year)).collect();
        for (id, refs) in resolve_corpus(&works) {
            let work = works.iter().find(|w| w.id == id).unwrap();
            for r in &refs {
                assert!(work.referenced_works.contains(r));
                assert_eq!(decade_of(years[r]), work.decade());
            }
        }
    }

    #[test]
    fn run_writes_back_to_store() {
        let mut store = MemoryStore::from_works([
            Work::new("X", 1991).with_references(["Y", "Z", "GONE"]),
            Work::new("Y", 1991),
            Work::new("Z", 1989),
        ]);
        let summary = run(&mut store).unwrap();
        assert_eq!(summary.works_updated, 3);
        assert_eq!(summary.references_kept, 1);
        assert_eq!(summary.references_unresolved, 1);
        assert_eq!(store.get("X").unwrap().in_decade_references, vec!["Y".to_string()]);
    }
}
